//! JSON documents persisted under the progress and risk-history keys.
//!
//! Encoding is strict. Decoding reads each field on its own: a malformed
//! field falls back to its default and a malformed list entry is skipped.
//! Each recovery is logged and reported in `issues`.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;
use training_core::catalog::ModuleCatalog;
use training_core::model::{
    AchievementId, EngineSettings, ModuleCompletion, ModuleId, ProgressParts, ProgressRecord,
    QuizAttempt, RiskAssessmentEntry, RiskHistory, RiskLevel,
};
use training_core::rules::{self, LoadReconciliation};

use crate::repository::StorageError;

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn issue(issues: &mut Vec<String>, message: String) {
    warn!(target: "storage::documents", "{message}");
    issues.push(message);
}

//
// ─── PROGRESS ─────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum ModuleKey {
    Number(u64),
    Text(String),
}

fn completed_default() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModuleEntryDoc {
    module_id: ModuleKey,
    #[serde(default = "completed_default")]
    completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    time_spent: Option<u32>,
}

/// Older dashboards stored bare ids; newer ones store objects.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ModuleEntryRaw {
    Detailed(ModuleEntryDoc),
    Bare(ModuleKey),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuizResultDoc {
    score: u32,
    total_questions: u32,
    #[serde(default)]
    date: Option<DateTime<Utc>>,
    #[serde(default)]
    passed: Option<bool>,
}

/// Wire shape of the progress record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressDocument {
    completed_modules: Vec<ModuleEntryDoc>,
    quiz_score: u8,
    quiz_results: Vec<QuizResultDoc>,
    assessments_completed: u32,
    total_time_spent: u64,
    achievements: Vec<AchievementId>,
    certificate_earned: bool,
    certificate_date: Option<DateTime<Utc>>,
    last_visit: Option<DateTime<Utc>>,
}

impl ProgressDocument {
    #[must_use]
    pub fn from_record(record: &ProgressRecord) -> Self {
        Self {
            completed_modules: record
                .completed_modules()
                .iter()
                .map(|c| ModuleEntryDoc {
                    module_id: ModuleKey::Number(u64::from(c.module_id().value())),
                    completed: true,
                    completed_at: c.completed_at(),
                    time_spent: c.time_spent_minutes(),
                })
                .collect(),
            quiz_score: record.quiz_score(),
            quiz_results: record
                .quiz_results()
                .iter()
                .map(|a| QuizResultDoc {
                    score: a.score(),
                    total_questions: a.total_questions(),
                    date: Some(a.taken_at()),
                    passed: Some(a.passed()),
                })
                .collect(),
            assessments_completed: record.assessments_completed(),
            total_time_spent: record.total_time_spent_minutes(),
            achievements: record.achievements().to_vec(),
            certificate_earned: record.certificate_earned(),
            certificate_date: record.certificate_date(),
            last_visit: record.last_visit(),
        }
    }
}

/// Serialize a record for the progress key.
///
/// # Errors
///
/// Returns `StorageError::Serialization` if encoding fails.
pub fn encode_progress(record: &ProgressRecord) -> Result<String, StorageError> {
    serde_json::to_string(&ProgressDocument::from_record(record)).map_err(ser)
}

/// A record rebuilt from storage, plus what had to be repaired.
#[derive(Debug, Clone, Default)]
pub struct DecodedProgress {
    pub record: ProgressRecord,
    pub issues: Vec<String>,
    pub reconciliation: LoadReconciliation,
}

impl DecodedProgress {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Rebuild a record from whatever is stored under the progress key.
///
/// Never fails: unusable input yields the default record. `now` stamps quiz
/// attempts that were stored without a date.
#[must_use]
pub fn decode_progress(
    raw: &str,
    settings: &EngineSettings,
    catalog: &ModuleCatalog,
    now: DateTime<Utc>,
) -> DecodedProgress {
    let mut issues = Vec::new();

    let value: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(err) => {
            issue(
                &mut issues,
                format!("progress payload is not valid JSON ({err}); using defaults"),
            );
            return DecodedProgress {
                issues,
                ..DecodedProgress::default()
            };
        }
    };
    let Value::Object(map) = value else {
        issue(&mut issues, "progress payload is not a JSON object; using defaults".into());
        return DecodedProgress {
            issues,
            ..DecodedProgress::default()
        };
    };

    let total_time_spent_minutes = field::<u64>(&map, "totalTimeSpent", &mut issues)
        .or_else(|| field::<u64>(&map, "trainingTime", &mut issues).map(|secs| secs / 60))
        .or_else(|| field::<u64>(&map, "timeSpent", &mut issues))
        .unwrap_or(0);

    let parts = ProgressParts {
        completed_modules: decode_modules(map.get("completedModules"), catalog, &mut issues),
        quiz_score: field(&map, "quizScore", &mut issues).unwrap_or(0),
        quiz_results: decode_quiz_results(map.get("quizResults"), settings, now, &mut issues),
        assessments_completed: field(&map, "assessmentsCompleted", &mut issues).unwrap_or(0),
        total_time_spent_minutes,
        achievements: decode_achievements(map.get("achievements"), &mut issues),
        certificate_earned: field(&map, "certificateEarned", &mut issues).unwrap_or(false),
        certificate_date: field(&map, "certificateDate", &mut issues),
        last_visit: field(&map, "lastVisit", &mut issues),
    };

    let mut record = ProgressRecord::from_parts(parts);
    let reconciliation = rules::reconcile_loaded(&mut record, settings);
    for id in &reconciliation.achievements.revoked {
        issue(&mut issues, format!("achievement `{id}` is not supported by the record; removed"));
    }
    if reconciliation.certificate_dropped {
        issue(&mut issues, "certificate is not supported by the record; cleared".into());
    }

    DecodedProgress {
        record,
        issues,
        reconciliation,
    }
}

fn field<T: DeserializeOwned>(
    map: &Map<String, Value>,
    key: &str,
    issues: &mut Vec<String>,
) -> Option<T> {
    let value = map.get(key).filter(|v| !v.is_null())?;
    match serde_json::from_value(value.clone()) {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            issue(issues, format!("field `{key}` is malformed ({err}); using default"));
            None
        }
    }
}

fn array<'a>(value: Option<&'a Value>, key: &str, issues: &mut Vec<String>) -> &'a [Value] {
    match value {
        None | Some(Value::Null) => &[],
        Some(Value::Array(items)) => items.as_slice(),
        Some(_) => {
            issue(issues, format!("field `{key}` is not an array; using []"));
            &[]
        }
    }
}

fn decode_modules(
    value: Option<&Value>,
    catalog: &ModuleCatalog,
    issues: &mut Vec<String>,
) -> Vec<ModuleCompletion> {
    let mut completions = Vec::new();
    for (index, item) in array(value, "completedModules", issues).iter().enumerate() {
        let entry = match serde_json::from_value::<ModuleEntryRaw>(item.clone()) {
            Ok(ModuleEntryRaw::Detailed(doc)) => doc,
            Ok(ModuleEntryRaw::Bare(key)) => ModuleEntryDoc {
                module_id: key,
                completed: true,
                completed_at: None,
                time_spent: None,
            },
            Err(err) => {
                issue(issues, format!("completedModules[{index}] is malformed ({err}); skipped"));
                continue;
            }
        };
        if !entry.completed {
            continue;
        }
        let Some(module_id) = resolve_module(&entry.module_id, catalog) else {
            issue(
                issues,
                format!("completedModules[{index}] has an unrecognised id; skipped"),
            );
            continue;
        };
        completions.push(ModuleCompletion::new(
            module_id,
            entry.completed_at,
            entry.time_spent,
        ));
    }
    completions
}

/// Any id the engine can store resolves, including ids outside the catalog.
fn resolve_module(key: &ModuleKey, catalog: &ModuleCatalog) -> Option<ModuleId> {
    match key {
        ModuleKey::Number(n) => u32::try_from(*n).ok().map(ModuleId::new),
        ModuleKey::Text(raw) => catalog.resolve(raw),
    }
}

fn decode_quiz_results(
    value: Option<&Value>,
    settings: &EngineSettings,
    now: DateTime<Utc>,
    issues: &mut Vec<String>,
) -> Vec<QuizAttempt> {
    let mut attempts = Vec::new();
    for (index, item) in array(value, "quizResults", issues).iter().enumerate() {
        let doc = match serde_json::from_value::<QuizResultDoc>(item.clone()) {
            Ok(doc) => doc,
            Err(err) => {
                issue(issues, format!("quizResults[{index}] is malformed ({err}); skipped"));
                continue;
            }
        };
        let taken_at = doc.date.unwrap_or_else(|| {
            issue(issues, format!("quizResults[{index}] has no date; stamped with load time"));
            now
        });
        let attempt = match doc.passed {
            Some(passed) => {
                QuizAttempt::from_persisted(doc.score, doc.total_questions, taken_at, passed)
            }
            None => QuizAttempt::new(
                doc.score,
                doc.total_questions,
                taken_at,
                settings.pass_percent(),
            ),
        };
        match attempt {
            Ok(attempt) => attempts.push(attempt),
            Err(err) => issue(issues, format!("quizResults[{index}] is invalid ({err}); skipped")),
        }
    }
    attempts
}

fn decode_achievements(value: Option<&Value>, issues: &mut Vec<String>) -> Vec<AchievementId> {
    let mut ids = Vec::new();
    for (index, item) in array(value, "achievements", issues).iter().enumerate() {
        match item.as_str().and_then(AchievementId::from_alias) {
            Some(id) => ids.push(id),
            None => issue(issues, format!("achievements[{index}] is not a known badge; skipped")),
        }
    }
    ids
}

//
// ─── RISK HISTORY ─────────────────────────────────────────────────────────────
//

/// Wire shape of one risk history entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskEntryDoc {
    timestamp: DateTime<Utc>,
    asset: String,
    threat: String,
    likelihood: u8,
    impact: u8,
    #[serde(default)]
    score: Option<u8>,
    #[serde(default)]
    level: Option<RiskLevel>,
}

impl RiskEntryDoc {
    #[must_use]
    pub fn from_entry(entry: &RiskAssessmentEntry) -> Self {
        Self {
            timestamp: entry.assessed_at(),
            asset: entry.asset().to_string(),
            threat: entry.threat().to_string(),
            likelihood: entry.likelihood().value(),
            impact: entry.impact().value(),
            score: Some(entry.score()),
            level: Some(entry.level()),
        }
    }
}

/// Serialize the history (most-recent-first) for the risk-history key.
///
/// # Errors
///
/// Returns `StorageError::Serialization` if encoding fails.
pub fn encode_history(history: &RiskHistory) -> Result<String, StorageError> {
    let docs: Vec<RiskEntryDoc> = history.iter().map(RiskEntryDoc::from_entry).collect();
    serde_json::to_string(&docs).map_err(ser)
}

#[derive(Debug, Clone)]
pub struct DecodedHistory {
    pub history: RiskHistory,
    pub issues: Vec<String>,
}

/// Rebuild the risk history. Invalid entries are dropped, stored scores and
/// levels are recomputed from the ratings, and the list is cut to capacity.
#[must_use]
pub fn decode_history(raw: &str, capacity: usize) -> DecodedHistory {
    let mut issues = Vec::new();

    let items: Vec<Value> = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(items)) => items,
        Ok(_) => {
            issue(&mut issues, "risk history is not a JSON array; using []".into());
            Vec::new()
        }
        Err(err) => {
            issue(&mut issues, format!("risk history is not valid JSON ({err}); using []"));
            Vec::new()
        }
    };

    let mut entries = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let doc = match serde_json::from_value::<RiskEntryDoc>(item) {
            Ok(doc) => doc,
            Err(err) => {
                issue(&mut issues, format!("risk history[{index}] is malformed ({err}); skipped"));
                continue;
            }
        };
        let entry = match RiskAssessmentEntry::assess(
            &doc.asset,
            &doc.threat,
            doc.likelihood,
            doc.impact,
            doc.timestamp,
        ) {
            Ok(entry) => entry,
            Err(err) => {
                issue(&mut issues, format!("risk history[{index}] is invalid ({err}); skipped"));
                continue;
            }
        };
        if doc.score.is_some_and(|s| s != entry.score())
            || doc.level.is_some_and(|l| l != entry.level())
        {
            issue(
                &mut issues,
                format!("risk history[{index}] stored a stale score; recomputed"),
            );
        }
        entries.push(entry);
    }

    if entries.len() > capacity {
        issue(
            &mut issues,
            format!("risk history holds {} entries; keeping the newest {capacity}", entries.len()),
        );
    }

    DecodedHistory {
        history: RiskHistory::from_persisted(entries, capacity),
        issues,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use training_core::time::fixed_now;

    fn settings() -> EngineSettings {
        EngineSettings::default()
    }

    fn decode(raw: &str) -> DecodedProgress {
        decode_progress(raw, &settings(), &ModuleCatalog::default(), fixed_now())
    }

    #[test]
    fn non_array_modules_fall_back_to_empty() {
        let decoded = decode(r#"{"completedModules": "not-an-array"}"#);
        assert!(decoded.record.completed_modules().is_empty());
        assert_eq!(decoded.issues.len(), 1);
    }

    #[test]
    fn garbage_payloads_yield_defaults() {
        for raw in ["", "{", "[1,2,3]", "42", "null"] {
            let decoded = decode(raw);
            assert_eq!(decoded.record, ProgressRecord::new(), "payload {raw:?}");
            assert!(!decoded.is_clean());
        }
    }

    #[test]
    fn partial_records_are_backfilled_field_by_field() {
        let decoded = decode(r#"{"assessmentsCompleted": 3, "quizScore": "high"}"#);
        assert_eq!(decoded.record.assessments_completed(), 3);
        assert_eq!(decoded.record.quiz_score(), 0);
        assert!(decoded.record.quiz_results().is_empty());
        assert_eq!(decoded.issues.len(), 1);
    }

    #[test]
    fn legacy_plain_script_shape_is_understood() {
        let raw = r#"{
            "completedModules": [1, "2", "ir-001", {"bogus": true}, "nope"],
            "quizScore": 60,
            "assessmentsCompleted": 1,
            "trainingTime": 600,
            "achievements": ["first", "halfway", "mystery"]
        }"#;
        let decoded = decode(raw);
        let ids: Vec<u32> = decoded
            .record
            .completed_modules()
            .iter()
            .map(|c| c.module_id().value())
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(decoded.record.quiz_score(), 60);
        assert_eq!(decoded.record.total_time_spent_minutes(), 10);
        assert_eq!(
            decoded.record.achievements(),
            &[AchievementId::FirstSteps, AchievementId::Halfway]
        );
        // {"bogus": true}, "nope", "mystery"
        assert_eq!(decoded.issues.len(), 3);
    }

    #[test]
    fn rich_variant_shape_is_understood() {
        let raw = r#"{
            "completedModules": [
                {"moduleId": "rm-001", "completed": true, "completedAt": "2023-11-14T22:13:20Z", "timeSpent": 12},
                {"moduleId": "ta-001", "completed": false}
            ],
            "quizResults": [{"score": 9, "totalQuestions": 11, "date": "2023-11-14T22:13:20Z", "passed": true}],
            "totalTimeSpent": 12,
            "certificateEarned": false
        }"#;
        let decoded = decode(raw);
        assert!(decoded.issues.is_empty(), "{:?}", decoded.issues);
        assert_eq!(decoded.record.completed_modules().len(), 1);
        let completion = &decoded.record.completed_modules()[0];
        assert_eq!(completion.completed_at(), Some(fixed_now()));
        assert_eq!(completion.time_spent_minutes(), Some(12));
        assert_eq!(decoded.record.quiz_score(), 82);
        // 9/11 meets the 80% mark, so the badge is derived on load.
        assert_eq!(decoded.reconciliation.achievements.unlocked.len(), 2);
    }

    #[test]
    fn invalid_quiz_entries_are_skipped() {
        let raw = r#"{"quizResults": [
            {"score": 11, "totalQuestions": 10, "date": "2023-11-14T22:13:20Z"},
            {"score": 1, "totalQuestions": 0},
            {"score": 7, "totalQuestions": 10}
        ]}"#;
        let decoded = decode(raw);
        assert_eq!(decoded.record.quiz_results().len(), 1);
        let attempt = &decoded.record.quiz_results()[0];
        assert!(attempt.passed());
        assert_eq!(attempt.taken_at(), fixed_now());
    }

    #[test]
    fn encode_then_decode_preserves_engine_records() {
        let mut record = ProgressRecord::new();
        record.complete_module(ModuleId::new(1), Some(5), fixed_now());
        record.record_quiz_attempt(QuizAttempt::new(6, 10, fixed_now(), 70).unwrap());
        record.record_assessment();
        record.touch(fixed_now());
        rules::check_achievements(&mut record, &settings());

        let raw = encode_progress(&record).unwrap();
        let decoded = decode(&raw);
        assert!(decoded.is_clean(), "{:?}", decoded.issues);
        assert_eq!(decoded.record, record);
    }

    #[test]
    fn ids_outside_the_catalog_survive_a_round_trip() {
        let mut record = ProgressRecord::new();
        record.complete_module(ModuleId::new(0), Some(5), fixed_now());
        record.complete_module(ModuleId::new(42), None, fixed_now());

        let decoded = decode(&encode_progress(&record).unwrap());
        assert!(decoded.is_clean(), "{:?}", decoded.issues);
        assert_eq!(decoded.record, record);
        assert_eq!(decoded.record.total_time_spent_minutes(), 5);
    }

    #[test]
    fn encoded_document_uses_camel_case_keys() {
        let raw = encode_progress(&ProgressRecord::new()).unwrap();
        let value: Value = serde_json::from_str(&raw).unwrap();
        for key in [
            "completedModules",
            "quizScore",
            "quizResults",
            "assessmentsCompleted",
            "totalTimeSpent",
            "achievements",
            "certificateEarned",
            "certificateDate",
            "lastVisit",
        ] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
    }

    #[test]
    fn history_decoding_drops_bad_entries_and_recomputes() {
        let raw = r#"[
            {"timestamp": "2023-11-14T22:13:20Z", "asset": "CRM", "threat": "Phishing", "likelihood": 3, "impact": 4, "score": 99, "level": "LOW"},
            {"timestamp": "2023-11-14T22:13:20Z", "asset": "", "threat": "Phishing", "likelihood": 3, "impact": 4},
            {"timestamp": "2023-11-14T22:13:20Z", "asset": "DB", "threat": "Ransomware", "likelihood": 9, "impact": 4},
            "junk"
        ]"#;
        let decoded = decode_history(raw, 10);
        assert_eq!(decoded.history.len(), 1);
        let entry = decoded.history.latest().unwrap();
        assert_eq!(entry.score(), 12);
        assert_eq!(entry.level(), RiskLevel::Medium);
        assert_eq!(decoded.issues.len(), 4);
    }

    #[test]
    fn history_round_trip_keeps_order() {
        let mut history = RiskHistory::new(10);
        history.push(RiskAssessmentEntry::assess("A", "malware", 1, 1, fixed_now()).unwrap());
        history.push(RiskAssessmentEntry::assess("B", "ddos", 5, 5, fixed_now()).unwrap());

        let decoded = decode_history(&encode_history(&history).unwrap(), 10);
        assert!(decoded.issues.is_empty());
        assert_eq!(decoded.history, history);
    }
}
