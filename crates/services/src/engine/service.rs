use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use storage::documents;
use storage::repository::{KeyValueStore, StorageError};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use training_core::Clock;
use training_core::catalog::{self, ModuleCatalog, QuestionBank};
use training_core::metrics::{self, ModuleStatus, ProgressMetrics};
use training_core::model::{
    AssessmentError, EngineSettings, ModuleId, ProgressRecord, QuizAttempt, QuizError,
    RiskAssessmentEntry, RiskHistory, ScoreBand,
};
use training_core::rules::{self, AchievementChanges};

use super::export::ProgressExport;
use super::outcomes::{
    AnswerSheetOutcome, LoadReport, ModuleCompletionOutcome, ProgressSnapshot, QuizOutcome,
    RiskOutcome,
};
use crate::error::EngineError;

//
// ─── ENGINE ───────────────────────────────────────────────────────────────────
//

/// Owns the learner's progress record and risk history.
///
/// Every transition goes through a method here: it mutates the record,
/// re-evaluates achievements and the certificate, persists through the store
/// and publishes a fresh [`ProgressSnapshot`]. Storage failures during a
/// transition are logged and the in-memory state stays authoritative.
pub struct ProgressEngine {
    clock: Clock,
    settings: EngineSettings,
    catalog: ModuleCatalog,
    store: Arc<dyn KeyValueStore>,
    record: ProgressRecord,
    history: RiskHistory,
    snapshots: watch::Sender<ProgressSnapshot>,
}

/// What a finished transition changed besides the record itself.
struct Settled {
    changes: AchievementChanges,
    certificate_awarded: bool,
}

impl ProgressEngine {
    /// Build an engine holding default state. Nothing is read from the store
    /// until [`ProgressEngine::load_progress`] runs.
    #[must_use]
    pub fn new(
        clock: Clock,
        settings: EngineSettings,
        catalog: ModuleCatalog,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        if catalog.len() != settings.module_count() {
            warn!(
                catalog = catalog.len(),
                configured = settings.module_count(),
                "module catalog size differs from configured module count"
            );
        }
        let record = ProgressRecord::new();
        let history = RiskHistory::new(settings.history_capacity());
        let snapshot = build_snapshot(&record, &history, &settings);
        let (snapshots, _) = watch::channel(snapshot);
        Self {
            clock,
            settings,
            catalog,
            store,
            record,
            history,
            snapshots,
        }
    }

    /// Build an engine and restore persisted state.
    pub async fn open(
        clock: Clock,
        settings: EngineSettings,
        catalog: ModuleCatalog,
        store: Arc<dyn KeyValueStore>,
    ) -> (Self, LoadReport) {
        let mut engine = Self::new(clock, settings, catalog, store);
        let report = engine.load_progress().await;
        (engine, report)
    }

    //
    // ─── PERSISTENCE ─────────────────────────────────────────────────────────
    //

    /// Replace in-memory state with what the store holds.
    ///
    /// Missing keys, read failures and malformed payloads all yield default
    /// state; repairs are listed in the returned report.
    pub async fn load_progress(&mut self) -> LoadReport {
        let now = self.clock.now();
        let mut report = LoadReport::default();

        self.record = match self.store.get(&self.settings.keys().progress).await {
            Ok(Some(raw)) => {
                report.progress_found = true;
                let decoded =
                    documents::decode_progress(&raw, &self.settings, &self.catalog, now);
                report.progress_issues = decoded.issues;
                report.reconciliation = decoded.reconciliation;
                decoded.record
            }
            Ok(None) => {
                debug!("no saved progress; starting fresh");
                ProgressRecord::new()
            }
            Err(err) => {
                warn!(error = %err, "failed to read progress; starting fresh");
                report.progress_issues.push(format!("progress unreadable: {err}"));
                ProgressRecord::new()
            }
        };

        let capacity = self.settings.history_capacity();
        self.history = match self.store.get(&self.settings.keys().risk_history).await {
            Ok(Some(raw)) => {
                let decoded = documents::decode_history(&raw, capacity);
                report.history_issues = decoded.issues;
                decoded.history
            }
            Ok(None) => RiskHistory::new(capacity),
            Err(err) => {
                warn!(error = %err, "failed to read risk history; starting empty");
                report.history_issues.push(format!("risk history unreadable: {err}"));
                RiskHistory::new(capacity)
            }
        };

        debug!(
            modules = self.record.completed_modules().len(),
            attempts = self.record.quiz_results().len(),
            assessments = self.record.assessments_completed(),
            history = self.history.len(),
            "progress loaded"
        );
        self.publish();
        report
    }

    /// Write the progress record under its key.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if encoding or the store write fails.
    pub async fn save_progress(&self) -> Result<(), StorageError> {
        let raw = documents::encode_progress(&self.record)?;
        self.store.set(&self.settings.keys().progress, &raw).await
    }

    /// Write the risk history under its key.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if encoding or the store write fails.
    pub async fn save_history(&self) -> Result<(), StorageError> {
        let raw = documents::encode_history(&self.history)?;
        self.store.set(&self.settings.keys().risk_history, &raw).await
    }

    async fn persist_progress(&self) {
        if let Err(err) = self.save_progress().await {
            warn!(error = %err, "failed to persist progress; keeping in-memory state");
        }
    }

    async fn persist_history(&self) {
        if let Err(err) = self.save_history().await {
            warn!(error = %err, "failed to persist risk history; keeping in-memory state");
        }
    }

    //
    // ─── TRANSITIONS ─────────────────────────────────────────────────────────
    //

    /// Mark a module complete. Unknown ids are stored but unlock nothing.
    pub async fn complete_module(
        &mut self,
        module_id: ModuleId,
        time_spent_minutes: Option<u32>,
    ) -> ModuleCompletionOutcome {
        let now = self.clock.now();
        let module_count = self.settings.module_count();
        let known = module_id.is_known(module_count);
        if !known {
            warn!(module = %module_id, module_count, "completing a module outside the catalog");
        }

        let newly_completed = self.record.complete_module(module_id, time_spent_minutes, now);
        let unlocked_next = Some(module_id.next())
            .filter(|next| newly_completed && known && next.is_known(module_count));
        debug!(module = %module_id, newly_completed, "module completed");

        let settled = self.settle(now).await;
        ModuleCompletionOutcome {
            module_id,
            newly_completed,
            known,
            unlocked_next,
            new_achievements: settled.changes.unlocked,
            certificate_awarded: settled.certificate_awarded,
        }
    }

    /// Record a quiz attempt of `score` correct answers out of `total_questions`.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` for an empty quiz or a score above the total; the
    /// record is left untouched.
    pub async fn submit_quiz(
        &mut self,
        score: u32,
        total_questions: u32,
    ) -> Result<QuizOutcome, QuizError> {
        let now = self.clock.now();
        let attempt = QuizAttempt::new(score, total_questions, now, self.settings.pass_percent())?;
        let percentage = attempt.percentage();
        let passed = attempt.passed();
        self.record.record_quiz_attempt(attempt.clone());
        debug!(score, total_questions, percentage, passed, "quiz submitted");

        let settled = self.settle(now).await;
        let best_percentage = self
            .record
            .best_attempt()
            .map_or(percentage, QuizAttempt::percentage);
        Ok(QuizOutcome {
            attempt,
            percentage,
            passed,
            band: ScoreBand::for_percentage(percentage, self.settings.pass_percent()),
            best_percentage,
            new_achievements: settled.changes.unlocked,
            certificate_awarded: settled.certificate_awarded,
        })
    }

    /// Grade an answer sheet against `bank` and record the result.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` if the graded sheet is not a valid attempt.
    pub async fn submit_quiz_answers(
        &mut self,
        bank: &QuestionBank,
        answers: &[Option<usize>],
    ) -> Result<AnswerSheetOutcome, QuizError> {
        let graded = bank.grade(answers);
        let outcome = self
            .submit_quiz(graded.score, graded.total_questions)
            .await?;
        Ok(AnswerSheetOutcome { graded, outcome })
    }

    /// Score a risk and add it to the history.
    ///
    /// Known threat codes are stored under their display names.
    ///
    /// # Errors
    ///
    /// Returns `AssessmentError` for a blank asset or threat or a rating
    /// outside `1..=5`; nothing is recorded.
    pub async fn submit_risk_assessment(
        &mut self,
        asset: &str,
        threat: &str,
        likelihood: u8,
        impact: u8,
    ) -> Result<RiskOutcome, AssessmentError> {
        let now = self.clock.now();
        let threat = catalog::threat_display_name(threat);
        let entry = RiskAssessmentEntry::assess(asset, threat, likelihood, impact, now)?;

        self.record.record_assessment();
        let evicted = self.history.push(entry.clone());
        if let Some(old) = &evicted {
            debug!(asset = old.asset(), "oldest risk assessment evicted");
        }
        debug!(
            asset = entry.asset(),
            score = entry.score(),
            level = %entry.level(),
            "risk assessed"
        );

        self.persist_history().await;
        let settled = self.settle(now).await;
        Ok(RiskOutcome {
            recommendation: entry.level().recommendation(),
            entry,
            evicted,
            assessments_completed: self.record.assessments_completed(),
            new_achievements: settled.changes.unlocked,
            certificate_awarded: settled.certificate_awarded,
        })
    }

    /// Reconcile badges with the current record, persisting when anything
    /// changed.
    pub async fn check_achievements(&mut self) -> AchievementChanges {
        let changes = rules::check_achievements(&mut self.record, &self.settings);
        log_changes(&changes);
        if !changes.is_empty() {
            self.persist_progress().await;
            self.publish();
        }
        changes
    }

    /// Grant the certificate if the record qualifies. Returns `true` only on
    /// the transition.
    pub async fn award_certificate(&mut self) -> bool {
        let now = self.clock.now();
        let awarded = rules::award_certificate(&mut self.record, &self.settings, now);
        if awarded {
            info!(at = %now, "certificate earned");
            self.persist_progress().await;
            self.publish();
        }
        awarded
    }

    /// Add one minute of training time. Driven by [`super::TrainingTimer`].
    pub async fn record_training_minute(&mut self) {
        let now = self.clock.now();
        self.record.add_training_minutes(1);
        debug!(
            total = self.record.total_time_spent_minutes(),
            "training minute recorded"
        );
        self.settle(now).await;
    }

    /// Drop all progress and history, in memory and in the store.
    pub async fn reset_progress(&mut self) {
        self.record = ProgressRecord::new();
        self.history.clear();

        let keys = self.settings.keys();
        for key in [&keys.progress, &keys.risk_history] {
            if let Err(err) = self.store.remove(key).await {
                warn!(key = %key, error = %err, "failed to remove stored progress");
            }
        }
        info!("progress reset");
        self.publish();
    }

    /// Shared tail of every transition.
    async fn settle(&mut self, now: DateTime<Utc>) -> Settled {
        self.record.touch(now);
        let changes = rules::check_achievements(&mut self.record, &self.settings);
        log_changes(&changes);
        let certificate_awarded = rules::award_certificate(&mut self.record, &self.settings, now);
        if certificate_awarded {
            info!(at = %now, "certificate earned");
        }
        self.persist_progress().await;
        self.publish();
        Settled {
            changes,
            certificate_awarded,
        }
    }

    //
    // ─── READS ───────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn record(&self) -> &ProgressRecord {
        &self.record
    }

    #[must_use]
    pub fn history(&self) -> &RiskHistory {
        &self.history
    }

    #[must_use]
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    #[must_use]
    pub fn catalog(&self) -> &ModuleCatalog {
        &self.catalog
    }

    #[must_use]
    pub fn metrics(&self) -> ProgressMetrics {
        ProgressMetrics::compute(&self.record, &self.settings)
    }

    #[must_use]
    pub fn module_statuses(&self) -> Vec<(ModuleId, ModuleStatus)> {
        metrics::module_statuses(&self.record, &self.settings)
    }

    #[must_use]
    pub fn snapshot(&self) -> ProgressSnapshot {
        build_snapshot(&self.record, &self.history, &self.settings)
    }

    /// Receive a fresh snapshot after every transition.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ProgressSnapshot> {
        self.snapshots.subscribe()
    }

    #[must_use]
    pub fn export(&self) -> ProgressExport {
        ProgressExport::build(&self.record, &self.history, &self.settings, self.clock.now())
    }

    /// Pretty-printed export document.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Export` if serialization fails.
    pub fn export_json(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string_pretty(&self.export())?)
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.snapshot());
    }
}

impl fmt::Debug for ProgressEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressEngine")
            .field("clock", &self.clock)
            .field("settings", &self.settings)
            .field("record", &self.record)
            .field("history_len", &self.history.len())
            .finish_non_exhaustive()
    }
}

fn build_snapshot(
    record: &ProgressRecord,
    history: &RiskHistory,
    settings: &EngineSettings,
) -> ProgressSnapshot {
    ProgressSnapshot {
        metrics: ProgressMetrics::compute(record, settings),
        statuses: metrics::module_statuses(record, settings),
        achievements: record.achievements().to_vec(),
        certificate_earned: record.certificate_earned(),
        certificate_date: record.certificate_date(),
        latest_risk: history.latest().cloned(),
        last_visit: record.last_visit(),
    }
}

fn log_changes(changes: &AchievementChanges) {
    for id in &changes.unlocked {
        info!(achievement = %id, "achievement unlocked");
    }
    for id in &changes.revoked {
        warn!(achievement = %id, "achievement revoked");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::repository::InMemoryStore;
    use training_core::model::AchievementId;
    use training_core::time::fixed_clock;

    fn engine() -> (ProgressEngine, InMemoryStore) {
        let store = InMemoryStore::new();
        let engine = ProgressEngine::new(
            fixed_clock(),
            EngineSettings::default(),
            ModuleCatalog::default(),
            Arc::new(store.clone()),
        );
        (engine, store)
    }

    #[tokio::test]
    async fn first_completion_unlocks_next_module() {
        let (mut engine, _) = engine();
        let outcome = engine.complete_module(ModuleId::new(1), Some(10)).await;
        assert!(outcome.newly_completed);
        assert_eq!(outcome.unlocked_next, Some(ModuleId::new(2)));
        assert_eq!(outcome.new_achievements, vec![AchievementId::FirstSteps]);

        let repeat = engine.complete_module(ModuleId::new(1), None).await;
        assert!(!repeat.newly_completed);
        assert_eq!(repeat.unlocked_next, None);
        assert!(repeat.new_achievements.is_empty());
    }

    #[tokio::test]
    async fn last_module_unlocks_nothing_further() {
        let (mut engine, _) = engine();
        let outcome = engine.complete_module(ModuleId::new(5), None).await;
        assert_eq!(outcome.unlocked_next, None);
        assert!(outcome.known);
    }

    #[tokio::test]
    async fn unknown_modules_are_recorded_without_effects() {
        let (mut engine, _) = engine();
        let outcome = engine.complete_module(ModuleId::new(42), Some(3)).await;
        assert!(!outcome.known);
        assert!(outcome.new_achievements.is_empty());
        assert!(engine.record().is_module_completed(ModuleId::new(42)));
        assert_eq!(engine.metrics().completion_percentage, 0);
    }

    #[tokio::test]
    async fn rejected_input_leaves_record_untouched() {
        let (mut engine, store) = engine();
        assert!(engine.submit_quiz(3, 0).await.is_err());
        assert!(engine.submit_quiz(11, 10).await.is_err());
        assert!(
            engine
                .submit_risk_assessment("  ", "phishing", 3, 3)
                .await
                .is_err()
        );
        assert!(engine.submit_risk_assessment("CRM", "phishing", 0, 3).await.is_err());

        assert_eq!(engine.record(), &ProgressRecord::new());
        assert!(engine.history().is_empty());
        assert_eq!(store.snapshot(&engine.settings().keys().progress), None);
    }

    #[tokio::test]
    async fn snapshots_follow_transitions() {
        let (mut engine, _) = engine();
        let mut rx = engine.subscribe();
        engine.complete_module(ModuleId::new(1), None).await;
        assert!(rx.has_changed().unwrap());
        let snapshot = rx.borrow_and_update().clone();
        assert_eq!(snapshot.metrics.modules_completed, 1);
        assert_eq!(snapshot.statuses[1].1, ModuleStatus::Unlocked);
        assert_eq!(snapshot.achievements, vec![AchievementId::FirstSteps]);
    }

    #[tokio::test]
    async fn threat_codes_are_stored_by_display_name() {
        let (mut engine, _) = engine();
        let outcome = engine
            .submit_risk_assessment("Mail server", "ddos", 2, 3)
            .await
            .unwrap();
        assert_eq!(outcome.entry.threat(), "DDoS Attack");
        assert_eq!(outcome.entry.score(), 6);
        assert_eq!(outcome.assessments_completed, 1);
    }
}
