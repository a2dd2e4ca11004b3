//! Achievement and certificate rules.
//!
//! Every predicate here is monotone under the engine's transitions (counts
//! and the best quiz fraction only grow), so an unlocked badge stays valid
//! until a reset. Reconciliation still removes badges that persisted data
//! claims but cannot support.

use chrono::{DateTime, Utc};

use crate::model::{AchievementId, EngineSettings, ProgressRecord};

/// Badges added or removed by a reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AchievementChanges {
    pub unlocked: Vec<AchievementId>,
    pub revoked: Vec<AchievementId>,
}

impl AchievementChanges {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.unlocked.is_empty() && self.revoked.is_empty()
    }
}

/// Whether the record currently satisfies the unlock condition for `id`.
#[must_use]
pub fn is_satisfied(id: AchievementId, record: &ProgressRecord, settings: &EngineSettings) -> bool {
    let completed = record.known_completed_count(settings.module_count());
    match id {
        AchievementId::FirstSteps => completed >= 1,
        AchievementId::Halfway => completed >= settings.halfway_threshold(),
        AchievementId::KnowledgeSeeker => completed >= settings.module_count(),
        AchievementId::RiskMaster => {
            record.assessments_completed() >= settings.risk_master_threshold()
        }
        AchievementId::QuizExpert => record
            .best_attempt()
            .is_some_and(|best| best.meets(settings.quiz_expert_percent())),
    }
}

/// Bring `achievements` in line with the rules: unlock what is newly
/// satisfied, drop what is not. Unlocking is idempotent.
pub fn check_achievements(
    record: &mut ProgressRecord,
    settings: &EngineSettings,
) -> AchievementChanges {
    let mut changes = AchievementChanges::default();

    let held: Vec<AchievementId> = record.achievements().to_vec();
    for id in held {
        if !is_satisfied(id, record, settings) && record.revoke_achievement(id) {
            changes.revoked.push(id);
        }
    }

    for id in AchievementId::ALL {
        if is_satisfied(id, record, settings) && record.unlock_achievement(id) {
            changes.unlocked.push(id);
        }
    }

    changes
}

/// Every known module completed and a best attempt at or above the
/// certificate mark.
#[must_use]
pub fn certificate_eligible(record: &ProgressRecord, settings: &EngineSettings) -> bool {
    record.known_completed_count(settings.module_count()) >= settings.module_count()
        && record
            .best_attempt()
            .is_some_and(|best| best.meets(settings.certificate_percent()))
}

/// Grant the certificate when eligible. Returns `true` only on the
/// transition; an earned certificate is never taken back here.
pub fn award_certificate(
    record: &mut ProgressRecord,
    settings: &EngineSettings,
    now: DateTime<Utc>,
) -> bool {
    if record.certificate_earned() || !certificate_eligible(record, settings) {
        return false;
    }
    record.grant_certificate(now)
}

/// What changed while validating a freshly loaded record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReconciliation {
    pub achievements: AchievementChanges,
    pub certificate_dropped: bool,
}

/// Enforce record invariants on data read from storage.
///
/// Unsupported badges are removed and supported ones added. A certificate
/// the data cannot justify is cleared; a missing certificate is not granted
/// here, since that needs a timestamp and happens on the next mutation.
pub fn reconcile_loaded(
    record: &mut ProgressRecord,
    settings: &EngineSettings,
) -> LoadReconciliation {
    let achievements = check_achievements(record, settings);
    let certificate_dropped =
        record.certificate_earned() && !certificate_eligible(record, settings);
    if certificate_dropped {
        record.drop_certificate();
    }
    LoadReconciliation {
        achievements,
        certificate_dropped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EngineSettingsDraft, ModuleId, ProgressParts, QuizAttempt};
    use crate::time::fixed_now;
    use chrono::Duration;

    fn settings() -> EngineSettings {
        EngineSettings::default()
    }

    fn complete(record: &mut ProgressRecord, ids: impl IntoIterator<Item = u32>) {
        for id in ids {
            record.complete_module(ModuleId::new(id), None, fixed_now());
        }
    }

    fn quiz(record: &mut ProgressRecord, score: u32, total: u32) {
        record.record_quiz_attempt(QuizAttempt::new(score, total, fixed_now(), 70).unwrap());
    }

    #[test]
    fn module_badges_follow_completion_count() {
        let settings = settings();
        let mut record = ProgressRecord::new();

        complete(&mut record, [1]);
        let changes = check_achievements(&mut record, &settings);
        assert_eq!(changes.unlocked, vec![AchievementId::FirstSteps]);

        complete(&mut record, [2, 3]);
        let changes = check_achievements(&mut record, &settings);
        assert_eq!(changes.unlocked, vec![AchievementId::Halfway]);

        complete(&mut record, [4, 5]);
        let changes = check_achievements(&mut record, &settings);
        assert_eq!(changes.unlocked, vec![AchievementId::KnowledgeSeeker]);

        assert!(check_achievements(&mut record, &settings).is_empty());
    }

    #[test]
    fn unknown_modules_never_unlock_badges() {
        let mut record = ProgressRecord::new();
        complete(&mut record, [77, 78, 79]);
        assert!(check_achievements(&mut record, &settings()).is_empty());
    }

    #[test]
    fn halfway_threshold_is_configurable() {
        let settings = EngineSettingsDraft {
            module_count: Some(6),
            halfway_threshold: Some(4),
            ..EngineSettingsDraft::default()
        }
        .validate()
        .unwrap();
        let mut record = ProgressRecord::new();
        complete(&mut record, [1, 2, 3]);
        assert!(!is_satisfied(AchievementId::Halfway, &record, &settings));
        complete(&mut record, [4]);
        assert!(is_satisfied(AchievementId::Halfway, &record, &settings));
    }

    #[test]
    fn risk_master_needs_five_assessments() {
        let mut record = ProgressRecord::new();
        for _ in 0..4 {
            record.record_assessment();
        }
        assert!(!is_satisfied(AchievementId::RiskMaster, &record, &settings()));
        record.record_assessment();
        assert!(is_satisfied(AchievementId::RiskMaster, &record, &settings()));
    }

    #[test]
    fn quiz_expert_uses_best_attempt() {
        let settings = settings();
        let mut record = ProgressRecord::new();
        quiz(&mut record, 8, 10);
        quiz(&mut record, 3, 10);
        assert!(is_satisfied(AchievementId::QuizExpert, &record, &settings));
    }

    #[test]
    fn certificate_requires_all_modules_and_eighty_percent() {
        let settings = settings();
        let mut record = ProgressRecord::new();
        complete(&mut record, 1..=5);
        quiz(&mut record, 7, 10);
        assert!(!award_certificate(&mut record, &settings, fixed_now()));

        quiz(&mut record, 8, 10);
        assert!(award_certificate(&mut record, &settings, fixed_now()));
        assert_eq!(record.certificate_date(), Some(fixed_now()));

        // A later weak attempt changes nothing.
        quiz(&mut record, 1, 10);
        assert!(!award_certificate(&mut record, &settings, fixed_now() + Duration::days(1)));
        assert!(record.certificate_earned());
        assert_eq!(record.certificate_date(), Some(fixed_now()));
    }

    #[test]
    fn loaded_records_lose_unsupported_claims() {
        let parts = ProgressParts {
            achievements: vec![AchievementId::RiskMaster, AchievementId::KnowledgeSeeker],
            certificate_earned: true,
            certificate_date: Some(fixed_now()),
            assessments_completed: 5,
            ..ProgressParts::default()
        };
        let mut record = ProgressRecord::from_parts(parts);
        let report = reconcile_loaded(&mut record, &settings());

        assert_eq!(report.achievements.revoked, vec![AchievementId::KnowledgeSeeker]);
        assert!(report.certificate_dropped);
        assert_eq!(record.achievements(), &[AchievementId::RiskMaster]);
        assert!(!record.certificate_earned());
        assert_eq!(record.certificate_date(), None);
    }
}
