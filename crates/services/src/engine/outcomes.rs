use chrono::{DateTime, Utc};
use training_core::catalog::GradedQuiz;
use training_core::metrics::{ModuleStatus, ProgressMetrics};
use training_core::model::{
    AchievementId, ModuleId, QuizAttempt, Recommendation, RiskAssessmentEntry, ScoreBand,
};
use training_core::rules::LoadReconciliation;

//
// ─── LOAD ─────────────────────────────────────────────────────────────────────
//

/// What happened while restoring persisted state. Loading never fails; this
/// only reports what was repaired.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub progress_found: bool,
    pub progress_issues: Vec<String>,
    pub history_issues: Vec<String>,
    pub reconciliation: LoadReconciliation,
}

impl LoadReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.progress_issues.is_empty() && self.history_issues.is_empty()
    }
}

//
// ─── MUTATIONS ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleCompletionOutcome {
    pub module_id: ModuleId,
    /// `false` when the module was already complete.
    pub newly_completed: bool,
    /// `false` for ids outside the configured module range.
    pub known: bool,
    /// Next module in the sequence, reported only on first completion.
    pub unlocked_next: Option<ModuleId>,
    pub new_achievements: Vec<AchievementId>,
    pub certificate_awarded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizOutcome {
    pub attempt: QuizAttempt,
    pub percentage: u8,
    pub passed: bool,
    pub band: ScoreBand,
    pub best_percentage: u8,
    pub new_achievements: Vec<AchievementId>,
    pub certificate_awarded: bool,
}

/// A graded answer sheet together with the recorded attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerSheetOutcome {
    pub graded: GradedQuiz,
    pub outcome: QuizOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskOutcome {
    pub entry: RiskAssessmentEntry,
    pub recommendation: &'static Recommendation,
    /// Oldest entry pushed out of a full history.
    pub evicted: Option<RiskAssessmentEntry>,
    pub assessments_completed: u32,
    pub new_achievements: Vec<AchievementId>,
    pub certificate_awarded: bool,
}

//
// ─── OBSERVATION ──────────────────────────────────────────────────────────────
//

/// Everything a presentation layer redraws after a change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub metrics: ProgressMetrics,
    pub statuses: Vec<(ModuleId, ModuleStatus)>,
    pub achievements: Vec<AchievementId>,
    pub certificate_earned: bool,
    pub certificate_date: Option<DateTime<Utc>>,
    pub latest_risk: Option<RiskAssessmentEntry>,
    pub last_visit: Option<DateTime<Utc>>,
}
