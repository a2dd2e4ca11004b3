//! Derived dashboard numbers. Nothing here is persisted.

use serde::Serialize;

use crate::model::{EngineSettings, ModuleId, ProgressRecord};

/// Points available for completing every module.
pub const MODULE_POINTS: u32 = 300;
/// Points available for a 100% quiz.
pub const QUIZ_POINTS: u32 = 400;
/// Points per risk assessment, capped at [`ASSESSMENT_POINTS_CAP`].
pub const ASSESSMENT_POINTS_EACH: u32 = 20;
pub const ASSESSMENT_POINTS_CAP: u32 = 300;
/// Sum of the three caps.
pub const MAX_TOTAL_SCORE: u32 = MODULE_POINTS + QUIZ_POINTS + ASSESSMENT_POINTS_CAP;

/// Assessments needed for a full assessment progress bar.
const ASSESSMENT_PROGRESS_TARGET: u64 = 10;

/// `part / whole * 100`, rounded half up. Returns 0 for an empty whole.
#[must_use]
pub fn rounded_percent(part: u64, whole: u64) -> u8 {
    if whole == 0 {
        return 0;
    }
    let rounded = (part.saturating_mul(200) + whole) / (whole * 2);
    u8::try_from(rounded.min(100)).unwrap_or(100)
}

/// Exact `part / whole >= percent / 100`, with no rounding.
#[must_use]
pub fn meets_percent(part: u64, whole: u64, percent: u8) -> bool {
    whole > 0 && part.saturating_mul(100) >= u64::from(percent).saturating_mul(whole)
}

/// Lock state of a module in the linear sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleStatus {
    Locked,
    Unlocked,
    Completed,
}

/// Module 1 is always open; module `n` opens once `n - 1` is completed.
#[must_use]
pub fn module_statuses(
    record: &ProgressRecord,
    settings: &EngineSettings,
) -> Vec<(ModuleId, ModuleStatus)> {
    (1..=settings.module_count())
        .map(ModuleId::new)
        .map(|id| (id, module_status(record, id)))
        .collect()
}

#[must_use]
pub fn module_status(record: &ProgressRecord, id: ModuleId) -> ModuleStatus {
    if record.is_module_completed(id) {
        ModuleStatus::Completed
    } else if id.value() <= 1 || record.is_module_completed(ModuleId::new(id.value() - 1)) {
        ModuleStatus::Unlocked
    } else {
        ModuleStatus::Locked
    }
}

/// Snapshot of every derived number the dashboard shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressMetrics {
    pub modules_completed: u32,
    pub module_count: u32,
    pub completion_percentage: u8,
    pub latest_quiz_percentage: u8,
    pub best_quiz_percentage: Option<u8>,
    pub quiz_attempts: usize,
    pub assessments_completed: u32,
    pub assessment_progress: u8,
    pub overall_progress: u8,
    pub total_score: u32,
    pub max_score: u32,
    pub training_minutes: u64,
}

impl ProgressMetrics {
    #[must_use]
    pub fn compute(record: &ProgressRecord, settings: &EngineSettings) -> Self {
        let module_count = settings.module_count();
        let modules_completed = record.known_completed_count(module_count);
        Self {
            modules_completed,
            module_count,
            completion_percentage: completion_percentage(record, settings),
            latest_quiz_percentage: record.quiz_score(),
            best_quiz_percentage: record.best_attempt().map(|a| a.percentage()),
            quiz_attempts: record.quiz_results().len(),
            assessments_completed: record.assessments_completed(),
            assessment_progress: rounded_percent(
                u64::from(record.assessments_completed()).min(ASSESSMENT_PROGRESS_TARGET),
                ASSESSMENT_PROGRESS_TARGET,
            ),
            overall_progress: overall_progress(record, settings),
            total_score: total_score(record, settings),
            max_score: MAX_TOTAL_SCORE,
            training_minutes: record.total_time_spent_minutes(),
        }
    }
}

/// Known completed modules over the module count, rounded.
#[must_use]
pub fn completion_percentage(record: &ProgressRecord, settings: &EngineSettings) -> u8 {
    rounded_percent(
        u64::from(record.known_completed_count(settings.module_count())),
        u64::from(settings.module_count()),
    )
}

/// Weighted score out of [`MAX_TOTAL_SCORE`]: modules, latest quiz, and
/// capped assessments.
#[must_use]
pub fn total_score(record: &ProgressRecord, settings: &EngineSettings) -> u32 {
    let count = u64::from(settings.module_count().max(1));
    let completed = u64::from(record.known_completed_count(settings.module_count()));
    let module_points = (completed * u64::from(MODULE_POINTS) * 2 + count) / (count * 2);
    let module_points = u32::try_from(module_points).unwrap_or(MODULE_POINTS);

    let quiz_points = u32::from(record.quiz_score()) * QUIZ_POINTS / 100;
    let assessment_points = record
        .assessments_completed()
        .saturating_mul(ASSESSMENT_POINTS_EACH)
        .min(ASSESSMENT_POINTS_CAP);

    module_points + quiz_points + assessment_points
}

/// Mean of module %, latest quiz %, and assessment progress at 5% each
/// (capped at 100), rounded.
#[must_use]
pub fn overall_progress(record: &ProgressRecord, settings: &EngineSettings) -> u8 {
    let count = u64::from(settings.module_count().max(1));
    let completed = u64::from(record.known_completed_count(settings.module_count()));
    let quiz = u64::from(record.quiz_score());
    let assessments = (u64::from(record.assessments_completed()) * 5).min(100);

    // (completed / count * 100 + quiz + assessments) / 3, kept in integers.
    let numerator = completed * 100 + count * (quiz + assessments);
    let rounded = (numerator * 2 + count * 3) / (count * 6);
    u8::try_from(rounded.min(100)).unwrap_or(100)
}
