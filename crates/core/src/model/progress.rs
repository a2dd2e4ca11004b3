use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::model::{AchievementId, ModuleId, QuizAttempt};

//
// ─── MODULE COMPLETION ────────────────────────────────────────────────────────
//

/// Completion marker for one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleCompletion {
    module_id: ModuleId,
    completed_at: Option<DateTime<Utc>>,
    time_spent_minutes: Option<u32>,
}

impl ModuleCompletion {
    #[must_use]
    pub fn new(
        module_id: ModuleId,
        completed_at: Option<DateTime<Utc>>,
        time_spent_minutes: Option<u32>,
    ) -> Self {
        Self {
            module_id,
            completed_at,
            time_spent_minutes,
        }
    }

    #[must_use]
    pub fn module_id(&self) -> ModuleId {
        self.module_id
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn time_spent_minutes(&self) -> Option<u32> {
        self.time_spent_minutes
    }
}

//
// ─── RECORD ───────────────────────────────────────────────────────────────────
//

/// Field-level view of a record, used when rehydrating from storage and when
/// encoding it back. No invariants are enforced on this type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressParts {
    pub completed_modules: Vec<ModuleCompletion>,
    pub quiz_score: u8,
    pub quiz_results: Vec<QuizAttempt>,
    pub assessments_completed: u32,
    pub total_time_spent_minutes: u64,
    pub achievements: Vec<AchievementId>,
    pub certificate_earned: bool,
    pub certificate_date: Option<DateTime<Utc>>,
    pub last_visit: Option<DateTime<Utc>>,
}

/// Everything the dashboard remembers about a learner.
///
/// Completed modules and achievements keep insertion order for display and
/// never hold duplicates. Quiz attempts are append-only. Time is tracked in
/// whole minutes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressRecord {
    completed_modules: Vec<ModuleCompletion>,
    quiz_score: u8,
    quiz_results: Vec<QuizAttempt>,
    assessments_completed: u32,
    total_time_spent_minutes: u64,
    achievements: Vec<AchievementId>,
    certificate_earned: bool,
    certificate_date: Option<DateTime<Utc>>,
    last_visit: Option<DateTime<Utc>>,
}

impl ProgressRecord {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from persisted parts, normalising structure.
    ///
    /// Duplicate modules and achievements keep their first occurrence, the
    /// quiz score cache is clamped and re-derived from the latest attempt,
    /// and a certificate date without a certificate is dropped. Rule-level
    /// reconciliation (achievements, certificate eligibility) is done by
    /// [`crate::rules::reconcile_loaded`].
    #[must_use]
    pub fn from_parts(parts: ProgressParts) -> Self {
        let mut completed_modules: Vec<ModuleCompletion> =
            Vec::with_capacity(parts.completed_modules.len());
        for completion in parts.completed_modules {
            if !completed_modules
                .iter()
                .any(|c| c.module_id == completion.module_id)
            {
                completed_modules.push(completion);
            }
        }

        let mut achievements = Vec::with_capacity(parts.achievements.len());
        for id in parts.achievements {
            if !achievements.contains(&id) {
                achievements.push(id);
            }
        }

        let quiz_score = parts
            .quiz_results
            .last()
            .map_or(parts.quiz_score.min(100), QuizAttempt::percentage);

        Self {
            completed_modules,
            quiz_score,
            quiz_results: parts.quiz_results,
            assessments_completed: parts.assessments_completed,
            total_time_spent_minutes: parts.total_time_spent_minutes,
            achievements,
            certificate_earned: parts.certificate_earned,
            certificate_date: parts.certificate_date.filter(|_| parts.certificate_earned),
            last_visit: parts.last_visit,
        }
    }

    #[must_use]
    pub fn to_parts(&self) -> ProgressParts {
        ProgressParts {
            completed_modules: self.completed_modules.clone(),
            quiz_score: self.quiz_score,
            quiz_results: self.quiz_results.clone(),
            assessments_completed: self.assessments_completed,
            total_time_spent_minutes: self.total_time_spent_minutes,
            achievements: self.achievements.clone(),
            certificate_earned: self.certificate_earned,
            certificate_date: self.certificate_date,
            last_visit: self.last_visit,
        }
    }

    // ─── reads ───────────────────────────────────────────────────────────────

    #[must_use]
    pub fn completed_modules(&self) -> &[ModuleCompletion] {
        &self.completed_modules
    }

    #[must_use]
    pub fn completion(&self, module_id: ModuleId) -> Option<&ModuleCompletion> {
        self.completed_modules
            .iter()
            .find(|c| c.module_id == module_id)
    }

    #[must_use]
    pub fn is_module_completed(&self, module_id: ModuleId) -> bool {
        self.completion(module_id).is_some()
    }

    /// Number of completed modules inside `1..=module_count`.
    #[must_use]
    pub fn known_completed_count(&self, module_count: u32) -> u32 {
        let count = self
            .completed_modules
            .iter()
            .filter(|c| c.module_id.is_known(module_count))
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    /// Percentage of the most recent attempt (display cache).
    #[must_use]
    pub fn quiz_score(&self) -> u8 {
        self.quiz_score
    }

    #[must_use]
    pub fn quiz_results(&self) -> &[QuizAttempt] {
        &self.quiz_results
    }

    #[must_use]
    pub fn latest_attempt(&self) -> Option<&QuizAttempt> {
        self.quiz_results.last()
    }

    /// Attempt with the highest score fraction; earliest wins ties.
    #[must_use]
    pub fn best_attempt(&self) -> Option<&QuizAttempt> {
        self.quiz_results.iter().reduce(|best, next| {
            if compare_fraction(next, best) == Ordering::Greater {
                next
            } else {
                best
            }
        })
    }

    #[must_use]
    pub fn assessments_completed(&self) -> u32 {
        self.assessments_completed
    }

    #[must_use]
    pub fn total_time_spent_minutes(&self) -> u64 {
        self.total_time_spent_minutes
    }

    #[must_use]
    pub fn achievements(&self) -> &[AchievementId] {
        &self.achievements
    }

    #[must_use]
    pub fn has_achievement(&self, id: AchievementId) -> bool {
        self.achievements.contains(&id)
    }

    #[must_use]
    pub fn certificate_earned(&self) -> bool {
        self.certificate_earned
    }

    #[must_use]
    pub fn certificate_date(&self) -> Option<DateTime<Utc>> {
        self.certificate_date
    }

    #[must_use]
    pub fn last_visit(&self) -> Option<DateTime<Utc>> {
        self.last_visit
    }

    // ─── transitions ─────────────────────────────────────────────────────────

    /// Mark a module complete. Returns `true` on first completion.
    ///
    /// Repeating a completion refreshes its timestamp and accumulates the
    /// reported time; the completion set itself is unchanged.
    pub fn complete_module(
        &mut self,
        module_id: ModuleId,
        time_spent_minutes: Option<u32>,
        now: DateTime<Utc>,
    ) -> bool {
        if let Some(minutes) = time_spent_minutes {
            self.total_time_spent_minutes = self
                .total_time_spent_minutes
                .saturating_add(u64::from(minutes));
        }

        if let Some(existing) = self
            .completed_modules
            .iter_mut()
            .find(|c| c.module_id == module_id)
        {
            existing.completed_at = Some(now);
            existing.time_spent_minutes = match (existing.time_spent_minutes, time_spent_minutes) {
                (Some(a), Some(b)) => Some(a.saturating_add(b)),
                (a, b) => a.or(b),
            };
            return false;
        }

        self.completed_modules.push(ModuleCompletion::new(
            module_id,
            Some(now),
            time_spent_minutes,
        ));
        true
    }

    /// Append an attempt and refresh the most-recent score cache.
    pub fn record_quiz_attempt(&mut self, attempt: QuizAttempt) {
        self.quiz_score = attempt.percentage();
        self.quiz_results.push(attempt);
    }

    pub fn record_assessment(&mut self) {
        self.assessments_completed = self.assessments_completed.saturating_add(1);
    }

    pub fn add_training_minutes(&mut self, minutes: u64) {
        self.total_time_spent_minutes = self.total_time_spent_minutes.saturating_add(minutes);
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_visit = Some(now);
    }

    pub(crate) fn unlock_achievement(&mut self, id: AchievementId) -> bool {
        if self.achievements.contains(&id) {
            return false;
        }
        self.achievements.push(id);
        true
    }

    pub(crate) fn revoke_achievement(&mut self, id: AchievementId) -> bool {
        let before = self.achievements.len();
        self.achievements.retain(|a| *a != id);
        before != self.achievements.len()
    }

    /// One-way: only the first grant stamps the date.
    pub(crate) fn grant_certificate(&mut self, now: DateTime<Utc>) -> bool {
        if self.certificate_earned {
            return false;
        }
        self.certificate_earned = true;
        self.certificate_date = Some(now);
        true
    }

    /// Only used while rehydrating records whose certificate is unsupported
    /// by the rest of the data.
    pub(crate) fn drop_certificate(&mut self) {
        self.certificate_earned = false;
        self.certificate_date = None;
    }
}

fn compare_fraction(a: &QuizAttempt, b: &QuizAttempt) -> Ordering {
    let lhs = u64::from(a.score()) * u64::from(b.total_questions());
    let rhs = u64::from(b.score()) * u64::from(a.total_questions());
    lhs.cmp(&rhs)
}
