use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::metrics::{meets_percent, rounded_percent};

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("a quiz must have at least one question")]
    NoQuestions,

    #[error("score {score} exceeds the number of questions ({total})")]
    ScoreExceedsTotal { score: u32, total: u32 },
}

//
// ─── ATTEMPT ──────────────────────────────────────────────────────────────────
//

/// One submitted quiz. Attempts are immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizAttempt {
    score: u32,
    total_questions: u32,
    taken_at: DateTime<Utc>,
    passed: bool,
}

impl QuizAttempt {
    /// Grade a fresh attempt against the pass mark.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` if there are no questions or the score is larger
    /// than the question count.
    pub fn new(
        score: u32,
        total_questions: u32,
        taken_at: DateTime<Utc>,
        pass_percent: u8,
    ) -> Result<Self, QuizError> {
        validate(score, total_questions)?;
        Ok(Self {
            score,
            total_questions,
            taken_at,
            passed: meets_percent(u64::from(score), u64::from(total_questions), pass_percent),
        })
    }

    /// Rehydrate an attempt, keeping the pass flag recorded at the time.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` if the persisted counts are inconsistent.
    pub fn from_persisted(
        score: u32,
        total_questions: u32,
        taken_at: DateTime<Utc>,
        passed: bool,
    ) -> Result<Self, QuizError> {
        validate(score, total_questions)?;
        Ok(Self {
            score,
            total_questions,
            taken_at,
            passed,
        })
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    #[must_use]
    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.passed
    }

    /// Score as a whole percentage, rounded half up.
    #[must_use]
    pub fn percentage(&self) -> u8 {
        rounded_percent(u64::from(self.score), u64::from(self.total_questions))
    }

    /// Exact threshold check, free of rounding.
    #[must_use]
    pub fn meets(&self, percent: u8) -> bool {
        meets_percent(
            u64::from(self.score),
            u64::from(self.total_questions),
            percent,
        )
    }
}

fn validate(score: u32, total_questions: u32) -> Result<(), QuizError> {
    if total_questions == 0 {
        return Err(QuizError::NoQuestions);
    }
    if score > total_questions {
        return Err(QuizError::ScoreExceedsTotal {
            score,
            total: total_questions,
        });
    }
    Ok(())
}

//
// ─── RESULT BANDS ─────────────────────────────────────────────────────────────
//

/// Feedback band shown after a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBand {
    Excellent,
    Passed,
    GoodEffort,
    KeepLearning,
}

impl ScoreBand {
    #[must_use]
    pub fn for_percentage(percentage: u8, pass_percent: u8) -> Self {
        if percentage >= 90 {
            Self::Excellent
        } else if percentage >= pass_percent {
            Self::Passed
        } else if percentage >= 50 {
            Self::GoodEffort
        } else {
            Self::KeepLearning
        }
    }

    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::Excellent => "Excellent! Outstanding performance!",
            Self::Passed => "Great job! You passed the quiz!",
            Self::GoodEffort => "Good effort! Review the material and try again.",
            Self::KeepLearning => "Keep learning! Review the modules and retake the quiz.",
        }
    }
}
