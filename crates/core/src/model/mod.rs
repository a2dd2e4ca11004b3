mod achievement;
mod ids;
mod progress;
mod quiz;
mod risk;
mod settings;

pub use achievement::{Achievement, AchievementId};
pub use ids::{ModuleId, ParseIdError};
pub use progress::{ModuleCompletion, ProgressParts, ProgressRecord};
pub use quiz::{QuizAttempt, QuizError, ScoreBand};
pub use risk::{
    AssessmentError, Impact, Likelihood, Recommendation, RiskAssessmentEntry, RiskHistory,
    RiskLevel,
};
pub use settings::{EngineSettings, EngineSettingsDraft, SettingsError, StorageKeys};
