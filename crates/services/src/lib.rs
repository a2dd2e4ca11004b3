#![forbid(unsafe_code)]

pub mod engine;
pub mod error;

pub use training_core::Clock;

pub use engine::{
    AnswerSheetOutcome, DEFAULT_TICK, LoadReport, MIN_TICK, ModuleCompletionOutcome,
    ProgressEngine, ProgressExport, ProgressSnapshot, QuizOutcome, RiskOutcome, TrainingTimer,
};
pub use error::EngineError;
