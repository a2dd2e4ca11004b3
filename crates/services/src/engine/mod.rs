mod export;
mod outcomes;
mod service;
mod timer;

// Public API of the progress engine.
pub use export::ProgressExport;
pub use outcomes::{
    AnswerSheetOutcome, LoadReport, ModuleCompletionOutcome, ProgressSnapshot, QuizOutcome,
    RiskOutcome,
};
pub use service::ProgressEngine;
pub use timer::{DEFAULT_TICK, MIN_TICK, TrainingTimer};
