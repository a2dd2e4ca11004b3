//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;
use training_core::model::{AssessmentError, QuizError};

/// Errors emitted by `ProgressEngine` and its bootstrap.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    #[error(transparent)]
    Quiz(#[from] QuizError),
    #[error(transparent)]
    Assessment(#[from] AssessmentError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error("failed to render export: {0}")]
    Export(#[from] serde_json::Error),
}
