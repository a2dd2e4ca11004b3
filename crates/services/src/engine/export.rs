use chrono::{DateTime, Utc};
use serde::Serialize;
use storage::documents::{ProgressDocument, RiskEntryDoc};
use training_core::metrics;
use training_core::model::{EngineSettings, ProgressRecord, RiskHistory};

/// Downloadable progress report: the persisted document plus derived totals.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressExport {
    #[serde(flatten)]
    progress: ProgressDocument,
    completion_percentage: u8,
    overall_progress: u8,
    total_score: u32,
    max_score: u32,
    best_quiz_score: Option<u8>,
    risk_history: Vec<RiskEntryDoc>,
    export_date: DateTime<Utc>,
}

impl ProgressExport {
    #[must_use]
    pub fn build(
        record: &ProgressRecord,
        history: &RiskHistory,
        settings: &EngineSettings,
        exported_at: DateTime<Utc>,
    ) -> Self {
        Self {
            progress: ProgressDocument::from_record(record),
            completion_percentage: metrics::completion_percentage(record, settings),
            overall_progress: metrics::overall_progress(record, settings),
            total_score: metrics::total_score(record, settings),
            max_score: metrics::MAX_TOTAL_SCORE,
            best_quiz_score: record.best_attempt().map(|a| a.percentage()),
            risk_history: history.iter().map(RiskEntryDoc::from_entry).collect(),
            export_date: exported_at,
        }
    }
}
