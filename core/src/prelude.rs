use serde::Serialize;

use crate::store::RadarStore;

/// Common error type for pipeline stages.
#[derive(thiserror::Error, Debug)]
pub enum RadarError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("store failure: {0}")]
    Store(#[from] rusqlite::Error),
}

pub type RadarResult<T> = Result<T, RadarError>;

/// Summary emitted by each stage for chaining and telemetry.
///
/// Only `rows_written` is universal; the optional fields are filled by the
/// stages they apply to.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StageReport {
    pub rows_written: usize,
    pub cells_tested: Option<usize>,
    pub cells_skipped: Option<usize>,
    pub skipped_joins: Option<usize>,
    pub scans_processed: Option<usize>,
    pub fallback: Option<bool>,
    pub final_pulse_width: Option<f64>,
    pub final_threshold: Option<f64>,
    pub notes: Vec<String>,
}

/// Trait describing the side-effecting pipeline stages run over a store handle.
pub trait RadarTask {
    fn run(&mut self, store: &mut RadarStore) -> RadarResult<StageReport>;
}
