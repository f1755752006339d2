use serde::{Deserialize, Serialize};

/// Ground-truth sample appended by the scene generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetRow {
    pub time: f64,
    pub target_id: i64,
    pub true_range: f64,
    pub true_azimuth: f64,
    pub true_elevation: f64,
    pub true_velocity: f64,
    pub rcs: f64,
    pub noise_power: f64,
}

/// Synthesized received signal for one (target, time) sample.
///
/// Rows are uniquely keyed by (time, target_id).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EchoRow {
    pub time: f64,
    pub target_id: i64,
    pub range: f64,
    pub azimuth: f64,
    pub velocity: f64,
    pub snr_db: f64,
    pub v_sum: f64,
    pub v_diff: f64,
}

/// A cell under test that passed CFAR.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionRow {
    pub time: f64,
    pub target_id: i64,
    pub range: f64,
    pub azimuth: f64,
    pub velocity: f64,
    pub snr_db: f64,
}

/// One cognitive-loop iteration's parameters.
///
/// `timestamp` is assigned by the store on insert and only populated on reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptiveState {
    pub iteration: i64,
    pub pulse_width: f64,
    pub detection_threshold: f64,
    pub avg_snr: f64,
    pub timestamp: Option<String>,
}

/// Smoothed angle estimate and error for one detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingRow {
    pub time: f64,
    pub target_id: i64,
    pub range: f64,
    pub true_azimuth: f64,
    pub est_azimuth: f64,
    pub tracking_error: f64,
    pub snr_db: f64,
}
