use crate::math::StatsHelper;
use crate::prelude::{RadarResult, RadarTask, StageReport};
use crate::scan;
use crate::store::{RadarStore, TrackingRow};
use crate::telemetry::log::LogManager;
use crate::tracking::kalman::AngleKalman;
use crate::tracking::TrackerMethod;

/// Beam step between the two synthetic lobe positions, degrees.
pub const BEAM_OFFSET_DEG: f64 = 0.5;
/// Calibration constant mapping the lobe power ratio to degrees.
pub const LOBING_GAIN: f64 = 2.0;

/// Angle estimation from alternating offset-beam power comparison.
///
/// Each scan yields one raw estimate from the left/right synthetic lobe
/// powers; the smoothed angle is shared by every detection in the scan.
pub struct SequentialLobingTracker {
    beam_offset: f64,
    gain: f64,
    logger: LogManager,
}

impl SequentialLobingTracker {
    pub fn new() -> Self {
        Self {
            beam_offset: BEAM_OFFSET_DEG,
            gain: LOBING_GAIN,
            logger: LogManager::new(),
        }
    }

    /// Raw per-scan estimate from the scan's mean linear SNR.
    fn raw_estimate(&self, snrs_db: &[f64]) -> f64 {
        let mean_linear = StatsHelper::mean_linear(snrs_db);
        let left = mean_linear * (1.0 - self.beam_offset / 10.0);
        let right = mean_linear * (1.0 + self.beam_offset / 10.0);
        let ratio = (right - left) / (right + left);
        self.gain * ratio
    }
}

impl Default for SequentialLobingTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl RadarTask for SequentialLobingTracker {
    fn run(&mut self, store: &mut RadarStore) -> RadarResult<StageReport> {
        let detections = store.load_detections()?;
        let mut kf = AngleKalman::new();
        let scans = scan::partition(detections, |d| d.time);
        let scan_count = scans.len();

        let mut rows = Vec::new();
        for group in scans {
            let snrs: Vec<f64> = group.rows.iter().map(|d| d.snr_db).collect();
            let est_azimuth = kf.step(self.raw_estimate(&snrs));
            for det in group.rows {
                rows.push(TrackingRow {
                    time: det.time,
                    target_id: det.target_id,
                    range: det.range,
                    true_azimuth: det.azimuth,
                    est_azimuth,
                    tracking_error: (det.azimuth - est_azimuth).abs(),
                    snr_db: det.snr_db,
                });
            }
        }

        let written = store.replace_tracking(TrackerMethod::Sequential, &rows)?;
        self.logger.record(&format!(
            "SequentialLobingTracker wrote {} results over {} scans",
            written, scan_count
        ));
        Ok(StageReport {
            rows_written: written,
            scans_processed: Some(scan_count),
            ..Default::default()
        })
    }
}
