use std::collections::HashMap;

use crate::prelude::{RadarResult, RadarTask, StageReport};
use crate::scan;
use crate::store::{RadarStore, TrackingRow};
use crate::telemetry::log::LogManager;
use crate::telemetry::metrics::MetricsRecorder;
use crate::tracking::kalman::AngleKalman;
use crate::tracking::TrackerMethod;

/// Calibration constant mapping the channel ratio to degrees.
pub const MONOPULSE_GAIN: f64 = 10.0;
/// Keeps the ratio finite when the sum channel fades through zero.
pub const SUM_CHANNEL_EPS: f64 = 1e-9;

/// Angle estimation from the ratio of sum and difference channel voltages.
///
/// The only variant with a per-detection raw estimate: the filter runs one
/// predict/update per detection, in scan order. Detections without a matching
/// echo row are skipped, never aborting the run.
pub struct MonopulseTracker {
    gain: f64,
    logger: LogManager,
    metrics: MetricsRecorder,
}

impl MonopulseTracker {
    pub fn new() -> Self {
        Self {
            gain: MONOPULSE_GAIN,
            logger: LogManager::new(),
            metrics: MetricsRecorder::new(),
        }
    }
}

impl Default for MonopulseTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl RadarTask for MonopulseTracker {
    fn run(&mut self, store: &mut RadarStore) -> RadarResult<StageReport> {
        self.metrics.reset();
        let detections = store.load_detections()?;
        let echoes = store.load_echoes()?;

        // Join key: exact sample time and target id.
        let voltages: HashMap<(u64, i64), (f64, f64)> = echoes
            .iter()
            .map(|e| ((e.time.to_bits(), e.target_id), (e.v_sum, e.v_diff)))
            .collect();

        // Fresh filter per run; state never leaves this scope.
        let mut kf = AngleKalman::new();
        let scans = scan::partition(detections, |d| d.time);
        let scan_count = scans.len();

        let mut rows = Vec::new();
        for group in scans {
            for det in group.rows {
                let Some(&(v_sum, v_diff)) = voltages.get(&(det.time.to_bits(), det.target_id))
                else {
                    self.metrics.record_skipped();
                    continue;
                };
                self.metrics.record_processed();

                let ratio = v_diff / (v_sum + SUM_CHANNEL_EPS);
                let est_azimuth = kf.step(self.gain * ratio);
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

        let written = store.replace_tracking(TrackerMethod::Monopulse, &rows)?;
        let (_, skipped) = self.metrics.snapshot();
        if skipped > 0 {
            self.logger.flag(&format!(
                "MonopulseTracker skipped {} detections without echo voltages",
                skipped
            ));
        }
        self.logger.record(&format!(
            "MonopulseTracker wrote {} results over {} scans",
            written, scan_count
        ));
        Ok(StageReport {
            rows_written: written,
            scans_processed: Some(scan_count),
            skipped_joins: Some(skipped),
            ..Default::default()
        })
    }
}
