use crate::prelude::{RadarResult, RadarTask, StageReport};
use crate::scan;
use crate::store::{RadarStore, TrackingRow};
use crate::telemetry::log::LogManager;
use crate::tracking::kalman::AngleKalman;
use crate::tracking::TrackerMethod;

/// Nutation rate of the scanning beam, degrees per second.
pub const SCAN_RATE_DEG_PER_S: f64 = 10.0;
/// Cone radius of the nutating beam, degrees.
pub const CONE_AMPLITUDE_DEG: f64 = 0.5;
/// Calibration constant scaling the modulation to an angle error.
pub const CONICAL_GAIN: f64 = 5.0;

/// Angle estimation from the amplitude modulation of a nutating beam.
///
/// The boresight phase advances with the scan time; each scan contributes one
/// raw estimate shared by all of its detections.
pub struct ConicalScanTracker {
    scan_rate: f64,
    amplitude: f64,
    gain: f64,
    logger: LogManager,
}

impl ConicalScanTracker {
    pub fn new() -> Self {
        Self {
            scan_rate: SCAN_RATE_DEG_PER_S,
            amplitude: CONE_AMPLITUDE_DEG,
            gain: CONICAL_GAIN,
            logger: LogManager::new(),
        }
    }

    /// Raw per-scan estimate from the beam phase at scan time `t`.
    fn raw_estimate(&self, t: f64) -> f64 {
        let phase_deg = (t * self.scan_rate).rem_euclid(360.0);
        let modulation = self.amplitude * phase_deg.to_radians().cos();
        self.gain * modulation / 10.0
    }
}

impl Default for ConicalScanTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl RadarTask for ConicalScanTracker {
    fn run(&mut self, store: &mut RadarStore) -> RadarResult<StageReport> {
        let detections = store.load_detections()?;
        let mut kf = AngleKalman::new();
        let scans = scan::partition(detections, |d| d.time);
        let scan_count = scans.len();

        let mut rows = Vec::new();
        for group in scans {
            let est_azimuth = kf.step(self.raw_estimate(group.time));
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

        let written = store.replace_tracking(TrackerMethod::Conical, &rows)?;
        self.logger.record(&format!(
            "ConicalScanTracker wrote {} results over {} scans",
            written, scan_count
        ));
        Ok(StageReport {
            rows_written: written,
            scans_processed: Some(scan_count),
            ..Default::default()
        })
    }
}
