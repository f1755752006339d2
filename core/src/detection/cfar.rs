use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::math::{linear_to_db, StatsHelper};
use crate::prelude::{RadarError, RadarResult, RadarTask, StageReport};
use crate::scan;
use crate::store::{DetectionRow, EchoRow, RadarStore};
use crate::telemetry::log::LogManager;
use crate::telemetry::metrics::MetricsRecorder;

/// Offset applied when no adaptive state has ever been persisted.
pub const DEFAULT_THRESHOLD_DB: f64 = 2.0;
/// Rows kept by the no-detection fallback.
pub const FALLBACK_TOP_K: usize = 10;

/// How the detection offset above the local noise estimate is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ThresholdPolicy {
    /// Offset from the highest-iteration adaptive-state row, or `default_db`
    /// when the cognitive loop has never run.
    FixedOffset { default_db: f64 },
    /// Cell-averaging CFAR offset for the desired probability of false alarm.
    PfaDerived { pfa: f64 },
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        ThresholdPolicy::FixedOffset {
            default_db: DEFAULT_THRESHOLD_DB,
        }
    }
}

/// Adaptive cell-averaging CFAR over range-ordered cells within each scan.
///
/// The reference band around the cell under test excludes the guard band and
/// the cell itself; its noise estimate is averaged in the linear power domain.
pub struct CfarDetector {
    window: usize,
    guard: usize,
    policy: ThresholdPolicy,
    top_k: usize,
    logger: LogManager,
    metrics: MetricsRecorder,
}

impl CfarDetector {
    pub fn new(window: usize, guard: usize, policy: ThresholdPolicy) -> Self {
        Self {
            window,
            guard,
            policy,
            top_k: FALLBACK_TOP_K,
            logger: LogManager::new(),
            metrics: MetricsRecorder::new(),
        }
    }

    fn validate(&self) -> RadarResult<()> {
        if self.window == 0 {
            return Err(RadarError::InvalidInput("window must be positive".into()));
        }
        if let ThresholdPolicy::PfaDerived { pfa } = self.policy {
            if !(0.0..1.0).contains(&pfa) || pfa <= 0.0 {
                return Err(RadarError::InvalidInput(
                    "pfa must lie strictly between 0 and 1".into(),
                ));
            }
        }
        Ok(())
    }

    /// Resolve the fixed offset for this run, consulting the adaptive state.
    fn resolve_fixed_offset(&self, store: &RadarStore, default_db: f64) -> RadarResult<(f64, String)> {
        match store.latest_adaptive_state()? {
            Some(state) => Ok((
                state.detection_threshold,
                format!("adaptive threshold (iteration {})", state.iteration),
            )),
            None => Ok((default_db, format!("default threshold {default_db:.2}"))),
        }
    }

    /// Offset in dB above the noise estimate for one cell.
    fn offset_db(&self, fixed: Option<f64>, noise_linear: f64) -> f64 {
        match (self.policy, fixed) {
            (ThresholdPolicy::FixedOffset { .. }, Some(offset)) => offset,
            (ThresholdPolicy::PfaDerived { pfa }, _) => {
                let alpha = pfa.powf(-1.0 / self.window as f64) - 1.0;
                linear_to_db(noise_linear * alpha)
            }
            // FixedOffset always resolves before the scan loop.
            (ThresholdPolicy::FixedOffset { default_db }, None) => default_db,
        }
    }

    /// Reference SNRs for cell `i`: the window around it minus guard and CUT.
    fn reference_cells(&self, snrs: &[f64], i: usize) -> Vec<f64> {
        let n = snrs.len();
        let start = i.saturating_sub(self.window + self.guard);
        let end = (i + self.window + self.guard + 1).min(n);
        let guard_start = i.saturating_sub(self.guard);
        let guard_end = (i + self.guard + 1).min(n);

        let mut cells = Vec::with_capacity(2 * self.window);
        cells.extend_from_slice(&snrs[start..guard_start]);
        cells.extend_from_slice(&snrs[guard_end..end]);
        cells
    }

    fn fallback_rows(&self, echoes: &[EchoRow]) -> Vec<DetectionRow> {
        let mut ranked: Vec<&EchoRow> = echoes.iter().collect();
        ranked.sort_by(|a, b| {
            b.snr_db
                .partial_cmp(&a.snr_db)
                .unwrap_or(Ordering::Equal)
        });
        ranked
            .into_iter()
            .take(self.top_k)
            .map(|e| DetectionRow {
                time: e.time,
                target_id: e.target_id,
                range: e.range,
                azimuth: e.azimuth,
                velocity: e.velocity,
                snr_db: e.snr_db,
            })
            .collect()
    }
}

impl RadarTask for CfarDetector {
    fn run(&mut self, store: &mut RadarStore) -> RadarResult<StageReport> {
        self.validate()?;
        self.metrics.reset();

        let (fixed_offset, offset_note) = match self.policy {
            ThresholdPolicy::FixedOffset { default_db } => {
                let (offset, note) = self.resolve_fixed_offset(store, default_db)?;
                self.logger.record(&format!("CfarDetector using {note}"));
                (Some(offset), note)
            }
            ThresholdPolicy::PfaDerived { pfa } => (None, format!("pfa-derived (pfa {pfa:e})")),
        };

        let echoes = store.load_echoes()?;
        let mut detections = Vec::new();

        let scans = scan::partition(echoes.clone(), |e| e.time);
        for mut group in scans {
            group.rows.sort_by(|a, b| {
                a.range.partial_cmp(&b.range).unwrap_or(Ordering::Equal)
            });
            let snrs: Vec<f64> = group.rows.iter().map(|e| e.snr_db).collect();

            for (i, echo) in group.rows.iter().enumerate() {
                let reference = self.reference_cells(&snrs, i);
                if reference.is_empty() {
                    // Scan-boundary cell with no usable reference band.
                    self.metrics.record_skipped();
                    continue;
                }
                self.metrics.record_processed();

                let noise_linear = StatsHelper::mean_linear(&reference);
                let noise_est_db = linear_to_db(noise_linear);
                let offset = self.offset_db(fixed_offset, noise_linear);
                if echo.snr_db > noise_est_db + offset {
                    detections.push(DetectionRow {
                        time: echo.time,
                        target_id: echo.target_id,
                        range: echo.range,
                        azimuth: echo.azimuth,
                        velocity: echo.velocity,
                        snr_db: echo.snr_db,
                    });
                }
            }
        }

        let fallback = detections.is_empty();
        if fallback {
            detections = self.fallback_rows(&echoes);
            self.logger.flag(&format!(
                "CfarDetector found no detections; substituting top {} echoes by SNR",
                detections.len()
            ));
        }

        let written = store.replace_detections(&detections)?;
        let (tested, skipped) = self.metrics.snapshot();
        self.logger.record(&format!(
            "CfarDetector wrote {} detections ({} cells tested, {} skipped)",
            written, tested, skipped
        ));
        Ok(StageReport {
            rows_written: written,
            cells_tested: Some(tested),
            cells_skipped: Some(skipped),
            fallback: Some(fallback),
            notes: vec![offset_note],
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::AdaptiveState;

    fn echo(time: f64, range: f64, snr_db: f64) -> EchoRow {
        EchoRow {
            time,
            target_id: range as i64,
            range,
            azimuth: 0.0,
            velocity: -7.0,
            snr_db,
            v_sum: 0.1,
            v_diff: 0.0,
        }
    }

    fn fixed(default_db: f64) -> ThresholdPolicy {
        ThresholdPolicy::FixedOffset { default_db }
    }

    #[test]
    fn flags_exactly_the_cell_above_local_noise() {
        let mut store = RadarStore::open_in_memory().unwrap();
        let snrs = [5.0, 6.0, 20.0, 6.0, 5.0];
        let rows: Vec<EchoRow> = snrs
            .iter()
            .enumerate()
            .map(|(i, &snr)| echo(0.0, i as f64, snr))
            .collect();
        store.replace_echoes(&rows).unwrap();

        let report = CfarDetector::new(1, 1, fixed(2.0))
            .run(&mut store)
            .unwrap();
        // Reference for the peak is {5, 5} dB -> 5 dB estimate; 20 > 5 + 2.
        let detections = store.load_detections().unwrap();
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].snr_db, 20.0);
        assert_eq!(report.fallback, Some(false));
        // Every cell still has a one-sided reference band here.
        assert_eq!(report.cells_tested, Some(5));
        assert_eq!(report.cells_skipped, Some(0));
    }

    #[test]
    fn boundary_cells_never_include_the_cut_in_the_reference() {
        // A lone strong edge cell: its reference is the quiet right side, so it
        // is flagged; if the CUT leaked into the reference it would not be.
        let mut store = RadarStore::open_in_memory().unwrap();
        let rows = vec![
            echo(0.0, 0.0, 30.0),
            echo(0.0, 1.0, 5.0),
            echo(0.0, 2.0, 5.0),
            echo(0.0, 3.0, 5.0),
        ];
        store.replace_echoes(&rows).unwrap();
        CfarDetector::new(1, 1, fixed(2.0)).run(&mut store).unwrap();
        let detections = store.load_detections().unwrap();
        assert!(detections.iter().any(|d| d.snr_db == 30.0));
    }

    #[test]
    fn single_cell_scan_is_skipped_not_flagged() {
        let mut store = RadarStore::open_in_memory().unwrap();
        // Reference band is empty for both cells once guard swallows the scan,
        // so the run falls back rather than flagging anything.
        store
            .replace_echoes(&[echo(0.0, 0.0, 40.0), echo(0.1, 0.0, 41.0)])
            .unwrap();
        let report = CfarDetector::new(4, 2, fixed(2.0)).run(&mut store).unwrap();
        assert_eq!(report.cells_tested, Some(0));
        assert_eq!(report.cells_skipped, Some(2));
        assert_eq!(report.fallback, Some(true));
    }

    #[test]
    fn fallback_keeps_top_k_sorted_by_descending_snr() {
        let mut store = RadarStore::open_in_memory().unwrap();
        // Flat scene: nothing exceeds its neighbours, so CFAR flags nothing.
        let rows: Vec<EchoRow> = (0..15)
            .map(|i| echo(0.0, i as f64, 10.0 + 0.01 * i as f64))
            .collect();
        store.replace_echoes(&rows).unwrap();
        let report = CfarDetector::new(2, 1, fixed(5.0)).run(&mut store).unwrap();
        assert_eq!(report.fallback, Some(true));
        let detections = store.load_detections().unwrap();
        assert_eq!(detections.len(), FALLBACK_TOP_K);
        for pair in detections.windows(2) {
            assert!(pair[0].snr_db >= pair[1].snr_db);
        }
    }

    #[test]
    fn fallback_is_bounded_by_the_echo_count() {
        let mut store = RadarStore::open_in_memory().unwrap();
        store
            .replace_echoes(&[echo(0.0, 0.0, 10.0), echo(0.0, 1.0, 10.0)])
            .unwrap();
        let report = CfarDetector::new(5, 2, fixed(5.0)).run(&mut store).unwrap();
        assert_eq!(report.fallback, Some(true));
        assert_eq!(report.rows_written, 2);
    }

    #[test]
    fn fixed_offset_prefers_the_latest_adaptive_state() {
        let mut store = RadarStore::open_in_memory().unwrap();
        let snrs = [5.0, 6.0, 9.0, 6.0, 5.0];
        let rows: Vec<EchoRow> = snrs
            .iter()
            .enumerate()
            .map(|(i, &snr)| echo(0.0, i as f64, snr))
            .collect();
        store.replace_echoes(&rows).unwrap();
        // Peak is 4 dB above its 5 dB reference: flagged at offset 3, not 5.
        for (iteration, threshold) in [(1, 5.0), (2, 3.0)] {
            store
                .append_adaptive_state(&AdaptiveState {
                    iteration,
                    pulse_width: 1e-6,
                    detection_threshold: threshold,
                    avg_snr: 0.0,
                    timestamp: None,
                })
                .unwrap();
        }
        let report = CfarDetector::new(1, 1, fixed(99.0)).run(&mut store).unwrap();
        assert_eq!(report.fallback, Some(false));
        let detections = store.load_detections().unwrap();
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].snr_db, 9.0);
    }

    #[test]
    fn pfa_policy_applies_the_cell_averaging_scaling() {
        let snrs = [0.0, 0.0, 12.0, 0.0, 0.0];
        let rows: Vec<EchoRow> = snrs
            .iter()
            .enumerate()
            .map(|(i, &snr)| echo(0.0, i as f64, snr))
            .collect();

        // W=1: alpha = pfa^-1 - 1. Noise estimate for the peak is 0 dB
        // (linear 1), so the offset is 10*log10(alpha).
        // pfa = 0.5 -> offset 0 dB -> 12 > 0 flagged.
        let mut store = RadarStore::open_in_memory().unwrap();
        store.replace_echoes(&rows).unwrap();
        let report = CfarDetector::new(1, 1, ThresholdPolicy::PfaDerived { pfa: 0.5 })
            .run(&mut store)
            .unwrap();
        assert_eq!(report.fallback, Some(false));

        // pfa = 1e-2 -> alpha = 99 -> offset ~19.96 dB -> 12 < 19.96 missed.
        let mut store = RadarStore::open_in_memory().unwrap();
        store.replace_echoes(&rows).unwrap();
        let report = CfarDetector::new(1, 1, ThresholdPolicy::PfaDerived { pfa: 1e-2 })
            .run(&mut store)
            .unwrap();
        assert_eq!(report.fallback, Some(true));
    }

    #[test]
    fn rerun_with_identical_inputs_is_idempotent() {
        let mut store = RadarStore::open_in_memory().unwrap();
        let rows: Vec<EchoRow> = [5.0, 6.0, 20.0, 6.0, 5.0]
            .iter()
            .enumerate()
            .map(|(i, &snr)| echo(0.0, i as f64, snr))
            .collect();
        store.replace_echoes(&rows).unwrap();
        CfarDetector::new(1, 1, fixed(2.0)).run(&mut store).unwrap();
        let first = store.load_detections().unwrap();
        CfarDetector::new(1, 1, fixed(2.0)).run(&mut store).unwrap();
        let second = store.load_detections().unwrap();
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.time, b.time);
            assert_eq!(a.snr_db, b.snr_db);
        }
    }

    #[test]
    fn rejects_invalid_parameters() {
        let mut store = RadarStore::open_in_memory().unwrap();
        assert!(matches!(
            CfarDetector::new(0, 1, fixed(2.0)).run(&mut store),
            Err(RadarError::InvalidInput(_))
        ));
        assert!(matches!(
            CfarDetector::new(1, 1, ThresholdPolicy::PfaDerived { pfa: 0.0 }).run(&mut store),
            Err(RadarError::InvalidInput(_))
        ));
        assert!(matches!(
            CfarDetector::new(1, 1, ThresholdPolicy::PfaDerived { pfa: 1.5 }).run(&mut store),
            Err(RadarError::InvalidInput(_))
        ));
    }
}
