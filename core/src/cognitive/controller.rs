use ndarray::Array1;
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use crate::cognitive::waveform::{delayed_return, mean_power, synthesize_pulse, PULSE_SAMPLES};
use crate::math::linear_to_db;
use crate::prelude::{RadarError, RadarResult, RadarTask, StageReport};
use crate::store::{AdaptiveState, RadarStore};
use crate::telemetry::log::LogManager;

pub const INITIAL_PULSE_WIDTH_S: f64 = 1.0e-6;
pub const INITIAL_THRESHOLD: f64 = 2.0;
/// 1-sigma of the additive sample noise on the simulated return.
pub const NOISE_LEVEL: f64 = 0.5;
/// Band the per-cycle target distance is drawn from, metres.
pub const TARGET_RANGE_BAND_M: (f64, f64) = (100.0, 1000.0);

/// Waveform and detector parameters adapted by the feedback loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerState {
    pub pulse_width: f64,
    pub detection_threshold: f64,
}

impl Default for ControllerState {
    fn default() -> Self {
        Self {
            pulse_width: INITIAL_PULSE_WIDTH_S,
            detection_threshold: INITIAL_THRESHOLD,
        }
    }
}

/// Decision taken by one adaptation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adaptation {
    /// Low SNR: trade resolution for sensitivity.
    Widen,
    /// High SNR: tighten to cut false alarms and conserve energy.
    Tighten,
    /// SNR inside the acceptance band: leave both parameters alone.
    Hold,
}

impl ControllerState {
    /// Apply the adaptation rule for one observed SNR.
    ///
    /// Both comparisons are strict: an SNR exactly at the threshold, or
    /// exactly at four times it, changes nothing.
    pub fn adapt(&mut self, snr_db: f64) -> Adaptation {
        if snr_db < self.detection_threshold {
            self.pulse_width *= 1.5;
            self.detection_threshold *= 0.9;
            Adaptation::Widen
        } else if snr_db > 4.0 * self.detection_threshold {
            self.pulse_width *= 0.8;
            self.detection_threshold *= 1.1;
            Adaptation::Tighten
        } else {
            Adaptation::Hold
        }
    }
}

/// Closed-loop controller that observes per-pulse SNR and appends one
/// adaptive-state row per cycle.
///
/// The two scalar parameters restart from their defaults each run; the
/// iteration counter continues from the highest persisted row so the
/// `RadarConfig` log stays strictly increasing across runs.
pub struct CognitiveController {
    iterations: usize,
    seed: u64,
    logger: LogManager,
}

impl CognitiveController {
    pub fn new(iterations: usize, seed: u64) -> Self {
        Self {
            iterations,
            seed,
            logger: LogManager::new(),
        }
    }
}

impl RadarTask for CognitiveController {
    fn run(&mut self, store: &mut RadarStore) -> RadarResult<StageReport> {
        if self.iterations == 0 {
            return Err(RadarError::InvalidInput("iterations must be positive".into()));
        }

        let mut state = ControllerState::default();
        let mut iteration = store.max_adaptive_iteration()?;
        let mut rng = StdRng::seed_from_u64(self.seed);
        let sample_noise = Normal::new(0.0, NOISE_LEVEL)
            .map_err(|e| RadarError::InvalidInput(format!("noise level: {e}")))?;

        for cycle in 0..self.iterations {
            let tx = synthesize_pulse(state.pulse_width, PULSE_SAMPLES);
            let target_range = rng.gen_range(TARGET_RANGE_BAND_M.0..TARGET_RANGE_BAND_M.1);
            let noise =
                Array1::from_iter((0..PULSE_SAMPLES).map(|_| sample_noise.sample(&mut rng)));
            let rx = delayed_return(&tx, state.pulse_width, target_range, &noise);

            let snr_db = linear_to_db(mean_power(&tx) / mean_power(&noise));
            let action = state.adapt(snr_db);

            iteration += 1;
            store.append_adaptive_state(&AdaptiveState {
                iteration,
                pulse_width: state.pulse_width,
                detection_threshold: state.detection_threshold,
                avg_snr: snr_db,
                timestamp: None,
            })?;

            self.logger.record(&format!(
                "cycle {}/{}: range {:.1} m, snr {:.2} dB, rx power {:.3}, {:?}",
                cycle + 1,
                self.iterations,
                target_range,
                snr_db,
                mean_power(&rx),
                action
            ));
        }

        Ok(StageReport {
            rows_written: self.iterations,
            final_pulse_width: Some(state.pulse_width),
            final_threshold: Some(state.detection_threshold),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_snr_widens_the_pulse_and_lowers_the_threshold() {
        let mut state = ControllerState::default();
        assert_eq!(state.adapt(1.0), Adaptation::Widen);
        assert!((state.pulse_width - 1.5e-6).abs() < 1e-18);
        assert!((state.detection_threshold - 1.8).abs() < 1e-12);
    }

    #[test]
    fn high_snr_tightens_both_parameters() {
        let mut state = ControllerState::default();
        assert_eq!(state.adapt(9.0), Adaptation::Tighten);
        assert!((state.pulse_width - 0.8e-6).abs() < 1e-18);
        assert!((state.detection_threshold - 2.2).abs() < 1e-12);
    }

    #[test]
    fn boundaries_hold_on_both_strict_comparisons() {
        let mut state = ControllerState::default();
        assert_eq!(state.adapt(INITIAL_THRESHOLD), Adaptation::Hold);
        assert_eq!(state.adapt(4.0 * INITIAL_THRESHOLD), Adaptation::Hold);
        assert_eq!(state, ControllerState::default());
    }

    #[test]
    fn parameters_stay_strictly_positive_under_any_history() {
        let mut state = ControllerState::default();
        for i in 0..500 {
            // Alternate the harshest pressure in both directions.
            let snr = if i % 2 == 0 { -100.0 } else { 1e6 };
            state.adapt(snr);
            assert!(state.pulse_width > 0.0);
            assert!(state.detection_threshold > 0.0);
        }
    }

    #[test]
    fn run_appends_one_row_per_cycle_with_increasing_iterations() {
        let mut store = RadarStore::open_in_memory().unwrap();
        let report = CognitiveController::new(5, 3).run(&mut store).unwrap();
        assert_eq!(report.rows_written, 5);
        assert_eq!(store.max_adaptive_iteration().unwrap(), 5);
        assert!(report.final_pulse_width.unwrap() > 0.0);
        assert!(report.final_threshold.unwrap() > 0.0);
    }

    #[test]
    fn iteration_counter_continues_across_runs() {
        let mut store = RadarStore::open_in_memory().unwrap();
        CognitiveController::new(4, 1).run(&mut store).unwrap();
        CognitiveController::new(3, 2).run(&mut store).unwrap();
        assert_eq!(store.max_adaptive_iteration().unwrap(), 7);
        let latest = store.latest_adaptive_state().unwrap().unwrap();
        assert_eq!(latest.iteration, 7);
    }

    #[test]
    fn zero_iterations_is_rejected() {
        let mut store = RadarStore::open_in_memory().unwrap();
        assert!(matches!(
            CognitiveController::new(0, 0).run(&mut store),
            Err(RadarError::InvalidInput(_))
        ));
    }
}
