use rand::{rngs::StdRng, SeedableRng};
use rand_distr::{Distribution, Normal};

use crate::math::linear_to_db;
use crate::prelude::{RadarError, RadarResult, RadarTask, StageReport};
use crate::store::{EchoRow, RadarStore};
use crate::telemetry::log::LogManager;

pub const SPEED_OF_LIGHT_MPS: f64 = 3.0e8;
pub const CARRIER_FREQ_HZ: f64 = 10.0e9;
pub const TX_POWER_W: f64 = 1.0;
/// Antenna gain, linear scale.
pub const ANTENNA_GAIN: f64 = 30.0;
pub const BOLTZMANN_J_PER_K: f64 = 1.38e-23;
pub const NOISE_TEMP_K: f64 = 290.0;
pub const BANDWIDTH_HZ: f64 = 1.0e6;
/// 1-sigma of the additive noise on the sum/difference channel voltages.
pub const CHANNEL_NOISE_STD_V: f64 = 0.01;

/// Monostatic radar range equation: received power in watts.
pub fn received_power(range_m: f64, rcs_m2: f64) -> f64 {
    let lambda = SPEED_OF_LIGHT_MPS / CARRIER_FREQ_HZ;
    let numerator = TX_POWER_W * ANTENNA_GAIN.powi(2) * lambda.powi(2) * rcs_m2;
    let denominator = (4.0 * std::f64::consts::PI).powi(3) * range_m.powi(4);
    numerator / denominator
}

/// Thermal noise power at the receiver, watts.
pub fn noise_power() -> f64 {
    BOLTZMANN_J_PER_K * NOISE_TEMP_K * BANDWIDTH_HZ
}

/// Converts ground-truth trajectories into simulated received signal.
///
/// SNR is fully determined by the target row; only the angle-channel voltages
/// carry injected measurement noise. Replaces `RadarDetections` wholesale.
pub struct EchoSynthesizer {
    seed: u64,
    logger: LogManager,
}

impl EchoSynthesizer {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            logger: LogManager::new(),
        }
    }
}

impl RadarTask for EchoSynthesizer {
    fn run(&mut self, store: &mut RadarStore) -> RadarResult<StageReport> {
        let targets = store.load_targets()?;
        let mut rng = StdRng::seed_from_u64(self.seed);
        let channel_noise = Normal::new(0.0, CHANNEL_NOISE_STD_V)
            .map_err(|e| RadarError::InvalidInput(format!("channel noise: {e}")))?;

        let mut rows = Vec::with_capacity(targets.len());
        for target in &targets {
            let pr = received_power(target.true_range, target.rcs);
            let snr_db = linear_to_db(pr / noise_power());
            let theta = target.true_azimuth.to_radians();
            rows.push(EchoRow {
                time: target.time,
                target_id: target.target_id,
                range: target.true_range,
                azimuth: target.true_azimuth,
                velocity: target.true_velocity,
                snr_db,
                v_sum: pr.sqrt() * theta.cos() + channel_noise.sample(&mut rng),
                v_diff: pr.sqrt() * theta.sin() + channel_noise.sample(&mut rng),
            });
        }

        let written = store.replace_echoes(&rows)?;
        self.logger
            .record(&format!("EchoSynthesizer wrote {} echo samples", written));
        Ok(StageReport {
            rows_written: written,
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TargetRow;

    fn seed_targets(store: &mut RadarStore) {
        let rows: Vec<TargetRow> = (0..5)
            .map(|i| TargetRow {
                time: i as f64 * 0.1,
                target_id: 0,
                true_range: 100.0 - i as f64,
                true_azimuth: 2.0,
                true_elevation: 0.0,
                true_velocity: -10.0,
                rcs: 10.0,
                noise_power: -80.0,
            })
            .collect();
        store.append_targets(&rows).unwrap();
    }

    #[test]
    fn snr_matches_the_range_equation() {
        let mut store = RadarStore::open_in_memory().unwrap();
        seed_targets(&mut store);
        EchoSynthesizer::new(7).run(&mut store).unwrap();
        let echoes = store.load_echoes().unwrap();
        let expected = linear_to_db(received_power(100.0, 10.0) / noise_power());
        assert!((echoes[0].snr_db - expected).abs() < 1e-9);
        // Closer target, higher SNR.
        assert!(echoes[4].snr_db > echoes[0].snr_db);
    }

    #[test]
    fn snr_is_deterministic_across_seeds_and_reruns() {
        let mut store = RadarStore::open_in_memory().unwrap();
        seed_targets(&mut store);
        EchoSynthesizer::new(1).run(&mut store).unwrap();
        let first: Vec<f64> = store.load_echoes().unwrap().iter().map(|e| e.snr_db).collect();
        EchoSynthesizer::new(2).run(&mut store).unwrap();
        let second: Vec<f64> = store.load_echoes().unwrap().iter().map(|e| e.snr_db).collect();
        for (a, b) in first.iter().zip(&second) {
            assert!((a - b).abs() <= 1e-9 * a.abs());
        }
    }

    #[test]
    fn channel_voltages_are_reproducible_for_a_fixed_seed() {
        let mut store = RadarStore::open_in_memory().unwrap();
        seed_targets(&mut store);
        EchoSynthesizer::new(42).run(&mut store).unwrap();
        let first = store.load_echoes().unwrap();
        EchoSynthesizer::new(42).run(&mut store).unwrap();
        let second = store.load_echoes().unwrap();
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.v_sum, b.v_sum);
            assert_eq!(a.v_diff, b.v_diff);
        }
    }

    #[test]
    fn run_replaces_the_echo_table() {
        let mut store = RadarStore::open_in_memory().unwrap();
        seed_targets(&mut store);
        EchoSynthesizer::new(0).run(&mut store).unwrap();
        let report = EchoSynthesizer::new(0).run(&mut store).unwrap();
        assert_eq!(report.rows_written, 5);
        assert_eq!(store.load_echoes().unwrap().len(), 5);
    }

    #[test]
    fn received_power_falls_with_fourth_power_of_range() {
        let near = received_power(100.0, 10.0);
        let far = received_power(200.0, 10.0);
        assert!((near / far - 16.0).abs() < 1e-9);
    }
}
