use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::prelude::{RadarError, RadarResult, RadarTask, StageReport};
use crate::store::{RadarStore, TargetRow};
use crate::telemetry::log::LogManager;

/// Configuration for synthesizing ground-truth trajectories.
///
/// Bands are (low, high) pairs sampled uniformly; all angles are in degrees.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub n_targets: usize,
    pub t_end: f64,
    pub dt: f64,
    pub seed: u64,
    pub range_band_m: (f64, f64),
    pub velocity_band_mps: (f64, f64),
    pub azimuth_band_deg: (f64, f64),
    pub azimuth_jitter_deg: f64,
    pub rcs_band_m2: (f64, f64),
    pub noise_figure_band_dbm: (f64, f64),
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            n_targets: 2,
            t_end: 10.0,
            dt: 0.1,
            seed: 0,
            range_band_m: (50.0, 200.0),
            velocity_band_mps: (-10.0, -5.0),
            azimuth_band_deg: (-5.0, 5.0),
            azimuth_jitter_deg: 0.1,
            rcs_band_m2: (5.0, 15.0),
            noise_figure_band_dbm: (-90.0, -70.0),
        }
    }
}

impl SceneConfig {
    fn validate(&self) -> RadarResult<()> {
        if self.n_targets == 0 {
            return Err(RadarError::InvalidInput("n_targets must be positive".into()));
        }
        if self.t_end <= 0.0 {
            return Err(RadarError::InvalidInput("t_end must be positive".into()));
        }
        if self.dt <= 0.0 {
            return Err(RadarError::InvalidInput("dt must be positive".into()));
        }
        if self.azimuth_jitter_deg < 0.0 {
            return Err(RadarError::InvalidInput(
                "azimuth jitter must be non-negative".into(),
            ));
        }
        for (name, band) in [
            ("range", self.range_band_m),
            ("velocity", self.velocity_band_mps),
            ("azimuth", self.azimuth_band_deg),
            ("rcs", self.rcs_band_m2),
            ("noise figure", self.noise_figure_band_dbm),
        ] {
            if band.0 >= band.1 {
                return Err(RadarError::InvalidInput(format!(
                    "{name} band must satisfy low < high"
                )));
            }
        }
        Ok(())
    }
}

/// Synthesizes linear-motion point targets and appends them to `TargetData`.
pub struct SceneGenerator {
    config: SceneConfig,
    logger: LogManager,
}

impl SceneGenerator {
    pub fn new(config: SceneConfig) -> Self {
        Self {
            config,
            logger: LogManager::new(),
        }
    }

    fn build_rows(&self) -> RadarResult<Vec<TargetRow>> {
        let cfg = &self.config;
        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let jitter = Normal::new(0.0, cfg.azimuth_jitter_deg)
            .map_err(|e| RadarError::InvalidInput(format!("azimuth jitter: {e}")))?;

        let mut rows = Vec::new();
        for target_id in 0..cfg.n_targets as i64 {
            // Per-target draws happen once; only the jitter varies per sample.
            let range0 = rng.gen_range(cfg.range_band_m.0..cfg.range_band_m.1);
            let velocity = rng.gen_range(cfg.velocity_band_mps.0..cfg.velocity_band_mps.1);
            let azimuth_bias = rng.gen_range(cfg.azimuth_band_deg.0..cfg.azimuth_band_deg.1);
            let rcs = rng.gen_range(cfg.rcs_band_m2.0..cfg.rcs_band_m2.1);
            let noise_power = rng
                .gen_range(cfg.noise_figure_band_dbm.0..cfg.noise_figure_band_dbm.1);

            for time in (0..).map(|i| i as f64 * cfg.dt).take_while(|t| *t < cfg.t_end) {
                rows.push(TargetRow {
                    time,
                    target_id,
                    true_range: range0 + velocity * time,
                    true_azimuth: azimuth_bias + jitter.sample(&mut rng),
                    true_elevation: 0.0,
                    true_velocity: velocity,
                    rcs,
                    noise_power,
                });
            }
        }
        Ok(rows)
    }
}

impl RadarTask for SceneGenerator {
    fn run(&mut self, store: &mut RadarStore) -> RadarResult<StageReport> {
        self.config.validate()?;
        let rows = self.build_rows()?;
        let written = store.append_targets(&rows)?;
        self.logger.record(&format!(
            "SceneGenerator appended {} rows for {} targets",
            written, self.config.n_targets
        ));
        Ok(StageReport {
            rows_written: written,
            notes: vec![format!("{} targets", self.config.n_targets)],
            ..Default::default()
        })
    }
}
