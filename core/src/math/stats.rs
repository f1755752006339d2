use crate::math::units::{db_to_linear, linear_to_db};

pub struct StatsHelper;

impl StatsHelper {
    pub fn mean(samples: &[f64]) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }
        samples.iter().sum::<f64>() / samples.len() as f64
    }

    /// Mean of decibel samples taken in the linear power domain.
    pub fn mean_linear(samples_db: &[f64]) -> f64 {
        if samples_db.is_empty() {
            return 0.0;
        }
        samples_db.iter().map(|&v| db_to_linear(v)).sum::<f64>() / samples_db.len() as f64
    }

    /// Linear-domain mean of decibel samples, expressed back in decibels.
    pub fn mean_power_db(samples_db: &[f64]) -> f64 {
        linear_to_db(Self::mean_linear(samples_db))
    }
}
