use ndarray::Array1;

use crate::sim::echo::{CARRIER_FREQ_HZ, SPEED_OF_LIGHT_MPS};

/// Samples per synthesized pulse.
pub const PULSE_SAMPLES: usize = 1000;

/// Sampled sine pulse at the carrier frequency over [0, pulse_width].
pub fn synthesize_pulse(pulse_width_s: f64, samples: usize) -> Array1<f64> {
    Array1::from_shape_fn(samples, |i| {
        let t = pulse_width_s * i as f64 / (samples - 1) as f64;
        (2.0 * std::f64::consts::PI * CARRIER_FREQ_HZ * t).sin()
    })
}

/// Target return: the pulse circularly delayed by the round trip, plus noise.
///
/// The delay wraps modulo the pulse length, matching a repeating pulse train.
pub fn delayed_return(
    tx: &Array1<f64>,
    pulse_width_s: f64,
    target_range_m: f64,
    noise: &Array1<f64>,
) -> Array1<f64> {
    let n = tx.len();
    let delay_s = 2.0 * target_range_m / SPEED_OF_LIGHT_MPS;
    let shift = ((delay_s * n as f64 / pulse_width_s) as usize) % n;
    Array1::from_shape_fn(n, |i| tx[(i + n - shift) % n] + noise[i])
}

/// Mean squared amplitude of a sampled signal.
pub fn mean_power(signal: &Array1<f64>) -> f64 {
    signal.mapv(|v| v * v).mean().unwrap_or(0.0)
}
