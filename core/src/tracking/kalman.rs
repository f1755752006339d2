//! Constant-velocity angle smoother shared by the tracker variants.
//!
//! State x = [angle, rate]; transition F = [[1, 1], [0, 1]]; observation
//! H = [1, 0]. The 2x2 arithmetic is written out directly; a matrix crate
//! buys nothing at this size.

/// Filter constants fixed across all three tracker variants.
pub const INITIAL_COVARIANCE: f64 = 10.0;
pub const MEASUREMENT_NOISE: f64 = 0.05;
pub const PROCESS_NOISE: f64 = 0.001;

#[derive(Debug, Clone)]
pub struct AngleKalman {
    x: [f64; 2],
    p: [[f64; 2]; 2],
    r: f64,
    q: [f64; 2],
}

impl AngleKalman {
    pub fn new() -> Self {
        Self {
            x: [0.0, 0.0],
            p: [[INITIAL_COVARIANCE, 0.0], [0.0, INITIAL_COVARIANCE]],
            r: MEASUREMENT_NOISE,
            q: [PROCESS_NOISE, PROCESS_NOISE],
        }
    }

    /// Propagate state and covariance one scan forward.
    pub fn predict(&mut self) {
        let [x0, x1] = self.x;
        self.x = [x0 + x1, x1];

        // P' = F P F^T + Q
        let [[p00, p01], [p10, p11]] = self.p;
        self.p = [
            [p00 + p10 + p01 + p11 + self.q[0], p01 + p11],
            [p10 + p11, p11 + self.q[1]],
        ];
    }

    /// Fold one raw angle estimate into the state.
    pub fn update(&mut self, z: f64) {
        let innovation = z - self.x[0];
        let s = self.p[0][0] + self.r;
        let k0 = self.p[0][0] / s;
        let k1 = self.p[1][0] / s;

        self.x[0] += k0 * innovation;
        self.x[1] += k1 * innovation;

        // P' = (I - K H) P
        let [[p00, p01], [p10, p11]] = self.p;
        self.p = [
            [(1.0 - k0) * p00, (1.0 - k0) * p01],
            [p10 - k1 * p00, p11 - k1 * p01],
        ];
    }

    /// Predict, then update, returning the smoothed angle.
    pub fn step(&mut self, z: f64) -> f64 {
        self.predict();
        self.update(z);
        self.x[0]
    }

    pub fn angle(&self) -> f64 {
        self.x[0]
    }

    pub fn rate(&self) -> f64 {
        self.x[1]
    }
}

impl Default for AngleKalman {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converges_to_a_constant_angle() {
        let mut kf = AngleKalman::new();
        let truth = 3.2;
        for _ in 0..50 {
            kf.step(truth);
        }
        assert!((kf.angle() - truth).abs() < 1e-3);
        assert!(kf.rate().abs() < 1e-3);
    }

    #[test]
    fn update_pulls_the_state_toward_the_measurement() {
        let mut kf = AngleKalman::new();
        let est = kf.step(1.0);
        // High initial covariance: the first estimate sits near the measurement.
        assert!(est > 0.9 && est <= 1.0);
    }

    #[test]
    fn update_shrinks_the_angle_variance() {
        let mut kf = AngleKalman::new();
        kf.predict();
        let before = kf.p[0][0];
        kf.update(0.5);
        assert!(kf.p[0][0] < before);
    }

    #[test]
    fn tracks_a_constant_rate_ramp() {
        let mut kf = AngleKalman::new();
        // Angle advancing one unit of 0.05 per scan.
        for i in 0..200 {
            kf.step(0.05 * i as f64);
        }
        assert!((kf.rate() - 0.05).abs() < 1e-2);
    }
}
