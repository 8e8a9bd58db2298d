/// Point ↔ chemical-shift conversion for one spectral axis.
///
/// Point 0 sits at the high-frequency edge, so ppm decreases with the point
/// index whenever the spectral width is positive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitConverter {
    size: usize,
    /// ppm per point (negative for a positive spectral width).
    delta: f64,
    /// ppm of point 0.
    first: f64,
}

impl UnitConverter {
    pub fn new(size: usize, sw: f64, obs: f64, car: f64) -> Self {
        let n = size.max(1) as f64;
        let delta = -sw / (n * obs);
        let first = car / obs - delta * n / 2.0;
        Self { size, delta, first }
    }

    pub fn ppm(&self, point: f64) -> f64 {
        self.first + point * self.delta
    }

    /// ppm of the first and last point.
    pub fn ppm_limits(&self) -> (f64, f64) {
        (self.ppm(0.0), self.ppm(self.size.saturating_sub(1) as f64))
    }

    /// ppm of every point, in storage order.
    pub fn ppm_scale(&self) -> Vec<f64> {
        (0..self.size).map(|i| self.ppm(i as f64)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centred_carrier() {
        // 1H at 600 MHz, 12 ppm window centred on 4.7 ppm
        let obs = 600.0;
        let sw = 12.0 * obs;
        let car = 4.7 * obs;
        let uc = UnitConverter::new(1024, sw, obs, car);

        let (left, right) = uc.ppm_limits();
        assert!(left > right);
        assert!((left - (4.7 + 6.0)).abs() < 1e-9, "left {left}");
        assert!((right - (4.7 - 6.0 + 12.0 / 1024.0)).abs() < 1e-9, "right {right}");
        assert!((uc.ppm(512.0) - 4.7).abs() < 1e-9);
    }

    #[test]
    fn test_point_spacing_is_sw_over_size() {
        let uc = UnitConverter::new(256, 3000.0, 150.9, 15_000.0);
        let step = uc.ppm(1.0) - uc.ppm(0.0);
        assert!((step + 3000.0 / (256.0 * 150.9)).abs() < 1e-12);
    }

    #[test]
    fn test_scale_matches_limits() {
        let uc = UnitConverter::new(5, 500.0, 100.0, 0.0);
        let scale = uc.ppm_scale();
        assert_eq!(scale.len(), 5);
        let (left, right) = uc.ppm_limits();
        assert_eq!(scale[0], left);
        assert_eq!(scale[4], right);
        assert!(scale.windows(2).all(|w| w[0] > w[1]));
    }
}
