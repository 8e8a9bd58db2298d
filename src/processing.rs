//! Baseline, normalisation and contour-level helpers applied to a
//! [`SpectralArray`] before thresholding.

use log::warn;

use crate::data::model::SpectralArray;
use crate::threshold::{compute_threshold, estimate_noise, Sign, ThresholdError};

/// Bins used for the intensity histogram.
pub const HISTOGRAM_BINS: usize = 256;

// ---------------------------------------------------------------------------
// Histogram and baseline
// ---------------------------------------------------------------------------

/// Equal-width histogram over `[min, max]` of `values`.
///
/// Returns the counts and the bin centres. A constant input is widened to
/// `[v - 0.5, v + 0.5]`; the maximum lands in the last bin.
pub fn histogram(values: &[f64], nbins: usize) -> (Vec<usize>, Vec<f64>) {
    let finite = values.iter().copied().filter(|v| v.is_finite());
    let (mut lo, mut hi) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if nbins == 0 || lo > hi {
        return (Vec::new(), Vec::new());
    }
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }

    let width = (hi - lo) / nbins as f64;
    let mut counts = vec![0usize; nbins];
    for &v in values.iter().filter(|v| v.is_finite()) {
        let bin = (((v - lo) / width) as usize).min(nbins - 1);
        counts[bin] += 1;
    }
    let centers = (0..nbins)
        .map(|i| lo + width * (i as f64 + 0.5))
        .collect();
    (counts, centers)
}

/// Spectral baseline: the centre of the most populated histogram bin.
pub fn baseline(values: &[f64]) -> Option<f64> {
    let (counts, centers) = histogram(values, HISTOGRAM_BINS);
    histogram_mode(&counts, &centers)
}

/// Centre of the most populated bin of a [`histogram`].
pub fn histogram_mode(counts: &[usize], centers: &[f64]) -> Option<f64> {
    // First bin wins on ties.
    let mut best: Option<(usize, usize)> = None;
    for (i, &count) in counts.iter().enumerate() {
        if best.map_or(true, |(_, max)| count > max) {
            best = Some((i, count));
        }
    }
    best.map(|(i, _)| centers[i])
}

/// Shift the baseline to zero and scale by its magnitude.
///
/// Returns `None` when the baseline cannot serve as a scale (zero or not
/// finite); the caller keeps the raw data in that case.
pub fn normalize(array: &SpectralArray, baseline: f64) -> Option<SpectralArray> {
    if !baseline.is_finite() || baseline == 0.0 {
        warn!("baseline is {baseline}, skipping normalisation");
        return None;
    }
    let scale = baseline.abs();
    Some(array.map(|v| (v - baseline) / scale))
}

// ---------------------------------------------------------------------------
// Signal to noise
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalStats {
    /// Sum of all intensities.
    pub signal: f64,
    /// Variance of all intensities.
    pub noise: f64,
    pub snr: f64,
}

impl SignalStats {
    pub fn compute(array: &SpectralArray) -> Result<Self, ThresholdError> {
        let noise = estimate_noise(array)?;
        let signal: f64 = array.values().iter().sum();
        Ok(Self {
            signal,
            noise,
            snr: signal / noise,
        })
    }
}

// ---------------------------------------------------------------------------
// Contour levels
// ---------------------------------------------------------------------------

/// How many contours to draw and how far apart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContourConfig {
    pub nlevs: usize,
    /// Ratio between consecutive levels.
    pub increment: f64,
}

impl Default for ContourConfig {
    fn default() -> Self {
        Self {
            nlevs: 42,
            increment: 1.1,
        }
    }
}

impl ContourConfig {
    pub fn validate(&self) -> Result<(), ThresholdError> {
        if self.nlevs == 0 {
            return Err(ThresholdError::InvalidContour(
                "at least one contour level is required".into(),
            ));
        }
        if !(self.increment.is_finite() && self.increment > 0.0) {
            return Err(ThresholdError::InvalidContour(format!(
                "level increment must be a positive number, got {}",
                self.increment
            )));
        }
        Ok(())
    }
}

/// Geometric series of positive levels starting at `noise * factor`.
pub fn contour_levels(
    noise: f64,
    factor: f64,
    contour: ContourConfig,
) -> Result<Vec<f64>, ThresholdError> {
    contour.validate()?;
    let start = compute_threshold(noise, factor)?;
    Ok((0..contour.nlevs)
        .map(|k| start * contour.increment.powi(k as i32))
        .collect())
}

/// Levels for `sign`, sorted ascending: as given, mirrored below zero, or both.
pub fn signed_levels(levels: &[f64], sign: Sign) -> Vec<f64> {
    let negative = levels.iter().rev().map(|l| -l);
    match sign {
        Sign::Positive => levels.to_vec(),
        Sign::Negative => negative.collect(),
        Sign::Both => negative.chain(levels.iter().copied()).collect(),
    }
}

/// Index of the highest level strictly below `magnitude`.
///
/// `levels` must be ascending and non-negative.
pub fn level_index(levels: &[f64], magnitude: f64) -> Option<usize> {
    levels.partition_point(|&l| l < magnitude).checked_sub(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_histogram_counts_every_value() {
        let values = [0.0, 0.1, 0.1, 0.9, 1.0];
        let (counts, centers) = histogram(&values, 10);
        assert_eq!(counts.iter().sum::<usize>(), values.len());
        assert_eq!(counts[1], 2);
        assert_eq!(counts[9], 2, "maximum falls in the last bin");
        assert!((centers[0] - 0.05).abs() < 1e-12);
        assert!((centers[9] - 0.95).abs() < 1e-12);
    }

    #[test]
    fn test_histogram_constant_input() {
        let (counts, centers) = histogram(&[2.0; 4], 2);
        assert_eq!(counts, vec![0, 4]);
        assert!((centers[0] - 1.75).abs() < 1e-12);
        assert!(histogram(&[], 4).0.is_empty());
    }

    #[test]
    fn test_baseline_is_mode() {
        // Mostly flat at 10 with a few peaks
        let mut values = vec![10.0; 500];
        values.extend([250.0, 300.0, -40.0]);
        let b = baseline(&values).unwrap();
        assert!((b - 10.0).abs() < 340.0 / 256.0, "baseline {b}");
    }

    #[test]
    fn test_histogram_mode_prefers_first_tie() {
        assert_eq!(histogram_mode(&[1, 3, 3, 0], &[0.0, 1.0, 2.0, 3.0]), Some(1.0));
        assert_eq!(histogram_mode(&[], &[]), None);
    }

    #[test]
    fn test_normalize_moves_baseline_to_zero() {
        let array = SpectralArray::new(vec![4], vec![10.0, 10.0, 30.0, 10.0]).unwrap();
        let normalized = normalize(&array, 10.0).unwrap();
        assert_eq!(normalized.values(), &[0.0, 0.0, 2.0, 0.0]);

        let negative = normalize(&array, -10.0).unwrap();
        assert_eq!(negative.values()[0], 2.0);

        assert!(normalize(&array, 0.0).is_none());
        assert!(normalize(&array, f64::NAN).is_none());
    }

    #[test]
    fn test_signal_stats() {
        let array = SpectralArray::new(vec![4], vec![1.0, 3.0, 1.0, 3.0]).unwrap();
        let stats = SignalStats::compute(&array).unwrap();
        assert_eq!(stats.signal, 8.0);
        assert_eq!(stats.noise, 1.0);
        assert_eq!(stats.snr, 8.0);
    }

    #[test]
    fn test_contour_levels_geometric() {
        let config = ContourConfig {
            nlevs: 3,
            increment: 2.0,
        };
        let levels = contour_levels(2.0, 0.5, config).unwrap();
        assert_eq!(levels, vec![1.0, 2.0, 4.0]);

        assert!(matches!(
            contour_levels(2.0, 0.5, ContourConfig { nlevs: 0, ..config }),
            Err(ThresholdError::InvalidContour(_))
        ));
        assert_eq!(
            contour_levels(2.0, 0.0, ContourConfig::default()),
            Err(ThresholdError::InvalidFactor(0.0))
        );
    }

    #[test]
    fn test_signed_levels() {
        let levels = [1.0, 2.0];
        assert_eq!(signed_levels(&levels, Sign::Positive), vec![1.0, 2.0]);
        assert_eq!(signed_levels(&levels, Sign::Negative), vec![-2.0, -1.0]);
        assert_eq!(signed_levels(&levels, Sign::Both), vec![-2.0, -1.0, 1.0, 2.0]);
    }

    #[test]
    fn test_level_index() {
        let levels = [1.0, 2.0, 4.0];
        assert_eq!(level_index(&levels, 0.5), None);
        assert_eq!(level_index(&levels, 1.0), None);
        assert_eq!(level_index(&levels, 1.5), Some(0));
        assert_eq!(level_index(&levels, 4.0), Some(1));
        assert_eq!(level_index(&levels, 100.0), Some(2));
    }
}
