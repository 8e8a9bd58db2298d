use anyhow::{bail, Result};
use log::info;

use crate::data::model::{AxisParams, Experiment, SpectralArray};
use crate::processing::{self, ContourConfig, SignalStats, HISTOGRAM_BINS};
use crate::threshold::{
    compute_threshold, SignalSelection, ThresholdConfig, ThresholdError, ThresholdEstimator,
};

/// A loaded experiment together with everything derived from it once:
/// ppm ranges, baseline and noise statistics.
#[derive(Debug, Clone)]
pub struct Spectrum {
    experiment: Experiment,
    /// `(first, last)` ppm of every axis, in storage order.
    ppm_limits: Vec<(f64, f64)>,
    baseline: f64,
    normalized: bool,
    stats: SignalStats,
    /// Intensity histogram of the (possibly normalised) data.
    histogram: (Vec<usize>, Vec<f64>),
}

impl Spectrum {
    /// Derive baseline and noise statistics, normalising the data to the
    /// baseline first when `normalize` is set.
    pub fn new(mut experiment: Experiment, normalize: bool) -> Result<Self> {
        if experiment.axes.len() != experiment.ndim() {
            bail!(
                "'{}' describes {} axes for a {}D spectrum",
                experiment.title,
                experiment.axes.len(),
                experiment.ndim()
            );
        }
        let ppm_limits = experiment
            .axes_with_size()
            .map(|(axis, size)| axis.converter(size).ppm_limits())
            .collect();

        // Rejects empty arrays before the histogram is built.
        let raw_stats = SignalStats::compute(&experiment.array)?;
        let mut baseline = processing::baseline(experiment.array.values()).unwrap_or(0.0);

        let mut normalized = false;
        if normalize {
            if let Some(array) = processing::normalize(&experiment.array, baseline) {
                experiment.array = array;
                normalized = true;
            }
        }
        let histogram = processing::histogram(experiment.array.values(), HISTOGRAM_BINS);
        if normalized {
            baseline = processing::histogram_mode(&histogram.0, &histogram.1).unwrap_or(0.0);
        }
        let stats = if normalized {
            SignalStats::compute(&experiment.array)?
        } else {
            raw_stats
        };

        info!(
            "{}D spectrum '{}': baseline {baseline:.4e}, noise {:.4e}, S/N {:.4e}",
            experiment.ndim(),
            experiment.title,
            stats.noise,
            stats.snr
        );

        Ok(Self {
            experiment,
            ppm_limits,
            baseline,
            normalized,
            stats,
            histogram,
        })
    }

    pub fn experiment(&self) -> &Experiment {
        &self.experiment
    }

    pub fn title(&self) -> &str {
        &self.experiment.title
    }

    pub fn array(&self) -> &SpectralArray {
        &self.experiment.array
    }

    pub fn axes(&self) -> &[AxisParams] {
        &self.experiment.axes
    }

    pub fn ndim(&self) -> usize {
        self.experiment.ndim()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.axes().iter().map(|a| a.label.as_str()).collect()
    }

    pub fn ppm_limits(&self) -> &[(f64, f64)] {
        &self.ppm_limits
    }

    /// Plot extent `[x_first, x_last, y_first, y_last]`: the axes' ppm limits
    /// flattened in reversed dimension order.
    pub fn ppm_ranges(&self) -> Vec<f64> {
        self.ppm_limits
            .iter()
            .rev()
            .flat_map(|&(a, b)| [a, b])
            .collect()
    }

    /// ppm of every point along storage axis `dim`.
    pub fn ppm_scale(&self, dim: usize) -> Vec<f64> {
        self.experiment
            .axes_with_size()
            .nth(dim)
            .map(|(axis, size)| axis.converter(size).ppm_scale())
            .unwrap_or_default()
    }

    pub fn baseline(&self) -> f64 {
        self.baseline
    }

    /// Counts and bin centres of the intensity histogram.
    pub fn histogram(&self) -> (&[usize], &[f64]) {
        (&self.histogram.0, &self.histogram.1)
    }

    pub fn is_normalized(&self) -> bool {
        self.normalized
    }

    pub fn stats(&self) -> SignalStats {
        self.stats
    }

    pub fn noise(&self) -> f64 {
        self.stats.noise
    }

    pub fn threshold(&self, config: ThresholdConfig) -> Result<f64, ThresholdError> {
        compute_threshold(self.stats.noise, config.factor)
    }

    pub fn select(&self, config: ThresholdConfig) -> Result<SignalSelection, ThresholdError> {
        ThresholdEstimator::new(config)?.evaluate_with_noise(self.array(), self.stats.noise)
    }

    pub fn contour_levels(
        &self,
        config: ThresholdConfig,
        contour: ContourConfig,
    ) -> Result<Vec<f64>, ThresholdError> {
        processing::contour_levels(self.stats.noise, config.factor, contour)
    }
}
