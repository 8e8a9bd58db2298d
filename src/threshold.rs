use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use log::debug;
use thiserror::Error;

use crate::data::model::SpectralArray;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures of a single threshold computation.
///
/// Every variant except [`ThresholdError::EmptyArray`] is a configuration
/// error: the input values handed to the estimator are unusable.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ThresholdError {
    #[error("configuration error: threshold factor must be a positive number, got {0}")]
    InvalidFactor(f64),
    #[error("configuration error: noise estimate must be finite and non-negative, got {0}")]
    InvalidNoise(f64),
    #[error("configuration error: unknown sign '{0}' (expected positive, negative or both)")]
    InvalidSign(String),
    #[error("configuration error: {0}")]
    InvalidContour(String),
    #[error("cannot estimate the noise of an empty spectral array")]
    EmptyArray,
}

impl ThresholdError {
    /// `true` for the configuration class of errors, `false` for degenerate input.
    pub fn is_configuration(&self) -> bool {
        !matches!(self, ThresholdError::EmptyArray)
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Which polarity of signal is kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, ValueEnum)]
pub enum Sign {
    #[default]
    Positive,
    Negative,
    Both,
}

impl Sign {
    pub const ALL: [Sign; 3] = [Sign::Positive, Sign::Negative, Sign::Both];

    /// Whether `value` passes this sign filter at `threshold` (strict).
    pub fn accepts(self, value: f64, threshold: f64) -> bool {
        match self {
            Sign::Positive => value > threshold,
            Sign::Negative => value < -threshold,
            Sign::Both => value.abs() > threshold,
        }
    }
}

impl fmt::Display for Sign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Sign::Positive => "positive",
            Sign::Negative => "negative",
            Sign::Both => "both",
        };
        f.write_str(name)
    }
}

impl FromStr for Sign {
    type Err = ThresholdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" => Ok(Sign::Positive),
            "negative" => Ok(Sign::Negative),
            "both" => Ok(Sign::Both),
            _ => Err(ThresholdError::InvalidSign(s.to_string())),
        }
    }
}

/// Default multiple of the noise used as the lowest contour.
pub const DEFAULT_FACTOR: f64 = 1.0;

/// Threshold settings supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdConfig {
    /// Multiple of the noise estimate below which points are dropped.
    pub factor: f64,
    pub sign: Sign,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            factor: DEFAULT_FACTOR,
            sign: Sign::default(),
        }
    }
}

impl ThresholdConfig {
    pub fn validate(&self) -> Result<(), ThresholdError> {
        validate_factor(self.factor)
    }
}

fn validate_factor(factor: f64) -> Result<(), ThresholdError> {
    if factor.is_finite() && factor > 0.0 {
        Ok(())
    } else {
        Err(ThresholdError::InvalidFactor(factor))
    }
}

// ---------------------------------------------------------------------------
// Core operations
// ---------------------------------------------------------------------------

/// Population variance (ddof = 0) of every intensity in `array`.
pub fn estimate_noise(array: &SpectralArray) -> Result<f64, ThresholdError> {
    let values = array.values();
    if values.is_empty() {
        return Err(ThresholdError::EmptyArray);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Ok(variance)
}

/// `noise * factor`, the minimum magnitude a point needs to be rendered.
pub fn compute_threshold(noise: f64, factor: f64) -> Result<f64, ThresholdError> {
    validate_factor(factor)?;
    if !noise.is_finite() || noise < 0.0 {
        return Err(ThresholdError::InvalidNoise(noise));
    }
    Ok(noise * factor)
}

/// A selected point: coordinates in reversed dimension order plus its intensity.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalPoint {
    /// `coords[0]` indexes the last storage dimension (the plot's x axis).
    pub coords: Vec<usize>,
    pub value: f64,
}

/// Every point of `array` passing `sign` at `threshold`.
///
/// Positions are visited with the dimension order reversed: for a
/// `[rows][cols]` array the columns form the outer loop and each point is
/// reported as `[col, row]`, which lines the coordinates up with the plot's
/// (x, y) axes.
pub fn select_signals(array: &SpectralArray, threshold: f64, sign: Sign) -> Vec<SignalPoint> {
    let shape = array.shape();
    if array.is_empty() {
        return Vec::new();
    }
    let reversed: Vec<usize> = shape.iter().rev().copied().collect();
    let ndim = reversed.len();

    // Row-major strides of the stored array, listed in reversed order.
    let mut strides = vec![1usize; ndim];
    for d in 1..ndim {
        strides[d] = strides[d - 1] * reversed[d - 1];
    }

    let values = array.values();
    let mut points = Vec::new();
    let mut index = vec![0usize; ndim];
    'walk: loop {
        let offset: usize = index.iter().zip(&strides).map(|(i, s)| i * s).sum();
        let value = values[offset];
        if sign.accepts(value, threshold) {
            points.push(SignalPoint {
                coords: index.clone(),
                value,
            });
        }
        // Odometer over the reversed shape, last position varies fastest.
        for d in (0..ndim).rev() {
            index[d] += 1;
            if index[d] < reversed[d] {
                continue 'walk;
            }
            index[d] = 0;
        }
        break;
    }
    points
}

// ---------------------------------------------------------------------------
// Estimator
// ---------------------------------------------------------------------------

/// Result of one threshold evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalSelection {
    pub noise: f64,
    pub threshold: f64,
    pub sign: Sign,
    pub points: Vec<SignalPoint>,
}

impl SignalSelection {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Validated [`ThresholdConfig`] that can be applied to any number of arrays.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdEstimator {
    config: ThresholdConfig,
}

impl ThresholdEstimator {
    pub fn new(config: ThresholdConfig) -> Result<Self, ThresholdError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn evaluate(&self, array: &SpectralArray) -> Result<SignalSelection, ThresholdError> {
        let noise = estimate_noise(array)?;
        self.evaluate_with_noise(array, noise)
    }

    /// Same as [`evaluate`](Self::evaluate) with a noise estimate computed elsewhere.
    pub fn evaluate_with_noise(
        &self,
        array: &SpectralArray,
        noise: f64,
    ) -> Result<SignalSelection, ThresholdError> {
        let threshold = compute_threshold(noise, self.config.factor)?;
        let points = select_signals(array, threshold, self.config.sign);
        debug!(
            "selected {} of {} points ({} above {threshold:.4e})",
            points.len(),
            array.len(),
            self.config.sign
        );
        Ok(SignalSelection {
            noise,
            threshold,
            sign: self.config.sign,
            points,
        })
    }
}
