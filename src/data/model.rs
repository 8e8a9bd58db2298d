use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::units::UnitConverter;

// ---------------------------------------------------------------------------
// SpectralArray – decoded intensities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArrayError {
    #[error("shape {shape:?} holds {expected} points but {actual} values were given")]
    ShapeMismatch {
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },
    #[error("only 1D and 2D spectra are supported, got {0} dimensions")]
    UnsupportedDimensions(usize),
    #[error("row {row} has {actual} points, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[error("intensity at {} is {value}, expected a finite number", describe_index(.index))]
    NonFinite { index: Vec<usize>, value: f64 },
}

fn describe_index(index: &[usize]) -> String {
    match index {
        [row, col] => format!("row {row}, column {col}"),
        [point] => format!("point {point}"),
        other => format!("{other:?}"),
    }
}

/// Real intensities of a processed spectrum, stored row-major.
///
/// For a 2D spectrum `shape = [rows, cols]`: rows run along the indirect
/// dimension and cols along the direct one.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralArray {
    shape: Vec<usize>,
    values: Vec<f64>,
}

impl SpectralArray {
    pub fn new(shape: Vec<usize>, values: Vec<f64>) -> Result<Self, ArrayError> {
        if shape.is_empty() || shape.len() > 2 {
            return Err(ArrayError::UnsupportedDimensions(shape.len()));
        }
        let expected: usize = shape.iter().product();
        if expected != values.len() {
            return Err(ArrayError::ShapeMismatch {
                shape,
                expected,
                actual: values.len(),
            });
        }
        if let Some(offset) = values.iter().position(|v| !v.is_finite()) {
            let index = match shape[..] {
                [_, cols] => vec![offset / cols, offset % cols],
                _ => vec![offset],
            };
            return Err(ArrayError::NonFinite {
                index,
                value: values[offset],
            });
        }
        Ok(Self { shape, values })
    }

    /// Build a 2D array from equally long rows.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, ArrayError> {
        let cols = rows.first().map_or(0, Vec::len);
        let n_rows = rows.len();
        let mut values = Vec::with_capacity(n_rows * cols);
        for (row, data) in rows.into_iter().enumerate() {
            if data.len() != cols {
                return Err(ArrayError::RaggedRow {
                    row,
                    expected: cols,
                    actual: data.len(),
                });
            }
            values.extend(data);
        }
        Self::new(vec![n_rows, cols], values)
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Apply `f` to every intensity, keeping the shape.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            shape: self.shape.clone(),
            values: self.values.iter().map(|&v| f(v)).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// AxisParams – one dimension of the parameter dictionary
// ---------------------------------------------------------------------------

/// Acquisition parameters of one spectral dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisParams {
    /// Nucleus label, e.g. `1H` or `13C`.
    pub label: String,
    /// Spectral width in Hz.
    pub sw: f64,
    /// Observe frequency in MHz.
    pub obs: f64,
    /// Carrier frequency in Hz.
    pub car: f64,
}

impl AxisParams {
    pub fn converter(&self, size: usize) -> UnitConverter {
        UnitConverter::new(size, self.sw, self.obs, self.car)
    }
}

// ---------------------------------------------------------------------------
// ParamValue – extra entries of the parameter dictionary
// ---------------------------------------------------------------------------

/// A loosely typed acquisition or processing parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Null,
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::String(s) => write!(f, "{s}"),
            ParamValue::Integer(i) => write!(f, "{i}"),
            ParamValue::Float(v) => write!(f, "{v:.4}"),
            ParamValue::Bool(b) => write!(f, "{b}"),
            ParamValue::Null => write!(f, "<null>"),
        }
    }
}

// ---------------------------------------------------------------------------
// Experiment – what a data source hands over
// ---------------------------------------------------------------------------

/// A processed spectrum together with its parameter dictionary.
#[derive(Debug, Clone)]
pub struct Experiment {
    pub title: String,
    /// One entry per dimension, in storage order.
    pub axes: Vec<AxisParams>,
    pub array: SpectralArray,
    pub params: BTreeMap<String, ParamValue>,
}

impl Experiment {
    pub fn ndim(&self) -> usize {
        self.array.ndim()
    }

    /// Axis parameters paired with the number of points along that axis.
    pub fn axes_with_size(&self) -> impl Iterator<Item = (&AxisParams, usize)> {
        self.axes.iter().zip(self.array.shape().iter().copied())
    }
}
