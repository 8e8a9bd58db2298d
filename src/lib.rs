//! Plot 1D and 2D NMR spectra from processed Bruker experiments.
//!
//! The heart of the crate is [`threshold`]: a noise estimate (variance of
//! all intensities) scaled by a user factor decides which points are worth
//! drawing, split by signal polarity. Everything else composes that with
//! loading ([`data`]), baseline handling ([`processing`], [`spectrum`]) and
//! rendering ([`render`], [`export`], [`app`]).

pub mod app;
pub mod cli;
pub mod color;
pub mod data;
pub mod export;
pub mod processing;
pub mod render;
pub mod spectrum;
pub mod state;
pub mod threshold;
pub mod ui;

pub use data::model::{AxisParams, Experiment, SpectralArray};
pub use spectrum::Spectrum;
pub use threshold::{
    compute_threshold, estimate_noise, select_signals, SignalPoint, SignalSelection, Sign,
    ThresholdConfig, ThresholdError, ThresholdEstimator,
};
