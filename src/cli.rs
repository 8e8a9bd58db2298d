use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, bail, Result};
use clap::Parser;
use log::{warn, LevelFilter};

use crate::app;
use crate::color::Colormap;
use crate::data::loader::source_for;
use crate::export;
use crate::processing::ContourConfig;
use crate::render::PlotModel;
use crate::spectrum::Spectrum;
use crate::state::AppState;
use crate::threshold::{Sign, ThresholdConfig, DEFAULT_FACTOR};

/// Pixel dimensions of an exported image, written `WIDTHxHEIGHT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl FromStr for ImageSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<u32>()
                .map_err(|e| format!("invalid image dimension '{v}': {e}"))
        };
        Ok(Self {
            width: parse(w)?,
            height: parse(h)?,
        })
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[derive(Debug, Parser)]
#[command(name = "nmrplot", version)]
#[command(about = "Plot a 1D or 2D Bruker NMR spectrum in a given path")]
pub struct Args {
    /// Experiment folder (the one holding pdata/) or an exported spectrum file
    pub path: PathBuf,

    /// Number of processing in the Bruker experiment
    #[arg(short, long, default_value_t = 1)]
    pub pdata: u32,

    /// How many times the noise level is the lowest contour above the baseline
    #[arg(short, long, default_value_t = DEFAULT_FACTOR, allow_hyphen_values = true)]
    pub threshold: f64,

    /// Whether to draw positive, negative or both contours
    #[arg(short, long, value_enum, default_value_t = Sign::Positive)]
    pub sign: Sign,

    /// Colormap: viridis, red, blue, green, purple, orange, grey, light_red,
    /// light_blue. Only with sign=both: coolwarm
    #[arg(short, long, default_value = "viridis")]
    pub cmap: Colormap,

    /// Number of contour levels to draw
    #[arg(short, long, default_value_t = 42)]
    pub nlevs: usize,

    /// Increment factor between contour levels
    #[arg(short, long, default_value_t = 1.1, allow_hyphen_values = true)]
    pub factor: f64,

    /// Keep raw intensities instead of scaling them to the baseline
    #[arg(long)]
    pub no_normalize: bool,

    /// Write a PNG here instead of opening a window
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Size of the exported PNG
    #[arg(long, default_value = "1200x800")]
    pub size: ImageSize,

    /// More log output (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    pub fn threshold_config(&self) -> ThresholdConfig {
        ThresholdConfig {
            factor: self.threshold,
            sign: self.sign,
        }
    }

    pub fn contour_config(&self) -> ContourConfig {
        ContourConfig {
            nlevs: self.nlevs,
            increment: self.factor,
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            _ => LevelFilter::Debug,
        }
    }
}

/// Load the spectrum named by `args` and plot it.
///
/// Settings are validated before anything is read from disk.
pub fn run(args: &Args) -> Result<()> {
    let threshold = args.threshold_config();
    let contour = args.contour_config();
    threshold.validate()?;
    contour.validate()?;
    args.cmap.check_sign(args.sign)?;

    if !args.path.exists() {
        bail!("path {} does not exist", args.path.display());
    }
    let experiment = source_for(&args.path, args.pdata).load()?;
    let spectrum = Spectrum::new(experiment, !args.no_normalize)?;
    println!("Loaded {}D spectrum {}", spectrum.ndim(), spectrum.title());

    match &args.output {
        Some(path) => {
            let model = PlotModel::build(&spectrum, threshold, contour, args.cmap)?;
            if model.selected == 0 {
                warn!(
                    "no points above threshold {:.3e}, the plot will be empty",
                    model.threshold
                );
            }
            export::write_png(&model, path, (args.size.width, args.size.height))?;
            println!("Saved plot to {}", path.display());
        }
        None => {
            let state = AppState::new(spectrum, threshold, contour, args.cmap);
            app::run(state).map_err(|e| anyhow!("plot window failed: {e}"))?;
        }
    }
    Ok(())
}
