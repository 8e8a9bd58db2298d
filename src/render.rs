use std::collections::BTreeMap;

use log::debug;
use thiserror::Error;

use crate::color::{level_color, Colormap, ColormapError};
use crate::processing::{level_index, signed_levels, ContourConfig};
use crate::spectrum::Spectrum;
use crate::threshold::{Sign, ThresholdConfig, ThresholdError};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    #[error(transparent)]
    Threshold(#[from] ThresholdError),
    #[error(transparent)]
    Colormap(#[from] ColormapError),
}

// ---------------------------------------------------------------------------
// Plot geometry
// ---------------------------------------------------------------------------

/// A 1D spectrum as a line in ppm.
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    pub ppm: Vec<f64>,
    pub intensity: Vec<f64>,
}

/// Selected 2D points whose magnitude lies between one contour level and the next.
#[derive(Debug, Clone, PartialEq)]
pub struct Band {
    /// Signed lower bound of the band.
    pub level: f64,
    pub color: [u8; 3],
    /// `[x_ppm, y_ppm]` of every point in the band.
    pub points: Vec<[f64; 2]>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlotData {
    Line(Trace),
    Contours(Vec<Band>),
}

/// Everything a renderer needs, independent of the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotModel {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    /// ppm of the first and last point along x (descending).
    pub x_range: (f64, f64),
    /// ppm range along y for 2D spectra.
    pub y_range: Option<(f64, f64)>,
    pub threshold: f64,
    pub sign: Sign,
    /// Signed contour levels, ascending.
    pub levels: Vec<f64>,
    /// Number of points passing the threshold.
    pub selected: usize,
    pub data: PlotData,
}

impl PlotModel {
    pub fn build(
        spectrum: &Spectrum,
        config: ThresholdConfig,
        contour: ContourConfig,
        colormap: Colormap,
    ) -> Result<Self, RenderError> {
        colormap.check_sign(config.sign)?;
        let selection = spectrum.select(config)?;
        let levels = spectrum.contour_levels(config, contour)?;
        let labels = spectrum.labels();
        let ranges = spectrum.ppm_ranges();
        let x_range = (ranges[0], ranges[1]);

        let model = if spectrum.ndim() == 1 {
            let trace = Trace {
                ppm: spectrum.ppm_scale(0),
                intensity: spectrum.array().values().to_vec(),
            };
            PlotModel {
                title: spectrum.title().to_string(),
                x_label: format!("{} ppm", labels[0]),
                y_label: "Intensity (A.U.)".to_string(),
                x_range,
                y_range: None,
                threshold: selection.threshold,
                sign: config.sign,
                levels: signed_levels(&levels, config.sign),
                selected: selection.points.len(),
                data: PlotData::Line(trace),
            }
        } else {
            let x_scale = spectrum.ppm_scale(1);
            let y_scale = spectrum.ppm_scale(0);

            let mut grouped: BTreeMap<(bool, usize), Vec<[f64; 2]>> = BTreeMap::new();
            for point in &selection.points {
                let Some(k) = level_index(&levels, point.value.abs()) else {
                    continue;
                };
                let (x, y) = (point.coords[0], point.coords[1]);
                grouped
                    .entry((point.value < 0.0, k))
                    .or_default()
                    .push([x_scale[x], y_scale[y]]);
            }

            let mut bands: Vec<Band> = grouped
                .into_iter()
                .map(|((negative, k), points)| {
                    let level = if negative { -levels[k] } else { levels[k] };
                    Band {
                        level,
                        color: level_color(colormap, k, levels.len(), negative),
                        points,
                    }
                })
                .collect();
            bands.sort_by(|a, b| a.level.total_cmp(&b.level));
            debug!(
                "{} points in {} contour bands",
                selection.points.len(),
                bands.len()
            );

            PlotModel {
                title: spectrum.title().to_string(),
                x_label: format!("{} ppm", labels[1]),
                y_label: format!("{} ppm", labels[0]),
                x_range,
                y_range: Some((ranges[2], ranges[3])),
                threshold: selection.threshold,
                sign: config.sign,
                levels: signed_levels(&levels, config.sign),
                selected: selection.points.len(),
                data: PlotData::Contours(bands),
            }
        };
        Ok(model)
    }

    pub fn is_empty(&self) -> bool {
        match &self.data {
            PlotData::Line(trace) => trace.ppm.is_empty(),
            PlotData::Contours(bands) => bands.is_empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrum::tests::experiment_2d;

    fn spectrum() -> Spectrum {
        // One positive and one negative peak on a flat floor
        let experiment = experiment_2d(16, 32, |r, c| match (r, c) {
            (4, 10) => 50.0,
            (4, 11) => 20.0,
            (12, 25) => -40.0,
            _ => 0.0,
        });
        Spectrum::new(experiment, false).unwrap()
    }

    fn config(sign: Sign) -> ThresholdConfig {
        ThresholdConfig { factor: 1.0, sign }
    }

    #[test]
    fn test_bands_follow_sign() {
        let spectrum = spectrum();
        let contour = ContourConfig::default();

        let both =
            PlotModel::build(&spectrum, config(Sign::Both), contour, Colormap::Coolwarm).unwrap();
        assert_eq!(both.selected, 3);
        let PlotData::Contours(bands) = &both.data else {
            panic!("expected contours");
        };
        let total: usize = bands.iter().map(|b| b.points.len()).sum();
        assert_eq!(total, 3);
        assert!(bands.first().unwrap().level < 0.0);
        assert!(bands.last().unwrap().level > 0.0);
        assert!(bands.windows(2).all(|w| w[0].level < w[1].level));

        let positive =
            PlotModel::build(&spectrum, config(Sign::Positive), contour, Colormap::Red).unwrap();
        assert_eq!(positive.selected, 2);
        assert!(positive.levels.iter().all(|&l| l > 0.0));
    }

    #[test]
    fn test_points_are_in_ppm() {
        let spectrum = spectrum();
        let model = PlotModel::build(
            &spectrum,
            config(Sign::Negative),
            ContourConfig::default(),
            Colormap::Blue,
        )
        .unwrap();
        let PlotData::Contours(bands) = &model.data else {
            panic!("expected contours");
        };
        assert_eq!(bands.len(), 1);
        let [x, y] = bands[0].points[0];
        assert_eq!(x, spectrum.ppm_scale(1)[25]);
        assert_eq!(y, spectrum.ppm_scale(0)[12]);
        assert_eq!(model.x_label, "1H ppm");
        assert_eq!(model.y_label, "13C ppm");
    }

    #[test]
    fn test_high_threshold_gives_empty_plot() {
        let model = PlotModel::build(
            &spectrum(),
            ThresholdConfig {
                factor: 1e6,
                sign: Sign::Both,
            },
            ContourConfig::default(),
            Colormap::Viridis,
        )
        .unwrap();
        assert!(model.is_empty());
        assert_eq!(model.selected, 0);
    }

    #[test]
    fn test_configuration_errors() {
        let spectrum = spectrum();
        let err = PlotModel::build(
            &spectrum,
            config(Sign::Positive),
            ContourConfig::default(),
            Colormap::Coolwarm,
        )
        .unwrap_err();
        assert!(matches!(err, RenderError::Colormap(_)));

        let err = PlotModel::build(
            &spectrum,
            ThresholdConfig {
                factor: -1.0,
                sign: Sign::Both,
            },
            ContourConfig::default(),
            Colormap::Viridis,
        )
        .unwrap_err();
        assert_eq!(err, RenderError::Threshold(ThresholdError::InvalidFactor(-1.0)));
    }
}
