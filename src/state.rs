use log::warn;

use crate::color::Colormap;
use crate::processing::ContourConfig;
use crate::render::PlotModel;
use crate::spectrum::Spectrum;
use crate::threshold::ThresholdConfig;

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub spectrum: Spectrum,

    pub threshold: ThresholdConfig,
    pub contour: ContourConfig,
    pub colormap: Colormap,

    /// Plot geometry for the current settings (None when they are invalid).
    pub model: Option<PlotModel>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(
        spectrum: Spectrum,
        threshold: ThresholdConfig,
        contour: ContourConfig,
        colormap: Colormap,
    ) -> Self {
        let mut state = Self {
            spectrum,
            threshold,
            contour,
            colormap,
            model: None,
            status_message: None,
        };
        state.refresh();
        state
    }

    /// Recompute the selection and plot geometry from the current settings.
    pub fn refresh(&mut self) {
        match PlotModel::build(&self.spectrum, self.threshold, self.contour, self.colormap) {
            Ok(model) => {
                self.status_message = None;
                self.model = Some(model);
            }
            Err(e) => {
                warn!("{e}");
                self.status_message = Some(e.to_string());
                self.model = None;
            }
        }
    }

    pub fn set_threshold(&mut self, threshold: ThresholdConfig) {
        if threshold != self.threshold {
            self.threshold = threshold;
            self.refresh();
        }
    }

    pub fn set_contour(&mut self, contour: ContourConfig) {
        if contour != self.contour {
            self.contour = contour;
            self.refresh();
        }
    }

    pub fn set_colormap(&mut self, colormap: Colormap) {
        if colormap != self.colormap {
            self.colormap = colormap;
            self.refresh();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrum::tests::experiment_2d;
    use crate::threshold::Sign;

    fn state() -> AppState {
        let experiment = experiment_2d(8, 8, |r, c| match (r, c) {
            (2, 2) => 30.0,
            (5, 6) => -30.0,
            _ => 0.0,
        });
        AppState::new(
            Spectrum::new(experiment, false).unwrap(),
            ThresholdConfig::default(),
            ContourConfig::default(),
            Colormap::Viridis,
        )
    }

    #[test]
    fn test_sign_change_recomputes_selection() {
        let mut state = state();
        assert_eq!(state.model.as_ref().unwrap().selected, 1);

        state.set_threshold(ThresholdConfig {
            sign: Sign::Both,
            ..state.threshold
        });
        assert_eq!(state.model.as_ref().unwrap().selected, 2);
    }

    #[test]
    fn test_invalid_settings_reported_not_panicking() {
        let mut state = state();
        state.set_colormap(Colormap::Coolwarm);
        assert!(state.model.is_none());
        assert!(state.status_message.as_deref().unwrap().contains("sign=both"));

        state.set_threshold(ThresholdConfig {
            sign: Sign::Both,
            ..state.threshold
        });
        assert!(state.model.is_some());
        assert!(state.status_message.is_none());
    }
}
