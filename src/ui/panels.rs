use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use super::plot::histogram_plot;
use crate::color::Colormap;
use crate::state::AppState;
use crate::threshold::Sign;

// ---------------------------------------------------------------------------
// Top bar – title and status
// ---------------------------------------------------------------------------

pub fn top_bar(ui: &mut Ui, state: &AppState) {
    ui.horizontal(|ui: &mut Ui| {
        ui.strong(format!(
            "{}D spectrum {}",
            state.spectrum.ndim(),
            state.spectrum.title()
        ));
        ui.separator();
        match (&state.status_message, &state.model) {
            (Some(msg), _) => {
                ui.colored_label(Color32::from_rgb(200, 40, 40), msg);
            }
            (None, Some(model)) if model.selected == 0 => {
                ui.label(format!(
                    "No points above threshold {:.3e}",
                    model.threshold
                ));
            }
            (None, Some(model)) => {
                ui.label(format!(
                    "{} points above threshold {:.3e}",
                    model.selected, model.threshold
                ));
            }
            (None, None) => {}
        }
    });
}

// ---------------------------------------------------------------------------
// Left side panel – experiment info and threshold controls
// ---------------------------------------------------------------------------

pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            spectrum_info(ui, state);
            ui.separator();
            threshold_controls(ui, state);
            ui.separator();
            egui::CollapsingHeader::new(RichText::new("Histogram").strong())
                .default_open(false)
                .show(ui, |ui: &mut Ui| histogram_plot(ui, state));
            parameter_list(ui, state);
        });
}

fn spectrum_info(ui: &mut Ui, state: &AppState) {
    let spectrum = &state.spectrum;
    let stats = spectrum.stats();

    ui.heading("Spectrum");
    egui::Grid::new("spectrum_info")
        .num_columns(2)
        .striped(true)
        .show(ui, |ui: &mut Ui| {
            ui.label("Points");
            ui.label(format!("{:?}", spectrum.array().shape()));
            ui.end_row();

            for ((axis, size), (first, last)) in spectrum
                .experiment()
                .axes_with_size()
                .zip(spectrum.ppm_limits().iter().copied())
            {
                ui.label(RichText::new(&axis.label).strong());
                ui.label(format!(
                    "{size} pts, {first:.2} – {last:.2} ppm\nSW {:.1} Hz, {:.2} MHz",
                    axis.sw, axis.obs
                ));
                ui.end_row();
            }

            ui.label("Baseline");
            ui.label(format!("{:.3e}", spectrum.baseline()));
            ui.end_row();

            ui.label("Normalised");
            ui.label(if spectrum.is_normalized() { "yes" } else { "no" });
            ui.end_row();

            ui.label("Noise");
            ui.label(format!("{:.3e}", stats.noise));
            ui.end_row();

            ui.label("S/N");
            ui.label(format!("{:.3e}", stats.snr));
            ui.end_row();
        });
}

fn threshold_controls(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Threshold");

    let mut threshold = state.threshold;
    let mut contour = state.contour;
    let mut colormap = state.colormap;

    ui.horizontal(|ui: &mut Ui| {
        ui.label("Factor × noise");
        ui.add(
            egui::DragValue::new(&mut threshold.factor)
                .speed(0.01)
                .range(0.001..=1.0e6),
        );
    });

    egui::ComboBox::from_label("Sign")
        .selected_text(threshold.sign.to_string())
        .show_ui(ui, |ui: &mut Ui| {
            for sign in Sign::ALL {
                ui.selectable_value(&mut threshold.sign, sign, sign.to_string());
            }
        });

    if state.spectrum.ndim() == 2 {
        ui.add(egui::Slider::new(&mut contour.nlevs, 1..=100).text("Levels"));
        ui.horizontal(|ui: &mut Ui| {
            ui.label("Increment");
            ui.add(
                egui::DragValue::new(&mut contour.increment)
                    .speed(0.005)
                    .range(1.001..=5.0),
            );
        });

        egui::ComboBox::from_label("Colormap")
            .selected_text(colormap.name())
            .show_ui(ui, |ui: &mut Ui| {
                for cmap in Colormap::ALL {
                    ui.selectable_value(&mut colormap, cmap, cmap.name());
                }
            });
    }

    state.set_threshold(threshold);
    state.set_contour(contour);
    state.set_colormap(colormap);
}

fn parameter_list(ui: &mut Ui, state: &AppState) {
    let params = &state.spectrum.experiment().params;
    if params.is_empty() {
        return;
    }
    let title = RichText::new(format!("Parameters ({})", params.len())).strong();
    egui::CollapsingHeader::new(title)
        .default_open(false)
        .show(ui, |ui: &mut Ui| {
            egui::Grid::new("parameters")
                .num_columns(2)
                .striped(true)
                .show(ui, |ui: &mut Ui| {
                    for (key, value) in params {
                        ui.label(key);
                        ui.label(value.to_string());
                        ui.end_row();
                    }
                });
        });
}
