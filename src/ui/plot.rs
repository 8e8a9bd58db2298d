use eframe::egui::{Color32, Ui};
use egui_plot::{Bar, BarChart, HLine, Line, MarkerShape, Plot, PlotPoints, Points, VLine};

use crate::render::PlotData;
use crate::state::AppState;
use crate::threshold::Sign;

// ---------------------------------------------------------------------------
// Spectral plot (central panel)
// ---------------------------------------------------------------------------

const TRACE_COLOR: Color32 = Color32::from_rgb(31, 119, 180);

/// Render the spectrum in the central panel.
///
/// ppm axes are drawn negated so that chemical shift decreases to the right
/// (and downwards for the indirect dimension); tick labels undo the sign.
pub fn spectral_plot(ui: &mut Ui, state: &AppState) {
    let model = match &state.model {
        Some(model) => model,
        None => {
            ui.centered_and_justified(|ui: &mut Ui| {
                ui.heading("Nothing to plot with the current settings");
            });
            return;
        }
    };

    let plot = Plot::new("spectral_plot")
        .x_axis_label(model.x_label.clone())
        .y_axis_label(model.y_label.clone())
        .x_axis_formatter(|mark, _range| format!("{:.2}", -mark.value))
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true);

    match &model.data {
        PlotData::Line(trace) => {
            let points: PlotPoints = trace
                .ppm
                .iter()
                .zip(trace.intensity.iter())
                .map(|(&x, &y)| [-x, y])
                .collect();
            let threshold = model.threshold;
            let sign = model.sign;

            plot.legend(egui_plot::Legend::default()).show(ui, |plot_ui| {
                plot_ui.line(
                    Line::new(points)
                        .name(&model.title)
                        .color(TRACE_COLOR)
                        .width(1.0),
                );
                let guide = Color32::from_gray(160);
                if sign != Sign::Negative {
                    plot_ui.hline(HLine::new(threshold).color(guide));
                }
                if sign != Sign::Positive {
                    plot_ui.hline(HLine::new(-threshold).color(guide));
                }
            });
        }
        PlotData::Contours(bands) => {
            plot.y_axis_formatter(|mark, _range| format!("{:.1}", -mark.value))
                .show(ui, |plot_ui| {
                    for band in bands {
                        let [r, g, b] = band.color;
                        let points: PlotPoints =
                            band.points.iter().map(|&[x, y]| [-x, -y]).collect();
                        plot_ui.points(
                            Points::new(points)
                                .color(Color32::from_rgb(r, g, b))
                                .shape(MarkerShape::Square)
                                .filled(true)
                                .radius(1.5),
                        );
                    }
                });
        }
    }
}

// ---------------------------------------------------------------------------
// Intensity histogram (side panel)
// ---------------------------------------------------------------------------

/// Bar chart of the intensity histogram with the baseline marked.
pub fn histogram_plot(ui: &mut Ui, state: &AppState) {
    let spectrum = &state.spectrum;
    let (counts, centers) = spectrum.histogram();
    let width = match centers {
        [a, b, ..] => b - a,
        _ => 1.0,
    };
    let bars: Vec<Bar> = counts
        .iter()
        .zip(centers)
        .map(|(&count, &center)| Bar::new(center, count as f64).width(width))
        .collect();

    Plot::new("intensity_histogram")
        .height(160.0)
        .x_axis_label("intensity")
        .y_axis_label("count")
        .allow_drag(false)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).color(TRACE_COLOR));
            plot_ui.vline(VLine::new(spectrum.baseline()).color(Color32::from_gray(160)));
        });
}
