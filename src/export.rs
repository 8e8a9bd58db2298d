use std::path::Path;

use anyhow::{bail, Context, Result};
use image::{Rgb, RgbImage};
use log::info;

use crate::render::{PlotData, PlotModel, Trace};

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const TRACE: Rgb<u8> = Rgb([31, 119, 180]);
const GUIDE: Rgb<u8> = Rgb([200, 200, 200]);

/// Map a ppm interval onto `0..pixels`, highest ppm at pixel 0.
#[derive(Debug, Clone, Copy)]
struct PpmAxis {
    high: f64,
    low: f64,
    pixels: u32,
}

impl PpmAxis {
    fn new((a, b): (f64, f64), pixels: u32) -> Self {
        Self {
            high: a.max(b),
            low: a.min(b),
            pixels,
        }
    }

    fn pixel(&self, ppm: f64) -> Option<u32> {
        let span = self.high - self.low;
        let frac = if span > 0.0 {
            (self.high - ppm) / span
        } else {
            0.5
        };
        if !(0.0..=1.0).contains(&frac) {
            return None;
        }
        Some(((frac * (self.pixels - 1) as f64).round() as u32).min(self.pixels - 1))
    }
}

/// Rasterise `model` into a `width` x `height` image.
///
/// Axes follow the NMR convention: ppm decreases to the right and, for 2D
/// spectra, increases downwards.
pub fn rasterize(model: &PlotModel, width: u32, height: u32) -> Result<RgbImage> {
    if width < 2 || height < 2 {
        bail!("image size {width}x{height} is too small");
    }
    let mut img = RgbImage::from_pixel(width, height, BACKGROUND);
    let x_axis = PpmAxis::new(model.x_range, width);

    match &model.data {
        PlotData::Line(trace) => draw_trace(&mut img, trace, x_axis, model.threshold),
        PlotData::Contours(bands) => {
            let Some(y_range) = model.y_range else {
                bail!("2D plot without a y range");
            };
            // Highest ppm at the bottom
            let y_axis = PpmAxis::new(y_range, height);
            for band in bands {
                let color = Rgb(band.color);
                for &[x, y] in &band.points {
                    if let (Some(px), Some(py)) = (x_axis.pixel(x), y_axis.pixel(y)) {
                        img.put_pixel(px, height - 1 - py, color);
                    }
                }
            }
        }
    }
    Ok(img)
}

fn draw_trace(img: &mut RgbImage, trace: &Trace, x_axis: PpmAxis, threshold: f64) {
    let height = img.height();
    let (lo, hi) = trace
        .intensity
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if lo > hi {
        return;
    }
    let y_axis = PpmAxis::new((hi, lo), height);

    for level in [threshold, -threshold] {
        if let Some(py) = y_axis.pixel(level) {
            for px in 0..img.width() {
                img.put_pixel(px, py, GUIDE);
            }
        }
    }

    let pixels: Vec<Option<(u32, u32)>> = trace
        .ppm
        .iter()
        .zip(&trace.intensity)
        .map(|(&x, &y)| Some((x_axis.pixel(x)?, y_axis.pixel(y)?)))
        .collect();
    for pair in pixels.windows(2) {
        if let [Some(a), Some(b)] = pair {
            draw_segment(img, *a, *b, TRACE);
        }
    }
    if let [Some((x, y))] = pixels.as_slice() {
        img.put_pixel(*x, *y, TRACE);
    }
}

fn draw_segment(img: &mut RgbImage, (x0, y0): (u32, u32), (x1, y1): (u32, u32), color: Rgb<u8>) {
    let dx = x1 as i64 - x0 as i64;
    let dy = y1 as i64 - y0 as i64;
    let steps = dx.abs().max(dy.abs()).max(1);
    for s in 0..=steps {
        let x = x0 as i64 + dx * s / steps;
        let y = y0 as i64 + dy * s / steps;
        img.put_pixel(x as u32, y as u32, color);
    }
}

/// Render `model` and save it as a PNG at `path`.
pub fn write_png(model: &PlotModel, path: &Path, (width, height): (u32, u32)) -> Result<()> {
    let img = rasterize(model, width, height)?;
    img.save(path)
        .with_context(|| format!("writing {}", path.display()))?;
    info!(
        "wrote {width}x{height} plot of '{}' to {}",
        model.title,
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Colormap;
    use crate::processing::ContourConfig;
    use crate::spectrum::tests::experiment_2d;
    use crate::spectrum::Spectrum;
    use crate::threshold::{Sign, ThresholdConfig};

    fn model_2d() -> PlotModel {
        let experiment = experiment_2d(8, 8, |r, c| if (r, c) == (0, 0) { 100.0 } else { 0.0 });
        let spectrum = Spectrum::new(experiment, false).unwrap();
        PlotModel::build(
            &spectrum,
            ThresholdConfig {
                factor: 0.1,
                sign: Sign::Positive,
            },
            ContourConfig::default(),
            Colormap::Grey,
        )
        .unwrap()
    }

    #[test]
    fn test_axis_pixels() {
        let axis = PpmAxis::new((10.0, 0.0), 11);
        assert_eq!(axis.pixel(10.0), Some(0));
        assert_eq!(axis.pixel(0.0), Some(10));
        assert_eq!(axis.pixel(5.0), Some(5));
        assert_eq!(axis.pixel(11.0), None);
    }

    #[test]
    fn test_2d_peak_position() {
        let img = rasterize(&model_2d(), 8, 8).unwrap();
        // Point (0, 0) has the highest ppm on both axes: left edge, bottom row.
        assert_ne!(*img.get_pixel(0, 7), BACKGROUND);
        let painted = img.pixels().filter(|p| **p != BACKGROUND).count();
        assert_eq!(painted, 1);
    }

    #[test]
    fn test_write_png() {
        let path = std::env::temp_dir().join(format!("nmrplot-export-{}.png", std::process::id()));
        write_png(&model_2d(), &path, (64, 32)).unwrap();
        let reread = image::open(&path).unwrap();
        assert_eq!((reread.width(), reread.height()), (64, 32));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_too_small() {
        assert!(rasterize(&model_2d(), 1, 10).is_err());
    }
}
