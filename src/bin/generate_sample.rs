use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Builder, ListBuilder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use nmrplot::data::loader::{AXES_METADATA_KEY, INTENSITY_COLUMN, TITLE_METADATA_KEY};
use nmrplot::AxisParams;

fn lorentzian(x: f64, x0: f64, hwhm: f64, amplitude: f64) -> f64 {
    amplitude * hwhm.powi(2) / ((x - x0).powi(2) + hwhm.powi(2))
}

fn gaussian(x: f64, mu: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// ppm of every point of an axis, matching the loader's unit conversion.
fn ppm_axis(axis: &AxisParams, size: usize) -> Vec<f64> {
    axis.converter(size).ppm_scale()
}

/// 1H spectrum of a small molecule: a few multiplets on a positive offset.
fn write_1d(dir: &Path, rng: &mut SimpleRng) -> Result<PathBuf> {
    let axis = AxisParams {
        label: "1H".into(),
        sw: 7211.54,
        obs: 600.13,
        car: 2820.61,
    };
    let size = 16384;
    let ppm = ppm_axis(&axis, size);

    // (centre ppm, hwhm ppm, amplitude)
    let peaks = [
        (7.26, 0.002, 120.0),
        (3.71, 0.003, 800.0),
        (3.69, 0.003, 780.0),
        (2.05, 0.002, 1500.0),
        (1.25, 0.004, 950.0),
        (0.88, 0.004, 600.0),
    ];
    let data: Vec<f64> = ppm
        .iter()
        .map(|&x| {
            let signal: f64 = peaks
                .iter()
                .map(|&(x0, w, a)| lorentzian(x, x0, w, a))
                .sum();
            100.0 + signal + rng.gauss(0.0, 0.8)
        })
        .collect();

    let doc = serde_json::json!({
        "title": "sample 1D proton",
        "axes": [axis],
        "data": data,
        "params": { "pulprog": "zg30", "ns": 16, "d1": 1.0, "solvent": "CDCl3" },
    });

    let pdata = dir.join("1d").join("pdata").join("1");
    std::fs::create_dir_all(&pdata).context("creating 1D pdata folder")?;
    let path = pdata.join("spectrum.json");
    std::fs::write(&path, doc.to_string()).context("writing 1D spectrum")?;
    Ok(path)
}

/// 1H-13C HSQC-like map with positive CH/CH3 and negative CH2 cross peaks.
fn write_2d(dir: &Path, rng: &mut SimpleRng) -> Result<PathBuf> {
    let axes = vec![
        AxisParams {
            label: "13C".into(),
            sw: 24_900.0,
            obs: 150.9,
            car: 11_318.0,
        },
        AxisParams {
            label: "1H".into(),
            sw: 7211.54,
            obs: 600.13,
            car: 2820.61,
        },
    ];
    let (rows, cols) = (256, 512);
    let c_ppm = ppm_axis(&axes[0], rows);
    let h_ppm = ppm_axis(&axes[1], cols);

    // (13C ppm, 1H ppm, amplitude)
    let peaks = [
        (128.5, 7.26, 40.0),
        (61.2, 3.70, -55.0),
        (21.0, 2.05, 90.0),
        (29.7, 1.25, -70.0),
        (14.1, 0.88, 60.0),
    ];

    let mut builder = ListBuilder::new(Float64Builder::new());
    for &c in &c_ppm {
        for &h in &h_ppm {
            let signal: f64 = peaks
                .iter()
                .map(|&(pc, ph, a)| gaussian(c, pc, 0.6, 1.0) * gaussian(h, ph, 0.02, a))
                .sum();
            builder.values().append_value(20.0 + signal + rng.gauss(0.0, 0.5));
        }
        builder.append(true);
    }
    let intensity = builder.finish();

    let metadata = HashMap::from([
        (
            AXES_METADATA_KEY.to_string(),
            serde_json::to_string(&axes).context("encoding axes")?,
        ),
        (TITLE_METADATA_KEY.to_string(), "sample 2D HSQC".to_string()),
    ]);
    let schema = Arc::new(
        Schema::new(vec![Field::new(
            INTENSITY_COLUMN,
            DataType::List(Arc::new(Field::new("item", DataType::Float64, true))),
            false,
        )])
        .with_metadata(metadata),
    );
    let batch = RecordBatch::try_new(schema.clone(), vec![Arc::new(intensity)])
        .context("building record batch")?;

    let pdata = dir.join("2d").join("pdata").join("1");
    std::fs::create_dir_all(&pdata).context("creating 2D pdata folder")?;
    let path = pdata.join("spectrum.parquet");
    let file = std::fs::File::create(&path).context("creating 2D spectrum file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(path)
}

fn main() -> Result<()> {
    let out_dir = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("sample_data"));
    let mut rng = SimpleRng::new(42);

    let one_d = write_1d(&out_dir, &mut rng)?;
    let two_d = write_2d(&out_dir, &mut rng)?;

    println!("Wrote {}", one_d.display());
    println!("Wrote {}", two_d.display());
    println!(
        "Try: nmrplot {} -s both -c coolwarm",
        out_dir.join("2d").display()
    );
    Ok(())
}
