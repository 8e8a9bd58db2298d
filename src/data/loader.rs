use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{Array, Float32Array, Float64Array, LargeListArray, ListArray};
use arrow::datatypes::DataType;
use log::{debug, info};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::Deserialize;

use super::model::{AxisParams, Experiment, ParamValue, SpectralArray};

/// File names tried, in order, inside `<expno>/pdata/<n>/`.
pub const SPECTRUM_FILES: [&str; 3] = ["spectrum.json", "spectrum.parquet", "spectrum.csv"];

/// Parquet column holding one row of intensities per record.
pub const INTENSITY_COLUMN: &str = "intensity";
/// Parquet schema metadata key holding the axis parameters as JSON.
pub const AXES_METADATA_KEY: &str = "axes";
/// Parquet schema metadata key holding the experiment title.
pub const TITLE_METADATA_KEY: &str = "title";

// ---------------------------------------------------------------------------
// Adapter interface
// ---------------------------------------------------------------------------

/// Anything able to produce a processed spectrum and its parameters.
pub trait SpectrumSource {
    fn load(&self) -> Result<Experiment>;
}

/// A Bruker-style experiment folder: `<expno_path>/pdata/<pdata>/`.
#[derive(Debug, Clone)]
pub struct ExperimentDir {
    pub expno_path: PathBuf,
    pub pdata: u32,
}

impl ExperimentDir {
    pub fn new(expno_path: impl Into<PathBuf>, pdata: u32) -> Self {
        Self {
            expno_path: expno_path.into(),
            pdata,
        }
    }

    pub fn pdata_path(&self) -> PathBuf {
        self.expno_path.join("pdata").join(self.pdata.to_string())
    }

    /// The first spectrum export present in the processing folder.
    pub fn resolve(&self) -> Result<PathBuf> {
        let pdata_path = self.pdata_path();
        if !pdata_path.is_dir() {
            bail!("processing folder {} does not exist", pdata_path.display());
        }
        SPECTRUM_FILES
            .iter()
            .map(|name| pdata_path.join(name))
            .find(|p| p.is_file())
            .with_context(|| {
                format!(
                    "no spectrum found in {} (looked for {})",
                    pdata_path.display(),
                    SPECTRUM_FILES.join(", ")
                )
            })
    }

    /// Fallback title: the experiment folder name, e.g. `my_sample/10`.
    fn default_title(&self) -> String {
        let expno = file_name(&self.expno_path);
        match self.expno_path.parent().map(file_name) {
            Some(name) if !name.is_empty() => format!("{name}/{expno}"),
            _ => expno,
        }
    }
}

impl SpectrumSource for ExperimentDir {
    fn load(&self) -> Result<Experiment> {
        let path = self.resolve()?;
        info!("reading {}", path.display());
        let mut experiment = load_file(&path)?;
        if experiment.title.is_empty() {
            experiment.title = self.default_title();
        }
        Ok(experiment)
    }
}

/// A single exported spectrum file.
#[derive(Debug, Clone)]
pub struct SpectrumFile {
    pub path: PathBuf,
}

impl SpectrumSource for SpectrumFile {
    fn load(&self) -> Result<Experiment> {
        let mut experiment = load_file(&self.path)?;
        if experiment.title.is_empty() {
            experiment.title = self
                .path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
        }
        Ok(experiment)
    }
}

/// Pick the source matching `path`: a folder is an experiment, anything else a file.
pub fn source_for(path: &Path, pdata: u32) -> Box<dyn SpectrumSource> {
    if path.is_dir() {
        Box::new(ExperimentDir::new(path, pdata))
    } else {
        Box::new(SpectrumFile {
            path: path.to_path_buf(),
        })
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load an exported spectrum.  Dispatch by extension.
///
/// Supported formats:
/// * `.json`    – axes, data and parameters in one document
/// * `.parquet` – one `intensity` list per array row, axes in schema metadata
/// * `.csv`     – headerless intensity matrix plus a `<stem>.axes.json` sidecar
pub fn load_file(path: &Path) -> Result<Experiment> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let experiment = match ext.as_str() {
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        "csv" => load_csv(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
    .with_context(|| format!("loading {}", path.display()))?;

    debug!(
        "{}: shape {:?}, {} parameters",
        path.display(),
        experiment.array.shape(),
        experiment.params.len()
    );
    Ok(experiment)
}

/// Check the parts of the parameter dictionary the plot depends on.
fn validate(axes: &[AxisParams], array: &SpectralArray) -> Result<()> {
    if axes.len() != array.ndim() {
        bail!(
            "{} axes described for a {}D spectrum",
            axes.len(),
            array.ndim()
        );
    }
    for (i, axis) in axes.iter().enumerate() {
        if !(axis.obs.is_finite() && axis.obs > 0.0) {
            bail!("axis {i} ({}): observe frequency must be positive", axis.label);
        }
        if !(axis.sw.is_finite() && axis.sw > 0.0) {
            bail!("axis {i} ({}): spectral width must be positive", axis.label);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Intensities as written in JSON: a flat list (1D) or a list of rows (2D).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonData {
    OneD(Vec<f64>),
    TwoD(Vec<Vec<f64>>),
}

/// Expected JSON schema:
///
/// ```json
/// {
///   "title": "hsqc 10",
///   "axes": [
///     { "label": "13C", "sw": 24144.9, "obs": 150.9, "car": 11318.0 },
///     { "label": "1H",  "sw": 9615.4,  "obs": 600.1, "car": 2822.1 }
///   ],
///   "data": [[0.1, 0.2, ...], ...],
///   "params": { "pulprog": "hsqcetgpsi", "ns": 8 }
/// }
/// ```
#[derive(Debug, Deserialize)]
struct JsonExperiment {
    #[serde(default)]
    title: String,
    axes: Vec<AxisParams>,
    data: JsonData,
    #[serde(default)]
    params: BTreeMap<String, ParamValue>,
}

fn load_json(path: &Path) -> Result<Experiment> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let doc: JsonExperiment = serde_json::from_str(&text).context("parsing JSON")?;

    let array = match doc.data {
        JsonData::OneD(values) => SpectralArray::new(vec![values.len()], values)?,
        JsonData::TwoD(rows) => SpectralArray::from_rows(rows)?,
    };
    validate(&doc.axes, &array)?;

    Ok(Experiment {
        title: doc.title,
        axes: doc.axes,
        array,
        params: doc.params,
    })
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// Sidecar holding the axes of a CSV export: `spectrum.csv` → `spectrum.axes.json`.
pub fn csv_axes_path(path: &Path) -> PathBuf {
    path.with_extension("axes.json")
}

/// CSV layout: no header, one record per array row, one field per point.
/// A single record is a 1D spectrum.
fn load_csv(path: &Path) -> Result<Experiment> {
    let axes_path = csv_axes_path(path);
    let axes_text = std::fs::read_to_string(&axes_path)
        .with_context(|| format!("reading axis parameters from {}", axes_path.display()))?;
    let axes: Vec<AxisParams> =
        serde_json::from_str(&axes_text).context("parsing axis parameters")?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_path(path)
        .context("opening CSV")?;

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let row = record
            .iter()
            .enumerate()
            .map(|(j, tok)| {
                tok.parse::<f64>()
                    .with_context(|| format!("Row {row_no}, column {j}: '{tok}' is not a number"))
            })
            .collect::<Result<Vec<f64>>>()?;
        rows.push(row);
    }

    let array = if rows.len() == 1 && axes.len() == 1 {
        let values = rows.remove(0);
        SpectralArray::new(vec![values.len()], values)?
    } else {
        SpectralArray::from_rows(rows)?
    };
    validate(&axes, &array)?;

    Ok(Experiment {
        title: String::new(),
        axes,
        array,
        params: BTreeMap::new(),
    })
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet export.
///
/// Expected layout:
/// - `intensity`: List<Float64|Float32> or LargeList, one record per array row
/// - schema metadata `axes`: JSON array of axis parameters
/// - schema metadata `title` (optional)
///
/// A file with a single record and a single axis is a 1D spectrum.
fn load_parquet(path: &Path) -> Result<Experiment> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;

    let metadata: HashMap<String, String> = builder.schema().metadata().clone();
    let axes_json = metadata
        .get(AXES_METADATA_KEY)
        .with_context(|| format!("Parquet schema has no '{AXES_METADATA_KEY}' metadata"))?;
    let axes: Vec<AxisParams> =
        serde_json::from_str(axes_json).context("parsing axis parameters")?;
    let title = metadata.get(TITLE_METADATA_KEY).cloned().unwrap_or_default();

    let reader = builder.build().context("building parquet reader")?;

    let mut rows = Vec::new();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let idx = batch
            .schema()
            .index_of(INTENSITY_COLUMN)
            .map_err(|_| anyhow::anyhow!("Parquet file missing '{INTENSITY_COLUMN}' column"))?;
        let column = batch.column(idx);
        for row in 0..batch.num_rows() {
            let row_no = rows.len();
            let values = extract_f64_list(column, row)
                .with_context(|| format!("Row {row_no}: failed to read '{INTENSITY_COLUMN}'"))?;
            rows.push(values);
        }
    }

    let array = if rows.len() == 1 && axes.len() == 1 {
        let values = rows.remove(0);
        SpectralArray::new(vec![values.len()], values)?
    } else {
        SpectralArray::from_rows(rows)?
    };
    validate(&axes, &array)?;

    Ok(Experiment {
        title,
        axes,
        array,
        params: BTreeMap::new(),
    })
}

// -- Parquet / Arrow helpers --

/// Extract a `Vec<f64>` from a List or LargeList column at the given row.
fn extract_f64_list(col: &Arc<dyn Array>, row: usize) -> Result<Vec<f64>> {
    if col.is_null(row) {
        bail!("null value in list column");
    }

    let values_array = match col.data_type() {
        DataType::List(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<ListArray>()
                .context("expected ListArray")?;
            list_arr.value(row)
        }
        DataType::LargeList(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<LargeListArray>()
                .context("expected LargeListArray")?;
            list_arr.value(row)
        }
        other => bail!("Expected List or LargeList column, got {other:?}"),
    };

    let missing = |j: usize| anyhow::anyhow!("column {j}: missing intensity");
    if let Some(f64_arr) = values_array.as_any().downcast_ref::<Float64Array>() {
        f64_arr
            .iter()
            .enumerate()
            .map(|(j, v)| v.ok_or_else(|| missing(j)))
            .collect()
    } else if let Some(f32_arr) = values_array.as_any().downcast_ref::<Float32Array>() {
        f32_arr
            .iter()
            .enumerate()
            .map(|(j, v)| v.map(f64::from).ok_or_else(|| missing(j)))
            .collect()
    } else {
        bail!(
            "List inner type is {:?}, expected Float64 or Float32",
            values_array.data_type()
        )
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Float64Builder, ListBuilder};
    use arrow::datatypes::{Field, Schema};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;

    use crate::data::model::ArrayError;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join(format!("nmrplot-loader-{}-{name}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    const AXES_2D: &str = r#"[
        {"label": "13C", "sw": 3000.0, "obs": 150.0, "car": 9000.0},
        {"label": "1H", "sw": 6000.0, "obs": 600.0, "car": 2820.0}
    ]"#;

    #[test]
    fn test_json_1d() {
        let dir = scratch_dir("json1d");
        let path = dir.join("proton.json");
        std::fs::write(
            &path,
            r#"{"axes": [{"label": "1H", "sw": 6000.0, "obs": 600.0, "car": 2820.0}],
                "data": [0.0, 1.5, -2.0, 0.25],
                "params": {"ns": 16}}"#,
        )
        .unwrap();

        let experiment = SpectrumFile { path }.load().unwrap();
        assert_eq!(experiment.title, "proton");
        assert_eq!(experiment.array.shape(), &[4]);
        assert_eq!(experiment.array.values()[2], -2.0);
        assert_eq!(experiment.params["ns"], ParamValue::Integer(16));
    }

    #[test]
    fn test_json_axes_must_match_dimensions() {
        let dir = scratch_dir("json-axes");
        let path = dir.join("bad.json");
        std::fs::write(
            &path,
            format!(r#"{{"axes": {AXES_2D}, "data": [1.0, 2.0]}}"#),
        )
        .unwrap();
        let err = load_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("2 axes described for a 1D spectrum"));
    }

    #[test]
    fn test_csv_with_sidecar() {
        let dir = scratch_dir("csv");
        let path = dir.join("spectrum.csv");
        std::fs::write(&path, "1.0, 2.0, 3.0\n4.0, 5.0, 6.0\n").unwrap();
        std::fs::write(csv_axes_path(&path), AXES_2D).unwrap();

        let experiment = load_file(&path).unwrap();
        assert_eq!(experiment.array.shape(), &[2, 3]);
        assert_eq!(experiment.array.values()[5], 6.0);
        assert_eq!(experiment.axes[1].label, "1H");
    }

    #[test]
    fn test_csv_without_sidecar_fails() {
        let dir = scratch_dir("csv-nosidecar");
        let path = dir.join("spectrum.csv");
        std::fs::write(&path, "1.0,2.0\n").unwrap();
        let err = load_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("axis parameters"));
    }

    #[test]
    fn test_csv_rejects_non_finite_intensity() {
        let dir = scratch_dir("csv-nan");
        let path = dir.join("spectrum.csv");
        std::fs::write(&path, "1.0, 2.0, 3.0\n4.0, nan, 6.0\n").unwrap();
        std::fs::write(csv_axes_path(&path), AXES_2D).unwrap();

        let err = load_file(&path).unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("row 1, column 1"), "{message}");
        assert!(
            err.chain()
                .any(|cause| cause.downcast_ref::<ArrayError>().is_some()),
            "{message}"
        );
    }

    #[test]
    fn test_parquet_null_intensity_fails() {
        let dir = scratch_dir("parquet-null");
        let path = dir.join("spectrum.parquet");

        let mut builder = ListBuilder::new(Float64Builder::new());
        builder.values().append_value(1.0);
        builder.values().append_null();
        builder.append(true);
        let column = builder.finish();
        let metadata = HashMap::from([(
            AXES_METADATA_KEY.to_string(),
            r#"[{"label": "1H", "sw": 6000.0, "obs": 600.0, "car": 2820.0}]"#.to_string(),
        )]);
        let schema = Arc::new(
            Schema::new(vec![Field::new(
                INTENSITY_COLUMN,
                DataType::List(Arc::new(Field::new("item", DataType::Float64, true))),
                false,
            )])
            .with_metadata(metadata),
        );
        let batch = RecordBatch::try_new(schema.clone(), vec![Arc::new(column)]).unwrap();
        let file = std::fs::File::create(&path).unwrap();
        let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let err = load_file(&path).unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("Row 0"), "{message}");
        assert!(message.contains("column 1: missing intensity"), "{message}");
    }

    #[test]
    fn test_experiment_dir_parquet() {
        let dir = scratch_dir("expdir");
        let expno = dir.join("sample").join("10");
        let pdata = expno.join("pdata").join("1");
        std::fs::create_dir_all(&pdata).unwrap();

        let mut builder = ListBuilder::new(Float64Builder::new());
        for row in [[0.5, -1.0, 2.0], [3.0, 0.0, -4.5]] {
            builder.values().append_slice(&row);
            builder.append(true);
        }
        let column = builder.finish();
        let metadata = HashMap::from([(AXES_METADATA_KEY.to_string(), AXES_2D.to_string())]);
        let schema = Arc::new(
            Schema::new(vec![Field::new(
                INTENSITY_COLUMN,
                DataType::List(Arc::new(Field::new("item", DataType::Float64, true))),
                false,
            )])
            .with_metadata(metadata),
        );
        let batch = RecordBatch::try_new(schema.clone(), vec![Arc::new(column)]).unwrap();
        let file = std::fs::File::create(pdata.join("spectrum.parquet")).unwrap();
        let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let experiment = source_for(&expno, 1).load().unwrap();
        assert_eq!(experiment.title, "sample/10");
        assert_eq!(experiment.array.shape(), &[2, 3]);
        assert_eq!(experiment.array.values()[5], -4.5);
        assert_eq!(experiment.axes[0].label, "13C");
    }

    #[test]
    fn test_missing_pdata() {
        let dir = scratch_dir("nopdata");
        let err = ExperimentDir::new(&dir, 3).load().unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_unsupported_extension() {
        let err = load_file(Path::new("spectrum.fid")).unwrap_err();
        assert!(format!("{err:#}").contains("Unsupported file extension: .fid"));
    }
}
