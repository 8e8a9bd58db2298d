/// Data layer: core types, unit conversion and loading.
///
/// Architecture:
/// ```text
///  <expno>/pdata/<n>/spectrum.{json,parquet,csv}
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  SpectrumSource → Experiment
///   └──────────┘
///        │
///        ▼
///   ┌────────────┐
///   │ Experiment │  SpectralArray + AxisParams + parameter dictionary
///   └────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  units    │  point ↔ ppm per axis
///   └──────────┘
/// ```

pub mod loader;
pub mod model;
pub mod units;
