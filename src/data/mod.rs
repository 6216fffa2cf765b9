/// Data layer: core types, windowing, loading, and writing.
///
/// Architecture:
/// ```text
///  .parquet / .json / .csv
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → TimeSeries / SeismicVolume
///   └──────────┘
///        │
///        ▼
///   ┌──────────────┐
///   │ SeismicVolume │  Vec<TimeSeries>, common dt and length
///   └──────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  window   │  horizon window, trace selection
///   └──────────┘
///        ⋮  (inversion)
///        ▼
///   ┌──────────┐
///   │  writer   │  InvertedVolume → .parquet / .json / .csv
///   └──────────┘
/// ```

pub mod loader;
pub mod model;
pub mod window;
pub mod writer;
