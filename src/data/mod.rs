/// Data layer: core types, loading, sanitizing and filtering.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader  │  parse file → Dataset, check required columns
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ sanitize │  negative indicator values → missing
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter  │  level + selected units → row indices
///   └──────────┘
/// ```

pub mod filter;
pub mod loader;
pub mod model;
pub mod sanitize;
