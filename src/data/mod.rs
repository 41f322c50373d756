/// Data layer: core table types, loading, and filter rules.
///
/// Architecture:
/// ```text
///  .csv / .tsv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader  │  parse file → Table (entity index × features)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  model   │  Value, Table, Series, Mask
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter  │  feature <op> value → Mask
///   └──────────┘
/// ```

pub mod filter;
pub mod loader;
pub mod model;
