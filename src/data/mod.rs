/// Data layer: normalization engine, filtering, and aggregation.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  read raw rows → resolve columns → normalize
///   └──────────┘       (fields, numeric, geo)
///        │
///        ▼
///   ┌────────────────────┐
///   │ InstitutionDataset  │  Vec<NormalizedRecord>, distinct-value index
///   └────────────────────┘
///        │
///        ▼
///   ┌──────────┐      ┌──────────┐
///   │  filter   │ ───▶ │ cluster  │  criteria → subset → spatial clusters
///   └──────────┘      └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  export   │  rubric summary / filtered records as CSV
///   └──────────┘
/// ```
pub mod cluster;
pub mod export;
pub mod fields;
pub mod filter;
pub mod geo;
pub mod loader;
pub mod model;
pub mod numeric;
