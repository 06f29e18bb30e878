/// Data layer: loading, caching, filtering and aggregation.
///
/// Architecture:
/// ```text
///  .parquet / .csv            .geojson
///        │                       │
///        ▼                       ▼
///   ┌──────────┐          ┌───────────┐
///   │  loader   │          │ boundary  │  features + code → name
///   └──────────┘          └───────────┘
///        │                       │
///        └──────► context ◄──────┘     loaded once, shared via Arc
///                   │
///                   ▼
///             ┌──────────┐
///             │  filter   │  FilterSelection → FilteredView (row indices)
///             └──────────┘
///                   │
///                   ▼
///             ┌───────────┐
///             │ aggregate │  grouped tonnage sums → chart series
///             └───────────┘
/// ```

pub mod aggregate;
pub mod boundary;
pub mod context;
pub mod error;
pub mod filter;
pub mod loader;
pub mod model;
