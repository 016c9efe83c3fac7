//! Data layer: core types, loading, queries and derived metrics.
//!
//! Architecture:
//! ```text
//!  .csv / .json / .parquet
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  parse file → drop aggregates → merge aliases → cutoff
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────────┐
//!   │ DatasetCache  │  one Arc<EmissionsTable> per (path, policy)
//!   └──────────────┘
//!        │
//!        ▼
//!   ┌─────────────┐
//!   │ QueryEngine  │  memoised filter / top-N / reductions
//!   └─────────────┘
//!        │
//!        ▼
//!   query + metrics  pure functions over &EmissionsTable
//! ```

pub mod cache;
pub mod engine;
pub mod error;
pub mod loader;
pub mod metrics;
pub mod model;
pub mod query;

pub use cache::DatasetCache;
pub use engine::QueryEngine;
pub use error::DataLoadError;
pub use loader::LoaderConfig;
pub use model::{EmissionsRecord, EmissionsTable, Source};
