//! `crosstab-model` defines the core in-memory survey analytics data
//! structures.
//!
//! The crate is intentionally self-contained so it can be reused by:
//! - the aggregation engine (cohort resolution, tallies, significance)
//! - the ingestion/inference layer that assembles datasets from uploads
//! - Tauri/IPC and WASM boundaries via `serde` (JSON-safe schema)

mod cohort;
mod dataset;
pub mod key;
mod question;
mod series;
mod value;

pub use cohort::{
    CohortSpec, ComparisonSet, ProductBucket, SegmentDef, SegmentMode, SortOrder,
};
pub use dataset::{Dataset, DatasetError};
pub use key::{derive_key, derive_key_or, UniqueKeySet};
pub use question::{
    GatePolarity, OptionColumn, QuestionDef, QuestionKind, QuestionLevel, SentimentGate,
};
pub use series::{GroupMeta, SeriesPoint, SeriesTable, Significance};
pub use value::{clean_label, RawValue};
