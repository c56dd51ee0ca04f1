#![forbid(unsafe_code)]
#![deny(unreachable_patterns)]

//! Pure survey-response aggregation: cohorts × answer options into
//! percentage (or mean-rank) series with pairwise chi-square significance.
//!
//! Every entry point is a pure, synchronous function of its inputs: the same
//! `(dataset, question, cohort spec, sort order, overrides)` always produces
//! the same [`SeriesTable`]. Callers memoize on [`series_cache_key`] and
//! re-invoke on every UI interaction, so the engine keeps to one pass over
//! the cohort rows per option and never holds state between calls.
//!
//! Malformed requests (missing columns, unknown options, empty cohorts) are
//! absorbed into well-formed, possibly empty output; the only hard errors
//! live at dataset construction in [`crosstab-model`](crosstab_model).

mod diag;
mod resolve;
mod series;
mod significance;
mod tally;

pub use series::{
    build_series, build_series_from_comparison_sets, build_series_from_product_buckets,
    series_cache_key,
};
pub use significance::CHI_SQUARE_CRITICAL_P05;

// Model types appear throughout this crate's API; re-export the crate so
// callers depend on one name.
pub use crosstab_model as model;
pub use crosstab_model::{
    CohortSpec, ComparisonSet, Dataset, GroupMeta, ProductBucket, QuestionDef, SegmentDef,
    SeriesPoint, SeriesTable, Significance, SortOrder,
};
