//! Combining standardized datasets into one master table.

mod combine;

pub use combine::{merge_datasets, MergeResult, SourceReport, DEFAULT_SOURCE_LABEL};
