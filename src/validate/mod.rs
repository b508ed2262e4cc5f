//! Pre-merge checks on standardized datasets.

mod check;

pub use check::{
    validate_dataset, MissingValueCaveat, MissingValuePolicy, ValidationIssue, ValidationReport,
};
