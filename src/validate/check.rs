//! Column-set and missing-value checks.

use crate::data::{sorted_difference, Table};
use crate::error::{HarmonizeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// What to do with a dataset that contains missing values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingValuePolicy {
    /// Accept; the consumer removes incomplete rows.
    Drop,
    /// Accept unmodified.
    Ignore,
    /// Reject the dataset. Used for unspecified or unrecognized policies.
    #[default]
    Reject,
}

impl MissingValuePolicy {
    /// Parse a policy label; anything other than `drop` / `ignore` rejects.
    pub fn from_label(label: Option<&str>) -> Self {
        match label.map(str::trim) {
            Some("drop") => Self::Drop,
            Some("ignore") => Self::Ignore,
            _ => Self::Reject,
        }
    }
}

/// A reason a dataset is not allowed into the merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationIssue {
    /// Column set differs from the expected set.
    SchemaMismatch {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },
    /// Missing values present and the policy rejects them.
    MissingDataPolicyViolation { n_missing: usize },
}

impl ValidationIssue {
    /// Convert into the matching library error.
    pub fn to_error(&self) -> HarmonizeError {
        match self {
            Self::SchemaMismatch {
                missing,
                unexpected,
            } => HarmonizeError::SchemaMismatch {
                missing: missing.clone(),
                unexpected: unexpected.clone(),
            },
            Self::MissingDataPolicyViolation { n_missing } => {
                HarmonizeError::MissingDataPolicyViolation {
                    n_missing: *n_missing,
                }
            }
        }
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_error())
    }
}

/// Pass-with-caveat note for datasets accepted despite missing values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingValueCaveat {
    /// Consumer is expected to drop incomplete rows.
    RowsToDrop,
    /// Missing values kept as they are.
    Kept,
}

/// Outcome of validating one dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Everything that disqualifies the dataset.
    pub issues: Vec<ValidationIssue>,
    /// Number of missing cells.
    pub n_missing: usize,
    /// Set when the dataset passes with missing values.
    pub caveat: Option<MissingValueCaveat>,
}

impl ValidationReport {
    /// True when no issue disqualifies the dataset.
    pub fn passed(&self) -> bool {
        self.issues.is_empty()
    }

    /// `Ok(self)` if passed, else the first issue as an error.
    pub fn into_result(self) -> Result<Self> {
        match self.issues.first() {
            Some(issue) => Err(issue.to_error()),
            None => Ok(self),
        }
    }
}

/// Check a dataset against an expected column set and a missing-value policy.
///
/// The column set must equal `expected_columns` exactly. Missing values are
/// only considered when present: `Drop` passes with a caveat, `Ignore` passes,
/// `Reject` fails. The table is not modified.
pub fn validate_dataset<S: AsRef<str>>(
    table: &Table,
    expected_columns: &[S],
    policy: MissingValuePolicy,
) -> ValidationReport {
    let mut issues = Vec::new();

    let actual = table.column_set();
    let expected: HashSet<&str> = expected_columns.iter().map(|c| c.as_ref()).collect();
    if actual != expected {
        issues.push(ValidationIssue::SchemaMismatch {
            missing: sorted_difference(&expected, &actual),
            unexpected: sorted_difference(&actual, &expected),
        });
    }

    let n_missing = table.count_missing();
    let mut caveat = None;
    if n_missing > 0 {
        match policy {
            MissingValuePolicy::Drop => caveat = Some(MissingValueCaveat::RowsToDrop),
            MissingValuePolicy::Ignore => caveat = Some(MissingValueCaveat::Kept),
            MissingValuePolicy::Reject => {
                issues.push(ValidationIssue::MissingDataPolicyViolation { n_missing })
            }
        }
    }

    ValidationReport {
        issues,
        n_missing,
        caveat,
    }
}
