//! QC-label based subject filtering.

use super::criteria::QcCriterion;
use crate::data::Table;
use crate::error::Result;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Statistics of the QC stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QcStageReport {
    /// QC column the criterion was evaluated on.
    pub column: String,
    /// Subjects in the QC table with an accepted value.
    pub n_accepted: usize,
    /// Distinct subjects in the data before filtering.
    pub n_subjects_before: usize,
    /// Distinct subjects in the data after filtering.
    pub n_subjects_after: usize,
    /// Rows before filtering.
    pub n_rows_before: usize,
    /// Rows after filtering.
    pub n_rows_after: usize,
}

/// Keep rows whose subject passes the QC criterion.
///
/// Subject IDs are compared numerically when they parse as numbers, so a
/// zero-padded `0051456` in the data matches `51456` in the QC table.
pub fn filter_qc(
    data: &Table,
    subject_id_column: &str,
    qc_table: &Table,
    criterion: &QcCriterion,
) -> Result<(Table, QcStageReport)> {
    let n_subjects_before = data.distinct_keys(subject_id_column)?.len();
    info!(
        "Filtering based on {}. Number of subjects before filtering: {}",
        criterion.column, n_subjects_before
    );

    let qc_values = qc_table.column(&criterion.column)?;
    let qc_subjects = qc_table.column(subject_id_column)?;
    let keep_subs: HashSet<String> = qc_subjects
        .into_iter()
        .zip(qc_values)
        .filter(|(_, qc)| criterion.accepts(qc))
        .filter_map(|(subject, _)| subject.numeric_key())
        .collect();

    let filtered = data.filter_by_column(subject_id_column, |v| {
        v.numeric_key().is_some_and(|k| keep_subs.contains(&k))
    })?;

    let report = QcStageReport {
        column: criterion.column.clone(),
        n_accepted: keep_subs.len(),
        n_subjects_before,
        n_subjects_after: filtered.distinct_keys(subject_id_column)?.len(),
        n_rows_before: data.n_rows(),
        n_rows_after: filtered.n_rows(),
    };
    info!("Resultant number of subjects: {}", report.n_subjects_after);
    Ok((filtered, report))
}
