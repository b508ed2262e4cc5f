//! CIVET 2.1 output: `{region code}.{L|R}` columns.

use super::naming::Hemisphere;
use super::{
    canonical_roi_name, ensure_unique_subjects, subject_ids_as_text, DroppedColumn,
    StandardizeReport, Standardized,
};
use crate::data::Table;
use crate::error::{HarmonizeError, Result};
use log::{debug, info, warn};
use std::collections::HashMap;

/// Mapping from CIVET region codes to FreeSurfer (DKT) region names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoiLookup {
    names: HashMap<String, String>,
}

impl RoiLookup {
    /// Default name of the region-code column in a lookup table.
    pub const DEFAULT_CODE_COLUMN: &'static str = "CIVET";
    /// Default name of the FreeSurfer region-name column in a lookup table.
    pub const DEFAULT_NAME_COLUMN: &'static str = "Freesurfer";

    /// Build a lookup from `(code, region name)` pairs. Later duplicates are ignored.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut names = HashMap::new();
        for (code, name) in pairs {
            names.entry(code.into()).or_insert_with(|| name.into());
        }
        Self { names }
    }

    /// Build a lookup from a table with a code column and a region-name column.
    ///
    /// Rows with a missing code or name are skipped; the first row for a code wins.
    pub fn from_table(table: &Table, code_column: &str, name_column: &str) -> Result<Self> {
        let codes = table.column(code_column)?;
        let names = table.column(name_column)?;
        Ok(Self::from_pairs(
            codes
                .into_iter()
                .zip(names)
                .filter_map(|(c, n)| Some((c.key()?, n.key()?))),
        ))
    }

    /// FreeSurfer region name for a CIVET code.
    pub fn get(&self, code: &str) -> Option<&str> {
        self.names.get(code).map(String::as_str)
    }

    /// Number of mapped codes.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Check if the lookup is empty.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Standardize CIVET output.
///
/// Every column other than the subject-ID column must be named
/// `{region code}.{L|R}`. The region code is resolved through `lookup`; an
/// unmapped code aborts standardization with [`HarmonizeError::Mapping`].
/// CIVET subject IDs carry no site label and are kept as-is.
pub fn standardize_civet(
    raw: &Table,
    subject_id_column: &str,
    lookup: &RoiLookup,
) -> Result<Standardized> {
    raw.column_index(subject_id_column)?;

    let mut report = StandardizeReport {
        format: "civet".to_string(),
        ..Default::default()
    };
    let mut keep = vec![subject_id_column.to_string()];
    let mut renames = HashMap::new();

    for column in raw.columns() {
        if column == subject_id_column {
            continue;
        }
        let (code, hemi_token) =
            column
                .split_once('.')
                .ok_or_else(|| HarmonizeError::MalformedColumn {
                    column: column.clone(),
                    reason: "expected '{region code}.{hemisphere}'".to_string(),
                })?;
        let hemisphere =
            Hemisphere::from_canonical(hemi_token).ok_or_else(|| HarmonizeError::MalformedColumn {
                column: column.clone(),
                reason: format!("unknown hemisphere token '{}'", hemi_token),
            })?;
        let region = lookup.get(code).ok_or_else(|| HarmonizeError::Mapping {
            code: code.to_string(),
            column: column.clone(),
        })?;

        let canonical = match canonical_roi_name(hemisphere, region) {
            Ok(name) => name,
            Err(reason) => {
                warn!("civet: dropping column '{}' mapped to '{}' ({})", column, region, reason);
                report.dropped_columns.push(DroppedColumn {
                    column: column.clone(),
                    reason,
                });
                continue;
            }
        };
        debug!("civet: {} -> {}", column, canonical);
        keep.push(column.clone());
        renames.insert(column.clone(), canonical.clone());
        report.renamed.push((column.clone(), canonical));
    }

    let table = raw.select_columns(&keep)?.rename_columns(&renames)?;
    let table = subject_ids_as_text(&table, subject_id_column)?;
    ensure_unique_subjects(&table, subject_id_column)?;

    report.n_subjects = table.n_rows();
    info!(
        "civet: standardized {} subjects, {} ROI columns",
        report.n_subjects,
        report.renamed.len()
    );
    Ok(Standardized { table, report })
}
