//! Per-pipeline schema standardization.
//!
//! Each supported processing pipeline names its ROI columns and subject IDs
//! differently. A [`Standardizer`] maps one pipeline's raw output to the
//! canonical schema: a bare subject-ID column plus `{L|R}_{region}` columns.
//!
//! Supported formats:
//!
//! - **CIVET**: `{code}.{L|R}` columns, region codes resolved through a [`RoiLookup`]
//! - **ANTs**: `left <name>` / `right <name>` columns keyed by `Structure Name`
//! - **FreeSurfer 5.x**: `L_{region}_{measure}` / `R_{region}_{measure}` columns
//! - **FreeSurfer 6.0**: separate `lh` / `rh` tables joined on subject ID

pub mod ants;
pub mod civet;
pub mod freesurfer;
pub mod fs60;
pub mod naming;

pub use ants::{standardize_ants, STRUCTURE_NAME_COLUMN};
pub use civet::{standardize_civet, RoiLookup};
pub use freesurfer::standardize_freesurfer5;
pub use fs60::{standardize_freesurfer6, Fs60Atlas, AGGREGATE_COLUMNS};
pub use naming::{
    is_canonical_roi_column, roi_column, sanitize_region, strip_site_label, Hemisphere, SiteLabel,
    SplitFrom,
};

use crate::data::{Table, Value};
use crate::error::{HarmonizeError, Result};
use serde::{Deserialize, Serialize};

/// Raw pipeline output handed to a [`Standardizer`].
#[derive(Debug, Clone)]
pub enum RawInput {
    /// One table covering both hemispheres.
    Single(Table),
    /// Separate left- and right-hemisphere tables (FreeSurfer 6.0).
    Hemispheres { left: Table, right: Table },
}

/// Standardization routine for one source pipeline.
#[derive(Debug, Clone)]
pub enum Standardizer {
    /// CIVET output with a region-code lookup.
    Civet(RoiLookup),
    /// ANTs output.
    Ants,
    /// FreeSurfer 5.1 / 5.3 output.
    FreeSurfer5,
    /// FreeSurfer 6.0 output split by hemisphere.
    FreeSurfer6 { atlas: Fs60Atlas },
}

impl Standardizer {
    /// Short name of the pipeline format.
    pub fn format_name(&self) -> &'static str {
        match self {
            Self::Civet(_) => "civet",
            Self::Ants => "ants",
            Self::FreeSurfer5 => "freesurfer5",
            Self::FreeSurfer6 { .. } => "freesurfer6",
        }
    }

    /// Map raw pipeline output to the canonical schema.
    ///
    /// `site` tells which side of the separator holds the site label; CIVET
    /// subject IDs carry no site label and ignore it.
    pub fn standardize(
        &self,
        input: &RawInput,
        subject_id_column: &str,
        site: SiteLabel,
    ) -> Result<Standardized> {
        match (self, input) {
            (Self::Civet(lookup), RawInput::Single(raw)) => {
                standardize_civet(raw, subject_id_column, lookup)
            }
            (Self::Ants, RawInput::Single(raw)) => standardize_ants(raw, subject_id_column, site),
            (Self::FreeSurfer5, RawInput::Single(raw)) => {
                standardize_freesurfer5(raw, subject_id_column, site)
            }
            (Self::FreeSurfer6 { atlas }, RawInput::Hemispheres { left, right }) => {
                standardize_freesurfer6(left, right, subject_id_column, atlas, site)
            }
            (Self::FreeSurfer6 { .. }, RawInput::Single(_)) => Err(HarmonizeError::InvalidParameter(
                "freesurfer6 expects separate left and right hemisphere tables".to_string(),
            )),
            (_, RawInput::Hemispheres { .. }) => Err(HarmonizeError::InvalidParameter(format!(
                "{} expects a single table",
                self.format_name()
            ))),
        }
    }
}

/// Why a raw column was left out of the canonical schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Column carries no hemisphere token.
    NotHemispheric,
    /// Hemisphere token present but no region name follows it.
    EmptyRegion,
    /// FreeSurfer 6.0 column with a prefix other than `lh_` / `rh_`.
    UnrecognizedPrefix,
    /// Column present in both hemisphere tables; the right-hand copy is dropped.
    DuplicateAcrossHemispheres,
    /// Region name still has characters outside `[A-Za-z0-9_]` after sanitizing.
    NonCanonicalName,
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::NotHemispheric => "no hemisphere token",
            Self::EmptyRegion => "empty region name",
            Self::UnrecognizedPrefix => "unrecognized hemisphere prefix",
            Self::DuplicateAcrossHemispheres => "present in both hemisphere tables",
            Self::NonCanonicalName => "region name not representable as {L|R}_{region}",
        };
        f.write_str(text)
    }
}

/// A raw column excluded from the canonical schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedColumn {
    pub column: String,
    pub reason: DropReason,
}

/// Accounting of what a standardizer renamed and excluded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandardizeReport {
    /// Pipeline format name.
    pub format: String,
    /// `(raw name, canonical name)` pairs.
    pub renamed: Vec<(String, String)>,
    /// Columns left out of the canonical table.
    pub dropped_columns: Vec<DroppedColumn>,
    /// Columns passed through unmodified.
    pub passthrough_columns: Vec<String>,
    /// Subjects present in only one hemisphere table (FreeSurfer 6.0).
    pub unpaired_subjects: Vec<String>,
    /// Number of subjects in the canonical table.
    pub n_subjects: usize,
}

impl std::fmt::Display for StandardizeReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Standardization ({})", self.format)?;
        writeln!(f, "  Subjects:        {}", self.n_subjects)?;
        writeln!(f, "  Renamed columns: {}", self.renamed.len())?;
        writeln!(f, "  Dropped columns: {}", self.dropped_columns.len())?;
        for d in &self.dropped_columns {
            writeln!(f, "    {} ({})", d.column, d.reason)?;
        }
        if !self.passthrough_columns.is_empty() {
            writeln!(f, "  Passed through:  {}", self.passthrough_columns.join(", "))?;
        }
        if !self.unpaired_subjects.is_empty() {
            writeln!(f, "  Unpaired subjects dropped: {}", self.unpaired_subjects.len())?;
        }
        Ok(())
    }
}

/// A canonical table together with its standardization report.
#[derive(Debug, Clone)]
pub struct Standardized {
    pub table: Table,
    pub report: StandardizeReport,
}

/// Sanitized canonical column for `region`, or why it cannot have one.
pub(crate) fn canonical_roi_name(
    hemisphere: Hemisphere,
    region: &str,
) -> std::result::Result<String, DropReason> {
    if region.is_empty() {
        return Err(DropReason::EmptyRegion);
    }
    let name = roi_column(hemisphere, &sanitize_region(region));
    if is_canonical_roi_column(&name) {
        Ok(name)
    } else {
        Err(DropReason::NonCanonicalName)
    }
}

/// Rewrite subject IDs to bare text IDs with the site label removed.
pub(crate) fn normalize_subject_ids(
    table: &Table,
    subject_id_column: &str,
    separator: char,
    split: SplitFrom,
    site: SiteLabel,
) -> Result<Table> {
    table.map_column(subject_id_column, |v| match v.key() {
        Some(raw) => Value::Text(strip_site_label(&raw, separator, split, site).to_string()),
        None => Value::Missing,
    })
}

/// Rewrite subject IDs to text without stripping anything.
pub(crate) fn subject_ids_as_text(table: &Table, subject_id_column: &str) -> Result<Table> {
    table.map_column(subject_id_column, |v| match v.key() {
        Some(raw) => Value::Text(raw),
        None => Value::Missing,
    })
}

/// Fail if any subject ID occurs more than once.
pub(crate) fn ensure_unique_subjects(table: &Table, subject_id_column: &str) -> Result<()> {
    match table.duplicate_keys(subject_id_column)?.into_iter().next() {
        Some(subject) => Err(HarmonizeError::DuplicateSubject {
            subject,
            column: subject_id_column.to_string(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(columns: &[&str], rows: Vec<Vec<Value>>) -> RawInput {
        let columns = columns.iter().map(|s| s.to_string()).collect();
        RawInput::Single(Table::new(columns, rows).unwrap())
    }

    #[test]
    fn test_dispatch_by_variant() {
        let raw = single(
            &["SubjID", "L_bankssts_thickavg", "R_bankssts_thickavg"],
            vec![vec!["SUB01_SITE1".into(), 2.5.into(), 2.6.into()]],
        );
        let out = Standardizer::FreeSurfer5
            .standardize(&raw, "SubjID", SiteLabel::Suffix)
            .unwrap();
        assert_eq!(out.table.columns(), &["SubjID", "L_bankssts", "R_bankssts"]);
        assert_eq!(out.report.format, "freesurfer5");
    }

    #[test]
    fn test_input_shape_mismatch() {
        let raw = single(&["SubjID"], vec![]);
        let result = Standardizer::FreeSurfer6 {
            atlas: Fs60Atlas::Aparc,
        }
        .standardize(&raw, "SubjID", SiteLabel::Suffix);
        assert!(matches!(result, Err(HarmonizeError::InvalidParameter(_))));

        let table = Table::empty(vec!["SubjID".to_string()]).unwrap();
        let pair = RawInput::Hemispheres {
            left: table.clone(),
            right: table,
        };
        let result = Standardizer::Ants.standardize(&pair, "SubjID", SiteLabel::Suffix);
        assert!(matches!(result, Err(HarmonizeError::InvalidParameter(_))));
    }

    #[test]
    fn test_unique_subjects_enforced() {
        let table = Table::new(
            vec!["SubjID".to_string()],
            vec![vec!["S1".into()], vec!["S1".into()]],
        )
        .unwrap();
        assert!(matches!(
            ensure_unique_subjects(&table, "SubjID"),
            Err(HarmonizeError::DuplicateSubject { subject, .. }) if subject == "S1"
        ));
    }
}
