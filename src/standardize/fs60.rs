//! FreeSurfer 6.0 output exported per hemisphere (`aparcstats2table` style).

use super::naming::{
    is_canonical_roi_column, roi_column, sanitize_region, Hemisphere, SiteLabel, SplitFrom,
};
use super::{
    ensure_unique_subjects, normalize_subject_ids, DropReason, DroppedColumn, StandardizeReport,
    Standardized,
};
use crate::data::Table;
use crate::error::{HarmonizeError, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Whole-brain aggregate columns passed through without renaming.
pub const AGGREGATE_COLUMNS: &[&str] = &[
    "lh_MeanThickness_thickness",
    "rh_MeanThickness_thickness",
    "lh_temporalpole_thickness",
    "rh_temporalpole_thickness",
];

/// Parcellation the FreeSurfer 6.0 tables were exported with.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Fs60Atlas {
    /// Desikan-Killiany `aparc`; canonical names carry the hemisphere prefix.
    #[default]
    Aparc,
    /// `aparc.Glasseratlas`; region names already encode the side, so the
    /// hemisphere prefix is not added.
    Glasser,
    /// Any other parcellation name; treated like `aparc`.
    Other(String),
}

impl Fs60Atlas {
    /// Parcellation name as it appears in the subject-ID column header.
    pub fn parcellation(&self) -> &str {
        match self {
            Self::Aparc => "aparc",
            Self::Glasser => "aparc.Glasseratlas",
            Self::Other(name) => name,
        }
    }

    /// Subject-ID column header of a hemisphere table, e.g. `lh.aparc.thickness`.
    pub fn subject_column(&self, hemisphere: Hemisphere) -> String {
        let token = match hemisphere {
            Hemisphere::Left => "lh",
            Hemisphere::Right => "rh",
        };
        format!("{}.{}.thickness", token, self.parcellation())
    }

    fn keeps_hemisphere_prefix(&self) -> bool {
        !matches!(self, Self::Glasser)
    }
}

/// Canonical name for one FreeSurfer 6.0 column, or why it has none.
fn canonical_name(column: &str, atlas: &Fs60Atlas) -> std::result::Result<String, DropReason> {
    let (hemi_token, rest) = column.split_once('_').unwrap_or((column, ""));
    let hemisphere =
        Hemisphere::from_freesurfer(hemi_token).ok_or(DropReason::UnrecognizedPrefix)?;
    // strip the measurement suffix (`_thickness`)
    let region = rest.rsplit_once('_').map_or(rest, |(head, _)| head);
    if region.is_empty() {
        return Err(DropReason::EmptyRegion);
    }
    let name = if atlas.keeps_hemisphere_prefix() {
        roi_column(hemisphere, region)
    } else {
        region.to_string()
    };
    let name = sanitize_region(&name);
    if is_canonical_roi_column(&name) {
        Ok(name)
    } else {
        Err(DropReason::NonCanonicalName)
    }
}

/// Standardize FreeSurfer 6.0 output given as separate hemisphere tables.
///
/// The `lh.{parcellation}.thickness` / `rh.{parcellation}.thickness` columns
/// become `subject_id_column` and the two tables are inner-joined on it;
/// subjects present on one side only are dropped and listed in the report.
/// Columns with a prefix other than `lh_` / `rh_` are excluded with an
/// unrecognized-prefix warning. Subject IDs are split once at the first `-`.
pub fn standardize_freesurfer6(
    left: &Table,
    right: &Table,
    subject_id_column: &str,
    atlas: &Fs60Atlas,
    site: SiteLabel,
) -> Result<Standardized> {
    let mut report = StandardizeReport {
        format: "freesurfer6".to_string(),
        ..Default::default()
    };

    let left = rename_subject_column(left, &atlas.subject_column(Hemisphere::Left), subject_id_column)?;
    let right =
        rename_subject_column(right, &atlas.subject_column(Hemisphere::Right), subject_id_column)?;

    // Non-key columns exported into both tables (e.g. eTIV) keep the left copy.
    let left_columns = left.column_set();
    let mut right_keep = Vec::new();
    for column in right.columns() {
        if column != subject_id_column && left_columns.contains(column.as_str()) {
            warn!("freesurfer6: column '{}' present in both hemisphere tables", column);
            report.dropped_columns.push(DroppedColumn {
                column: column.clone(),
                reason: DropReason::DuplicateAcrossHemispheres,
            });
        } else {
            right_keep.push(column.clone());
        }
    }
    let right = right.select_columns(&right_keep)?;

    report.unpaired_subjects = unpaired_subjects(&left, &right, subject_id_column)?;
    if !report.unpaired_subjects.is_empty() {
        warn!(
            "freesurfer6: dropping {} subjects present in only one hemisphere: {:?}",
            report.unpaired_subjects.len(),
            report.unpaired_subjects
        );
    }
    let joined = left.inner_join(&right, subject_id_column)?;
    info!("freesurfer6: joined hemispheres, {} subjects", joined.n_rows());

    let mut keep = Vec::new();
    let mut renames = HashMap::new();
    for column in joined.columns() {
        if column == subject_id_column {
            keep.push(column.clone());
            continue;
        }
        if AGGREGATE_COLUMNS.contains(&column.as_str()) {
            keep.push(column.clone());
            report.passthrough_columns.push(column.clone());
            continue;
        }
        match canonical_name(column, atlas) {
            Ok(canonical) => {
                keep.push(column.clone());
                renames.insert(column.clone(), canonical.clone());
                report.renamed.push((column.clone(), canonical));
            }
            Err(reason) => {
                if reason == DropReason::UnrecognizedPrefix {
                    warn!(
                        "freesurfer6: {}",
                        HarmonizeError::UnrecognizedPrefix(column.clone())
                    );
                }
                report.dropped_columns.push(DroppedColumn {
                    column: column.clone(),
                    reason,
                });
            }
        }
    }

    let table = joined.select_columns(&keep)?.rename_columns(&renames)?;
    let table = normalize_subject_ids(&table, subject_id_column, '-', SplitFrom::Left, site)?;
    ensure_unique_subjects(&table, subject_id_column)?;

    report.n_subjects = table.n_rows();
    Ok(Standardized { table, report })
}

fn rename_subject_column(table: &Table, from: &str, to: &str) -> Result<Table> {
    table.column_index(from)?;
    table.rename_columns(&HashMap::from([(from.to_string(), to.to_string())]))
}

fn unpaired_subjects(left: &Table, right: &Table, subject_id_column: &str) -> Result<Vec<String>> {
    let left_ids = left.distinct_keys(subject_id_column)?;
    let right_ids = right.distinct_keys(subject_id_column)?;
    let left_set: HashSet<&String> = left_ids.iter().collect();
    let right_set: HashSet<&String> = right_ids.iter().collect();
    Ok(left_ids
        .iter()
        .filter(|id| !right_set.contains(id))
        .chain(right_ids.iter().filter(|id| !left_set.contains(id)))
        .cloned()
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Value;
    use crate::standardize::is_canonical_roi_column;

    fn hemi_table(columns: &[&str], rows: Vec<Vec<Value>>) -> Table {
        Table::new(columns.iter().map(|s| s.to_string()).collect(), rows).unwrap()
    }

    fn lh() -> Table {
        hemi_table(
            &[
                "lh.aparc.thickness",
                "lh_bankssts_thickness",
                "lh_G&S_frontomargin_thickness",
                "lh_MeanThickness_thickness",
            ],
            vec![
                vec!["A-SITE1".into(), 2.1.into(), 2.2.into(), 2.4.into()],
                vec!["B-SITE1".into(), 2.3.into(), 2.4.into(), 2.5.into()],
                vec!["C-SITE1".into(), 2.5.into(), 2.6.into(), 2.6.into()],
            ],
        )
    }

    fn rh() -> Table {
        hemi_table(
            &[
                "rh.aparc.thickness",
                "rh_bankssts_thickness",
                "rh_G_cingul-Post-dorsal_thickness",
                "BrainSegVolNotVent",
            ],
            vec![
                vec!["B-SITE1".into(), 2.0.into(), 2.9.into(), 1.1e6.into()],
                vec!["C-SITE1".into(), 2.2.into(), 3.0.into(), 1.2e6.into()],
                vec!["D-SITE1".into(), 2.4.into(), 3.1.into(), 1.3e6.into()],
            ],
        )
    }

    #[test]
    fn test_inner_join_narrowing() {
        let out =
            standardize_freesurfer6(&lh(), &rh(), "SubjID", &Fs60Atlas::Aparc, SiteLabel::Suffix)
                .unwrap();
        assert_eq!(out.table.distinct_keys("SubjID").unwrap(), vec!["B", "C"]);
        assert_eq!(out.report.unpaired_subjects, vec!["A-SITE1", "D-SITE1"]);
        assert_eq!(out.report.n_subjects, 2);
    }

    #[test]
    fn test_column_renaming_and_sanitizing() {
        let out =
            standardize_freesurfer6(&lh(), &rh(), "SubjID", &Fs60Atlas::Aparc, SiteLabel::Suffix)
                .unwrap();
        assert_eq!(
            out.table.columns(),
            &[
                "SubjID",
                "L_bankssts",
                "L_G_and_S_frontomargin",
                "lh_MeanThickness_thickness",
                "R_bankssts",
                "R_G_cingul_Post_dorsal",
            ]
        );
        assert_eq!(out.report.passthrough_columns, vec!["lh_MeanThickness_thickness"]);
        assert_eq!(
            out.report.dropped_columns,
            vec![DroppedColumn {
                column: "BrainSegVolNotVent".to_string(),
                reason: DropReason::UnrecognizedPrefix,
            }]
        );
        for c in out.table.columns() {
            if c != "SubjID" && !AGGREGATE_COLUMNS.contains(&c.as_str()) {
                assert!(is_canonical_roi_column(c), "{} is not canonical", c);
            }
        }
    }

    #[test]
    fn test_glasser_atlas_drops_prefix() {
        let left = hemi_table(
            &["lh.aparc.Glasseratlas.thickness", "lh_L_V1_ROI_thickness"],
            vec![vec!["S1-X".into(), 1.8.into()]],
        );
        let right = hemi_table(
            &["rh.aparc.Glasseratlas.thickness", "rh_R_V1_ROI_thickness"],
            vec![vec!["S1-X".into(), 1.9.into()]],
        );
        let out =
            standardize_freesurfer6(&left, &right, "SubjID", &Fs60Atlas::Glasser, SiteLabel::Suffix)
                .unwrap();
        assert_eq!(out.table.columns(), &["SubjID", "L_V1_ROI", "R_V1_ROI"]);
    }

    #[test]
    fn test_missing_subject_header() {
        let result =
            standardize_freesurfer6(&lh(), &rh(), "SubjID", &Fs60Atlas::Glasser, SiteLabel::Suffix);
        assert!(matches!(result, Err(HarmonizeError::MissingColumn(c)) if c == "lh.aparc.Glasseratlas.thickness"));
    }

    #[test]
    fn test_shared_columns_keep_left_copy() {
        let left = hemi_table(
            &["lh.aparc.thickness", "lh_cuneus_thickness", "eTIV"],
            vec![vec!["S1-X".into(), 1.8.into(), 1.5e6.into()]],
        );
        let right = hemi_table(
            &["rh.aparc.thickness", "rh_cuneus_thickness", "eTIV"],
            vec![vec!["S1-X".into(), 1.9.into(), 1.5e6.into()]],
        );
        let out =
            standardize_freesurfer6(&left, &right, "SubjID", &Fs60Atlas::Aparc, SiteLabel::Suffix)
                .unwrap();
        assert_eq!(out.table.columns(), &["SubjID", "L_cuneus", "R_cuneus"]);
        assert_eq!(out.report.dropped_columns.len(), 2);
    }

    #[test]
    fn test_canonical_name_rules() {
        assert_eq!(
            canonical_name("lh_superiorfrontal_thickness", &Fs60Atlas::Aparc),
            Ok("L_superiorfrontal".to_string())
        );
        assert_eq!(
            canonical_name("xh_superiorfrontal_thickness", &Fs60Atlas::Aparc),
            Err(DropReason::UnrecognizedPrefix)
        );
        assert_eq!(
            canonical_name("lh_thickness", &Fs60Atlas::Aparc),
            Ok("L_thickness".to_string())
        );
        assert_eq!(canonical_name("lh_", &Fs60Atlas::Aparc), Err(DropReason::EmptyRegion));
        assert_eq!(
            canonical_name("lh_pars.opercularis_thickness", &Fs60Atlas::Aparc),
            Err(DropReason::NonCanonicalName)
        );
    }
}
