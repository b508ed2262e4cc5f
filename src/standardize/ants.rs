//! ANTs output: `left <name>` / `right <name>` columns.

use super::naming::{Hemisphere, SiteLabel, SplitFrom};
use super::{
    canonical_roi_name, ensure_unique_subjects, normalize_subject_ids, DropReason, DroppedColumn, StandardizeReport,
    Standardized,
};
use crate::data::Table;
use crate::error::Result;
use log::{debug, info, warn};
use std::collections::HashMap;

/// Column holding the subject ID in ANTs output.
pub const STRUCTURE_NAME_COLUMN: &str = "Structure Name";

/// Standardize ANTs output.
///
/// Columns whose first space-separated token is `left` or `right` become
/// `{L|R}_{remaining tokens joined}` (sanitized); every other column is dropped. The
/// `Structure Name` column becomes `subject_id_column`, and subject IDs are
/// split once at the last `_` to remove the site label.
pub fn standardize_ants(raw: &Table, subject_id_column: &str, site: SiteLabel) -> Result<Standardized> {
    raw.column_index(STRUCTURE_NAME_COLUMN)?;

    let mut report = StandardizeReport {
        format: "ants".to_string(),
        ..Default::default()
    };
    let mut keep = vec![STRUCTURE_NAME_COLUMN.to_string()];
    let mut renames = HashMap::from([(
        STRUCTURE_NAME_COLUMN.to_string(),
        subject_id_column.to_string(),
    )]);

    for column in raw.columns() {
        if column == STRUCTURE_NAME_COLUMN {
            continue;
        }
        let mut tokens = column.split(' ');
        let Some(hemisphere) = tokens.next().and_then(Hemisphere::from_ants) else {
            debug!("ants: dropping non-hemispheric column '{}'", column);
            report.dropped_columns.push(DroppedColumn {
                column: column.clone(),
                reason: DropReason::NotHemispheric,
            });
            continue;
        };
        let region: String = tokens.collect();
        let canonical = match canonical_roi_name(hemisphere, &region) {
            Ok(name) => name,
            Err(reason) => {
                warn!("ants: dropping column '{}' ({})", column, reason);
                report.dropped_columns.push(DroppedColumn {
                    column: column.clone(),
                    reason,
                });
                continue;
            }
        };

        keep.push(column.clone());
        renames.insert(column.clone(), canonical.clone());
        report.renamed.push((column.clone(), canonical));
    }

    let table = raw.select_columns(&keep)?.rename_columns(&renames)?;
    let table = normalize_subject_ids(&table, subject_id_column, '_', SplitFrom::Right, site)?;
    ensure_unique_subjects(&table, subject_id_column)?;

    report.n_subjects = table.n_rows();
    info!(
        "ants: standardized {} subjects, kept {} ROI columns, dropped {}",
        report.n_subjects,
        report.renamed.len(),
        report.dropped_columns.len()
    );
    Ok(Standardized { table, report })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Value;
    use crate::error::HarmonizeError;
    use crate::standardize::is_canonical_roi_column;

    fn raw_ants() -> Table {
        Table::new(
            vec![
                "Structure Name".to_string(),
                "left caudal anterior cingulate".to_string(),
                "right caudal anterior cingulate".to_string(),
                "left".to_string(),
                "Total Volume".to_string(),
            ],
            vec![
                vec!["SUB01_SITE1".into(), 2.5.into(), 2.6.into(), 1.0.into(), 1200.0.into()],
                vec!["SUB02_SITE1".into(), 2.4.into(), 2.3.into(), 1.0.into(), 1100.0.into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_standardize_ants() {
        let out = standardize_ants(&raw_ants(), "SubjID", SiteLabel::Suffix).unwrap();
        assert_eq!(
            out.table.columns(),
            &["SubjID", "L_caudalanteriorcingulate", "R_caudalanteriorcingulate"]
        );
        assert_eq!(out.table.value(0, "SubjID"), Some(&Value::Text("SUB01".to_string())));
        assert_eq!(out.table.value(1, "R_caudalanteriorcingulate"), Some(&Value::Number(2.3)));
    }

    #[test]
    fn test_dropped_columns_reported() {
        let out = standardize_ants(&raw_ants(), "SubjID", SiteLabel::Suffix).unwrap();
        assert_eq!(
            out.report.dropped_columns,
            vec![
                DroppedColumn {
                    column: "left".to_string(),
                    reason: DropReason::EmptyRegion,
                },
                DroppedColumn {
                    column: "Total Volume".to_string(),
                    reason: DropReason::NotHemispheric,
                },
            ]
        );
    }

    #[test]
    fn test_region_names_sanitized_to_canonical() {
        let raw = Table::new(
            vec![
                "Structure Name".to_string(),
                "left caudal-anterior".to_string(),
                "right G&S".to_string(),
                "left pars (opercularis)".to_string(),
            ],
            vec![vec!["SUB01_SITE1".into(), 2.5.into(), 2.6.into(), 2.7.into()]],
        )
        .unwrap();
        let out = standardize_ants(&raw, "SubjID", SiteLabel::Suffix).unwrap();
        assert_eq!(out.table.columns(), &["SubjID", "L_caudal_anterior", "R_G_and_S"]);
        for column in &out.table.columns()[1..] {
            assert!(is_canonical_roi_column(column), "{}", column);
        }
        assert_eq!(
            out.report.dropped_columns,
            vec![DroppedColumn {
                column: "left pars (opercularis)".to_string(),
                reason: DropReason::NonCanonicalName,
            }]
        );
    }

    #[test]
    fn test_site_prefix_layout() {
        let raw = Table::new(
            vec!["Structure Name".to_string(), "left cuneus".to_string()],
            vec![vec!["NYU_0051456".into(), 1.9.into()]],
        )
        .unwrap();
        let out = standardize_ants(&raw, "SubjID", SiteLabel::Prefix).unwrap();
        assert_eq!(out.table.value(0, "SubjID"), Some(&Value::Text("0051456".to_string())));
    }

    #[test]
    fn test_restandardizing_fails_cleanly() {
        let once = standardize_ants(&raw_ants(), "SubjID", SiteLabel::Suffix).unwrap();
        let twice = standardize_ants(&once.table, "SubjID", SiteLabel::Suffix);
        assert!(matches!(twice, Err(HarmonizeError::MissingColumn(c)) if c == STRUCTURE_NAME_COLUMN));
    }
}
