//! FreeSurfer 5.1 / 5.3 output: `L_{region}_{measure}` columns.

use super::naming::{Hemisphere, SiteLabel, SplitFrom};
use super::{
    canonical_roi_name, ensure_unique_subjects, normalize_subject_ids, DropReason, DroppedColumn, StandardizeReport,
    Standardized,
};
use crate::data::Table;
use crate::error::Result;
use log::{debug, info, warn};
use std::collections::HashMap;

/// Standardize FreeSurfer 5.x output.
///
/// Only columns whose first `_` token is `L` or `R` are kept, renamed to the
/// prefix and the second token (`L_bankssts_thickavg` becomes `L_bankssts`).
/// Subject IDs are split once at the last `_` to remove the site label.
///
/// Running this on an already standardized table leaves column names
/// unchanged as long as region names contain no `_`.
pub fn standardize_freesurfer5(
    raw: &Table,
    subject_id_column: &str,
    site: SiteLabel,
) -> Result<Standardized> {
    raw.column_index(subject_id_column)?;

    let mut report = StandardizeReport {
        format: "freesurfer5".to_string(),
        ..Default::default()
    };
    let mut keep = vec![subject_id_column.to_string()];
    let mut renames = HashMap::new();

    for column in raw.columns() {
        if column == subject_id_column {
            continue;
        }
        let mut tokens = column.split('_');
        let Some(hemisphere) = tokens.next().and_then(Hemisphere::from_canonical) else {
            debug!("freesurfer5: dropping non-hemispheric column '{}'", column);
            report.dropped_columns.push(DroppedColumn {
                column: column.clone(),
                reason: DropReason::NotHemispheric,
            });
            continue;
        };
        let region = tokens.next().unwrap_or_default();
        let canonical = match canonical_roi_name(hemisphere, region) {
            Ok(name) => name,
            Err(reason) => {
                warn!("freesurfer5: dropping column '{}' ({})", column, reason);
                report.dropped_columns.push(DroppedColumn {
                    column: column.clone(),
                    reason,
                });
                continue;
            }
        };
        keep.push(column.clone());
        if &canonical != column {
            report.renamed.push((column.clone(), canonical.clone()));
        }
        renames.insert(column.clone(), canonical);
    }

    let table = raw.select_columns(&keep)?.rename_columns(&renames)?;
    let table = normalize_subject_ids(&table, subject_id_column, '_', SplitFrom::Right, site)?;
    ensure_unique_subjects(&table, subject_id_column)?;

    report.n_subjects = table.n_rows();
    info!(
        "freesurfer5: standardized {} subjects, {} ROI columns, dropped {}",
        report.n_subjects,
        keep.len() - 1,
        report.dropped_columns.len()
    );
    Ok(Standardized { table, report })
}
