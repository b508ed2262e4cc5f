//! Subject/column intersection and source stacking.

use crate::data::{Dataset, Table, Value};
use crate::error::{HarmonizeError, Result};
use crate::validate::{validate_dataset, MissingValuePolicy, ValidationReport};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Default name of the column identifying the source pipeline of each row.
pub const DEFAULT_SOURCE_LABEL: &str = "software";

/// What happened to one source during the merge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceReport {
    /// Source name (also the row label in the master table).
    pub name: String,
    /// Rows in the standardized input.
    pub n_rows_input: usize,
    /// Rows left after restricting to common subjects.
    pub n_rows_selected: usize,
    /// Validator outcome on the restricted table.
    pub validation: ValidationReport,
    /// Whether the rows were added to the master table.
    pub included: bool,
}

/// Master table plus the intersections it was built from.
#[derive(Debug, Clone)]
pub struct MergeResult {
    /// Subject-ID column, sorted common ROI columns, source label column.
    pub master: Table,
    /// Subjects present in every source, sorted.
    pub common_subjects: Vec<String>,
    /// Columns present in every source minus the subject-ID column, sorted.
    pub common_roi_columns: Vec<String>,
    /// One report per source, in input order.
    pub sources: Vec<SourceReport>,
}

impl MergeResult {
    /// Names of the sources whose rows are in the master table.
    pub fn included_sources(&self) -> Vec<&str> {
        self.sources
            .iter()
            .filter(|s| s.included)
            .map(|s| s.name.as_str())
            .collect()
    }

    /// Names of the sources left out of the master table.
    pub fn excluded_sources(&self) -> Vec<&str> {
        self.sources
            .iter()
            .filter(|s| !s.included)
            .map(|s| s.name.as_str())
            .collect()
    }
}

impl std::fmt::Display for MergeResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Merge Result")?;
        writeln!(f, "  Common subjects:    {}", self.common_subjects.len())?;
        writeln!(f, "  Common ROI columns: {}", self.common_roi_columns.len())?;
        writeln!(f, "  Master rows:        {}", self.master.n_rows())?;
        for s in &self.sources {
            let status = if s.included { "included" } else { "excluded" };
            writeln!(f, "  {}: {} ({} of {} rows)", s.name, status, s.n_rows_selected, s.n_rows_input)?;
            for issue in &s.validation.issues {
                writeln!(f, "    {}", issue)?;
            }
        }
        Ok(())
    }
}

/// Merge standardized datasets into one master table.
///
/// Subjects are matched by [`Value::numeric_key`], so `0051456` in one source
/// and `51456` in another are the same subject.
///
/// Keeps only columns and subjects present in every dataset, validates each
/// restricted dataset against the common columns, and stacks the passing ones
/// in input order with their name in `source_label_column`. A subject appears
/// once per passing source; values are never reconciled across sources.
/// Failing sources are excluded and reported, never fatal. If no source
/// passes, the master table is empty.
pub fn merge_datasets(
    datasets: &[Dataset],
    subject_id_column: &str,
    policy: MissingValuePolicy,
    source_label_column: &str,
) -> Result<MergeResult> {
    if datasets.is_empty() {
        return Err(HarmonizeError::EmptyData("No datasets to merge".to_string()));
    }
    let mut names = HashSet::new();
    for d in datasets {
        if !names.insert(d.name.as_str()) {
            return Err(HarmonizeError::InvalidParameter(format!(
                "Duplicate dataset name '{}'",
                d.name
            )));
        }
        d.table.column_index(subject_id_column)?;
        if d.table.has_column(source_label_column) {
            return Err(HarmonizeError::InvalidParameter(format!(
                "Source label column '{}' already exists in dataset '{}'",
                source_label_column, d.name
            )));
        }
    }
    info!("Merging {} datasets", datasets.len());

    let common_columns = intersect(datasets.iter().map(|d| d.table.column_set()))
        .into_iter()
        .map(str::to_string)
        .collect::<HashSet<String>>();
    let subject_sets = datasets
        .iter()
        .map(|d| subject_keys(&d.table, subject_id_column))
        .collect::<Result<Vec<_>>>()?;
    let common_subject_set: HashSet<&str> =
        intersect(subject_sets.iter().map(|s| s.keys().map(String::as_str).collect()));

    // IDs are reported as spelled in the first dataset
    let mut common_subjects: Vec<String> = subject_sets
        .first()
        .map(|s| {
            s.iter()
                .filter(|(k, _)| common_subject_set.contains(k.as_str()))
                .map(|(_, id)| id.clone())
                .collect()
        })
        .unwrap_or_default();
    common_subjects.sort();
    let mut common_roi_columns: Vec<String> = common_columns
        .iter()
        .filter(|c| c.as_str() != subject_id_column)
        .cloned()
        .collect();
    common_roi_columns.sort();
    info!(
        "Common subjects: {}, common ROI columns: {}",
        common_subjects.len(),
        common_roi_columns.len()
    );

    let mut selected_columns = vec![subject_id_column.to_string()];
    selected_columns.extend(common_roi_columns.iter().cloned());
    let mut master_columns = selected_columns.clone();
    master_columns.push(source_label_column.to_string());
    let mut master = Table::empty(master_columns)?;

    let mut sources = Vec::with_capacity(datasets.len());
    for d in datasets {
        let restricted = d
            .table
            .filter_by_column(subject_id_column, |v| {
                v.numeric_key().is_some_and(|k| common_subject_set.contains(k.as_str()))
            })?
            .select_columns(&selected_columns)?;
        let validation = validate_dataset(&restricted, &selected_columns, policy);
        let included = validation.passed();

        if included {
            master.append(
                &restricted.with_constant_column(source_label_column, Value::from(d.name.as_str()))?,
            )?;
            info!(
                "Dataset '{}': {} rows added, master now {} rows",
                d.name,
                restricted.n_rows(),
                master.n_rows()
            );
        } else {
            for issue in &validation.issues {
                warn!("Dataset '{}' excluded from master table: {}", d.name, issue);
            }
        }

        sources.push(SourceReport {
            name: d.name.clone(),
            n_rows_input: d.table.n_rows(),
            n_rows_selected: restricted.n_rows(),
            validation,
            included,
        });
    }

    Ok(MergeResult {
        master,
        common_subjects,
        common_roi_columns,
        sources,
    })
}

/// Subject IDs keyed by [`Value::numeric_key`], mapped to their own spelling.
fn subject_keys(table: &Table, subject_id_column: &str) -> Result<HashMap<String, String>> {
    let mut keys = HashMap::new();
    for v in table.column(subject_id_column)? {
        if let (Some(numeric), Some(id)) = (v.numeric_key(), v.key()) {
            keys.entry(numeric).or_insert(id);
        }
    }
    Ok(keys)
}

/// Intersection of a non-empty sequence of sets.
fn intersect<'a, I>(sets: I) -> HashSet<&'a str>
where
    I: IntoIterator<Item = HashSet<&'a str>>,
{
    let mut iter = sets.into_iter();
    let first = iter.next().unwrap_or_default();
    iter.fold(first, |acc, s| acc.intersection(&s).copied().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(name: &str, columns: &[&str], rows: Vec<Vec<Value>>) -> Dataset {
        Dataset::new(
            name,
            Table::new(columns.iter().map(|s| s.to_string()).collect(), rows).unwrap(),
        )
    }

    fn three_sources() -> Vec<Dataset> {
        vec![
            dataset(
                "FS53",
                &["SubjID", "L_bankssts", "R_bankssts", "L_insula"],
                vec![
                    vec!["S1".into(), 2.5.into(), 2.6.into(), 3.1.into()],
                    vec!["S2".into(), 2.4.into(), 2.5.into(), 3.0.into()],
                    vec!["S3".into(), 2.3.into(), 2.2.into(), 2.9.into()],
                ],
            ),
            dataset(
                "ANTs",
                &["SubjID", "R_bankssts", "L_bankssts"],
                vec![
                    vec!["S2".into(), 2.7.into(), 2.8.into()],
                    vec!["S1".into(), 2.9.into(), 3.0.into()],
                ],
            ),
            dataset(
                "CIVET",
                &["SubjID", "L_bankssts", "R_bankssts", "R_insula"],
                vec![
                    vec!["S1".into(), 3.5.into(), 3.6.into(), 3.3.into()],
                    vec!["S2".into(), 3.4.into(), 3.5.into(), 3.2.into()],
                    vec!["S4".into(), 3.3.into(), 3.4.into(), 3.1.into()],
                ],
            ),
        ]
    }

    #[test]
    fn test_intersection_of_columns_and_subjects() {
        let result =
            merge_datasets(&three_sources(), "SubjID", MissingValuePolicy::Reject, "software")
                .unwrap();
        assert_eq!(result.common_subjects, vec!["S1", "S2"]);
        assert_eq!(result.common_roi_columns, vec!["L_bankssts", "R_bankssts"]);
        assert_eq!(
            result.master.columns(),
            &["SubjID", "L_bankssts", "R_bankssts", "software"]
        );
        assert_eq!(result.master.n_rows(), 6);
        assert_eq!(result.included_sources(), vec!["FS53", "ANTs", "CIVET"]);
    }

    #[test]
    fn test_numeric_and_zero_padded_ids_intersect() {
        let datasets = vec![
            dataset(
                "FS53",
                &["SubjID", "L_bankssts"],
                vec![
                    vec!["0051456".into(), 2.5.into()],
                    vec!["0051457".into(), 2.4.into()],
                ],
            ),
            dataset(
                "CIVET",
                &["SubjID", "L_bankssts"],
                vec![vec![51456i64.into(), 3.1.into()], vec![51999i64.into(), 3.0.into()]],
            ),
        ];
        let result =
            merge_datasets(&datasets, "SubjID", MissingValuePolicy::Reject, "software").unwrap();
        assert_eq!(result.common_subjects, vec!["0051456"]);
        assert_eq!(result.master.n_rows(), 2);
    }

    #[test]
    fn test_rows_stacked_per_source() {
        let result =
            merge_datasets(&three_sources(), "SubjID", MissingValuePolicy::Reject, "software")
                .unwrap();
        let labels: Vec<String> = result
            .master
            .column("software")
            .unwrap()
            .into_iter()
            .filter_map(Value::key)
            .collect();
        assert_eq!(labels, vec!["FS53", "FS53", "ANTs", "ANTs", "CIVET", "CIVET"]);
        // ANTs rows keep their own values after column reordering
        assert_eq!(result.master.value(2, "SubjID"), Some(&Value::from("S2")));
        assert_eq!(result.master.value(2, "L_bankssts"), Some(&Value::Number(2.8)));
    }

    #[test]
    fn test_failing_source_is_skipped() {
        let mut sources = three_sources();
        sources[1] = dataset(
            "ANTs",
            &["SubjID", "R_bankssts", "L_bankssts"],
            vec![
                vec!["S2".into(), Value::Missing, 2.8.into()],
                vec!["S1".into(), 2.9.into(), 3.0.into()],
            ],
        );
        let result =
            merge_datasets(&sources, "SubjID", MissingValuePolicy::Reject, "software").unwrap();
        assert_eq!(result.excluded_sources(), vec!["ANTs"]);
        assert_eq!(result.master.n_rows(), 4);
        assert!(!result.sources[1].validation.passed());

        let lenient =
            merge_datasets(&sources, "SubjID", MissingValuePolicy::Drop, "software").unwrap();
        assert_eq!(lenient.master.n_rows(), 6);
        assert_eq!(lenient.master.drop_incomplete_rows().n_rows(), 5);
    }

    #[test]
    fn test_no_passing_source_gives_empty_master() {
        let sources = vec![dataset(
            "FS53",
            &["SubjID", "L_bankssts"],
            vec![vec!["S1".into(), Value::Missing]],
        )];
        let result =
            merge_datasets(&sources, "SubjID", MissingValuePolicy::Reject, "software").unwrap();
        assert!(result.master.is_empty());
        assert_eq!(result.master.columns(), &["SubjID", "L_bankssts", "software"]);
    }

    #[test]
    fn test_caller_errors() {
        assert!(matches!(
            merge_datasets(&[], "SubjID", MissingValuePolicy::Reject, "software"),
            Err(HarmonizeError::EmptyData(_))
        ));

        let mut duplicated = three_sources();
        duplicated[2].name = "FS53".to_string();
        assert!(matches!(
            merge_datasets(&duplicated, "SubjID", MissingValuePolicy::Reject, "software"),
            Err(HarmonizeError::InvalidParameter(_))
        ));

        assert!(matches!(
            merge_datasets(&three_sources(), "subject", MissingValuePolicy::Reject, "software"),
            Err(HarmonizeError::MissingColumn(_))
        ));

        assert!(matches!(
            merge_datasets(&three_sources(), "SubjID", MissingValuePolicy::Reject, "L_bankssts"),
            Err(HarmonizeError::InvalidParameter(_))
        ));
    }
}
