//! QC stage followed by ordered minimum-count rules.

use super::criteria::{ExternalCriteria, QcCriterion};
use super::min_count::{filter_min_count, CovariateStageReport};
use super::qc::{filter_qc, QcStageReport};
use crate::data::Table;
use crate::error::Result;
use log::info;
use serde::{Deserialize, Serialize};

/// Filtered cohort and the accounting of each stage.
#[derive(Debug, Clone)]
pub struct CohortFilterResult {
    /// Rows that survived every stage; same columns as the input.
    pub table: Table,
    /// QC stage statistics.
    pub qc: QcStageReport,
    /// One report per covariate rule, in application order.
    pub covariates: Vec<CovariateStageReport>,
}

/// Serializable summary of a cohort filter run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CohortFilterSummary {
    pub qc: QcStageReport,
    pub covariates: Vec<CovariateStageReport>,
    pub n_rows: usize,
}

impl CohortFilterResult {
    /// Stage reports without the table.
    pub fn summary(&self) -> CohortFilterSummary {
        CohortFilterSummary {
            qc: self.qc.clone(),
            covariates: self.covariates.clone(),
            n_rows: self.table.n_rows(),
        }
    }
}

impl std::fmt::Display for CohortFilterResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Cohort Filter Result")?;
        writeln!(
            f,
            "  QC ({}):  {} -> {} subjects",
            self.qc.column, self.qc.n_subjects_before, self.qc.n_subjects_after
        )?;
        for c in &self.covariates {
            writeln!(
                f,
                "  {} (N > {}): {} subjects, dropped {} groups",
                c.covariate,
                c.min_count,
                c.n_subjects_after,
                c.dropped_levels.len()
            )?;
        }
        writeln!(f, "  Rows:     {}", self.table.n_rows())?;
        Ok(())
    }
}

/// Filter a subject-indexed table by QC labels and minimum group sizes.
///
/// First keeps rows whose subject passes `qc` in `qc_table`, then applies
/// each rule of `external` in order, each on the output of the previous one.
/// An empty result is not an error.
pub fn filter_cohort(
    data: &Table,
    subject_id_column: &str,
    qc_table: &Table,
    qc: &QcCriterion,
    external: Option<&ExternalCriteria>,
) -> Result<CohortFilterResult> {
    let (mut table, qc_report) = filter_qc(data, subject_id_column, qc_table, qc)?;

    let mut covariates = Vec::new();
    if let Some(criteria) = external {
        info!("Filtering based on external criteria: {:?}", criteria.covariates());
        for rule in criteria {
            let (next, report) = filter_min_count(&table, subject_id_column, rule)?;
            table = next;
            covariates.push(report);
        }
    }

    Ok(CohortFilterResult {
        table,
        qc: qc_report,
        covariates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Value;
    use crate::error::HarmonizeError;
    use crate::filter::{CovariateRule, LevelCount};

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    /// Subjects 1..=11: site A has 5, site B has 6; all pass QC.
    fn site_data() -> (Table, Table) {
        let mut data_rows = Vec::new();
        let mut qc_rows = Vec::new();
        for i in 1..=11i64 {
            let site = if i <= 5 { "A" } else { "B" };
            data_rows.push(vec![Value::from(format!("{:07}", i)), site.into(), 2.5.into()]);
            qc_rows.push(vec![Value::from(i), 1i64.into()]);
        }
        (
            Table::new(columns(&["SubjID", "site", "L_bankssts"]), data_rows).unwrap(),
            Table::new(columns(&["SubjID", "manual_qc"]), qc_rows).unwrap(),
        )
    }

    #[test]
    fn test_strict_threshold() {
        let (data, qc_table) = site_data();
        let qc = QcCriterion::new("manual_qc", [1i64]);
        let criteria = ExternalCriteria::new().then("site", 5);

        let result = filter_cohort(&data, "SubjID", &qc_table, &qc, Some(&criteria)).unwrap();
        assert_eq!(result.qc.n_subjects_after, 11);
        assert_eq!(result.table.n_rows(), 6);
        assert_eq!(
            result.covariates[0].dropped_levels,
            vec![LevelCount {
                value: "A".to_string(),
                count: 5
            }]
        );
        assert_eq!(
            result.covariates[0].kept_levels,
            vec![LevelCount {
                value: "B".to_string(),
                count: 6
            }]
        );
    }

    #[test]
    fn test_qc_stage_uses_numeric_ids() {
        let (data, qc_table) = site_data();
        let qc_table = qc_table
            .map_column("manual_qc", |v| match v.numeric_key().as_deref() {
                Some("1") => Value::from("pass"),
                _ => Value::Missing,
            })
            .unwrap()
            .filter_rows(|row| row[0] != Value::Number(3.0));
        let qc = QcCriterion::new("manual_qc", ["pass"]);

        let result = filter_cohort(&data, "SubjID", &qc_table, &qc, None).unwrap();
        assert_eq!(result.qc.n_accepted, 10);
        assert_eq!(result.table.n_rows(), 10);
        assert!(result.covariates.is_empty());
        assert!(!result
            .table
            .distinct_keys("SubjID")
            .unwrap()
            .contains(&"0000003".to_string()));
    }

    #[test]
    fn test_no_accepted_values_gives_empty_table() {
        let (data, qc_table) = site_data();
        let qc = QcCriterion::new("manual_qc", [0i64]);
        let criteria = ExternalCriteria::new().then("site", 1);
        let result = filter_cohort(&data, "SubjID", &qc_table, &qc, Some(&criteria)).unwrap();
        assert!(result.table.is_empty());
        assert_eq!(result.table.columns(), data.columns());
    }

    #[test]
    fn test_order_sensitivity() {
        // site X: 4 rows (batch 1 x3, batch 2 x1); site Y: 2 rows (batch 2 x2)
        let rows: Vec<Vec<Value>> = [
            ("s1", "X", 1),
            ("s2", "X", 1),
            ("s3", "X", 1),
            ("s4", "X", 2),
            ("s5", "Y", 2),
            ("s6", "Y", 2),
        ]
        .iter()
        .map(|(id, site, batch)| vec![Value::from(*id), Value::from(*site), Value::from(*batch as i64)])
        .collect();
        let data = Table::new(columns(&["SubjID", "site", "batch"]), rows).unwrap();
        let qc_table = data
            .select_columns(&["SubjID"])
            .unwrap()
            .with_constant_column("qc", Value::from("ok"))
            .unwrap();
        let qc = QcCriterion::new("qc", ["ok"]);

        let site_first = ExternalCriteria::new().then("site", 2).then("batch", 1);
        let batch_first = ExternalCriteria::new().then("batch", 1).then("site", 2);

        let a = filter_cohort(&data, "SubjID", &qc_table, &qc, Some(&site_first)).unwrap();
        let b = filter_cohort(&data, "SubjID", &qc_table, &qc, Some(&batch_first)).unwrap();

        // site first: Y dropped, then batch 2 has one row left and is dropped
        assert_eq!(a.table.distinct_keys("SubjID").unwrap(), vec!["s1", "s2", "s3"]);
        // batch first: both batches kept, then site Y (2 rows) dropped
        assert_eq!(b.table.distinct_keys("SubjID").unwrap(), vec!["s1", "s2", "s3", "s4"]);

        // equals applying the rules one at a time
        let (step1, _) = filter_min_count(&data, "SubjID", &CovariateRule::new("site", 2)).unwrap();
        let (step2, _) = filter_min_count(&step1, "SubjID", &CovariateRule::new("batch", 1)).unwrap();
        assert_eq!(a.table, step2);
    }

    #[test]
    fn test_missing_covariate_values_dropped() {
        let data = Table::new(
            columns(&["SubjID", "site"]),
            vec![
                vec!["s1".into(), "X".into()],
                vec!["s2".into(), "X".into()],
                vec!["s3".into(), Value::Missing],
            ],
        )
        .unwrap();
        let (out, report) = filter_min_count(&data, "SubjID", &CovariateRule::new("site", 0)).unwrap();
        assert_eq!(out.n_rows(), 2);
        assert_eq!(report.n_missing_dropped, 1);
    }

    #[test]
    fn test_missing_columns() {
        let (data, qc_table) = site_data();
        let qc = QcCriterion::new("auto_qc", [1i64]);
        assert!(matches!(
            filter_cohort(&data, "SubjID", &qc_table, &qc, None),
            Err(HarmonizeError::MissingColumn(c)) if c == "auto_qc"
        ));

        let qc = QcCriterion::new("manual_qc", [1i64]);
        let criteria = ExternalCriteria::new().then("scanner", 1);
        assert!(matches!(
            filter_cohort(&data, "SubjID", &qc_table, &qc, Some(&criteria)),
            Err(HarmonizeError::MissingColumn(c)) if c == "scanner"
        ));
    }
}
