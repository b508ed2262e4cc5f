//! Minimum sample size per covariate group.

use super::criteria::CovariateRule;
use crate::data::Table;
use crate::error::Result;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Row count of one covariate value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelCount {
    pub value: String,
    pub count: usize,
}

/// Statistics of one covariate rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CovariateStageReport {
    pub covariate: String,
    pub min_count: usize,
    /// Values with more than `min_count` rows, sorted by value.
    pub kept_levels: Vec<LevelCount>,
    /// Values with at most `min_count` rows, sorted by value.
    pub dropped_levels: Vec<LevelCount>,
    /// Rows dropped because the covariate is missing.
    pub n_missing_dropped: usize,
    /// Distinct subjects left after this rule.
    pub n_subjects_after: usize,
    /// Rows left after this rule.
    pub n_rows_after: usize,
}

/// Keep rows whose covariate value occurs strictly more than `rule.min_count` times.
///
/// Counts are taken over rows of `data`, i.e. over the population left by any
/// previous filter. Rows with a missing covariate value are dropped.
pub fn filter_min_count(
    data: &Table,
    subject_id_column: &str,
    rule: &CovariateRule,
) -> Result<(Table, CovariateStageReport)> {
    info!(
        "Performing min sample (N_min={}) size check based on {}",
        rule.min_count, rule.covariate
    );

    let values = data.column(&rule.covariate)?;
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut n_missing = 0;
    for v in &values {
        match v.key() {
            Some(k) => *counts.entry(k).or_insert(0) += 1,
            None => n_missing += 1,
        }
    }

    let (mut kept_levels, mut dropped_levels): (Vec<LevelCount>, Vec<LevelCount>) = counts
        .iter()
        .map(|(value, &count)| LevelCount {
            value: value.clone(),
            count,
        })
        .partition(|l| l.count > rule.min_count);
    kept_levels.sort_by(|a, b| a.value.cmp(&b.value));
    dropped_levels.sort_by(|a, b| a.value.cmp(&b.value));

    let filtered = data.filter_by_column(&rule.covariate, |v| {
        v.key()
            .and_then(|k| counts.get(&k))
            .is_some_and(|&c| c > rule.min_count)
    })?;

    if !dropped_levels.is_empty() {
        warn!(
            "Dropping subjects for {} {:?}",
            rule.covariate,
            dropped_levels
                .iter()
                .map(|l| format!("{}={}", l.value, l.count))
                .collect::<Vec<_>>()
        );
    }
    if n_missing > 0 {
        warn!("Dropping {} rows with missing {}", n_missing, rule.covariate);
    }

    let report = CovariateStageReport {
        covariate: rule.covariate.clone(),
        min_count: rule.min_count,
        kept_levels,
        dropped_levels,
        n_missing_dropped: n_missing,
        n_subjects_after: filtered.distinct_keys(subject_id_column)?.len(),
        n_rows_after: filtered.n_rows(),
    };
    info!("Resultant number of subjects: {}", report.n_subjects_after);
    Ok((filtered, report))
}
