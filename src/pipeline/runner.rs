//! Pipeline runner: standardize every source, merge, then filter the cohort.

use super::config::HarmonizeConfig;
use crate::data::{Dataset, Table};
use crate::error::{HarmonizeError, Result};
use crate::filter::{
    filter_cohort, CohortFilterResult, CohortFilterSummary, ExternalCriteria, QcCriterion,
};
use crate::merge::{merge_datasets, MergeResult, SourceReport, DEFAULT_SOURCE_LABEL};
use crate::standardize::{RawInput, SiteLabel, StandardizeReport, Standardizer};
use crate::validate::MissingValuePolicy;
use log::info;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// One source to harmonize: its standardizer and raw tables.
#[derive(Debug, Clone)]
pub struct SourceSpec {
    /// Source name; becomes the row label in the master table.
    pub name: String,
    pub standardizer: Standardizer,
    pub input: RawInput,
    pub site: SiteLabel,
}

impl SourceSpec {
    /// Source with a single raw table and the default site-label layout.
    pub fn single(name: &str, standardizer: Standardizer, table: Table) -> Self {
        Self {
            name: name.to_string(),
            standardizer,
            input: RawInput::Single(table),
            site: SiteLabel::default(),
        }
    }

    /// FreeSurfer 6.0-style source with separate hemisphere tables.
    pub fn hemispheres(name: &str, standardizer: Standardizer, left: Table, right: Table) -> Self {
        Self {
            name: name.to_string(),
            standardizer,
            input: RawInput::Hemispheres { left, right },
            site: SiteLabel::default(),
        }
    }

    /// Set which side of the separator holds the site label.
    pub fn with_site_label(mut self, site: SiteLabel) -> Self {
        self.site = site;
        self
    }
}

/// Everything a harmonization run produced.
#[derive(Debug, Clone)]
pub struct HarmonizeOutput {
    /// Run name.
    pub name: String,
    /// `(source name, report)` per source, in input order.
    pub standardization: Vec<(String, StandardizeReport)>,
    /// Master table and per-source merge accounting.
    pub merge: MergeResult,
    /// Filtered cohort, when a QC criterion was configured.
    pub cohort: Option<CohortFilterResult>,
}

impl HarmonizeOutput {
    /// The analysis-ready table: the filtered cohort if any, else the master table.
    pub fn final_table(&self) -> &Table {
        match &self.cohort {
            Some(c) => &c.table,
            None => &self.merge.master,
        }
    }

    /// Serializable accounting of the run (no tables).
    pub fn summary(&self) -> HarmonizeSummary {
        HarmonizeSummary {
            name: self.name.clone(),
            standardization: self
                .standardization
                .iter()
                .map(|(name, report)| SourceStandardization {
                    name: name.clone(),
                    report: report.clone(),
                })
                .collect(),
            common_subjects: self.merge.common_subjects.len(),
            common_roi_columns: self.merge.common_roi_columns.clone(),
            master_rows: self.merge.master.n_rows(),
            sources: self.merge.sources.clone(),
            cohort: self.cohort.as_ref().map(CohortFilterResult::summary),
        }
    }
}

/// Standardization report tagged with its source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceStandardization {
    pub name: String,
    pub report: StandardizeReport,
}

/// Serializable run summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarmonizeSummary {
    pub name: String,
    pub standardization: Vec<SourceStandardization>,
    pub common_subjects: usize,
    pub common_roi_columns: Vec<String>,
    pub master_rows: usize,
    pub sources: Vec<SourceReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cohort: Option<CohortFilterSummary>,
}

impl HarmonizeSummary {
    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Builder for harmonization runs.
#[derive(Debug, Clone)]
pub struct Harmonizer {
    name: String,
    subject_id_column: String,
    source_label: String,
    policy: MissingValuePolicy,
    qc: Option<QcCriterion>,
    attach_columns: Vec<String>,
    external: Option<ExternalCriteria>,
}

impl Default for Harmonizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Harmonizer {
    /// Create a run with default column names and a rejecting missing-value policy.
    pub fn new() -> Self {
        Self {
            name: "unnamed".to_string(),
            subject_id_column: "SubjID".to_string(),
            source_label: DEFAULT_SOURCE_LABEL.to_string(),
            policy: MissingValuePolicy::default(),
            qc: None,
            attach_columns: Vec::new(),
            external: None,
        }
    }

    /// Create from a config.
    pub fn from_config(config: &HarmonizeConfig) -> Self {
        let mut harmonizer = Self::new()
            .name(&config.name)
            .subject_id_column(&config.subject_id_column)
            .source_label(&config.source_label)
            .missing_values(config.missing_value_policy());
        if let Some(qc) = &config.qc {
            harmonizer = harmonizer.qc(qc.criterion());
            harmonizer.attach_columns = qc.attach_columns.clone();
        }
        harmonizer.external = config.external_criteria.clone();
        harmonizer
    }

    /// Set the run name.
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Set the canonical subject-ID column.
    pub fn subject_id_column(mut self, column: &str) -> Self {
        self.subject_id_column = column.to_string();
        self
    }

    /// Set the source label column of the master table.
    pub fn source_label(mut self, column: &str) -> Self {
        self.source_label = column.to_string();
        self
    }

    /// Set the missing-value policy used when validating sources.
    pub fn missing_values(mut self, policy: MissingValuePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Filter the master table by a QC criterion.
    pub fn qc(mut self, criterion: QcCriterion) -> Self {
        self.qc = Some(criterion);
        self
    }

    /// Copy a QC-table column onto the master table before filtering.
    pub fn attach_column(mut self, column: &str) -> Self {
        self.attach_columns.push(column.to_string());
        self
    }

    /// Add a minimum-count rule, applied after the existing ones.
    pub fn min_count(mut self, covariate: &str, min_count: usize) -> Self {
        let criteria = self.external.take().unwrap_or_default();
        self.external = Some(criteria.then(covariate, min_count));
        self
    }

    /// Standardize every source in parallel; results keep input order.
    pub fn standardize_sources(
        &self,
        sources: &[SourceSpec],
    ) -> Result<Vec<(Dataset, StandardizeReport)>> {
        sources
            .par_iter()
            .map(|s| {
                let out = s
                    .standardizer
                    .standardize(&s.input, &self.subject_id_column, s.site)
                    .map_err(|e| {
                        HarmonizeError::Pipeline(format!(
                            "Standardizing source '{}' ({}) failed: {}",
                            s.name,
                            s.standardizer.format_name(),
                            e
                        ))
                    })?;
                Ok((Dataset::new(&s.name, out.table), out.report))
            })
            .collect()
    }

    /// Run standardization, merge and (if configured) cohort filtering.
    ///
    /// A standardization error in any source aborts the run; sources failing
    /// validation are only excluded from the master table.
    pub fn run(&self, sources: &[SourceSpec], qc_table: Option<&Table>) -> Result<HarmonizeOutput> {
        if self.qc.is_none() && self.external.as_ref().is_some_and(|e| !e.is_empty()) {
            return Err(HarmonizeError::Pipeline(
                "External criteria configured without a QC criterion".to_string(),
            ));
        }
        info!("Harmonizing {} sources ({})", sources.len(), self.name);

        let standardized = self.standardize_sources(sources)?;
        let (datasets, reports): (Vec<Dataset>, Vec<StandardizeReport>) =
            standardized.into_iter().unzip();
        let standardization = datasets
            .iter()
            .map(|d| d.name.clone())
            .zip(reports)
            .collect();

        let merge = merge_datasets(
            &datasets,
            &self.subject_id_column,
            self.policy,
            &self.source_label,
        )?;

        let cohort = match (&self.qc, qc_table) {
            (Some(criterion), Some(qc_table)) => {
                let master = if self.policy == MissingValuePolicy::Drop {
                    let complete = merge.master.drop_incomplete_rows();
                    info!(
                        "Dropped {} incomplete master rows before filtering",
                        merge.master.n_rows() - complete.n_rows()
                    );
                    complete
                } else {
                    merge.master.clone()
                };
                let data = if self.attach_columns.is_empty() {
                    master
                } else {
                    master.attach_columns(
                        &self.subject_id_column,
                        qc_table,
                        &self.subject_id_column,
                        &self.attach_columns,
                    )?
                };
                Some(filter_cohort(
                    &data,
                    &self.subject_id_column,
                    qc_table,
                    criterion,
                    self.external.as_ref(),
                )?)
            }
            (Some(_), None) => {
                return Err(HarmonizeError::Pipeline(
                    "QC criterion configured but no QC table given".to_string(),
                ))
            }
            (None, _) => None,
        };

        Ok(HarmonizeOutput {
            name: self.name.clone(),
            standardization,
            merge,
            cohort,
        })
    }
}
