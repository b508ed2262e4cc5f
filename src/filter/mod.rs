//! Cohort filtering by QC labels and minimum group sizes.

pub mod cohort;
pub mod criteria;
pub mod min_count;
pub mod qc;

pub use cohort::{filter_cohort, CohortFilterResult, CohortFilterSummary};
pub use criteria::{CovariateRule, ExternalCriteria, QcCriterion};
pub use min_count::{filter_min_count, CovariateStageReport, LevelCount};
pub use qc::{filter_qc, QcStageReport};
