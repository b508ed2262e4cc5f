//! Multi-pipeline ROI harmonization.
//!
//! Turns the cortical-thickness outputs of several neuroimaging pipelines
//! (CIVET, ANTs, FreeSurfer 5.x, FreeSurfer 6.0) into a single long-format
//! master table with a canonical `{L|R}_{region}` schema, then filters it to
//! an analysis-ready cohort.
//!
//! # Overview
//!
//! - **data**: Tabular values, CSV I/O and named datasets
//! - **standardize**: Per-pipeline column renaming and subject-ID normalization
//! - **validate**: Schema and missing-value checks before merging
//! - **merge**: Subject/ROI intersection and the stacked master table
//! - **filter**: QC and minimum-group-size cohort filtering
//! - **pipeline**: YAML configuration and the end-to-end runner
//!
//! # Example
//!
//! ```no_run
//! use roi_harmonize::prelude::*;
//!
//! let fs = Table::from_csv("fs53.csv", &CsvOptions::default().text_column("SubjID")).unwrap();
//! let ants = Table::from_csv("ants.csv", &CsvOptions::default().text_column("Structure Name")).unwrap();
//! let qc = Table::from_csv("qc.csv", &CsvOptions::default().text_column("SubjID")).unwrap();
//!
//! let output = Harmonizer::new()
//!     .missing_values(MissingValuePolicy::Drop)
//!     .qc(QcCriterion::new("manual_qc", [1i64]))
//!     .attach_column("SITE_ID")
//!     .min_count("SITE_ID", 20)
//!     .run(
//!         &[
//!             SourceSpec::single("FS53", Standardizer::FreeSurfer5, fs),
//!             SourceSpec::single("ANTs", Standardizer::Ants, ants),
//!         ],
//!         Some(&qc),
//!     )
//!     .unwrap();
//! output.final_table().to_csv("master_filtered.csv").unwrap();
//! ```

pub mod data;
pub mod error;
pub mod filter;
pub mod merge;
pub mod pipeline;
pub mod standardize;
pub mod validate;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::data::{CsvOptions, Dataset, Table, Value};
    pub use crate::error::{HarmonizeError, Result};
    pub use crate::filter::{
        filter_cohort, filter_min_count, filter_qc, CohortFilterResult, CovariateRule,
        ExternalCriteria, QcCriterion,
    };
    pub use crate::merge::{merge_datasets, MergeResult, SourceReport};
    pub use crate::pipeline::{
        HarmonizeConfig, HarmonizeOutput, HarmonizeSummary, Harmonizer, SourceSpec,
    };
    pub use crate::standardize::{
        standardize_ants, standardize_civet, standardize_freesurfer5, standardize_freesurfer6,
        Fs60Atlas, RawInput, RoiLookup, SiteLabel, StandardizeReport, Standardized,
        Standardizer,
    };
    pub use crate::validate::{validate_dataset, MissingValuePolicy, ValidationReport};
}
