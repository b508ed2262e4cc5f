//! Run composition: configuration and the standardize → merge → filter runner.

mod config;
mod runner;

pub use config::{HarmonizeConfig, QcConfig, SourceConfig, SourceFormat};
pub use runner::{
    Harmonizer, HarmonizeOutput, HarmonizeSummary, SourceSpec, SourceStandardization,
};
