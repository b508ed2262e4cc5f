//! YAML run configuration.

use super::runner::SourceSpec;
use crate::data::{CsvOptions, Table, Value};
use crate::error::{HarmonizeError, Result};
use crate::filter::{ExternalCriteria, QcCriterion};
use crate::merge::DEFAULT_SOURCE_LABEL;
use crate::standardize::{
    Fs60Atlas, Hemisphere, RawInput, RoiLookup, SiteLabel, Standardizer, STRUCTURE_NAME_COLUMN,
};
use crate::validate::MissingValuePolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

fn default_subject_id_column() -> String {
    "SubjID".to_string()
}

fn default_source_label() -> String {
    DEFAULT_SOURCE_LABEL.to_string()
}

fn default_code_column() -> String {
    RoiLookup::DEFAULT_CODE_COLUMN.to_string()
}

fn default_name_column() -> String {
    RoiLookup::DEFAULT_NAME_COLUMN.to_string()
}

fn default_delimiter() -> char {
    ','
}

/// Pipeline format of a source and its format-specific inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceFormat {
    Civet {
        /// CIVET-to-FreeSurfer region lookup table.
        lookup: PathBuf,
        #[serde(default = "default_code_column")]
        code_column: String,
        #[serde(default = "default_name_column")]
        name_column: String,
    },
    Ants,
    Freesurfer5,
    Freesurfer6 {
        #[serde(default)]
        atlas: Fs60Atlas,
    },
}

/// One source pipeline's output files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Source name; becomes the row label in the master table.
    pub name: String,
    pub format: SourceFormat,
    /// Single table (all formats except FreeSurfer 6.0).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Left-hemisphere table (FreeSurfer 6.0).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<PathBuf>,
    /// Right-hemisphere table (FreeSurfer 6.0).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<PathBuf>,
    #[serde(default)]
    pub site_label: SiteLabel,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

/// QC table and the criterion applied to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QcConfig {
    /// QC / phenotype table keyed by the subject-ID column.
    pub table: PathBuf,
    /// QC column.
    pub column: String,
    /// Accepted QC values.
    pub accepted: Vec<Value>,
    /// QC-table columns copied onto the master table before filtering
    /// (e.g. a site column used by the external criteria).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attach_columns: Vec<String>,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

impl QcConfig {
    /// The QC criterion described by this configuration.
    pub fn criterion(&self) -> QcCriterion {
        QcCriterion {
            column: self.column.clone(),
            accepted: self.accepted.clone(),
        }
    }
}

/// Full harmonization run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarmonizeConfig {
    /// Name of the run.
    pub name: String,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_subject_id_column")]
    pub subject_id_column: String,
    #[serde(default = "default_source_label")]
    pub source_label: String,
    /// `drop`, `ignore`; anything else (or nothing) rejects sources with
    /// missing values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_values: Option<String>,
    pub sources: Vec<SourceConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qc: Option<QcConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_criteria: Option<ExternalCriteria>,
}

impl HarmonizeConfig {
    /// Load from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(HarmonizeError::from)
    }

    /// Save to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(HarmonizeError::from)
    }

    /// Load from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    /// Parsed missing-value policy.
    pub fn missing_value_policy(&self) -> MissingValuePolicy {
        MissingValuePolicy::from_label(self.missing_values.as_deref())
    }

    /// Read every source's tables; relative paths resolve against `base_dir`.
    pub fn load_sources(&self, base_dir: &Path) -> Result<Vec<SourceSpec>> {
        self.sources
            .iter()
            .map(|s| s.load(base_dir, &self.subject_id_column))
            .collect()
    }

    /// Read the QC table, if configured.
    pub fn load_qc_table(&self, base_dir: &Path) -> Result<Option<Table>> {
        self.qc
            .as_ref()
            .map(|qc| {
                let options = csv_options(qc.delimiter)?.text_column(&self.subject_id_column);
                Table::from_csv(base_dir.join(&qc.table), &options)
            })
            .transpose()
    }
}

impl SourceConfig {
    fn load(&self, base_dir: &Path, subject_id_column: &str) -> Result<SourceSpec> {
        let read = |path: &Option<PathBuf>, field: &str, id_column: &str| -> Result<Table> {
            let path = path.as_ref().ok_or_else(|| {
                HarmonizeError::InvalidParameter(format!(
                    "Source '{}' needs a '{}' path",
                    self.name, field
                ))
            })?;
            let options = csv_options(self.delimiter)?.text_column(id_column);
            Table::from_csv(base_dir.join(path), &options)
        };

        let (standardizer, input) = match &self.format {
            SourceFormat::Civet {
                lookup,
                code_column,
                name_column,
            } => {
                let options = csv_options(self.delimiter)?.text_column(code_column);
                let lookup_table = Table::from_csv(base_dir.join(lookup), &options)?;
                let lookup = RoiLookup::from_table(&lookup_table, code_column, name_column)?;
                (
                    Standardizer::Civet(lookup),
                    RawInput::Single(read(&self.path, "path", subject_id_column)?),
                )
            }
            SourceFormat::Ants => (
                Standardizer::Ants,
                RawInput::Single(read(&self.path, "path", STRUCTURE_NAME_COLUMN)?),
            ),
            SourceFormat::Freesurfer5 => (
                Standardizer::FreeSurfer5,
                RawInput::Single(read(&self.path, "path", subject_id_column)?),
            ),
            SourceFormat::Freesurfer6 { atlas } => (
                Standardizer::FreeSurfer6 {
                    atlas: atlas.clone(),
                },
                RawInput::Hemispheres {
                    left: read(&self.left, "left", &atlas.subject_column(Hemisphere::Left))?,
                    right: read(&self.right, "right", &atlas.subject_column(Hemisphere::Right))?,
                },
            ),
        };

        Ok(SourceSpec {
            name: self.name.clone(),
            standardizer,
            input,
            site: self.site_label,
        })
    }
}

fn csv_options(delimiter: char) -> Result<CsvOptions> {
    if !delimiter.is_ascii() {
        return Err(HarmonizeError::InvalidParameter(format!(
            "Delimiter '{}' is not a single ASCII character",
            delimiter
        )));
    }
    Ok(CsvOptions {
        delimiter: delimiter as u8,
        ..CsvOptions::default()
    })
}
