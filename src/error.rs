//! Error types for the roi-harmonize library.

use thiserror::Error;

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum HarmonizeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("No FreeSurfer region mapped to CIVET region code '{code}' (column '{column}')")]
    Mapping { code: String, column: String },

    #[error("Column set mismatch: missing {missing:?}, unexpected {unexpected:?}")]
    SchemaMismatch {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    #[error("Table contains {n_missing} missing values and the missing-value policy rejects them")]
    MissingDataPolicyViolation { n_missing: usize },

    #[error("Unrecognized hemisphere prefix in column '{0}'")]
    UnrecognizedPrefix(String),

    #[error("Malformed column name '{column}': {reason}")]
    MalformedColumn { column: String, reason: String },

    #[error("Duplicate column '{0}'")]
    DuplicateColumn(String),

    #[error("Duplicate subject '{subject}' in column '{column}'")]
    DuplicateSubject { subject: String, column: String },

    #[error("Missing column '{0}'")]
    MissingColumn(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Empty data: {0}")]
    EmptyData(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, HarmonizeError>;
