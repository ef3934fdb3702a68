//! Error types shared by every pipeline stage.
//!
//! Each variant names the stage or source it came from so a failed run can be
//! diagnosed without re-running it.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while cleaning, aligning, merging or modelling data.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The backing file or table of a source does not exist.
    #[error("source '{source_name}' not found at {}", path.display())]
    SourceNotFound { source_name: String, path: PathBuf },

    /// A rule required a column type the dataset does not provide.
    #[error("{stage}: column '{column}' has type {found}, expected {expected}")]
    SchemaMismatch {
        stage: String,
        column: String,
        expected: String,
        found: String,
    },

    /// A value in the date column could not be parsed to a calendar date.
    #[error("cannot parse '{value}' in column '{column}' (row {row}) as a date")]
    DateParseError {
        column: String,
        row: usize,
        value: String,
    },

    /// Two merge inputs carry the same non-key column.
    #[error("column '{column}' appears in more than one merge input; rename it before merging")]
    ColumnCollision { column: String },

    /// Feature resolution produced nothing to train on.
    #[error("no usable features for target '{target}'")]
    NoUsableFeatures { target: String },

    /// A stage ran out of rows.
    #[error("{stage}: insufficient data ({reason})")]
    InsufficientData { stage: String, reason: String },

    /// The (problem kind, algorithm) pair is not in the supported set.
    #[error("algorithm '{algorithm}' is not supported for {kind}")]
    UnsupportedAlgorithm { kind: String, algorithm: String },

    /// No serialized model exists at the requested location.
    #[error("model file not found at {}", path.display())]
    ModelNotFound { path: PathBuf },

    /// Evaluate, predict or save called before the model was trained.
    #[error("model has not been trained; call train() first")]
    ModelNotTrained,

    /// A configuration value is out of range or inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Polars(#[from] polars::prelude::PolarsError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl PipelineError {
    pub(crate) fn schema_mismatch(
        stage: &str,
        column: &str,
        expected: &str,
        found: impl ToString,
    ) -> Self {
        PipelineError::SchemaMismatch {
            stage: stage.to_string(),
            column: column.to_string(),
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    pub(crate) fn insufficient(stage: &str, reason: impl Into<String>) -> Self {
        PipelineError::InsufficientData {
            stage: stage.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_context() {
        let err = PipelineError::SourceNotFound {
            source_name: "traffic".to_string(),
            path: PathBuf::from("/data/raw/traffic.csv"),
        };
        let msg = err.to_string();
        assert!(msg.contains("traffic"));
        assert!(msg.contains("/data/raw/traffic.csv"));

        let err = PipelineError::schema_mismatch("clean", "Mes", "String", "Int64");
        assert_eq!(
            err.to_string(),
            "clean: column 'Mes' has type Int64, expected String"
        );
    }

    #[test]
    fn test_date_parse_error_names_row() {
        let err = PipelineError::DateParseError {
            column: "time".to_string(),
            row: 3,
            value: "2020-13-01".to_string(),
        };
        assert!(err.to_string().contains("row 3"));
    }
}
