//! Error taxonomy for the scoring pipeline.
//!
//! Every variant is fatal to a run. Each carries enough context (path, column,
//! row range) to locate the failure without re-running.

use std::ops::Range;
use std::path::PathBuf;
use thiserror::Error;

/// A type alias for `Result<T, rexprt_scorer::ScoringError>`.
pub type Result<T> = std::result::Result<T, ScoringError>;

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("model artifact not found: {}", path.display())]
    ArtifactNotFound { path: PathBuf },

    #[error("model artifact {} is unusable: {reason}", path.display())]
    ArtifactCorrupt { path: PathBuf, reason: String },

    #[error("required column '{column}' is missing from the record table")]
    MissingColumn { column: String },

    #[error("column '{column}', row {row}: value '{value}' is not numeric")]
    InvalidFeatureType {
        column: String,
        row: usize,
        value: String,
    },

    #[error("{model} scoring failed for rows {}..{}: {cause:#}", range.start, range.end)]
    ScoringFailure {
        model: String,
        range: Range<usize>,
        cause: anyhow::Error,
    },

    #[error("length mismatch: {left} has {left_len} rows, {right} has {right_len}")]
    LengthMismatch {
        left: &'static str,
        left_len: usize,
        right: &'static str,
        right_len: usize,
    },

    #[error("failed to write {}: {source}", path.display())]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {}: {source}", path.display())]
    IoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}:{line}: {reason}", path.display())]
    MalformedTable {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("input already contains derived column '{0}'")]
    ReservedColumn(String),

    #[error("column '{0}' appears more than once in the header")]
    DuplicateColumn(String),

    #[error("batch size must be at least 1")]
    InvalidBatchSize,

    #[error("scoring worker failed: {0}")]
    Worker(String),
}

impl ScoringError {
    /// Short name of the pipeline stage that raised this error.
    pub fn stage(&self) -> &'static str {
        match self {
            ScoringError::ArtifactNotFound { .. } | ScoringError::ArtifactCorrupt { .. } => {
                "model loading"
            }
            ScoringError::MissingColumn { .. } | ScoringError::InvalidFeatureType { .. } => {
                "feature extraction"
            }
            ScoringError::ScoringFailure { .. }
            | ScoringError::InvalidBatchSize
            | ScoringError::Worker(_) => "batch scoring",
            ScoringError::LengthMismatch { .. } => "ensemble combination",
            ScoringError::IoWrite { .. } => "result writing",
            ScoringError::IoRead { .. }
            | ScoringError::MalformedTable { .. }
            | ScoringError::ReservedColumn(_)
            | ScoringError::DuplicateColumn(_) => "table loading",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoring_failure_reports_range() {
        let err = ScoringError::ScoringFailure {
            model: "svm".to_string(),
            range: 20..30,
            cause: anyhow::anyhow!("session exploded"),
        };

        let msg = err.to_string();
        assert!(msg.contains("rows 20..30"));
        assert!(msg.contains("session exploded"));
        assert_eq!(err.stage(), "batch scoring");
    }

    #[test]
    fn test_missing_column_names_column() {
        let err = ScoringError::MissingColumn {
            column: "gerp".to_string(),
        };
        assert!(err.to_string().contains("'gerp'"));
        assert_eq!(err.stage(), "feature extraction");
    }
}
