//! Error types shared by the analysis pipelines, the CSV adapter and the result store

use chrono::NaiveDateTime;
use linfa_clustering::KMeansError;
use polars::prelude::PolarsError;
use thiserror::Error;

/// Coarse classification of an [`AnalysisError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller-supplied parameter outside its contract.
    Validation,
    /// Internal inconsistency; indicates a defect rather than bad input.
    Computation,
    /// Input dataset could not be read or normalized.
    Ingest,
    /// Result store or configuration file failure.
    Storage,
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("minimum support must be in (0, 1], got {0}")]
    InvalidMinSupport(f64),

    #[error("minimum confidence must be in [0, 1], got {0}")]
    InvalidMinConfidence(f64),

    #[error("number of clusters must be at least 2, got {0}")]
    TooFewClusters(usize),

    #[error("number of clusters ({clusters}) exceeds number of customers ({customers})")]
    TooManyClusters { clusters: usize, customers: usize },

    #[error("reference date {reference} precedes last purchase {last_purchase} of customer {customer_id}")]
    ReferenceBeforeLastPurchase {
        customer_id: String,
        reference: NaiveDateTime,
        last_purchase: NaiveDateTime,
    },

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("internal computation failure: {0}")]
    Computation(String),

    #[error("clustering failed: {0}")]
    Clustering(#[from] KMeansError),

    #[error("polars error: {0}")]
    Polars(#[from] PolarsError),

    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumn(Vec<String>),

    #[error("row {row}: missing value for column {column}")]
    MissingValue { row: usize, column: &'static str },

    #[error("row {row}: unrecognised timestamp {value:?}")]
    InvalidTimestamp { row: usize, value: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),
}

impl AnalysisError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidMinSupport(_)
            | Self::InvalidMinConfidence(_)
            | Self::TooFewClusters(_)
            | Self::TooManyClusters { .. }
            | Self::ReferenceBeforeLastPurchase { .. }
            | Self::InvalidParameter { .. } => ErrorKind::Validation,
            Self::Computation(_) | Self::Clustering(_) => ErrorKind::Computation,
            Self::Polars(_)
            | Self::MissingColumn(_)
            | Self::MissingValue { .. }
            | Self::InvalidTimestamp { .. } => ErrorKind::Ingest,
            Self::Io(_) | Self::Json(_) | Self::Config(_) => ErrorKind::Storage,
        }
    }

    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }
}

/// Result type used throughout the library.
pub type Result<T> = std::result::Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(AnalysisError::InvalidMinSupport(0.0).kind(), ErrorKind::Validation);
        assert_eq!(
            AnalysisError::TooManyClusters { clusters: 5, customers: 2 }.kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            AnalysisError::Computation("zero denominator".into()).kind(),
            ErrorKind::Computation
        );
        assert_eq!(
            AnalysisError::MissingColumn(vec!["date".into()]).kind(),
            ErrorKind::Ingest
        );
    }

    #[test]
    fn test_missing_column_message() {
        let err = AnalysisError::MissingColumn(vec!["date".into(), "product".into()]);
        assert_eq!(err.to_string(), "missing required columns: date, product");
    }
}
