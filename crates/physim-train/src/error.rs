//! Error types for training sessions and parameter persistence.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for session configuration and training operations.
#[derive(Error, Debug)]
pub enum TrainError {
    /// Topology or pipeline failure from the model layer.
    #[error(transparent)]
    Model(#[from] physim_model::ModelError),

    /// Inconsistent session description.
    #[error("Invalid session: {0}")]
    InvalidSession(String),

    /// The configured network directory does not exist.
    #[error("Network directory not found: {path:?}")]
    NetworkDirMissing { path: PathBuf },

    /// No parameter record inside the network directory.
    #[error("No saved parameters in {path:?}")]
    NoSavedParameters { path: PathBuf },

    /// The requested index does not select one of the saved records.
    #[error("{found} parameter records in {path:?}, index {requested} selects none")]
    AmbiguousSavedParameters {
        path: PathBuf,
        found: usize,
        requested: usize,
    },

    /// Persistence failure raised by the record format.
    #[error("Record error: {0}")]
    Record(#[from] burn::record::RecorderError),

    /// Filesystem failure while discovering parameter records.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An update was requested from a session built without an optimizer.
    #[error("Optimizer unavailable: session configured without a learning rate")]
    OptimizerUnavailable,
}

/// Result type for training operations.
pub type Result<T> = std::result::Result<T, TrainError>;

impl TrainError {
    /// Create an invalid session error.
    pub fn invalid_session(msg: impl Into<String>) -> Self {
        Self::InvalidSession(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = TrainError::invalid_session("missing learning rate");
        assert!(matches!(err, TrainError::InvalidSession(_)));
    }

    #[test]
    fn test_error_display() {
        let err = TrainError::invalid_session("missing learning rate");
        assert_eq!(err.to_string(), "Invalid session: missing learning rate");
    }

    #[test]
    fn test_model_error_passthrough() {
        let err = TrainError::from(physim_model::ModelError::PlanNotReady);
        assert!(err.to_string().contains("plan"));
    }

    #[test]
    fn test_ambiguous_records_display() {
        let err = TrainError::AmbiguousSavedParameters {
            path: PathBuf::from("nets"),
            found: 2,
            requested: 5,
        };
        let err_str = err.to_string();
        assert!(err_str.contains("2 parameter records"));
        assert!(err_str.contains("index 5"));
    }
}
