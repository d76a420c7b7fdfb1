//! Error types for network construction and data transformation.

use thiserror::Error;

/// Main error type for model construction and data-pipeline operations.
#[derive(Error, Debug)]
pub enum ModelError {
    /// The topology record fails a construction-time value check.
    #[error("Invalid topology: {0}")]
    InvalidTopology(String),

    /// Incoming data cannot be laid out as declared by the topology.
    #[error("Incompatible data: expected {expected:?}, got {actual:?}")]
    IncompatibleData {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// A transformation that needs the padding plan ran before any input
    /// passed through `transform_before_prediction`.
    #[error("Padding plan not ready: no input has been transformed yet")]
    PlanNotReady,
}

/// Result type for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;

impl ModelError {
    /// Create an invalid-topology error.
    pub fn invalid_topology(msg: impl Into<String>) -> Self {
        Self::InvalidTopology(msg.into())
    }

    /// Create an incompatible-data error.
    pub fn incompatible_data(expected: Vec<usize>, actual: Vec<usize>) -> Self {
        Self::IncompatibleData { expected, actual }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = ModelError::invalid_topology("zero channels");
        assert!(matches!(err, ModelError::InvalidTopology(_)));
    }

    #[test]
    fn test_error_display() {
        let err = ModelError::invalid_topology("zero channels");
        assert_eq!(err.to_string(), "Invalid topology: zero channels");
    }

    #[test]
    fn test_incompatible_data_display() {
        let err = ModelError::incompatible_data(vec![1, 10, 10, 10, 1], vec![12, 10, 10]);
        let err_str = err.to_string();
        assert!(err_str.contains("expected"));
        assert!(err_str.contains("got"));
    }
}
