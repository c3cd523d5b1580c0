//! Error handling for the elide driver.
//!
//! Everything here is a problem with the user's input files or
//! configuration. Failures inside the pass itself never surface as errors:
//! the affected method falls back to keeping every barrier.

use elide_ir::GraphError;
use thiserror::Error;

/// Main error type for the elide driver.
#[derive(Error, Debug)]
pub enum DriverError {
    /// Configuration file missing, unreadable or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Method description names a value before defining it.
    #[error("Undefined value '{name}' in method {method}")]
    UndefinedValue { method: String, name: String },

    /// Method description defines the same value name twice.
    #[error("Duplicate value '{name}' in method {method}")]
    DuplicateValue { method: String, name: String },

    /// Method description does not form a valid graph.
    #[error("Invalid method {method}: {source}")]
    Graph {
        method: String,
        #[source]
        source: GraphError,
    },

    /// Error when IO operations fail.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error when JSON deserialization fails.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias using DriverError.
pub type Result<T> = std::result::Result<T, DriverError>;

#[cfg(test)]
mod tests {
    use super::*;
    use elide_ir::BlockId;

    #[test]
    fn test_config_error_display() {
        let err = DriverError::Config("missing file".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing file");
    }

    #[test]
    fn test_undefined_value_display() {
        let err = DriverError::UndefinedValue {
            method: "A.b".to_string(),
            name: "x".to_string(),
        };
        assert_eq!(err.to_string(), "Undefined value 'x' in method A.b");
    }

    #[test]
    fn test_graph_error_display() {
        let err = DriverError::Graph {
            method: "A.b".to_string(),
            source: GraphError::NoPredecessors(BlockId(1)),
        };
        assert_eq!(
            err.to_string(),
            "Invalid method A.b: Malformed graph: block bb1 has no predecessors"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: DriverError = io.into();
        assert!(matches!(err, DriverError::Io(_)));
    }
}
