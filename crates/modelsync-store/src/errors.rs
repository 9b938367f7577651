//! Error handling for modelsync-store
//!
//! Wraps modelsync-core ExError with store-specific helpers

use modelsync_core::errors::{ExError, ExErrorKind};

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

/// Create an IO error
pub fn io_error(operation: &str, err: std::io::Error) -> ExError {
    ExError::new(ExErrorKind::Io)
        .with_op(operation.to_string())
        .with_message(err.to_string())
}

/// Create a YAML (de)serialization error
pub fn yaml_error(operation: &str, err: serde_yaml::Error) -> ExError {
    ExError::new(ExErrorKind::Serialization)
        .with_op(operation.to_string())
        .with_message(err.to_string())
}

/// A project file whose content does not form a valid project
pub fn invalid_project_file(project: &str, reason: impl Into<String>) -> ExError {
    ExError::new(ExErrorKind::Serialization)
        .with_op("load_project")
        .with_project(project.to_string())
        .with_message(reason)
}

/// Wrap the failure of one step of a batch; storage was restored
pub fn batch_failed(cause: ExError) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("persist")
        .with_message(format!("batch rolled back: {}", cause.message()))
        .with_source(cause)
}
