//! Error types.

use std::sync::Arc;

/// Boxed error a tracked operation may reject with.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias for configuration handling.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Failure of a tracked bootstrap operation.
///
/// Cloneable so the same failure can sit in the progress state and be
/// handed to the completion callback.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PreloadError {
    /// The tracked operation rejected
    #[error("bootstrap operation failed: {0}")]
    OperationFailed(Arc<dyn std::error::Error + Send + Sync + 'static>),
}

impl PreloadError {
    /// Wrap the rejection of a tracked operation.
    pub fn operation_failed(err: BoxError) -> Self {
        PreloadError::OperationFailed(Arc::from(err))
    }

    /// The value the operation rejected with.
    pub fn reason(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        match self {
            PreloadError::OperationFailed(err) => err.as_ref(),
        }
    }
}

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A field holds a value outside its allowed range
    #[error("invalid value for `{field}`: {reason}")]
    Invalid {
        /// Offending field
        field: &'static str,
        /// Why it was rejected
        reason: String,
    },
}
