use std::fmt;
use thiserror::Error;

/// Main error type for the disha core
#[derive(Error, Debug)]
pub enum DishaError {
    #[error("Recommendation generator failed: {message}")]
    Generator { message: String },

    #[error("Snapshot persistence failed: {message}")]
    Snapshot { message: String },

    #[error("Cache operation failed: {message}")]
    Cache { message: String },

    #[error("Failed to acquire lock: {message}")]
    LockError { message: String },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl DishaError {
    /// Create a new generator error
    pub fn generator_error(message: impl Into<String>) -> Self {
        Self::Generator {
            message: message.into(),
        }
    }

    /// Create a new snapshot persistence error
    pub fn snapshot_error(message: impl Into<String>) -> Self {
        Self::Snapshot {
            message: message.into(),
        }
    }

    /// Create a new cache error
    pub fn cache_error(message: impl Into<String>) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    /// Create a new lock error
    pub fn lock_error(message: impl Into<String>) -> Self {
        Self::LockError {
            message: message.into(),
        }
    }

    /// Create a new invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a new generic error
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

/// Result type alias using DishaError
pub type DishaResult<T> = Result<T, DishaError>;

/// Extension trait for converting errors to DishaError with context
pub trait ErrorExt<T> {
    /// Convert to DishaResult with added context
    fn with_context(self, message: impl AsRef<str>) -> DishaResult<T>;
}

impl<T, E: fmt::Display> ErrorExt<T> for Result<T, E> {
    fn with_context(self, message: impl AsRef<str>) -> DishaResult<T> {
        self.map_err(|e| DishaError::other(format!("{}: {}", message.as_ref(), e)))
    }
}
