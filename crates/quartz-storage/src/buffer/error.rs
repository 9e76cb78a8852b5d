//! Buffer pool errors.

use thiserror::Error;

use crate::disk::DiskError;

/// Result type for buffer pool operations.
pub type BufferResult<T> = Result<T, BufferError>;

/// Errors that can occur during buffer pool operations.
#[derive(Debug, Error)]
#[allow(missing_docs)] // Fields are documented by variant docs
pub enum BufferError {
    /// Every frame is pinned; nothing can be evicted.
    #[error("pool exhausted: all frames are pinned")]
    PoolExhausted,

    /// Disk I/O failed; propagated unchanged from the disk manager.
    #[error("disk error: {0}")]
    Disk(#[from] DiskError),

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl BufferError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Returns true if this is a transient error that can be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::PoolExhausted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_retryable() {
        assert!(BufferError::PoolExhausted.is_retryable());
        assert!(!BufferError::config("bad").is_retryable());
    }

    #[test]
    fn test_disk_error_conversion() {
        let err: BufferError = DiskError::short_write(10, 5).into();
        assert!(matches!(err, BufferError::Disk(_)));
    }
}
