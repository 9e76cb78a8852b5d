//! Error types for the disk module.

use std::io;
use std::path::PathBuf;

use quartz_common::types::PageId;
use thiserror::Error;

/// Result type for disk operations.
pub type DiskResult<T> = Result<T, DiskError>;

/// Errors that can occur during disk manager operations.
#[derive(Debug, Error)]
#[allow(missing_docs)] // Fields are documented by variant docs
pub enum DiskError {
    /// Standard I/O error.
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// Data file could not be opened.
    #[error("cannot open data file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Page identifier was never allocated or has been deallocated.
    #[error("page {page_id} is not allocated")]
    NotAllocated { page_id: PageId },

    /// Caller buffer does not match the page size.
    #[error("buffer size mismatch: page size is {page_size}, buffer is {buffer_len}")]
    BufferSize { page_size: usize, buffer_len: usize },

    /// Short read/write (less data than expected).
    #[error("short {operation}: expected {expected} bytes, got {actual}")]
    ShortIo {
        operation: &'static str,
        expected: usize,
        actual: usize,
    },
}

impl DiskError {
    /// Creates a ShortIo error for writes.
    pub fn short_write(expected: usize, actual: usize) -> Self {
        Self::ShortIo {
            operation: "write",
            expected,
            actual,
        }
    }

    /// Creates a buffer size mismatch error.
    pub fn buffer_size(page_size: usize, buffer_len: usize) -> Self {
        Self::BufferSize {
            page_size,
            buffer_len,
        }
    }

    /// Returns true if this error indicates an unallocated page.
    pub fn is_not_allocated(&self) -> bool {
        matches!(self, Self::NotAllocated { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_allocated() {
        let err = DiskError::NotAllocated {
            page_id: PageId::new(7),
        };
        assert!(err.is_not_allocated());
        assert!(!DiskError::short_write(10, 5).is_not_allocated());
    }

    #[test]
    fn test_from_io() {
        let std_err = io::Error::new(io::ErrorKind::Other, "boom");
        let err: DiskError = std_err.into();
        assert!(matches!(err, DiskError::Io { .. }));
    }
}
