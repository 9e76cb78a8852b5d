//! # quartz-storage
//!
//! Storage engine core for quartzdb.
//!
//! This crate implements the page-oriented storage layer:
//! - Disk management with page-granular I/O
//! - Write-ahead log sink
//! - Buffer pool with CLOCK replacement and dirty write-back

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Buffer pool management
pub mod buffer;

/// Disk management and page I/O
pub mod disk;

/// Write-ahead log sink
pub mod wal;
