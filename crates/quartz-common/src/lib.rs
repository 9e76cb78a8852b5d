//! # quartz-common
//!
//! Common types and constants for quartzdb.
//!
//! This crate provides the foundational types used across all quartzdb
//! components:
//!
//! - **Types**: core identifiers (`PageId`, `Lsn`)
//! - **Constants**: page and buffer-pool sizing
//!
//! ## Example
//!
//! ```rust
//! use quartz_common::types::{Lsn, PageId};
//!
//! let page_id = PageId::new(42);
//! assert!(page_id.is_valid());
//! assert!(!Lsn::INVALID.is_valid());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod constants;
pub mod types;

// Re-export commonly used items at the crate root
pub use constants::*;
pub use types::{Lsn, PageId};
