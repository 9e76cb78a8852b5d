//! Core identifier types for quartzdb.
//!
//! Thin newtypes so a page identifier and a log sequence number can never
//! be swapped for one another or for a bare integer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Page identifier.
///
/// Handed out by the disk manager on allocation; the buffer pool treats it
/// as opaque. [`PageId::INVALID`] marks a frame that holds no page.
///
/// # Example
///
/// ```rust
/// use quartz_common::types::PageId;
///
/// let page = PageId::new(42);
/// assert!(page.is_valid());
/// assert!(!PageId::INVALID.is_valid());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct PageId(u64);

impl PageId {
    /// Sentinel for "no page".
    pub const INVALID: Self = Self(u64::MAX);

    /// Wraps a raw identifier.
    #[inline]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Unwraps to the raw identifier.
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// True unless this is the [`INVALID`](Self::INVALID) sentinel.
    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 != Self::INVALID.0
    }
}

impl fmt::Debug for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::INVALID => f.write_str("PageId(INVALID)"),
            Self(id) => write!(f, "PageId({id})"),
        }
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Log sequence number.
///
/// Monotonically increasing position in the write-ahead log. The buffer
/// pool stores the LSN of a frame's last modification but never interprets
/// it.
///
/// # Example
///
/// ```rust
/// use quartz_common::types::Lsn;
///
/// let lsn = Lsn::new(1000);
/// assert!(lsn > Lsn::INVALID);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Lsn(u64);

impl Lsn {
    /// Sentinel for "no log record".
    pub const INVALID: Self = Self(0);

    /// First LSN a log manager hands out.
    pub const FIRST: Self = Self(1);

    /// Wraps a raw sequence number.
    #[inline]
    pub const fn new(lsn: u64) -> Self {
        Self(lsn)
    }

    /// Unwraps to the raw sequence number.
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// True unless this is the [`INVALID`](Self::INVALID) sentinel.
    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 != Self::INVALID.0
    }
}

impl fmt::Debug for Lsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::INVALID => f.write_str("Lsn(INVALID)"),
            Self(lsn) => write!(f, "Lsn({lsn})"),
        }
    }
}

impl fmt::Display for Lsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
