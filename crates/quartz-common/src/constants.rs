//! System-wide constants for quartzdb.

// =============================================================================
// Page and Memory Constants
// =============================================================================

/// Default page size in bytes (4 KB).
///
/// Matches the typical OS page size; a power of two so page offsets can be
/// computed with shifts.
pub const DEFAULT_PAGE_SIZE: usize = 4 * 1024;

/// Minimum page size in bytes (4 KB).
pub const MIN_PAGE_SIZE: usize = 4 * 1024;

/// Maximum page size in bytes (64 KB).
pub const MAX_PAGE_SIZE: usize = 64 * 1024;

// =============================================================================
// Buffer Pool Constants
// =============================================================================

/// Default number of frames in the buffer pool.
pub const DEFAULT_POOL_SIZE: usize = 1024;

/// Minimum number of frames a buffer pool may be configured with.
pub const MIN_POOL_SIZE: usize = 1;
