//! Disk management for quartzdb.
//!
//! The disk manager owns the mapping from page identifiers to their
//! on-disk representation. The buffer pool consumes this interface and
//! never touches the data file directly.

mod error;
mod file;
pub mod testing;

pub use error::{DiskError, DiskResult};
pub use file::FileDiskManager;

use quartz_common::types::PageId;

/// Page-granular persistent storage.
///
/// All operations are synchronous and thread-safe; implementations
/// serialize access per page identifier internally.
pub trait DiskManager: Send + Sync {
    /// Reads the page into `buf`. `buf` must be exactly one page long.
    fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> DiskResult<()>;

    /// Persists `data` as the content of the page. `data` must be exactly
    /// one page long.
    fn write_page(&self, page_id: PageId, data: &[u8]) -> DiskResult<()>;

    /// Allocates a fresh page identifier.
    fn allocate_page(&self) -> DiskResult<PageId>;

    /// Releases a page identifier.
    fn deallocate_page(&self, page_id: PageId) -> DiskResult<()>;

    /// Returns the page size this manager was configured with.
    fn page_size(&self) -> usize;
}
