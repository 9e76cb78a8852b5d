//! RAII page guards.
//!
//! Guards hold one pin on a frame and give it back through
//! [`BufferPoolManager::unpin_page`] when dropped, so the replacer
//! bookkeeping stays exact. A write guard remembers whether the holder
//! touched the bytes and reports that at unpin time.

use std::sync::Arc;

use quartz_common::types::PageId;

use super::frame::{FrameId, PageFrame};
use super::pool::BufferPoolManager;

/// Read guard for a pinned page.
pub struct PageReadGuard<'a> {
    pool: &'a BufferPoolManager,
    frame: Arc<PageFrame>,
    page_id: PageId,
}

impl<'a> PageReadGuard<'a> {
    pub(crate) fn new(pool: &'a BufferPoolManager, frame: Arc<PageFrame>, page_id: PageId) -> Self {
        Self {
            pool,
            frame,
            page_id,
        }
    }

    /// Returns the page ID.
    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Returns the frame ID.
    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame.frame_id()
    }

    /// Acquires the frame latch shared and returns the page bytes.
    #[inline]
    pub fn data(&self) -> parking_lot::RwLockReadGuard<'_, Box<[u8]>> {
        self.frame.read_data()
    }
}

impl Drop for PageReadGuard<'_> {
    fn drop(&mut self) {
        self.pool.unpin_page(self.page_id, false);
    }
}

impl std::fmt::Debug for PageReadGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageReadGuard")
            .field("page_id", &self.page_id)
            .field("frame_id", &self.frame.frame_id())
            .finish()
    }
}

/// Write guard for a pinned page.
///
/// Dropping the guard unpins the page, marking it dirty iff the bytes
/// were accessed mutably (or [`mark_dirty`](Self::mark_dirty) was called).
pub struct PageWriteGuard<'a> {
    pool: &'a BufferPoolManager,
    frame: Arc<PageFrame>,
    page_id: PageId,
    modified: bool,
}

impl<'a> PageWriteGuard<'a> {
    pub(crate) fn new(pool: &'a BufferPoolManager, frame: Arc<PageFrame>, page_id: PageId) -> Self {
        Self {
            pool,
            frame,
            page_id,
            modified: false,
        }
    }

    /// Returns the page ID.
    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Returns the frame ID.
    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame.frame_id()
    }

    /// Acquires the frame latch shared and returns the page bytes.
    #[inline]
    pub fn data(&self) -> parking_lot::RwLockReadGuard<'_, Box<[u8]>> {
        self.frame.read_data()
    }

    /// Acquires the frame latch exclusive and returns the page bytes.
    ///
    /// The page will be unpinned dirty.
    #[inline]
    pub fn data_mut(&mut self) -> parking_lot::RwLockWriteGuard<'_, Box<[u8]>> {
        self.modified = true;
        self.frame.write_data()
    }

    /// Marks the page dirty without touching the bytes.
    #[inline]
    pub fn mark_dirty(&mut self) {
        self.modified = true;
    }

    /// Returns true if the page will be unpinned dirty.
    #[inline]
    pub fn is_modified(&self) -> bool {
        self.modified
    }
}

impl Drop for PageWriteGuard<'_> {
    fn drop(&mut self) {
        self.pool.unpin_page(self.page_id, self.modified);
    }
}

impl std::fmt::Debug for PageWriteGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageWriteGuard")
            .field("page_id", &self.page_id)
            .field("frame_id", &self.frame.frame_id())
            .field("modified", &self.modified)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::super::config::BufferPoolConfig;
    use super::*;
    use crate::disk::testing::MemoryDiskManager;
    use crate::disk::DiskManager;
    use crate::wal::LogManager;

    const PAGE_SIZE: usize = 4096;

    fn test_pool(pool_size: usize) -> (Arc<MemoryDiskManager>, BufferPoolManager) {
        let disk = Arc::new(MemoryDiskManager::new(PAGE_SIZE));
        let pool = BufferPoolManager::new(
            BufferPoolConfig::new(pool_size).with_page_size(PAGE_SIZE),
            Arc::clone(&disk) as Arc<dyn DiskManager>,
            Arc::new(LogManager::new()),
        )
        .unwrap();
        (disk, pool)
    }

    #[test]
    fn test_read_guard_unpins_on_drop() {
        let (_disk, pool) = test_pool(2);
        let (page_id, _) = pool.new_page().unwrap();
        pool.unpin_page(page_id, false);

        {
            let _guard = pool.fetch_page_read(page_id).unwrap();
            assert_eq!(pool.stats().pinned_frames, 1);
        }
        assert_eq!(pool.stats().pinned_frames, 0);
        assert_eq!(pool.stats().evictable_frames, 1);
    }

    #[test]
    fn test_write_guard_marks_dirty_only_when_written() {
        let (_disk, pool) = test_pool(2);
        let (page_id, _) = pool.new_page().unwrap();
        pool.unpin_page(page_id, false);

        // Untouched write guard leaves the page clean.
        {
            let _guard = pool.fetch_page_write(page_id).unwrap();
        }
        assert_eq!(pool.stats().dirty_frames, 0);

        {
            let mut guard = pool.fetch_page_write(page_id).unwrap();
            guard.data_mut()[0] = 9;
            assert!(guard.is_modified());
        }
        assert_eq!(pool.stats().dirty_frames, 1);
    }

    #[test]
    fn test_write_guard_roundtrip() {
        let (_disk, pool) = test_pool(2);
        let page_id = {
            let mut guard = pool.new_page_write().unwrap();
            guard.data_mut()[0..3].copy_from_slice(b"abc");
            guard.page_id()
        };

        let guard = pool.fetch_page_read(page_id).unwrap();
        assert_eq!(&guard.data()[0..3], b"abc");
    }

    #[test]
    fn test_mark_dirty_without_write() {
        let (_disk, pool) = test_pool(2);
        let (page_id, _) = pool.new_page().unwrap();
        pool.unpin_page(page_id, false);

        {
            let mut guard = pool.fetch_page_write(page_id).unwrap();
            guard.mark_dirty();
        }
        assert_eq!(pool.stats().dirty_frames, 1);
    }
}
