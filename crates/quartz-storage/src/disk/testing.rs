//! In-memory disk manager for tests.
//!
//! Keeps every page in a hash map and records each operation in a journal
//! so tests can assert exact I/O traces (e.g. "eviction of a clean page
//! issues no write").

use std::collections::HashMap;

use parking_lot::Mutex;
use quartz_common::types::PageId;

use super::error::{DiskError, DiskResult};
use super::DiskManager;

/// A single recorded disk operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskOp {
    /// A `read_page` call.
    Read(PageId),
    /// A `write_page` call.
    Write(PageId),
    /// An `allocate_page` call and the identifier it returned.
    Allocate(PageId),
    /// A `deallocate_page` call.
    Deallocate(PageId),
}

#[derive(Default)]
struct MemoryState {
    pages: HashMap<PageId, Vec<u8>>,
    next_page_id: u64,
    journal: Vec<DiskOp>,
}

/// A purely in-memory implementation of [`DiskManager`].
///
/// Reading a page that was never allocated is an error; reading an
/// allocated page that was never written returns zeroes, matching the
/// file-backed manager.
pub struct MemoryDiskManager {
    state: Mutex<MemoryState>,
    page_size: usize,
}

impl MemoryDiskManager {
    /// Creates an empty in-memory disk with the given page size.
    pub fn new(page_size: usize) -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            page_size,
        }
    }

    /// Returns a copy of the operation journal.
    pub fn journal(&self) -> Vec<DiskOp> {
        self.state.lock().journal.clone()
    }

    /// Clears the operation journal.
    pub fn clear_journal(&self) {
        self.state.lock().journal.clear();
    }

    /// Number of `write_page` calls recorded for `page_id`.
    pub fn writes_to(&self, page_id: PageId) -> usize {
        self.count(DiskOp::Write(page_id))
    }

    /// Number of `read_page` calls recorded for `page_id`.
    pub fn reads_of(&self, page_id: PageId) -> usize {
        self.count(DiskOp::Read(page_id))
    }

    /// Number of `deallocate_page` calls recorded for `page_id`.
    pub fn deallocations_of(&self, page_id: PageId) -> usize {
        self.count(DiskOp::Deallocate(page_id))
    }

    /// Returns the stored bytes of `page_id`, if the page exists.
    pub fn page_data(&self, page_id: PageId) -> Option<Vec<u8>> {
        self.state.lock().pages.get(&page_id).cloned()
    }

    fn count(&self, op: DiskOp) -> usize {
        self.state.lock().journal.iter().filter(|&&o| o == op).count()
    }

    fn check_buffer(&self, len: usize) -> DiskResult<()> {
        if len != self.page_size {
            return Err(DiskError::buffer_size(self.page_size, len));
        }
        Ok(())
    }
}

impl DiskManager for MemoryDiskManager {
    fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> DiskResult<()> {
        self.check_buffer(buf.len())?;
        let mut state = self.state.lock();
        state.journal.push(DiskOp::Read(page_id));
        match state.pages.get(&page_id) {
            Some(data) => {
                buf.copy_from_slice(data);
                Ok(())
            }
            None => Err(DiskError::NotAllocated { page_id }),
        }
    }

    fn write_page(&self, page_id: PageId, data: &[u8]) -> DiskResult<()> {
        self.check_buffer(data.len())?;
        let mut state = self.state.lock();
        state.journal.push(DiskOp::Write(page_id));
        if !state.pages.contains_key(&page_id) {
            return Err(DiskError::NotAllocated { page_id });
        }
        state.pages.insert(page_id, data.to_vec());
        Ok(())
    }

    fn allocate_page(&self) -> DiskResult<PageId> {
        let mut state = self.state.lock();
        let page_id = PageId::new(state.next_page_id);
        state.next_page_id += 1;
        let zeroed = vec![0u8; self.page_size];
        state.pages.insert(page_id, zeroed);
        state.journal.push(DiskOp::Allocate(page_id));
        Ok(page_id)
    }

    fn deallocate_page(&self, page_id: PageId) -> DiskResult<()> {
        let mut state = self.state.lock();
        state.journal.push(DiskOp::Deallocate(page_id));
        state.pages.remove(&page_id);
        Ok(())
    }

    fn page_size(&self) -> usize {
        self.page_size
    }
}

impl std::fmt::Debug for MemoryDiskManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MemoryDiskManager")
            .field("page_size", &self.page_size)
            .field("pages", &state.pages.len())
            .field("journal_len", &state.journal.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE_SIZE: usize = 4096;

    #[test]
    fn test_allocate_then_write_then_read() {
        let disk = MemoryDiskManager::new(PAGE_SIZE);
        let page_id = disk.allocate_page().unwrap();

        let data = vec![7u8; PAGE_SIZE];
        disk.write_page(page_id, &data).unwrap();

        let mut buf = vec![0u8; PAGE_SIZE];
        disk.read_page(page_id, &mut buf).unwrap();
        assert_eq!(buf, data);
    }

    #[test]
    fn test_read_unallocated_fails() {
        let disk = MemoryDiskManager::new(PAGE_SIZE);
        let mut buf = vec![0u8; PAGE_SIZE];
        let err = disk.read_page(PageId::new(99), &mut buf).unwrap_err();
        assert!(err.is_not_allocated());
    }

    #[test]
    fn test_fresh_page_reads_zeroed() {
        let disk = MemoryDiskManager::new(PAGE_SIZE);
        let page_id = disk.allocate_page().unwrap();
        let mut buf = vec![0xffu8; PAGE_SIZE];
        disk.read_page(page_id, &mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_journal_records_operations() {
        let disk = MemoryDiskManager::new(PAGE_SIZE);
        let page_id = disk.allocate_page().unwrap();
        disk.write_page(page_id, &vec![0u8; PAGE_SIZE]).unwrap();
        let mut buf = vec![0u8; PAGE_SIZE];
        disk.read_page(page_id, &mut buf).unwrap();
        disk.deallocate_page(page_id).unwrap();

        assert_eq!(
            disk.journal(),
            vec![
                DiskOp::Allocate(page_id),
                DiskOp::Write(page_id),
                DiskOp::Read(page_id),
                DiskOp::Deallocate(page_id),
            ]
        );
        assert_eq!(disk.writes_to(page_id), 1);
        assert_eq!(disk.reads_of(page_id), 1);
        assert_eq!(disk.deallocations_of(page_id), 1);
    }

    #[test]
    fn test_deallocate_removes_page() {
        let disk = MemoryDiskManager::new(PAGE_SIZE);
        let page_id = disk.allocate_page().unwrap();
        disk.deallocate_page(page_id).unwrap();
        assert!(disk.page_data(page_id).is_none());
    }
}
