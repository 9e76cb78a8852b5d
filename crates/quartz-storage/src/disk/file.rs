//! File-backed disk manager.
//!
//! Pages live at `page_id * page_size` offsets in a single data file. All
//! file access goes through a mutex-guarded handle; callers (the buffer
//! pool) already serialize per-page access, the mutex only keeps the
//! seek/read pairs atomic.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use quartz_common::types::PageId;

use super::error::{DiskError, DiskResult};
use super::DiskManager;

/// Synchronous page-granular file storage.
pub struct FileDiskManager {
    /// The underlying data file, guarded for seek/read atomicity.
    file: Mutex<File>,
    /// The data file path.
    path: PathBuf,
    /// Page size in bytes.
    page_size: usize,
    /// Next page identifier to hand out.
    next_page_id: AtomicU64,
}

impl FileDiskManager {
    /// Opens (or creates) the data file at `path`.
    ///
    /// Page allocation resumes after the highest page the existing file
    /// already covers.
    pub fn open(path: impl AsRef<Path>, page_size: usize) -> DiskResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)
            .map_err(|e| DiskError::Open {
                path: path.clone(),
                source: e,
            })?;

        let len = file.metadata().map(|m| m.len()).unwrap_or(0);
        let next_page_id = len.div_ceil(page_size as u64);

        Ok(Self {
            file: Mutex::new(file),
            path,
            page_size,
            next_page_id: AtomicU64::new(next_page_id),
        })
    }

    /// Returns the data file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flushes file contents and metadata to the underlying device.
    pub fn sync(&self) -> DiskResult<()> {
        self.file.lock().sync_all()?;
        Ok(())
    }

    fn offset_of(&self, page_id: PageId) -> u64 {
        page_id.as_u64() * self.page_size as u64
    }

    fn check_buffer(&self, len: usize) -> DiskResult<()> {
        if len != self.page_size {
            return Err(DiskError::buffer_size(self.page_size, len));
        }
        Ok(())
    }
}

impl DiskManager for FileDiskManager {
    fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> DiskResult<()> {
        self.check_buffer(buf.len())?;

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(self.offset_of(page_id)))?;

        let mut total = 0;
        while total < buf.len() {
            match file.read(&mut buf[total..]) {
                Ok(0) => break,
                Ok(n) => total += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        // A page that was allocated but never written reads back as zeroes.
        if total < buf.len() {
            tracing::warn!(
                page_id = page_id.as_u64(),
                read = total,
                "short page read, zero-filling remainder"
            );
            buf[total..].fill(0);
        }
        Ok(())
    }

    fn write_page(&self, page_id: PageId, data: &[u8]) -> DiskResult<()> {
        self.check_buffer(data.len())?;

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(self.offset_of(page_id)))?;
        file.write_all(data)?;
        file.flush()?;
        Ok(())
    }

    fn allocate_page(&self) -> DiskResult<PageId> {
        let id = self.next_page_id.fetch_add(1, Ordering::SeqCst);
        Ok(PageId::new(id))
    }

    fn deallocate_page(&self, page_id: PageId) -> DiskResult<()> {
        // The identifier is retired but its file extent is not reclaimed.
        tracing::debug!(page_id = page_id.as_u64(), "deallocated page");
        Ok(())
    }

    fn page_size(&self) -> usize {
        self.page_size
    }
}

impl std::fmt::Debug for FileDiskManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileDiskManager")
            .field("path", &self.path)
            .field("page_size", &self.page_size)
            .field("next_page_id", &self.next_page_id.load(Ordering::SeqCst))
            .finish()
    }
}
