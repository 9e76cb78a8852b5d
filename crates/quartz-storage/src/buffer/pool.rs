//! Buffer pool manager.
//!
//! The manager owns a fixed array of page frames and translates page
//! identifiers to frames, reading pages in from the disk manager on miss
//! and writing dirty victims back before their frame is reused.
//!
//! A single pool latch guards the page table, the inverse frame table, the
//! free list, and every residency transition of a frame. Disk I/O runs
//! with the pool latch held so a concurrent fetch can never observe a
//! half-installed binding. The replacer's internal mutex is a leaf: it is
//! only taken while no frame latch is held.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use quartz_common::types::PageId;

use super::config::BufferPoolConfig;
use super::error::{BufferError, BufferResult};
use super::frame::{FrameId, PageFrame};
use super::guard::{PageReadGuard, PageWriteGuard};
use super::replacer::ClockReplacer;
use super::BufferPoolStats;
use crate::disk::DiskManager;
use crate::wal::LogManager;

/// Residency bookkeeping, all guarded by the pool latch.
struct PoolInner {
    /// Maps each resident page to its frame.
    page_table: HashMap<PageId, FrameId>,
    /// Inverse mapping. Consulted during eviction instead of the frame's
    /// own metadata, which may be stale mid-transition.
    frame_table: HashMap<FrameId, PageId>,
    /// Frames holding no page, drained front-first.
    free_list: VecDeque<FrameId>,
}

/// The buffer pool manager.
///
/// All public operations are thread-safe and linearizable with respect to
/// the pool latch. `fetch_page` and `new_page` return the frame pinned;
/// the caller owes exactly one `unpin_page` per successful call.
pub struct BufferPoolManager {
    /// Configuration.
    config: BufferPoolConfig,
    /// Array of buffer frames, fixed at construction.
    frames: Vec<Arc<PageFrame>>,
    /// Pool latch and the state it guards.
    inner: Mutex<PoolInner>,
    /// Eviction policy.
    replacer: ClockReplacer,
    /// Persistent page storage.
    disk: Arc<dyn DiskManager>,
    /// Write-ahead log sink, passed through to higher layers.
    log: Arc<LogManager>,
    /// Fetch counter for statistics.
    fetch_count: AtomicU64,
    /// Hit counter for statistics.
    hit_count: AtomicU64,
    /// Miss counter for statistics.
    miss_count: AtomicU64,
    /// Eviction counter for statistics.
    eviction_count: AtomicU64,
    /// Flush counter for statistics.
    flush_count: AtomicU64,
}

impl BufferPoolManager {
    /// Creates a new buffer pool with the given configuration.
    ///
    /// Every frame starts on the free list.
    pub fn new(
        config: BufferPoolConfig,
        disk: Arc<dyn DiskManager>,
        log: Arc<LogManager>,
    ) -> BufferResult<Self> {
        config.validate().map_err(BufferError::config)?;
        if disk.page_size() != config.page_size {
            return Err(BufferError::config(format!(
                "disk page size {} does not match pool page size {}",
                disk.page_size(),
                config.page_size
            )));
        }

        let frames: Vec<Arc<PageFrame>> = (0..config.pool_size)
            .map(|i| Arc::new(PageFrame::new(FrameId::new(i), config.page_size)))
            .collect();

        Ok(Self {
            replacer: ClockReplacer::new(config.pool_size),
            inner: Mutex::new(PoolInner {
                page_table: HashMap::with_capacity(config.pool_size),
                frame_table: HashMap::with_capacity(config.pool_size),
                free_list: (0..config.pool_size).map(FrameId::new).collect(),
            }),
            frames,
            config,
            disk,
            log,
            fetch_count: AtomicU64::new(0),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
            eviction_count: AtomicU64::new(0),
            flush_count: AtomicU64::new(0),
        })
    }

    /// Fetches the page, reading it from disk if it is not resident.
    ///
    /// The returned frame is pinned. Fails with
    /// [`BufferError::PoolExhausted`] when every frame is pinned.
    pub fn fetch_page(&self, page_id: PageId) -> BufferResult<Arc<PageFrame>> {
        let mut inner = self.inner.lock();
        self.fetch_count.fetch_add(1, Ordering::Relaxed);

        if let Some(&frame_id) = inner.page_table.get(&page_id) {
            self.hit_count.fetch_add(1, Ordering::Relaxed);
            let frame = Arc::clone(&self.frames[frame_id.index()]);
            self.replacer.pin(frame_id);
            frame.pin();
            return Ok(frame);
        }

        self.miss_count.fetch_add(1, Ordering::Relaxed);
        let frame_id = self.take_frame(&mut inner)?;
        let frame = Arc::clone(&self.frames[frame_id.index()]);

        inner.page_table.insert(page_id, frame_id);
        inner.frame_table.insert(frame_id, page_id);

        {
            let mut data = frame.write_data();
            if let Err(e) = self.disk.read_page(page_id, &mut data) {
                // Roll the half-installed binding back so the capacity
                // invariant holds on the error path.
                drop(data);
                inner.page_table.remove(&page_id);
                inner.frame_table.remove(&frame_id);
                inner.free_list.push_back(frame_id);
                return Err(e.into());
            }
        }

        frame.set_page_id(page_id);
        frame.set_dirty(false);
        frame.pin();
        Ok(frame)
    }

    /// Fetches the page and wraps it in a read guard that unpins on drop.
    pub fn fetch_page_read(&self, page_id: PageId) -> BufferResult<PageReadGuard<'_>> {
        let frame = self.fetch_page(page_id)?;
        Ok(PageReadGuard::new(self, frame, page_id))
    }

    /// Fetches the page and wraps it in a write guard that unpins on drop,
    /// marking the page dirty if it was written through the guard.
    pub fn fetch_page_write(&self, page_id: PageId) -> BufferResult<PageWriteGuard<'_>> {
        let frame = self.fetch_page(page_id)?;
        Ok(PageWriteGuard::new(self, frame, page_id))
    }

    /// Drops one pin on the page.
    ///
    /// `is_dirty` is OR-ed into the frame's dirty flag; the actual write
    /// happens at eviction or explicit flush. Returns false if the page is
    /// not resident or its pin count is already zero.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        let inner = self.inner.lock();
        let Some(&frame_id) = inner.page_table.get(&page_id) else {
            return false;
        };
        let frame = &self.frames[frame_id.index()];
        if frame.pin_count() == 0 {
            return false;
        }
        if is_dirty {
            frame.set_dirty(true);
        }
        if frame.unpin() == 0 {
            self.replacer.unpin(frame_id);
        }
        true
    }

    /// Writes the page to disk regardless of its dirty flag.
    ///
    /// Returns `Ok(false)` if the page is not resident. Pinning status is
    /// unchanged; the dirty flag is cleared on success.
    pub fn flush_page(&self, page_id: PageId) -> BufferResult<bool> {
        let inner = self.inner.lock();
        let Some(&frame_id) = inner.page_table.get(&page_id) else {
            return Ok(false);
        };
        let frame = &self.frames[frame_id.index()];
        {
            let data = frame.read_data();
            self.disk.write_page(page_id, &data)?;
        }
        frame.set_dirty(false);
        self.flush_count.fetch_add(1, Ordering::Relaxed);
        Ok(true)
    }

    /// Allocates a new page and binds it to a frame.
    ///
    /// The frame's bytes are zeroed and the frame is returned pinned
    /// together with the new page identifier. Fails with
    /// [`BufferError::PoolExhausted`] when every frame is pinned; in that
    /// case no page is allocated.
    pub fn new_page(&self) -> BufferResult<(PageId, Arc<PageFrame>)> {
        let mut inner = self.inner.lock();

        let frame_id = self.take_frame(&mut inner)?;
        let frame = Arc::clone(&self.frames[frame_id.index()]);

        let page_id = match self.disk.allocate_page() {
            Ok(page_id) => page_id,
            Err(e) => {
                inner.free_list.push_back(frame_id);
                return Err(e.into());
            }
        };

        inner.page_table.insert(page_id, frame_id);
        inner.frame_table.insert(frame_id, page_id);

        frame.write_data().fill(0);
        frame.set_page_id(page_id);
        frame.set_dirty(false);
        frame.pin();
        Ok((page_id, frame))
    }

    /// Allocates a new page and wraps its frame in a write guard.
    pub fn new_page_write(&self) -> BufferResult<PageWriteGuard<'_>> {
        let (page_id, frame) = self.new_page()?;
        Ok(PageWriteGuard::new(self, frame, page_id))
    }

    /// Deletes the page, returning its frame to the free list.
    ///
    /// Returns `Ok(true)` if the page was deleted or was not resident to
    /// begin with, `Ok(false)` if it is still pinned.
    pub fn delete_page(&self, page_id: PageId) -> BufferResult<bool> {
        let mut inner = self.inner.lock();
        let Some(&frame_id) = inner.page_table.get(&page_id) else {
            return Ok(true);
        };
        let frame = &self.frames[frame_id.index()];
        if frame.pin_count() > 0 {
            return Ok(false);
        }

        self.disk.deallocate_page(page_id)?;
        frame.reset();
        inner.page_table.remove(&page_id);
        inner.frame_table.remove(&frame_id);
        self.replacer.pin(frame_id);
        inner.free_list.push_back(frame_id);
        Ok(true)
    }

    /// Writes every resident page to disk.
    ///
    /// Dirty flags are cleared as pages are written; pinning is unchanged.
    pub fn flush_all(&self) -> BufferResult<()> {
        let inner = self.inner.lock();
        for (&page_id, &frame_id) in &inner.page_table {
            let frame = &self.frames[frame_id.index()];
            {
                let data = frame.read_data();
                self.disk.write_page(page_id, &data)?;
            }
            frame.set_dirty(false);
            self.flush_count.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    /// Returns the number of frames in the pool.
    pub fn pool_size(&self) -> usize {
        self.config.pool_size
    }

    /// Returns the page size in bytes.
    pub fn page_size(&self) -> usize {
        self.config.page_size
    }

    /// Returns true if the page is resident.
    pub fn contains(&self, page_id: PageId) -> bool {
        self.inner.lock().page_table.contains_key(&page_id)
    }

    /// Returns the log manager this pool was constructed with.
    pub fn log_manager(&self) -> &Arc<LogManager> {
        &self.log
    }

    /// Returns a snapshot of the pool statistics.
    pub fn stats(&self) -> BufferPoolStats {
        let inner = self.inner.lock();
        let mut pinned = 0;
        let mut dirty = 0;
        for &frame_id in inner.page_table.values() {
            let frame = &self.frames[frame_id.index()];
            if frame.is_pinned() {
                pinned += 1;
            }
            if frame.is_dirty() {
                dirty += 1;
            }
        }
        BufferPoolStats {
            fetches: self.fetch_count.load(Ordering::Relaxed),
            hits: self.hit_count.load(Ordering::Relaxed),
            misses: self.miss_count.load(Ordering::Relaxed),
            evictions: self.eviction_count.load(Ordering::Relaxed),
            flushes: self.flush_count.load(Ordering::Relaxed),
            resident_pages: inner.page_table.len(),
            free_frames: inner.free_list.len(),
            evictable_frames: self.replacer.size(),
            pinned_frames: pinned,
            dirty_frames: dirty,
        }
    }

    /// Secures an unbound frame: free list first, else a replacer victim.
    ///
    /// A dirty victim is written back under its read latch before its old
    /// binding is erased. Called with the pool latch held.
    fn take_frame(&self, inner: &mut PoolInner) -> BufferResult<FrameId> {
        if let Some(frame_id) = inner.free_list.pop_front() {
            return Ok(frame_id);
        }

        let frame_id = self.replacer.victim().ok_or(BufferError::PoolExhausted)?;
        let frame = &self.frames[frame_id.index()];
        // The frame's own page-id metadata may be stale mid-transition;
        // the inverse table is authoritative. A replacer entry is resident
        // by invariant.
        let old_page_id = inner.frame_table[&frame_id];

        if frame.is_dirty() {
            let data = frame.read_data();
            if let Err(e) = self.disk.write_page(old_page_id, &data) {
                // The victim stays resident and evictable.
                drop(data);
                self.replacer.unpin(frame_id);
                return Err(e.into());
            }
            drop(data);
            frame.set_dirty(false);
            self.flush_count.fetch_add(1, Ordering::Relaxed);
        }

        tracing::debug!(
            frame_id = frame_id.index(),
            old_page_id = old_page_id.as_u64(),
            "evicting page"
        );
        inner.page_table.remove(&old_page_id);
        inner.frame_table.remove(&frame_id);
        frame.set_page_id(PageId::INVALID);
        self.eviction_count.fetch_add(1, Ordering::Relaxed);
        Ok(frame_id)
    }
}

impl std::fmt::Debug for BufferPoolManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferPoolManager")
            .field("pool_size", &self.config.pool_size)
            .field("page_size", &self.config.page_size)
            .field("stats", &self.stats())
            .finish()
    }
}
