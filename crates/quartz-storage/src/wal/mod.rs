//! Write-ahead log sink for quartzdb.
//!
//! The buffer pool holds a reference to the [`LogManager`] and passes it
//! through to higher layers; it never interprets log content itself.
//! Recovery and group commit live outside this crate.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use quartz_common::types::Lsn;

/// Log manager statistics.
#[derive(Debug, Default)]
pub struct LogStats {
    /// Total bytes appended.
    pub bytes_appended: AtomicU64,
    /// Total records appended.
    pub records_appended: AtomicU64,
}

/// An append-only sink of log records.
///
/// Hands out monotonically increasing [`Lsn`]s and buffers record bytes
/// until [`flush`](Self::flush) is called.
pub struct LogManager {
    /// Next LSN to hand out.
    next_lsn: AtomicU64,
    /// Records appended since the last flush.
    buffer: Mutex<Vec<u8>>,
    /// Statistics.
    stats: LogStats,
}

impl LogManager {
    /// Creates an empty log manager.
    pub fn new() -> Self {
        Self {
            next_lsn: AtomicU64::new(Lsn::FIRST.as_u64()),
            buffer: Mutex::new(Vec::new()),
            stats: LogStats::default(),
        }
    }

    /// Appends a record and returns the LSN assigned to it.
    pub fn append(&self, record: &[u8]) -> Lsn {
        let lsn = Lsn::new(self.next_lsn.fetch_add(1, Ordering::SeqCst));
        self.buffer.lock().extend_from_slice(record);
        self.stats
            .bytes_appended
            .fetch_add(record.len() as u64, Ordering::Relaxed);
        self.stats.records_appended.fetch_add(1, Ordering::Relaxed);
        lsn
    }

    /// Drains the buffered records, returning their bytes.
    pub fn flush(&self) -> Vec<u8> {
        std::mem::take(&mut *self.buffer.lock())
    }

    /// The LSN the next appended record will receive.
    pub fn next_lsn(&self) -> Lsn {
        Lsn::new(self.next_lsn.load(Ordering::SeqCst))
    }

    /// Returns the statistics counters.
    pub fn stats(&self) -> &LogStats {
        &self.stats
    }
}

impl Default for LogManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LogManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogManager")
            .field("next_lsn", &self.next_lsn.load(Ordering::SeqCst))
            .field("buffered_bytes", &self.buffer.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_assigns_increasing_lsns() {
        let log = LogManager::new();
        let a = log.append(b"first");
        let b = log.append(b"second");
        assert!(b > a);
        assert_eq!(log.next_lsn().as_u64(), b.as_u64() + 1);
    }

    #[test]
    fn test_flush_drains_buffer() {
        let log = LogManager::new();
        log.append(b"abc");
        log.append(b"def");

        assert_eq!(log.flush(), b"abcdef".to_vec());
        assert!(log.flush().is_empty());
    }

    #[test]
    fn test_stats() {
        let log = LogManager::new();
        log.append(b"12345");
        assert_eq!(log.stats().records_appended.load(Ordering::Relaxed), 1);
        assert_eq!(log.stats().bytes_appended.load(Ordering::Relaxed), 5);
    }
}
