//! Buffer pool configuration.

use quartz_common::constants::{
    DEFAULT_PAGE_SIZE, DEFAULT_POOL_SIZE, MAX_PAGE_SIZE, MIN_PAGE_SIZE, MIN_POOL_SIZE,
};

/// Configuration for the buffer pool.
#[derive(Debug, Clone)]
pub struct BufferPoolConfig {
    /// Number of page frames in the buffer pool.
    pub pool_size: usize,
    /// Page size in bytes.
    pub page_size: usize,
}

impl BufferPoolConfig {
    /// Creates a new configuration with the specified number of frames.
    pub fn new(pool_size: usize) -> Self {
        Self {
            pool_size,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Creates a configuration from a memory size in bytes.
    pub fn from_memory_size(memory_bytes: usize) -> Self {
        let pool_size = (memory_bytes / DEFAULT_PAGE_SIZE).max(MIN_POOL_SIZE);
        Self::new(pool_size)
    }

    /// Sets the page size.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Returns the total memory used by the frame array.
    pub fn memory_usage(&self) -> usize {
        self.pool_size * self.page_size
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.pool_size < MIN_POOL_SIZE {
            return Err("pool_size must be > 0");
        }
        if !self.page_size.is_power_of_two() {
            return Err("page_size must be a power of 2");
        }
        if self.page_size < MIN_PAGE_SIZE {
            return Err("page_size must be >= 4096");
        }
        if self.page_size > MAX_PAGE_SIZE {
            return Err("page_size must be <= 65536");
        }
        Ok(())
    }
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_SIZE)
    }
}
