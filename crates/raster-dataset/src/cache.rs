//! LRU cache for decoded raster blocks.

use lru::LruCache;
use std::num::NonZeroUsize;

/// Cache key for blocks: (band, block_x, block_y).
pub type BlockKey = (u8, u32, u32);

/// LRU cache for decoded blocks with memory-bounded eviction.
///
/// One cache is shared by all bands of one resolution level; the band index
/// is part of the key so the sibling-band fill of a single fetch lands in
/// the same structure.
pub struct BlockCache {
    cache: LruCache<BlockKey, Vec<u8>>,
    memory_limit: usize,
    current_memory: usize,
}

impl BlockCache {
    /// Create a new block cache with the given memory limit in bytes.
    pub fn new(memory_limit: usize) -> Self {
        // Estimate max entries assuming ~256KB per block (512×512×1 byte)
        let block_size_estimate = 512 * 512;
        let max_entries = (memory_limit / block_size_estimate).max(16);

        Self {
            cache: LruCache::new(NonZeroUsize::new(max_entries).unwrap()),
            memory_limit,
            current_memory: 0,
        }
    }

    /// Try to get a block from the cache.
    pub fn get(&mut self, key: &BlockKey) -> Option<&Vec<u8>> {
        self.cache.get(key)
    }

    /// Check if a key exists in the cache without updating LRU order.
    pub fn contains(&self, key: &BlockKey) -> bool {
        self.cache.contains(key)
    }

    /// Insert a block into the cache.
    ///
    /// Least-recently-used entries are evicted to make room; a block larger
    /// than the whole budget is silently not cached.
    pub fn insert(&mut self, key: BlockKey, data: Vec<u8>) {
        let data_size = data.len();

        while self.current_memory + data_size > self.memory_limit && !self.cache.is_empty() {
            if let Some((_, evicted)) = self.cache.pop_lru() {
                self.current_memory = self.current_memory.saturating_sub(evicted.len());
            }
        }

        if data_size <= self.memory_limit {
            self.cache.put(key, data);
            self.current_memory += data_size;
        }
    }

    /// Current memory usage in bytes.
    pub fn memory_usage(&self) -> usize {
        self.current_memory
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
