//! Cache statistics tracking.

use std::time::Instant;

/// Counters describing cache behaviour since creation (or the last clear).
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub insertions: u64,
    /// `put` calls ignored because the key was already cached.
    pub duplicate_inserts: u64,
    pub evictions: u64,
    pub size_bytes: usize,
    pub entry_count: usize,
    pub created_at: Instant,
}

impl Default for CacheStats {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheStats {
    pub fn new() -> Self {
        Self {
            hits: 0,
            misses: 0,
            insertions: 0,
            duplicate_inserts: 0,
            evictions: 0,
            size_bytes: 0,
            entry_count: 0,
            created_at: Instant::now(),
        }
    }

    /// Hit rate in `0.0..=1.0`.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub(crate) fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub(crate) fn record_miss(&mut self) {
        self.misses += 1;
    }
}
