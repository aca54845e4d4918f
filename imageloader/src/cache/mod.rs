//! Decoded image cache.
//!
//! A single in-memory tier: a strict LRU weighted by the byte size of each
//! decoded image and bounded by a byte budget. Reads refresh recency.

mod memory;
mod stats;

pub use memory::ImageCache;
pub use stats::CacheStats;
