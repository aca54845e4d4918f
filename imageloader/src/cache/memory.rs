//! Size-weighted LRU cache of decoded images.

use std::fmt;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use tracing::trace;

use crate::cache::CacheStats;
use crate::types::{DecodedImage, RequestKey};

struct Inner {
    entries: LruCache<RequestKey, Arc<DecodedImage>>,
    size_bytes: usize,
    stats: CacheStats,
}

/// In-memory LRU cache bounded by total decoded byte size.
///
/// Ordering, size accounting and statistics live behind one lock, so every
/// operation is linearizable. After any operation the total byte size is at
/// most the budget.
pub struct ImageCache {
    inner: Mutex<Inner>,
    max_size_bytes: usize,
}

impl ImageCache {
    /// Creates a cache holding at most `max_size_bytes` of decoded pixels.
    pub fn new(max_size_bytes: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: LruCache::unbounded(),
                size_bytes: 0,
                stats: CacheStats::new(),
            }),
            max_size_bytes,
        }
    }

    /// Looks up `key`, marking it most recently used on a hit.
    pub fn get(&self, key: &RequestKey) -> Option<Arc<DecodedImage>> {
        let mut inner = self.inner.lock();
        match inner.entries.get(key).cloned() {
            Some(image) => {
                inner.stats.record_hit();
                Some(image)
            }
            None => {
                inner.stats.record_miss();
                None
            }
        }
    }

    /// Inserts `image` under `key`.
    ///
    /// Returns `false` without touching anything if the key is already
    /// present; the existing entry wins. Otherwise inserts, then evicts least
    /// recently used entries until the total fits the budget. An image larger
    /// than the whole budget is evicted straight away.
    pub fn put(&self, key: RequestKey, image: Arc<DecodedImage>) -> bool {
        let mut inner = self.inner.lock();
        if inner.entries.contains(&key) {
            inner.stats.duplicate_inserts += 1;
            return false;
        }

        inner.size_bytes += image.byte_size();
        inner.entries.put(key, image);
        inner.stats.insertions += 1;

        while inner.size_bytes > self.max_size_bytes {
            let Some((evicted, image)) = inner.entries.pop_lru() else {
                break;
            };
            inner.size_bytes -= image.byte_size();
            inner.stats.evictions += 1;
            trace!(key = %evicted, bytes = image.byte_size(), "Evicted from image cache");
        }

        true
    }

    /// Returns true if `key` is cached. Does not affect recency or stats.
    pub fn contains(&self, key: &RequestKey) -> bool {
        self.inner.lock().entries.contains(key)
    }

    /// Returns the cached image without affecting recency or stats.
    pub fn peek(&self, key: &RequestKey) -> Option<Arc<DecodedImage>> {
        self.inner.lock().entries.peek(key).cloned()
    }

    pub fn entry_count(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Total byte size of cached images.
    pub fn size_bytes(&self) -> usize {
        self.inner.lock().size_bytes
    }

    pub fn max_size_bytes(&self) -> usize {
        self.max_size_bytes
    }

    /// Snapshot of statistics, including current size and entry count.
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        let mut stats = inner.stats.clone();
        stats.size_bytes = inner.size_bytes;
        stats.entry_count = inner.entries.len();
        stats
    }

    /// Removes every entry and resets statistics.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.size_bytes = 0;
        inner.stats = CacheStats::new();
    }
}

impl fmt::Debug for ImageCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("ImageCache")
            .field("entries", &inner.entries.len())
            .field("size_bytes", &inner.size_bytes)
            .field("max_size_bytes", &self.max_size_bytes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// An image weighing exactly `bytes` (a multiple of 4).
    fn image_of(bytes: usize) -> Arc<DecodedImage> {
        let pixels = (bytes / 4) as u32;
        Arc::new(DecodedImage::solid(pixels, 1, [0, 0, 0, 255]))
    }

    fn key(s: &str) -> RequestKey {
        RequestKey::new(s)
    }

    #[test]
    fn test_put_then_get_returns_same_image() {
        let cache = ImageCache::new(1_000);
        let image = image_of(400);

        assert!(cache.put(key("a"), image.clone()));

        let cached = cache.get(&key("a")).unwrap();
        assert!(Arc::ptr_eq(&cached, &image));
        assert_eq!(cache.size_bytes(), 400);
    }

    #[test]
    fn test_miss() {
        let cache = ImageCache::new(1_000);
        assert!(cache.get(&key("nope")).is_none());
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_existing_entry_wins() {
        let cache = ImageCache::new(10_000);
        let first = image_of(400);
        let second = image_of(800);

        assert!(cache.put(key("a"), first.clone()));
        assert!(!cache.put(key("a"), second));

        assert!(Arc::ptr_eq(&cache.peek(&key("a")).unwrap(), &first));
        assert_eq!(cache.size_bytes(), 400);
        assert_eq!(cache.stats().duplicate_inserts, 1);
    }

    #[test]
    fn test_get_refreshes_recency() {
        let cache = ImageCache::new(1_000_000);
        cache.put(key("a"), image_of(400_000));
        cache.put(key("b"), image_of(400_000));
        assert!(cache.get(&key("a")).is_some());
        cache.put(key("c"), image_of(400_000));

        assert!(cache.contains(&key("a")));
        assert!(!cache.contains(&key("b")));
        assert!(cache.contains(&key("c")));
        assert_eq!(cache.size_bytes(), 800_000);
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_without_touch_oldest_is_evicted() {
        let cache = ImageCache::new(1_000_000);
        cache.put(key("a"), image_of(400_000));
        cache.put(key("b"), image_of(400_000));
        cache.put(key("c"), image_of(400_000));

        assert!(!cache.contains(&key("a")));
        assert!(cache.contains(&key("b")));
        assert!(cache.contains(&key("c")));
    }

    #[test]
    fn test_peek_and_contains_do_not_touch() {
        let cache = ImageCache::new(1_000_000);
        cache.put(key("a"), image_of(400_000));
        cache.put(key("b"), image_of(400_000));
        assert!(cache.peek(&key("a")).is_some());
        assert!(cache.contains(&key("a")));
        cache.put(key("c"), image_of(400_000));

        assert!(!cache.contains(&key("a")));
        assert_eq!(cache.stats().hits, 0);
    }

    #[test]
    fn test_oversized_entry_passes_through() {
        let cache = ImageCache::new(1_000);
        cache.put(key("small"), image_of(400));

        assert!(cache.put(key("huge"), image_of(4_000)));

        // Inserting the oversized entry pushes out everything, itself included.
        assert_eq!(cache.entry_count(), 0);
        assert_eq!(cache.size_bytes(), 0);
        assert_eq!(cache.stats().evictions, 2);
    }

    #[test]
    fn test_budget_never_exceeded() {
        let cache = ImageCache::new(10_000);
        for i in 0..200usize {
            let bytes = 4 * (1 + (i * 37) % 900);
            cache.put(key(&format!("k{}", i)), image_of(bytes));
            if i % 3 == 0 {
                cache.get(&key(&format!("k{}", i / 2)));
            }
            assert!(cache.size_bytes() <= cache.max_size_bytes());
        }
    }

    #[test]
    fn test_clear() {
        let cache = ImageCache::new(1_000);
        cache.put(key("a"), image_of(100));
        cache.get(&key("a"));
        cache.clear();

        assert_eq!(cache.entry_count(), 0);
        assert_eq!(cache.size_bytes(), 0);
        assert_eq!(cache.stats().hits, 0);
    }

    #[test]
    fn test_concurrent_access_respects_budget() {
        let cache = Arc::new(ImageCache::new(40_000));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..250 {
                        let k = key(&format!("t{}-{}", t, i % 40));
                        if cache.get(&k).is_none() {
                            cache.put(k, image_of(1_000));
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let stats = cache.stats();
        assert!(stats.size_bytes <= 40_000);
        assert_eq!(stats.size_bytes, stats.entry_count * 1_000);
    }
}
