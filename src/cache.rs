// Extraction cache: memoizes segmented paragraphs per document version.
//
// The key is (path, modification time, segmentation config). Touching a file
// changes its mtime and therefore its key, so there is no invalidation API:
// stale entries simply age out of the LRU. A file rewritten within the same
// mtime tick will hit the old entry; that is a known limitation.
//
// Each key maps to a OnceLock slot. The LRU lock is only held to find or
// create the slot, and the segmentation itself runs under the slot's
// once-initialization, so at most one computation per key is in flight and
// other callers for that key wait for its result.

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::SystemTime;

use lru::LruCache;
use serde::Serialize;
use tracing::debug;

use crate::corpus::Document;
use crate::segment::SegmentConfig;

/// Default number of documents kept in the cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Identity of one cached segmentation result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub path: PathBuf,
    pub modified_time: SystemTime,
    pub config: SegmentConfig,
}

impl CacheKey {
    pub fn new(document: &Document, config: &SegmentConfig) -> Self {
        Self {
            path: document.path.clone(),
            modified_time: document.modified_time,
            config: *config,
        }
    }
}

type Slot = Arc<OnceLock<Arc<Vec<String>>>>;

/// Counters for cache behaviour, mostly for logs and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// Bounded, thread-safe LRU cache of segmentation results.
pub struct ExtractionCache {
    slots: Mutex<LruCache<CacheKey, Slot>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl ExtractionCache {
    /// Create a cache holding at most `capacity` documents (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            slots: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Return the cached paragraphs for this document version, or run
    /// `compute` once, store its result and return it.
    pub fn get_or_compute<F>(
        &self,
        document: &Document,
        config: &SegmentConfig,
        compute: F,
    ) -> Arc<Vec<String>>
    where
        F: FnOnce() -> Vec<String>,
    {
        let key = CacheKey::new(document, config);
        let slot = self.slot_for(key);

        let mut computed = false;
        let value = slot.get_or_init(|| {
            computed = true;
            Arc::new(compute())
        });

        if computed {
            self.misses.fetch_add(1, Ordering::Relaxed);
        } else {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(path = %document.path.display(), "Extraction cache hit");
        }

        Arc::clone(value)
    }

    /// Find or create the slot for `key`, marking it most recently used.
    fn slot_for(&self, key: CacheKey) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(slot) = slots.get(&key) {
            return Arc::clone(slot);
        }

        let slot: Slot = Arc::new(OnceLock::new());
        // The key is known to be absent, so anything returned was evicted
        if let Some((evicted, _)) = slots.push(key, Arc::clone(&slot)) {
            self.evictions.fetch_add(1, Ordering::Relaxed);
            debug!(
                path = %evicted.path.display(),
                capacity = slots.cap().get(),
                "Extraction cache full, evicted least recently used entry"
            );
        }
        slot
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.lock().cap().get()
    }

    /// Drop every entry. Counters are kept.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<CacheKey, Slot>> {
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ExtractionCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn doc(path: &str, secs: u64) -> Document {
        Document::new(0, path, SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
    }

    #[test]
    fn test_hit_skips_recompute() {
        let cache = ExtractionCache::new(4);
        let config = SegmentConfig::default();
        let d = doc("a.pdf", 10);

        let first = cache.get_or_compute(&d, &config, || vec!["p".to_string()]);
        let second = cache.get_or_compute(&d, &config, || panic!("should be cached"));

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1, evictions: 0 });
    }

    #[test]
    fn test_mtime_change_is_a_new_key() {
        let cache = ExtractionCache::new(4);
        let config = SegmentConfig::default();

        cache.get_or_compute(&doc("a.pdf", 10), &config, || vec!["old".to_string()]);
        let fresh = cache.get_or_compute(&doc("a.pdf", 11), &config, || vec!["new".to_string()]);

        assert_eq!(fresh.as_slice(), ["new".to_string()]);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_config_is_part_of_key() {
        let cache = ExtractionCache::new(4);
        let d = doc("a.pdf", 10);
        let strict = SegmentConfig {
            min_chars: 50,
            ..SegmentConfig::default()
        };

        cache.get_or_compute(&d, &SegmentConfig::default(), || vec!["loose".to_string()]);
        let out = cache.get_or_compute(&d, &strict, || vec!["strict".to_string()]);
        assert_eq!(out.as_slice(), ["strict".to_string()]);
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let cache = ExtractionCache::new(2);
        let config = SegmentConfig::default();
        let (a, b, c) = (doc("a.pdf", 1), doc("b.pdf", 1), doc("c.pdf", 1));

        cache.get_or_compute(&a, &config, Vec::new);
        cache.get_or_compute(&b, &config, Vec::new);
        // Touch `a` so `b` becomes the eviction candidate
        cache.get_or_compute(&a, &config, || panic!("a should be cached"));
        cache.get_or_compute(&c, &config, Vec::new);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().evictions, 1);
        cache.get_or_compute(&a, &config, || panic!("a should survive"));

        let recomputed = AtomicUsize::new(0);
        cache.get_or_compute(&b, &config, || {
            recomputed.fetch_add(1, Ordering::SeqCst);
            Vec::new()
        });
        assert_eq!(recomputed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_single_computation_per_key_under_contention() {
        let cache = Arc::new(ExtractionCache::new(8));
        let calls = Arc::new(AtomicUsize::new(0));
        let d = doc("shared.pdf", 5);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let calls = Arc::clone(&calls);
                let d = d.clone();
                std::thread::spawn(move || {
                    cache.get_or_compute(&d, &SegmentConfig::default(), || {
                        calls.fetch_add(1, Ordering::SeqCst);
                        std::thread::sleep(Duration::from_millis(20));
                        vec!["once".to_string()]
                    })
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap().as_slice(), ["once".to_string()]);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_zero_capacity_rounds_up() {
        assert_eq!(ExtractionCache::new(0).capacity(), 1);
    }
}
