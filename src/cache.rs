//! Per-bucket/per-file upload URL cache with TTL and exclusive checkout (SPEC_FULL.md §4.3).
//!
//! Generalizes the teacher's `pool.rs` (a single bucket-scoped `VecDeque<UploadUrl>` behind
//! a semaphore) into a cache keyed by either `bucketId` (upload URLs) or `fileId` (part
//! URLs), with TTL expiry on top of the teacher's error-triggered eviction.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

struct Entry<T> {
    value: T,
    expires_at: Instant,
}

struct Inner<T> {
    ttl: Duration,
    slots: Mutex<HashMap<String, VecDeque<Entry<T>>>>,
}

/// A TTL-bearing, key-exclusive cache of short-lived credentials (upload/part URLs).
///
/// `Checkout` pops a fresh entry if one is cached, else calls the supplied fetcher.
/// `Return` either re-queues the entry for reuse (success) or discards every cached entry
/// for that key (failure) — per SPEC_FULL.md §4.3, any upload-URL error evicts regardless
/// of TTL.
pub struct UrlCache<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for UrlCache<T> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<T: Clone> UrlCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                ttl,
                slots: Mutex::new(HashMap::new()),
            }),
        }
    }

    fn pop_fresh(&self, key: &str) -> Option<T> {
        let mut slots = self.inner.slots.lock();
        let queue = slots.get_mut(key)?;
        let now = Instant::now();

        while let Some(entry) = queue.pop_front() {
            if entry.expires_at > now {
                return Some(entry.value);
            }
            tracing::debug!(key, "evicting expired cache entry");
        }

        None
    }

    /// Checks out an entry for `key`, fetching a fresh one via `fetch` on a cache miss.
    pub async fn checkout<F, Fut>(&self, key: &str, fetch: F) -> Result<T, crate::B2Error>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, crate::B2Error>>,
    {
        if let Some(value) = self.pop_fresh(key) {
            return Ok(value);
        }

        fetch().await
    }

    /// Returns a checked-out entry: re-queues it for reuse on success, or evicts every
    /// cached entry for `key` on failure.
    pub fn ret(&self, key: &str, value: T, ok: bool) {
        let mut slots = self.inner.slots.lock();

        if ok {
            slots.entry(key.to_owned()).or_default().push_back(Entry {
                value,
                expires_at: Instant::now() + self.inner.ttl,
            });
        } else {
            tracing::warn!(key, "evicting cache entries after upload-URL error");
            slots.remove(key);
        }
    }

    /// Unconditionally evicts all cached entries for `key`, e.g. after re-authentication.
    pub fn evict(&self, key: &str) {
        self.inner.slots.lock().remove(key);
    }

    /// Evicts every cached entry across all keys, e.g. after `Connect` (SPEC_FULL.md §4.6).
    pub fn evict_all(&self) {
        self.inner.slots.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn checkout_misses_then_fetches() {
        let cache: UrlCache<u32> = UrlCache::new(Duration::from_secs(60));
        let fetches = AtomicU32::new(0);

        let v = cache
            .checkout("bucket-1", || async {
                fetches.fetch_add(1, Ordering::SeqCst);
                Ok::<_, crate::B2Error>(42)
            })
            .await
            .unwrap();

        assert_eq!(v, 42);
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn returned_entry_is_reused_without_refetch() {
        let cache: UrlCache<u32> = UrlCache::new(Duration::from_secs(60));
        let fetches = AtomicU32::new(0);

        let fetch = || async {
            fetches.fetch_add(1, Ordering::SeqCst);
            Ok::<_, crate::B2Error>(7)
        };

        let v1 = cache.checkout("bucket-1", fetch).await.unwrap();
        cache.ret("bucket-1", v1, true);

        let v2 = cache.checkout("bucket-1", fetch).await.unwrap();

        assert_eq!(v2, 7);
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_return_evicts_and_forces_refetch() {
        let cache: UrlCache<u32> = UrlCache::new(Duration::from_secs(60));
        let fetches = AtomicU32::new(0);

        let fetch = || async {
            let n = fetches.fetch_add(1, Ordering::SeqCst);
            Ok::<_, crate::B2Error>(n)
        };

        let v1 = cache.checkout("bucket-1", fetch).await.unwrap();
        cache.ret("bucket-1", v1, false);

        let v2 = cache.checkout("bucket-1", fetch).await.unwrap();

        assert_eq!(fetches.load(Ordering::SeqCst), 2, "a fresh fetch must happen after eviction");
        assert_ne!(v1, v2);
    }

    #[tokio::test]
    async fn expired_entries_are_not_reused() {
        let cache: UrlCache<u32> = UrlCache::new(Duration::from_millis(1));
        let fetches = AtomicU32::new(0);

        let fetch = || async {
            fetches.fetch_add(1, Ordering::SeqCst);
            Ok::<_, crate::B2Error>(1)
        };

        let v = cache.checkout("bucket-1", fetch).await.unwrap();
        cache.ret("bucket-1", v, true);

        tokio::time::sleep(Duration::from_millis(5)).await;

        let _ = cache.checkout("bucket-1", fetch).await.unwrap();
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let cache: UrlCache<u32> = UrlCache::new(Duration::from_secs(60));

        let a = cache.checkout("a", || async { Ok::<_, crate::B2Error>(1) }).await.unwrap();
        cache.ret("a", a, true);

        let fetches = AtomicU32::new(0);
        let b = cache
            .checkout("b", || async {
                fetches.fetch_add(1, Ordering::SeqCst);
                Ok::<_, crate::B2Error>(2)
            })
            .await
            .unwrap();

        assert_eq!(b, 2);
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }
}
