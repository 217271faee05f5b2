//! Mutex-guarded, lazily-initialized cache shell.
//!
//! `SyncCache` is the thread-safe wrapper every [`crate::group::Group`] uses
//! as its `main_cache`: a single [`parking_lot::Mutex`] around an
//! [`LruCache`], constructed lazily on first [`SyncCache::add`] so that a
//! group which is only ever populated via peer reads (and never writes
//! locally) never pays for the inner cache's allocations. `get` takes the
//! lock exclusively rather than a reader lock, since a hit promotes the
//! entry to the front of the recency order — a mutation, not a read.

use parking_lot::Mutex;

use crate::byteview::ByteView;
use crate::lru::LruCache;

/// A lazily-constructed, mutex-guarded [`LruCache<ByteView>`].
pub struct SyncCache {
    max_bytes: usize,
    inner: Mutex<Option<LruCache<ByteView>>>,
}

impl std::fmt::Debug for SyncCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncCache")
            .field("max_bytes", &self.max_bytes)
            .finish()
    }
}

impl SyncCache {
    /// Creates a shell with the given byte budget. The inner [`LruCache`]
    /// is not allocated until the first [`SyncCache::add`].
    pub fn new(max_bytes: usize) -> Self {
        SyncCache {
            max_bytes,
            inner: Mutex::new(None),
        }
    }

    /// Looks up `key`, promoting it to most-recently-used on a hit. Returns
    /// `None` without allocating the inner cache if it has never been
    /// written to.
    pub fn get(&self, key: &str) -> Option<ByteView> {
        let mut guard = self.inner.lock();
        guard.as_mut()?.get(key)
    }

    /// Inserts or updates `key`, constructing the inner [`LruCache`] on
    /// first use.
    pub fn add(&self, key: &str, value: ByteView) {
        let mut guard = self.inner.lock();
        guard
            .get_or_insert_with(|| LruCache::new(self.max_bytes, None))
            .add(key, value);
    }
}
