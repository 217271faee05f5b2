//! Byte-accounted, recency-ordered bounded cache.
//!
//! `LruCache` is the bounded map at the bottom of every group: a hash index
//! plus a doubly-linked recency order, evicting from the back (least
//! recently used) whenever the accounted byte total exceeds the configured
//! budget. Accounting is per-byte, not per-entry, so a single oversized
//! `add` can evict many prior entries in one call.
//!
//! # Arena representation
//!
//! A doubly-linked list built from freely aliased pointers (as in the
//! original implementation's use of the host language's built-in linked
//! list) doesn't translate directly into a language with strict ownership.
//! Instead, entries live in a `Vec` arena addressed by `Slot` indices; the
//! "list" is just `head`/`tail` slots plus a `prev`/`next` pair stored
//! alongside each entry. Removing an entry returns its slot to a free list
//! for reuse, so the arena never grows unboundedly across an add/evict
//! cycle.
//!
//! `LruCache` itself is not thread-safe; see [`crate::cache::SyncCache`]
//! for a mutex-guarded wrapper.

use std::borrow::Borrow;

#[cfg(feature = "hashbrown")]
use hashbrown::HashMap;
#[cfg(not(feature = "hashbrown"))]
use std::collections::HashMap;

/// A value that can report the number of bytes it occupies for the purpose
/// of byte accounting. The cache charges `key.len() + value.cache_len()`
/// bytes per entry.
pub trait CacheValue {
    /// Size in bytes this value contributes to the cache's accounting.
    fn cache_len(&self) -> usize;
}

impl CacheValue for crate::byteview::ByteView {
    fn cache_len(&self) -> usize {
        self.len()
    }
}

/// Index into the entry arena. Stable for the lifetime of the entry it
/// refers to; reused once that entry is removed.
type Slot = usize;

struct Node<V> {
    key: Box<str>,
    value: V,
    prev: Option<Slot>,
    next: Option<Slot>,
}

/// A bounded, byte-accounted, recency-ordered cache.
///
/// See the [module documentation](self) for the eviction policy and the
/// arena representation used for the recency order.
pub struct LruCache<V: CacheValue> {
    max_bytes: usize,
    n_bytes: usize,
    arena: Vec<Option<Node<V>>>,
    free: Vec<Slot>,
    index: HashMap<Box<str>, Slot>,
    head: Option<Slot>,
    tail: Option<Slot>,
    on_evicted: Option<Box<dyn FnMut(&str, &V) + Send>>,
}

impl<V: CacheValue> std::fmt::Debug for LruCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LruCache")
            .field("max_bytes", &self.max_bytes)
            .field("n_bytes", &self.n_bytes)
            .field("len", &self.len())
            .finish()
    }
}

impl<V: CacheValue> LruCache<V> {
    /// Creates an empty cache with the given byte budget.
    ///
    /// `max_bytes == 0` disables eviction entirely: the cache grows without
    /// bound.
    pub fn new(max_bytes: usize, on_evicted: Option<Box<dyn FnMut(&str, &V) + Send>>) -> Self {
        LruCache {
            max_bytes,
            n_bytes: 0,
            arena: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
            head: None,
            tail: None,
            on_evicted,
        }
    }

    /// Number of entries currently cached.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// True if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Total bytes currently accounted for across all live entries.
    pub fn n_bytes(&self) -> usize {
        self.n_bytes
    }

    /// Looks up `key`. On a hit, promotes the entry to the front (most
    /// recently used) and returns a copy of its value; on a miss, returns
    /// `None` without mutating the cache.
    pub fn get<Q>(&mut self, key: &Q) -> Option<V>
    where
        Box<str>: Borrow<Q>,
        Q: std::hash::Hash + Eq + ?Sized,
        V: Clone,
    {
        let slot = *self.index.get(key)?;
        self.move_to_front(slot);
        Some(self.arena[slot].as_ref().unwrap().value.clone())
    }

    /// Inserts or updates `key`. If `key` is already present, its value is
    /// replaced (byte accounting adjusted by the size delta) and it is
    /// promoted to the front; otherwise a new front entry is created.
    ///
    /// After either branch, entries are evicted from the back until the
    /// byte budget is respected or a single oversized entry remains (see
    /// [`LruCache::remove_oldest`]).
    pub fn add(&mut self, key: impl Into<Box<str>>, value: V) {
        let key = key.into();
        if let Some(&slot) = self.index.get(&key) {
            let node = self.arena[slot].as_mut().unwrap();
            let old_len = node.value.cache_len();
            let new_len = value.cache_len();
            node.value = value;
            self.n_bytes = self.n_bytes + new_len - old_len;
            self.move_to_front(slot);
        } else {
            let added_bytes = key.len() + value.cache_len();
            let slot = self.alloc_slot(key, value);
            self.push_front(slot);
            self.n_bytes += added_bytes;
        }

        while self.max_bytes != 0 && self.n_bytes > self.max_bytes && self.len() > 1 {
            self.remove_oldest();
        }
    }

    /// Evicts the least-recently-used entry, if any, firing the
    /// `on_evicted` callback (if set) after bookkeeping is updated. No-op
    /// on an empty cache.
    pub fn remove_oldest(&mut self) {
        let Some(slot) = self.tail else { return };
        self.unlink(slot);
        let node = self.arena[slot].take().unwrap();
        self.index.remove(&node.key);
        self.n_bytes -= node.key.len() + node.value.cache_len();
        self.free.push(slot);
        if let Some(cb) = self.on_evicted.as_mut() {
            cb(&node.key, &node.value);
        }
    }

    fn alloc_slot(&mut self, key: Box<str>, value: V) -> Slot {
        let node = Node {
            key: key.clone(),
            value,
            prev: None,
            next: None,
        };
        let slot = if let Some(slot) = self.free.pop() {
            self.arena[slot] = Some(node);
            slot
        } else {
            self.arena.push(Some(node));
            self.arena.len() - 1
        };
        self.index.insert(key, slot);
        slot
    }

    fn push_front(&mut self, slot: Slot) {
        self.arena[slot].as_mut().unwrap().prev = None;
        self.arena[slot].as_mut().unwrap().next = self.head;
        if let Some(head) = self.head {
            self.arena[head].as_mut().unwrap().prev = Some(slot);
        }
        self.head = Some(slot);
        if self.tail.is_none() {
            self.tail = Some(slot);
        }
    }

    fn unlink(&mut self, slot: Slot) {
        let (prev, next) = {
            let node = self.arena[slot].as_ref().unwrap();
            (node.prev, node.next)
        };
        match prev {
            Some(p) => self.arena[p].as_mut().unwrap().next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.arena[n].as_mut().unwrap().prev = prev,
            None => self.tail = prev,
        }
    }

    fn move_to_front(&mut self, slot: Slot) {
        if self.head == Some(slot) {
            return;
        }
        self.unlink(slot);
        self.push_front(slot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::byteview::ByteView;
    use std::sync::{Arc, Mutex};

    fn bv(s: &str) -> ByteView {
        ByteView::from(s)
    }

    #[test]
    fn eviction_by_bytes() {
        // scenario 1: max_bytes = 10, insert k1/1234, k2/v2, k3/v3.
        let evicted = Arc::new(Mutex::new(Vec::new()));
        let evicted_cb = evicted.clone();
        let mut cache = LruCache::new(
            10,
            Some(Box::new(move |k: &str, _v: &ByteView| {
                evicted_cb.lock().unwrap().push(k.to_string());
            })),
        );
        cache.add("k1", bv("1234"));
        cache.add("k2", bv("v2"));
        cache.add("k3", bv("v3"));

        assert_eq!(cache.len(), 2);
        assert!(cache.get("k1").is_none());
        assert!(cache.get("k2").is_some());
        assert!(cache.get("k3").is_some());
        assert_eq!(*evicted.lock().unwrap(), vec!["k1".to_string()]);
    }

    #[test]
    fn get_promotes_to_front() {
        // scenario 2: unbounded cache, get(k2) promotes it ahead of k3, k1.
        let mut cache: LruCache<ByteView> = LruCache::new(0, None);
        cache.add("k1", bv("1"));
        cache.add("k2", bv("2"));
        cache.add("k3", bv("3"));
        assert_eq!(cache.get("k2"), Some(bv("2")));

        // Front-to-back eviction order should now be k2, k3, k1.
        cache.remove_oldest();
        assert!(cache.get("k1").is_none());
        cache.remove_oldest();
        assert!(cache.get("k3").is_none());
        assert!(cache.get("k2").is_some());
    }

    #[test]
    fn max_bytes_zero_disables_eviction() {
        let mut cache: LruCache<ByteView> = LruCache::new(0, None);
        for i in 0..1000 {
            cache.add(format!("k{i}"), bv("x"));
        }
        assert_eq!(cache.len(), 1000);
    }

    #[test]
    fn update_existing_key_adjusts_bytes_without_growing_len() {
        let mut cache: LruCache<ByteView> = LruCache::new(0, None);
        cache.add("k", bv("a"));
        let before = cache.n_bytes();
        cache.add("k", bv("aaaa"));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.n_bytes(), before + 3);
    }

    #[test]
    fn oversized_single_entry_is_retained() {
        // Invariant (spec.md §8): after Add, either n_bytes <= max_bytes or
        // exactly one entry remains whose size alone exceeds max_bytes.
        let mut cache: LruCache<ByteView> = LruCache::new(4, None);
        cache.add("k1", bv("a"));
        cache.add("k2", bv("b"));
        cache.add("huge", bv("0123456789"));
        assert_eq!(cache.len(), 1);
        assert!(cache.get("huge").is_some());
        assert!(cache.n_bytes() > 4);
    }

    #[test]
    fn remove_oldest_on_empty_is_noop() {
        let mut cache: LruCache<ByteView> = LruCache::new(10, None);
        cache.remove_oldest();
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn byte_accounting_never_exceeds_budget_past_one_entry() {
        let mut cache: LruCache<ByteView> = LruCache::new(50, None);
        for i in 0..100 {
            cache.add(format!("key-{i}"), bv("value"));
        }
        assert!(cache.len() <= 1 || cache.n_bytes() <= 50);
    }

    #[test]
    fn index_keyset_matches_order_after_random_ops() {
        let mut cache: LruCache<ByteView> = LruCache::new(30, None);
        for i in 0..20 {
            cache.add(format!("k{i}"), bv("ab"));
            if i % 2 == 0 {
                cache.get(format!("k{}", i / 2).as_str());
            }
        }
        // Every remaining key must still resolve through get().
        let remaining = cache.len();
        let mut found = 0;
        for i in 0..20 {
            if cache.get(format!("k{i}").as_str()).is_some() {
                found += 1;
            }
        }
        assert_eq!(found, remaining);
    }
}
