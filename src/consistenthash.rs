//! Consistent-hash ring mapping keys to peer names via virtual nodes.
//!
//! Each real peer is represented by several virtual nodes scattered around
//! a 32-bit hash ring (`replicas` per peer). Looking up a key walks the
//! ring clockwise from the key's own hash to the nearest virtual node,
//! wrapping around to the smallest hash if the key's hash is larger than
//! every virtual node's. This is the same placement rule the HTTP peer
//! pool uses to agree, without coordination, on which process owns a key.

use std::collections::HashMap;

/// A function mapping arbitrary bytes to a 32-bit hash. The default is
/// CRC32/IEEE, matching the reference peer pool so independently-built
/// rings agree on placement.
pub type HashFn = dyn Fn(&[u8]) -> u32 + Send + Sync;

/// Maps keys to peer names by consistent hashing over virtual nodes.
///
/// Not self-synchronizing: callers that mutate and read concurrently (like
/// [`crate::http::HttpPool`]) must guard it with their own lock.
pub struct Ring {
    replicas: usize,
    hash_fn: Box<HashFn>,
    keys: Vec<u32>,
    hash_to_node: HashMap<u32, String>,
}

impl std::fmt::Debug for Ring {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ring")
            .field("replicas", &self.replicas)
            .field("virtual_nodes", &self.keys.len())
            .finish()
    }
}

impl Ring {
    /// Creates an empty ring with `replicas` virtual nodes per real node
    /// and the default CRC32/IEEE hash function.
    ///
    /// # Panics
    ///
    /// Panics if `replicas == 0` — a ring with no virtual nodes per peer
    /// can never place a key.
    pub fn new(replicas: usize) -> Self {
        Self::with_hash_fn(replicas, Box::new(crc32fast::hash))
    }

    /// Creates an empty ring with a caller-supplied hash function, e.g. for
    /// deterministic tests that inject `hash_fn(x) = parse(x) mod 2^32`.
    pub fn with_hash_fn(replicas: usize, hash_fn: Box<HashFn>) -> Self {
        assert!(replicas > 0, "consistent hash ring requires replicas >= 1");
        Ring {
            replicas,
            hash_fn,
            keys: Vec::new(),
            hash_to_node: HashMap::new(),
        }
    }

    /// Adds real nodes to the ring, each contributing `replicas` virtual
    /// nodes. The virtual-node hash input is the decimal index concatenated
    /// with the node name (`format!("{i}{name}")`), matching the reference
    /// placement so independently-built rings agree.
    ///
    /// If two virtual nodes collide on the same hash, the later `add` wins
    /// that slot in `hash_to_node`; `keys` may then contain the same hash
    /// twice, which is harmless since both copies resolve to the same slot.
    pub fn add<I, S>(&mut self, nodes: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for node in nodes {
            let node = node.as_ref();
            for i in 0..self.replicas {
                let virtual_key = format!("{i}{node}");
                let h = (self.hash_fn)(virtual_key.as_bytes());
                self.keys.push(h);
                self.hash_to_node.insert(h, node.to_string());
            }
        }
        self.keys.sort_unstable();
    }

    /// Returns the name of the node that owns `key`, or an empty string if
    /// the ring has no nodes or `key` is empty.
    pub fn get(&self, key: &str) -> String {
        if self.keys.is_empty() || key.is_empty() {
            return String::new();
        }
        let h = (self.hash_fn)(key.as_bytes());
        let idx = self.keys.partition_point(|&k| k < h);
        let idx = idx % self.keys.len();
        self.hash_to_node
            .get(&self.keys[idx])
            .cloned()
            .unwrap_or_default()
    }
}
