//! Construction-time configuration for a [`crate::group::Group`]
//! (spec.md §9, SPEC_FULL.md §2 component H).

/// Configuration for creating a [`crate::group::Group`].
///
/// Fields are public for direct construction — this crate's `cache_rs`
/// heritage favors plain structs over builders for configs this small.
///
/// # Examples
///
/// ```
/// use geecache::config::GroupConfig;
///
/// let config = GroupConfig::new(64 << 20);
/// assert!(!config.cache_peer_reads);
/// ```
#[derive(Clone, Copy)]
pub struct GroupConfig {
    /// Byte budget for this group's local cache.
    pub max_bytes: usize,
    /// Whether values fetched from a remote peer are also stored in this
    /// node's local cache. Spec.md §9 documents the default as `false`:
    /// a peer read is not assumed to be worth a local warm copy.
    pub cache_peer_reads: bool,
}

impl GroupConfig {
    /// Creates a config for `max_bytes` with `cache_peer_reads` defaulted
    /// to `false`, matching the spec's documented default behavior.
    pub fn new(max_bytes: usize) -> Self {
        GroupConfig {
            max_bytes,
            cache_peer_reads: false,
        }
    }
}

impl std::fmt::Debug for GroupConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupConfig")
            .field("max_bytes", &self.max_bytes)
            .field("cache_peer_reads", &self.cache_peer_reads)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_defaults_cache_peer_reads_to_false() {
        let config = GroupConfig::new(1024);
        assert_eq!(config.max_bytes, 1024);
        assert!(!config.cache_peer_reads);
    }
}
