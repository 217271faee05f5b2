//! Named cache namespaces: the `main_cache` ↔ single-flight ↔ peer picker
//! ↔ local loader composition spec.md §4.E calls the group/loader.
//!
//! A [`Group`] is the only entry point applications use: [`Group::get`]
//! checks the local bounded cache, and on a miss, collapses concurrent
//! callers for the same key through a [`SingleFlight`] guard before asking
//! either a remote peer or the local `getter` callback to produce the
//! value.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use crate::byteview::ByteView;
use crate::cache::SyncCache;
use crate::config::GroupConfig;
use crate::error::GroupError;
use crate::peers::{PeerPicker, PeerRequest};
use crate::singleflight::SingleFlight;

/// The application-supplied capability that produces bytes for a key the
/// cache (and every peer) has never seen.
///
/// Mirrors the original's interface-or-function duality: anything that can
/// fetch bytes for a key — a database lookup, a file read, a network
/// call — implements this trait. A plain closure of the right signature
/// also implements it directly, via the blanket impl below.
pub trait Getter: Send + Sync {
    /// Produces the bytes for `key`. Any error is propagated verbatim to
    /// the original caller and to every single-flight follower.
    fn get(&self, key: &str) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>>;
}

impl<F> Getter for F
where
    F: Fn(&str) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>> + Send + Sync,
{
    fn get(&self, key: &str) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>> {
        self(key)
    }
}

/// A named, capacity-bounded cache namespace.
///
/// Created via [`new_group`] and looked up by name via [`get_group`];
/// groups live for the process once registered.
pub struct Group {
    name: String,
    getter: Arc<dyn Getter>,
    main_cache: SyncCache,
    peers: RwLock<Option<Arc<dyn PeerPicker>>>,
    loader: SingleFlight<ByteView, String>,
    cache_peer_reads: bool,
}

impl std::fmt::Debug for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Group").field("name", &self.name).finish()
    }
}

impl Group {
    /// This group's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Looks up `key`: a cache hit returns immediately without invoking
    /// `getter`; a miss delegates to [`Group::load`] under the
    /// single-flight guard.
    ///
    /// Returns [`GroupError::EmptyKey`] if `key` is empty.
    pub fn get(&self, key: &str) -> Result<ByteView, GroupError> {
        if key.is_empty() {
            return Err(GroupError::EmptyKey);
        }

        if let Some(v) = self.main_cache.get(key) {
            tracing::debug!(group = %self.name, %key, "cache hit");
            return Ok(v);
        }

        tracing::debug!(group = %self.name, %key, "cache miss, loading");
        self.load(key)
    }

    /// Installs `picker` as this group's peer picker. Idempotent-fatal: a
    /// second call panics, matching spec.md §4.E ("calling twice is a
    /// fatal misuse").
    ///
    /// # Panics
    ///
    /// Panics if a picker is already registered.
    pub fn register_peers(&self, picker: Arc<dyn PeerPicker>) {
        let mut slot = self.peers.write();
        assert!(slot.is_none(), "register_peers called more than once");
        *slot = Some(picker);
    }

    /// Routes the miss through the single-flight guard: at most one
    /// concurrent load executes per key, and every overlapping caller
    /// observes its exact result.
    fn load(&self, key: &str) -> Result<ByteView, GroupError> {
        self.loader
            .work(key, || self.load_once(key))
            .map_err(GroupError::Loader)
    }

    /// The single-flight leader's body: try the owning peer first, and
    /// fall back to the local loader on any peer error or when this node
    /// owns the key itself.
    ///
    /// Returns the raw loader error message, unprefixed — [`Group::load`]
    /// applies the [`GroupError::Loader`] wrapping exactly once, so the
    /// text a caller sees matches the application `getter`'s error as-is
    /// (spec.md §7 kind 5).
    fn load_once(&self, key: &str) -> Result<ByteView, String> {
        let picker = self.peers.read().clone();
        if let Some(picker) = picker {
            if let Some(peer) = picker.pick_peer(key) {
                let req = PeerRequest {
                    group: self.name.clone(),
                    key: key.to_string(),
                };
                match peer.get(&req) {
                    Ok(resp) => {
                        let value = ByteView::from(resp.value);
                        if self.cache_peer_reads {
                            self.main_cache.add(key, value.clone());
                        }
                        return Ok(value);
                    }
                    Err(err) => {
                        tracing::warn!(group = %self.name, %key, %err, "peer get failed, falling back to local loader");
                    }
                }
            }
        }

        self.get_locally(key)
    }

    fn get_locally(&self, key: &str) -> Result<ByteView, String> {
        let bytes = self.getter.get(key).map_err(|e| e.to_string())?;
        let value = ByteView::from(bytes);
        self.main_cache.add(key, value.clone());
        Ok(value)
    }
}

/// Process-global registry of groups, guarded by a reader/writer lock:
/// reads ([`get_group`]) scale, [`new_group`] is exclusive.
fn registry() -> &'static RwLock<HashMap<String, Arc<Group>>> {
    static REGISTRY: OnceLock<RwLock<HashMap<String, Arc<Group>>>> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Creates and registers a group named `name` with the given byte budget
/// and local loader, overwriting any previous registration of that name.
///
/// # Panics
///
/// Panics if `getter` would never be callable — mirrored from the
/// original's `nil Getter` fatal check: there is no sensible "no-op"
/// loader, so a non-existent one is a programmer error.
pub fn new_group(name: impl Into<String>, max_bytes: usize, getter: Arc<dyn Getter>) -> Arc<Group> {
    new_group_with_config(name, GroupConfig::new(max_bytes), getter)
}

/// Creates and registers a group the way [`new_group`] does, additionally
/// enabling `cache_peer_reads` so values fetched from a remote peer are
/// also stored in this node's local cache.
///
/// This is the configuration knob spec.md §9's Open Question anticipates
/// ("expose a configuration knob if a local warm copy is desirable"); the
/// default ([`new_group`]) keeps the spec's documented behavior of never
/// caching peer-sourced values locally.
pub fn new_group_with_peer_caching(
    name: impl Into<String>,
    max_bytes: usize,
    getter: Arc<dyn Getter>,
) -> Arc<Group> {
    let mut config = GroupConfig::new(max_bytes);
    config.cache_peer_reads = true;
    new_group_with_config(name, config, getter)
}

/// Creates and registers a group from an explicit [`GroupConfig`],
/// overwriting any previous registration of that name.
///
/// # Panics
///
/// Panics if `getter` would never be callable — mirrored from the
/// original's `nil Getter` fatal check: there is no sensible "no-op"
/// loader, so a non-existent one is a programmer error.
pub fn new_group_with_config(
    name: impl Into<String>,
    config: GroupConfig,
    getter: Arc<dyn Getter>,
) -> Arc<Group> {
    let name = name.into();
    let group = Arc::new(Group {
        name: name.clone(),
        getter,
        main_cache: SyncCache::new(config.max_bytes),
        peers: RwLock::new(None),
        loader: SingleFlight::new(),
        cache_peer_reads: config.cache_peer_reads,
    });
    registry().write().insert(name, group.clone());
    group
}

/// Looks up a previously-registered group by name.
pub fn get_group(name: &str) -> Option<Arc<Group>> {
    registry().read().get(name).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn unique_name(prefix: &str) -> String {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        format!("{prefix}-{}", COUNTER.fetch_add(1, Ordering::SeqCst))
    }

    #[test]
    fn hit_never_invokes_getter_miss_invokes_once() {
        // scenario 5: f(k) uppercases and records invocations.
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_cb = calls.clone();
        let getter: Arc<dyn Getter> = Arc::new(move |key: &str| {
            calls_cb.fetch_add(1, Ordering::SeqCst);
            Ok(key.to_uppercase().into_bytes())
        });

        let group = new_group(unique_name("hitmiss"), 1 << 20, getter);

        let v1 = group.get("k1").unwrap();
        assert_eq!(v1.as_bytes(), b"K1");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let v2 = group.get("k1").unwrap();
        assert_eq!(v2.as_bytes(), b"K1");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn empty_key_is_an_error() {
        let getter: Arc<dyn Getter> = Arc::new(|k: &str| Ok(k.as_bytes().to_vec()));
        let group = new_group(unique_name("emptykey"), 1024, getter);
        let err = group.get("").unwrap_err();
        assert!(matches!(err, GroupError::EmptyKey));
    }

    #[test]
    fn get_group_returns_registered_group() {
        let name = unique_name("lookup");
        let getter: Arc<dyn Getter> = Arc::new(|k: &str| Ok(k.as_bytes().to_vec()));
        new_group(name.clone(), 1024, getter);
        assert!(get_group(&name).is_some());
        assert!(get_group("does-not-exist-at-all").is_none());
    }

    struct AlwaysErrPicker;
    impl PeerPicker for AlwaysErrPicker {
        fn pick_peer(&self, _key: &str) -> Option<Arc<dyn crate::peers::PeerGetter>> {
            Some(Arc::new(AlwaysErrGetter))
        }
    }
    struct AlwaysErrGetter;
    impl crate::peers::PeerGetter for AlwaysErrGetter {
        fn get(
            &self,
            _req: &PeerRequest,
        ) -> Result<crate::peers::PeerResponse, crate::error::PeerError> {
            Err(crate::error::PeerError::Transport("boom".to_string()))
        }
    }

    #[test]
    fn peer_error_falls_back_to_local_loader_and_populates_local_cache() {
        // scenario 6: peer always errors, falls through to local loader.
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_cb = calls.clone();
        let getter: Arc<dyn Getter> = Arc::new(move |key: &str| {
            calls_cb.fetch_add(1, Ordering::SeqCst);
            Ok(format!("local:{key}").into_bytes())
        });
        let group = new_group(unique_name("peerfallback"), 1024, getter);
        group.register_peers(Arc::new(AlwaysErrPicker));

        let v1 = group.get("k").unwrap();
        assert_eq!(v1.as_bytes(), b"local:k");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Second get is a local hit: no further peer or loader calls.
        let v2 = group.get("k").unwrap();
        assert_eq!(v2.as_bytes(), b"local:k");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    #[should_panic(expected = "more than once")]
    fn register_peers_twice_panics() {
        let getter: Arc<dyn Getter> = Arc::new(|k: &str| Ok(k.as_bytes().to_vec()));
        let group = new_group(unique_name("doubleregister"), 1024, getter);
        group.register_peers(Arc::new(AlwaysErrPicker));
        group.register_peers(Arc::new(AlwaysErrPicker));
    }

    #[test]
    fn loader_error_is_surfaced_as_is_without_double_wrapping() {
        // spec.md §7 kind 5: the getter's error is propagated "as-is", so
        // the displayed text must carry the `GroupError::Loader` prefix
        // exactly once, not once from `load` and once from `get_locally`.
        let getter: Arc<dyn Getter> =
            Arc::new(|_key: &str| Err("loader blew up".into()));
        let group = new_group(unique_name("loadererr"), 1024, getter);
        let err = group.get("k").unwrap_err();
        assert_eq!(err.to_string(), "loader error: loader blew up");
        match err {
            GroupError::Loader(msg) => assert_eq!(msg, "loader blew up"),
            other => panic!("expected Loader error, got {other:?}"),
        }
    }
}
