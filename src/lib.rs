//! A distributed in-memory key → bytes cache, organized as named *groups*
//! that partition keys across a peer group by consistent hashing.
//!
//! Each process hosts a local, byte-bounded [`lru::LruCache`]. On a miss,
//! [`group::Group::get`] asks whichever peer the consistent-hash
//! [`consistenthash::Ring`] says owns the key; if that peer errs, or the
//! key is owned by this node itself, an application-supplied
//! [`group::Getter`] produces the bytes. A [`singleflight::SingleFlight`]
//! guard collapses concurrent loads for the same key into a single
//! underlying call, so a thundering herd of callers for a cold key never
//! causes more than one load.
//!
//! # Example
//!
//! ```
//! use geecache::group::{new_group, Getter};
//! use std::sync::Arc;
//!
//! let getter: Arc<dyn Getter> = Arc::new(|key: &str| {
//!     Ok(format!("profile for {key}").into_bytes())
//! });
//! let group = new_group("users", 64 << 20, getter);
//!
//! let value = group.get("alice").unwrap();
//! assert_eq!(value.as_bytes(), b"profile for alice");
//!
//! // Subsequent gets for the same key are served from cache; the loader
//! // closure above never runs again for "alice".
//! assert_eq!(group.get("alice").unwrap(), value);
//! ```
//!
//! # Module map
//!
//! - [`lru`] — the bounded, byte-accounted, recency-ordered cache at the
//!   bottom of every group.
//! - [`cache`] — a mutex-guarded, lazily-constructed [`lru::LruCache`]
//!   shell, the concrete type behind [`group::Group`]'s `main_cache`.
//! - [`singleflight`] — per-key deduplication of concurrent loads.
//! - [`consistenthash`] — the virtual-node hash ring that partitions keys
//!   across peers.
//! - [`group`] — the named-cache-namespace API applications actually call:
//!   composes the above plus a peer picker and a local loader.
//! - [`config`] — construction-time configuration for a [`group::Group`].
//! - [`peers`] — the [`peers::PeerPicker`]/[`peers::PeerGetter`] contracts
//!   a group uses to talk to the rest of the pool, independent of
//!   transport.
//! - [`http`] (feature `http`) — the reference transport implementing
//!   those contracts over HTTP.
//! - [`byteview`] — the immutable, defensively-copied byte payload stored
//!   in the cache and handed back to callers.
//! - [`error`] — the typed errors each fallible boundary can return.

pub mod byteview;
pub mod cache;
pub mod config;
pub mod consistenthash;
pub mod error;
pub mod group;
#[cfg(feature = "http")]
pub mod http;
pub mod lru;
pub mod peers;
pub mod singleflight;

pub use byteview::ByteView;
pub use config::GroupConfig;
pub use error::GroupError;
pub use group::{get_group, new_group, Getter, Group};
pub use lru::LruCache;
