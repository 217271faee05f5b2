//! Boundary contracts between a [`crate::group::Group`] and its transport.
//!
//! `PeerPicker` and `PeerGetter` are the seam spec.md §1 calls out as
//! external collaborators: a group only ever talks to these traits, never
//! to a concrete transport. [`crate::http::HttpPool`] (behind the `http`
//! feature) is the reference implementation of both.

use std::sync::Arc;

use crate::error::PeerError;

/// One (group, key) lookup sent to a specific remote peer.
#[derive(Debug, Clone)]
pub struct PeerRequest {
    /// Name of the [`crate::group::Group`] the key belongs to.
    pub group: String,
    /// The key being fetched.
    pub key: String,
}

/// The raw bytes a peer returned for a [`PeerRequest`].
#[derive(Debug, Clone)]
pub struct PeerResponse {
    /// The value's bytes, exactly as the remote group's loader produced
    /// them.
    pub value: Vec<u8>,
}

/// A client capability that fetches a single `(group, key)` pair from one
/// specific remote peer.
///
/// Implementations should treat any transport failure (connection refused,
/// timeout, non-success status, undecodable body) as a [`PeerError`]; the
/// caller ([`crate::group::Group::load`]) always falls back to the local
/// loader on error, so there is no need to retry internally.
pub trait PeerGetter: Send + Sync {
    /// Fetches `req` from this peer.
    fn get(&self, req: &PeerRequest) -> Result<PeerResponse, PeerError>;
}

/// A strategy that maps a key to either the local node (fetch locally) or
/// a remote peer (fetch via its [`PeerGetter`]).
///
/// `pick_peer` must return `Some(peer)` only when a *different* node owns
/// the key; when the ring picks this node itself, or the ring is empty,
/// implementations return `None` so the caller falls through to its local
/// loader. Implementations that hold internal state (e.g. a
/// consistent-hash ring) must guard the ring lookup with their own lock —
/// the picker is not assumed to be externally synchronized.
pub trait PeerPicker: Send + Sync {
    /// Picks the peer that owns `key`, if it isn't this node.
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn PeerGetter>>;
}
