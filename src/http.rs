//! Reference HTTP transport implementing the [`PeerPicker`]/[`PeerGetter`]
//! contracts from [`crate::peers`], per spec.md §6.
//!
//! `HttpPool` plays both roles: as a [`PeerPicker`] it consults a
//! [`crate::consistenthash::Ring`] to decide which peer owns a key; as the
//! server half, [`HttpPool::serve`] exposes every locally registered
//! [`crate::group::Group`] under a configurable base path
//! (`/_geecache/` by default) so other pool members can fetch keys this
//! process owns. The wire body is `bincode`-encoded rather than the
//! original's protobuf, since spec.md §1 treats the framing itself as
//! non-core and this pack carries no protobuf codec; the path shape,
//! status codes, and `Content-Type` are unchanged from §6.
//!
//! The transport is intentionally thread-blocking to match the rest of the
//! crate (spec.md §5): [`HttpPool::serve`] parks the calling thread inside
//! a dedicated Tokio runtime, and [`HttpGetter`] uses `reqwest`'s blocking
//! client.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response as AxumResponse};
use axum::routing::get;
use axum::Router;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::consistenthash::Ring;
use crate::error::{HttpError, PeerError};
use crate::group::get_group;
use crate::peers::{PeerGetter, PeerPicker, PeerRequest, PeerResponse};

/// Default base path a [`HttpPool`] serves requests under, matching the
/// reference transport.
pub const DEFAULT_BASE_PATH: &str = "/_geecache/";

/// Default number of virtual nodes per peer, matching spec.md §6.
pub const DEFAULT_REPLICAS: usize = 50;

/// The wire payload returned on a cache hit: `Response { bytes value = 1; }`
/// (spec.md §6), `bincode`-encoded instead of protobuf-encoded.
#[derive(Debug, Serialize, Deserialize)]
struct WireResponse {
    value: Vec<u8>,
}

struct RingState {
    ring: Ring,
    getters: HashMap<String, Arc<HttpGetter>>,
}

/// A peer pool that is both the [`PeerPicker`] a [`crate::group::Group`]
/// consults and the HTTP server that answers other pool members' requests.
///
/// Peers are addressed by base URL (e.g. `http://10.0.0.1:8001`), including
/// this process's own address, passed to [`HttpPool::set`]. `self_addr`
/// lets [`HttpPool::pick_peer`] recognize when the ring has picked this
/// node itself, in which case it returns `None` so the caller falls back
/// to its local loader, per spec.md §4.F.
pub struct HttpPool {
    self_addr: String,
    base_path: String,
    state: Mutex<RingState>,
}

impl std::fmt::Debug for HttpPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpPool")
            .field("self_addr", &self.self_addr)
            .field("base_path", &self.base_path)
            .finish()
    }
}

impl HttpPool {
    /// Creates a pool for `self_addr` (this process's own base URL) using
    /// the default base path (`/_geecache/`).
    pub fn new(self_addr: impl Into<String>) -> Self {
        Self::with_base_path(self_addr, DEFAULT_BASE_PATH)
    }

    /// Creates a pool for `self_addr`, serving under `base_path` instead of
    /// the default.
    pub fn with_base_path(self_addr: impl Into<String>, base_path: impl Into<String>) -> Self {
        HttpPool {
            self_addr: self_addr.into(),
            base_path: base_path.into(),
            state: Mutex::new(RingState {
                ring: Ring::new(DEFAULT_REPLICAS),
                getters: HashMap::new(),
            }),
        }
    }

    /// Replaces the peer set wholesale: rebuilds the consistent-hash ring
    /// and the per-peer HTTP clients. There is no incremental removal API,
    /// matching spec.md §4.C ("rebuilt wholesale by the picker on peer-set
    /// changes").
    pub fn set<I, S>(&self, peers: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let peers: Vec<String> = peers.into_iter().map(|p| p.as_ref().to_string()).collect();
        let mut ring = Ring::new(DEFAULT_REPLICAS);
        ring.add(peers.iter());
        let mut getters = HashMap::with_capacity(peers.len());
        for peer in &peers {
            getters.insert(
                peer.clone(),
                Arc::new(HttpGetter::new(format!("{peer}{}", self.base_path))),
            );
        }
        let mut state = self.state.lock();
        state.ring = ring;
        state.getters = getters;
    }

    /// Binds `addr` and serves every registered [`crate::group::Group`]
    /// under this pool's base path until the process is interrupted or the
    /// server errors. Blocks the calling thread.
    pub fn serve(self: Arc<Self>, addr: SocketAddr) -> Result<(), HttpError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|e| HttpError::Runtime(e.to_string()))?;
        runtime.block_on(self.serve_async(addr))
    }

    async fn serve_async(self: Arc<Self>, addr: SocketAddr) -> Result<(), HttpError> {
        let route = format!("{}{{*rest}}", self.base_path);
        let app = Router::new()
            .route(&route, get(handle_request))
            .with_state(self.clone());

        tracing::info!(%addr, base_path = %self.base_path, "geecache HTTP pool listening");

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| HttpError::Bind(addr, e.to_string()))?;
        axum::serve(listener, app)
            .await
            .map_err(|e| HttpError::Serve(e.to_string()))
    }
}

impl PeerPicker for HttpPool {
    /// Picks the peer that owns `key` via the ring, returning `None` if the
    /// ring is empty or the picked peer is this node itself.
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn PeerGetter>> {
        let state = self.state.lock();
        let peer = state.ring.get(key);
        if peer.is_empty() || peer == self.self_addr {
            return None;
        }
        state
            .getters
            .get(&peer)
            .cloned()
            .map(|g| g as Arc<dyn PeerGetter>)
    }
}

/// Handles one `GET <base_path>/<group>/<key>` request: a path with any
/// other shape gets `400`, an unregistered group gets `404`, and a loader
/// error gets `500` — spec.md §6. A path falling outside this pool's own
/// base path is a programmer error (the router should never route one
/// here); the reference server aborts rather than silently serving it.
async fn handle_request(State(pool): State<Arc<HttpPool>>, uri: Uri) -> AxumResponse {
    let path = uri.path();
    let Some(rest) = path.strip_prefix(pool.base_path.as_str()) else {
        tracing::error!(%path, base_path = %pool.base_path, "request outside pool base path");
        std::process::abort();
    };

    let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() != 2 {
        return (StatusCode::BAD_REQUEST, "bad request\n").into_response();
    }

    let (group_name, key) = match (
        urlencoding::decode(segments[0]),
        urlencoding::decode(segments[1]),
    ) {
        (Ok(g), Ok(k)) => (g.into_owned(), k.into_owned()),
        _ => return (StatusCode::BAD_REQUEST, "bad request\n").into_response(),
    };

    let Some(group) = get_group(&group_name) else {
        return (
            StatusCode::NOT_FOUND,
            format!("no such group: {group_name}\n"),
        )
            .into_response();
    };

    match group.get(&key) {
        Ok(value) => {
            let body = WireResponse {
                value: value.byte_slice(),
            };
            match bincode::serialize(&body) {
                Ok(bytes) => {
                    ([("content-type", "application/octet-stream")], bytes).into_response()
                }
                Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
            }
        }
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
    }
}

/// A [`PeerGetter`] that fetches `(group, key)` pairs from one specific
/// remote peer over HTTP, using a blocking `reqwest` client.
pub struct HttpGetter {
    /// This peer's base URL, including the pool's base path
    /// (e.g. `http://10.0.0.1:8001/_geecache/`).
    base_url: String,
    client: reqwest::blocking::Client,
}

impl std::fmt::Debug for HttpGetter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpGetter")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl HttpGetter {
    fn new(base_url: String) -> Self {
        HttpGetter {
            base_url,
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl PeerGetter for HttpGetter {
    fn get(&self, req: &PeerRequest) -> Result<PeerResponse, PeerError> {
        let url = format!(
            "{}{}/{}",
            self.base_url,
            urlencoding::encode(&req.group),
            urlencoding::encode(&req.key),
        );

        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| PeerError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(PeerError::Status(format!("{status}: {body}")));
        }

        let bytes = resp
            .bytes()
            .map_err(|e| PeerError::Transport(e.to_string()))?;
        let decoded: WireResponse =
            bincode::deserialize(&bytes).map_err(|e| PeerError::Decode(e.to_string()))?;
        Ok(PeerResponse {
            value: decoded.value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pick_peer_returns_none_when_ring_is_empty() {
        let pool = HttpPool::new("http://self:8000");
        assert!(pool.pick_peer("any-key").is_none());
    }

    #[test]
    fn pick_peer_returns_none_for_self() {
        let pool = HttpPool::new("http://self:8000");
        pool.set(["http://self:8000"]);
        assert!(pool.pick_peer("any-key").is_none());
    }

    #[test]
    fn pick_peer_returns_a_remote_getter_when_ring_picks_a_peer() {
        let pool = HttpPool::new("http://self:8000");
        pool.set(["http://self:8000", "http://peer-a:8001", "http://peer-b:8002"]);

        // With three peers in the ring, at least some keys must route to a
        // peer other than self.
        let routed_remote = (0..50).any(|i| pool.pick_peer(&format!("key-{i}")).is_some());
        assert!(routed_remote);
    }

    #[test]
    fn set_rebuilds_ring_wholesale() {
        let pool = HttpPool::new("http://self:8000");
        pool.set(["http://peer-a:8001"]);
        assert!(pool.pick_peer("some-key").is_some());

        pool.set(Vec::<String>::new());
        assert!(pool.pick_peer("some-key").is_none());
    }
}
