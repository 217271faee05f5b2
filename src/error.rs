//! Error types for the cache, group, and peer-transport boundaries.
//!
//! Misuse that spec.md classifies as fatal (a nil loader, a double
//! `register_peers`, a transport path outside its base) stays as a panic —
//! these are programmer errors, not recoverable conditions, so wrapping them
//! in `Result` would just push the `unwrap()` to every caller.

use thiserror::Error;

/// Errors a [`crate::group::Group::get`] call can surface to its caller.
#[derive(Debug, Error)]
pub enum GroupError {
    /// `Group::get` was called with an empty key.
    #[error("key is required")]
    EmptyKey,

    /// The application-supplied loader failed for this key. Carried as the
    /// loader's formatted error text rather than the original boxed error,
    /// since [`crate::singleflight::SingleFlight`] requires its error type
    /// to be `Clone` so every waiter can receive an identical copy.
    #[error("loader error: {0}")]
    Loader(String),
}

// A remote peer's error never reaches this enum: `Group::load` catches any
// `PeerError` internally and falls back to the local loader per spec.md
// §4.E, so only the local loader's failure (if that also fails) is ever
// surfaced to the caller.

/// Errors a [`crate::peers::PeerGetter`] implementation can return.
#[derive(Debug, Error)]
pub enum PeerError {
    /// The underlying transport failed (connection refused, timeout, ...).
    #[error("transport error: {0}")]
    Transport(String),

    /// The peer responded but the payload could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// The peer responded with a non-success status.
    #[error("peer responded with status: {0}")]
    Status(String),
}

/// Errors the reference [`crate::http::HttpPool`] transport can surface
/// while standing up or running a server. Per-request failures (bad path,
/// unknown group, loader error) are translated directly into HTTP status
/// codes instead, per spec.md §6.
#[cfg(feature = "http")]
#[derive(Debug, Error)]
pub enum HttpError {
    /// The Tokio runtime backing [`crate::http::HttpPool::serve`] could not
    /// be built.
    #[error("failed to start async runtime: {0}")]
    Runtime(String),

    /// The server could not bind its listening socket.
    #[error("failed to bind {0}: {1}")]
    Bind(std::net::SocketAddr, String),

    /// The `axum` server loop returned an error.
    #[error("server error: {0}")]
    Serve(String),
}
