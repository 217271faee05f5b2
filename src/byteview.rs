//! Read-only byte payload wrapper.
//!
//! `ByteView` is the value type stored in the cache and returned to callers.
//! It owns its bytes; any accessor that would let a caller mutate the
//! stored payload instead hands back a defensive copy, so a cache hit can
//! never be corrupted by something the previous caller did with the bytes
//! it got back.

use std::borrow::Cow;
use std::sync::Arc;

/// An immutable, cheaply-cloneable byte payload.
///
/// Internally reference-counted (`Arc<[u8]>`) so that storing a value in the
/// cache and handing a copy to a caller doesn't duplicate the backing bytes;
/// only [`ByteView::byte_slice`] produces an owned copy, since that's the
/// only accessor that hands bytes to code which might mutate them.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ByteView {
    b: Arc<[u8]>,
}

impl ByteView {
    /// Number of bytes in this value.
    pub fn len(&self) -> usize {
        self.b.len()
    }

    /// True if this value holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.b.is_empty()
    }

    /// Returns a defensive copy of the underlying bytes.
    ///
    /// Mutating the returned `Vec` never affects this value or any copy of
    /// it held elsewhere (e.g. in the cache).
    pub fn byte_slice(&self) -> Vec<u8> {
        self.b.to_vec()
    }

    /// Borrows the underlying bytes without copying.
    pub fn as_bytes(&self) -> &[u8] {
        &self.b
    }

    /// Lossily decodes the stored bytes as UTF-8, matching the original
    /// `(v ByteView) String() string` conversion, which never fails.
    pub fn as_str_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.b)
    }
}

impl From<Vec<u8>> for ByteView {
    fn from(b: Vec<u8>) -> Self {
        ByteView { b: Arc::from(b) }
    }
}

impl From<&[u8]> for ByteView {
    fn from(b: &[u8]) -> Self {
        ByteView { b: Arc::from(b) }
    }
}

impl From<String> for ByteView {
    fn from(s: String) -> Self {
        ByteView::from(s.into_bytes())
    }
}

impl From<&str> for ByteView {
    fn from(s: &str) -> Self {
        ByteView::from(s.as_bytes())
    }
}
