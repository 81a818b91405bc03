//! Growable byte container used for all bytes-in/bytes-out traffic.

use bytes::{Buf, BytesMut};

/// Owned byte buffer passed by reference into encode/decode calls.
///
/// Encoding appends to the end; frame processing consumes from the front.
/// No read cursor is kept: consumed bytes are dropped, so the buffer always
/// holds exactly the unprocessed suffix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataBuffer {
    data: BytesMut,
}

impl DataBuffer {
    /// Create an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty buffer with reserved capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: BytesMut::with_capacity(capacity),
        }
    }

    /// Append raw bytes, e.g. a chunk received from a socket.
    pub fn extend_from_slice(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Expose the stored bytes.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Expose the stored bytes for in-place edits.
    #[must_use]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Writable storage for encoders.
    pub fn bytes_mut(&mut self) -> &mut BytesMut {
        &mut self.data
    }

    /// Drop `count` bytes from the front.
    pub fn consume(&mut self, count: usize) {
        let count = count.min(self.data.len());
        self.data.advance(count);
    }

    /// Number of stored bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check whether the buffer contains no data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Remove all data.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Shorten the buffer to `len` bytes.
    pub fn truncate(&mut self, len: usize) {
        self.data.truncate(len);
    }

    /// Split off everything after `at`, leaving `[0, at)` in place.
    #[must_use]
    pub fn split_off(&mut self, at: usize) -> Self {
        let at = at.min(self.data.len());
        Self {
            data: self.data.split_off(at),
        }
    }

    /// Copy the contents out.
    #[must_use]
    pub fn to_vec(&self) -> Vec<u8> {
        self.data.to_vec()
    }
}

impl From<&[u8]> for DataBuffer {
    fn from(bytes: &[u8]) -> Self {
        Self {
            data: BytesMut::from(bytes),
        }
    }
}

impl From<Vec<u8>> for DataBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from(bytes.as_slice())
    }
}

impl AsRef<[u8]> for DataBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}
