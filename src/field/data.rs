//! Raw byte sequence fields.

use bytes::{BufMut, BytesMut};

use super::Field;
use super::list::{SizeMode, put_prefix, read_prefix};
use crate::protocol::{Error, Reader, Result};

/// Raw byte sequence.
///
/// For [`SizeMode::CountPrefix`] and [`SizeMode::LengthPrefix`] the prefix
/// carries the number of bytes; [`SizeMode::Fixed`] zero-pads on write.
#[derive(Debug, Clone, Default)]
pub struct DataField {
    bytes: Vec<u8>,
    mode: SizeMode,
    forced_len: Option<usize>,
}

impl PartialEq for DataField {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl DataField {
    /// Empty field with the given size mode.
    #[must_use]
    pub fn new(mode: SizeMode) -> Self {
        Self {
            bytes: Vec::new(),
            mode,
            forced_len: None,
        }
    }

    /// Initial contents.
    #[must_use]
    pub fn with_default(mut self, bytes: &[u8]) -> Self {
        self.bytes = bytes.to_vec();
        self
    }

    /// Size mode.
    #[must_use]
    pub const fn mode(&self) -> SizeMode {
        self.mode
    }

    /// Stored bytes.
    #[must_use]
    pub fn value(&self) -> &[u8] {
        &self.bytes
    }

    /// Replace the stored bytes.
    pub fn set_value(&mut self, bytes: &[u8]) {
        self.bytes.clear();
        self.bytes.extend_from_slice(bytes);
    }

    /// Direct access to the byte storage.
    pub fn value_mut(&mut self) -> &mut Vec<u8> {
        &mut self.bytes
    }

    /// Number of stored bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check whether no bytes are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Grow with zeros or shrink to `len` bytes.
    pub fn resize(&mut self, len: usize) {
        self.bytes.resize(len, 0);
    }

    /// Byte at `index`.
    #[must_use]
    pub fn at(&self, index: usize) -> Option<u8> {
        self.bytes.get(index).copied()
    }

    /// Live mutable reference to the byte at `index`.
    pub fn at_mut(&mut self, index: usize) -> Option<&mut u8> {
        self.bytes.get_mut(index)
    }

    /// Read exactly `len` bytes on the next read, whatever the mode.
    pub fn force_read_length(&mut self, len: usize) {
        self.forced_len = Some(len);
    }

    /// Length of the stored bytes as they appear on the wire, without
    /// prefix or terminator.
    pub(crate) fn body_length(&self) -> usize {
        match self.mode {
            SizeMode::Fixed(len) => len,
            _ => self.bytes.len(),
        }
    }
}

impl Field for DataField {
    fn length(&self) -> usize {
        self.mode.overhead() + self.body_length()
    }

    fn read(&mut self, reader: &mut Reader<'_>) -> Result<()> {
        let bytes = if let Some(len) = self.forced_len.take() {
            reader.take(len)?
        } else {
            match self.mode {
                SizeMode::Implicit => reader.take_rest(),
                SizeMode::Fixed(len) => reader.take(len)?,
                SizeMode::CountPrefix { width, endian } | SizeMode::LengthPrefix { width, endian } => {
                    let len = read_prefix(reader, width, endian)?;
                    reader.take(len)?
                }
                SizeMode::ZeroTerminated => {
                    let rest = reader.peek_rest();
                    let Some(end) = rest.iter().position(|byte| *byte == 0) else {
                        reader.ensure(rest.len() + 1)?;
                        return Err(Error::Protocol("missing zero terminator"));
                    };
                    let bytes = reader.take(end)?;
                    reader.take(1)?;
                    bytes
                }
                SizeMode::External => {
                    return Err(Error::Protocol("data length was not forced before read"));
                }
            }
        };
        self.bytes.clear();
        self.bytes.extend_from_slice(bytes);
        Ok(())
    }

    fn write(&self, out: &mut BytesMut) -> Result<()> {
        match self.mode {
            SizeMode::CountPrefix { width, endian } | SizeMode::LengthPrefix { width, endian } => {
                put_prefix(out, self.bytes.len(), width, endian)?;
                out.put_slice(&self.bytes);
            }
            SizeMode::Fixed(len) => {
                let used = self.bytes.len().min(len);
                out.put_slice(&self.bytes[..used]);
                out.put_bytes(0, len - used);
            }
            SizeMode::ZeroTerminated => {
                out.put_slice(&self.bytes);
                out.put_u8(0);
            }
            SizeMode::Implicit | SizeMode::External => out.put_slice(&self.bytes),
        }
        Ok(())
    }
}
