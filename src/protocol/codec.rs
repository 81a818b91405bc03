//! Low-level byte codec primitives
//!
//! Fixed-width integers of 1..=8 bytes in either byte order, and the
//! [`Reader`] cursor every field decodes from.

use bytes::{BufMut, BytesMut};

use super::{Error, Result};

/// Byte order of a multi-byte value on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Endian {
    /// Least significant byte first (crate default)
    #[default]
    Little,
    /// Most significant byte first
    Big,
}

/// Largest supported serialized integer width.
pub const MAX_INT_WIDTH: usize = 8;

/// Largest unsigned value representable in `width` bytes.
#[must_use]
pub const fn max_unsigned(width: usize) -> u64 {
    if width >= MAX_INT_WIDTH {
        u64::MAX
    } else {
        (1u64 << (width * 8)) - 1
    }
}

/// Write the low `width` bytes of `value`.
pub fn put_uint(out: &mut BytesMut, value: u64, width: usize, endian: Endian) {
    debug_assert!((1..=MAX_INT_WIDTH).contains(&width), "invalid width");
    let bytes = value.to_le_bytes();
    match endian {
        Endian::Little => out.put_slice(&bytes[..width]),
        Endian::Big => {
            for byte in bytes[..width].iter().rev() {
                out.put_u8(*byte);
            }
        }
    }
}

/// Interpret `bytes` (1..=8 of them) as an unsigned integer.
#[must_use]
pub fn uint_from_slice(bytes: &[u8], endian: Endian) -> u64 {
    let mut raw = [0u8; MAX_INT_WIDTH];
    let width = bytes.len().min(MAX_INT_WIDTH);
    match endian {
        Endian::Little => raw[..width].copy_from_slice(&bytes[..width]),
        Endian::Big => {
            for (dst, src) in raw[..width].iter_mut().zip(bytes[..width].iter().rev()) {
                *dst = *src;
            }
        }
    }
    u64::from_le_bytes(raw)
}

/// Sign-extend the low `width` bytes of `raw`.
#[must_use]
pub const fn sign_extend(raw: u64, width: usize) -> i64 {
    if width >= MAX_INT_WIDTH {
        return raw as i64;
    }
    let shift = 64 - (width as u32) * 8;
    ((raw << shift) as i64) >> shift
}

/// Cursor over an input slice.
///
/// A reader is either *open*, meaning more input may still arrive and an
/// overrun is reported as [`Error::NotEnoughData`], or *bounded* by a known
/// frame extent, in which case an overrun is a protocol violation
/// ([`Error::FrameOverrun`]).
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
    end: usize,
    bounded: bool,
}

impl<'a> Reader<'a> {
    /// Open reader over the whole slice.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            end: data.len(),
            bounded: false,
        }
    }

    /// Reader whose end is a hard frame boundary.
    #[must_use]
    pub fn bounded(data: &'a [u8]) -> Self {
        Self {
            bounded: true,
            ..Self::new(data)
        }
    }

    /// Reader over `data[pos..end]` that keeps earlier bytes addressable.
    #[must_use]
    pub fn with_range(data: &'a [u8], pos: usize, end: usize, bounded: bool) -> Self {
        let end = end.min(data.len());
        Self {
            data,
            pos: pos.min(end),
            end,
            bounded,
        }
    }

    /// Whether overruns are protocol errors.
    #[must_use]
    pub const fn is_bounded(&self) -> bool {
        self.bounded
    }

    /// Current absolute position.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Rewind or advance to an absolute position within the readable range.
    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos.min(self.end);
    }

    /// Bytes left before the end.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.end - self.pos
    }

    /// Whether nothing is left.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.pos >= self.end
    }

    /// Bytes already consumed starting at absolute offset `start`.
    #[must_use]
    pub fn consumed_since(&self, start: usize) -> &'a [u8] {
        &self.data[start.min(self.pos)..self.pos]
    }

    /// Unconsumed bytes without advancing.
    #[must_use]
    pub fn peek_rest(&self) -> &'a [u8] {
        &self.data[self.pos..self.end]
    }

    /// Sub-reader over the next `len` bytes; the parent advances past them.
    ///
    /// The sub-reader is always bounded: its end is fixed by `len`, so an
    /// overrun inside it cannot be cured by more input.
    pub fn split(&mut self, len: usize) -> Result<Reader<'a>> {
        self.ensure(len)?;
        let sub = Reader::with_range(self.data, self.pos, self.pos + len, true);
        self.pos += len;
        Ok(sub)
    }

    /// Fail unless `len` more bytes are available.
    pub fn ensure(&self, len: usize) -> Result<()> {
        let available = self.remaining();
        if len <= available {
            return Ok(());
        }
        if self.bounded {
            Err(Error::FrameOverrun {
                needed: len,
                available,
            })
        } else {
            Err(Error::NotEnoughData {
                needed: len,
                available,
            })
        }
    }

    /// Take the next `len` bytes.
    pub fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        self.ensure(len)?;
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    /// Take everything left.
    pub fn take_rest(&mut self) -> &'a [u8] {
        let slice = &self.data[self.pos..self.end];
        self.pos = self.end;
        slice
    }

    /// Read a single byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    /// Read an unsigned integer of `width` bytes.
    pub fn read_uint(&mut self, width: usize, endian: Endian) -> Result<u64> {
        let bytes = self.take(width)?;
        Ok(uint_from_slice(bytes, endian))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_byte_little_endian() {
        let mut reader = Reader::new(&[0x01, 0x02, 0x03, 0x04]);
        assert_eq!(reader.read_uint(3, Endian::Little).unwrap(), 0x03_0201);
        assert_eq!(reader.read_u8().unwrap(), 0x04);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_put_uint_big_endian() {
        let mut out = BytesMut::new();
        put_uint(&mut out, 0x0102_0304, 4, Endian::Big);
        put_uint(&mut out, 0x0506, 2, Endian::Little);
        assert_eq!(out.as_ref(), &[0x01, 0x02, 0x03, 0x04, 0x06, 0x05]);
    }

    #[test]
    fn test_sign_extend() {
        assert_eq!(sign_extend(0xFF, 1), -1);
        assert_eq!(sign_extend(0x7F, 1), 127);
        assert_eq!(sign_extend(0xFF_FFFE, 3), -2);
        assert_eq!(max_unsigned(3), 0xFF_FFFF);
        assert_eq!(max_unsigned(8), u64::MAX);
    }

    #[test]
    fn test_open_reader_reports_not_enough_data() {
        let mut reader = Reader::new(&[0x01]);
        let err = reader.read_uint(2, Endian::Little).unwrap_err();
        assert!(matches!(
            err,
            Error::NotEnoughData {
                needed: 2,
                available: 1
            }
        ));
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn test_bounded_reader_reports_overrun() {
        let mut reader = Reader::bounded(&[0x01]);
        let err = reader.take(2).unwrap_err();
        assert!(matches!(err, Error::FrameOverrun { .. }));
    }

    #[test]
    fn test_split_keeps_history() {
        let data = [1u8, 2, 3, 4, 5];
        let mut reader = Reader::new(&data);
        reader.take(1).unwrap();
        let mut sub = reader.split(3).unwrap();
        assert_eq!(reader.position(), 4);
        assert_eq!(sub.take_rest(), &[2, 3, 4]);
        assert_eq!(sub.consumed_since(0), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_split_of_open_reader_is_bounded() {
        let data = [1u8, 2, 3, 4];
        let mut reader = Reader::new(&data);
        let err = reader.split(5).unwrap_err();
        assert!(err.is_incomplete());

        let mut sub = reader.split(3).unwrap();
        assert!(sub.is_bounded());
        let err = sub.read_uint(4, Endian::Little).unwrap_err();
        assert!(matches!(err, Error::FrameOverrun { .. }));
    }
}
