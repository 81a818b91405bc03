//! Checksum fields computed over preceding members of the same group.

use bytes::BytesMut;
use tracing::trace;

use super::Field;
use crate::protocol::{ChecksumAlg, Endian, Error, Reader, Result, max_unsigned, put_uint};

/// Checksum over the bytes of earlier siblings.
///
/// Inside a [`field_group!`](crate::field_group) the checksum covers every
/// byte from the start of member `from` up to the checksum itself. The
/// value is recomputed on every write and verified on every read; a
/// mismatch fails the read with [`Error::ChecksumMismatch`]. Outside a
/// group the stored value is written and read as a plain integer.
///
/// Wrapped in an [`OptionalField`](super::OptionalField) the checksum still
/// sees the enclosing group. List elements and variant members do not pass
/// the enclosing group on: a checksum there covers only the members of its
/// own group, or behaves as a plain integer when it is the element itself.
///
/// Being derived data, the checksum never affects equality.
#[derive(Debug, Clone, Copy)]
pub struct ChecksumField {
    alg: ChecksumAlg,
    width: usize,
    endian: Endian,
    from: usize,
    value: u64,
}

impl PartialEq for ChecksumField {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl ChecksumField {
    /// Checksum covering the group from its first member, in the
    /// algorithm's natural width.
    #[must_use]
    pub const fn new(alg: ChecksumAlg) -> Self {
        Self {
            alg,
            width: alg.natural_width(),
            endian: Endian::Little,
            from: 0,
            value: 0,
        }
    }

    /// Serialized width; the computed value is truncated to it.
    #[must_use]
    pub const fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    /// Set the byte order.
    #[must_use]
    pub const fn with_endian(mut self, endian: Endian) -> Self {
        self.endian = endian;
        self
    }

    /// Index of the first covered group member.
    #[must_use]
    pub const fn with_from(mut self, from: usize) -> Self {
        self.from = from;
        self
    }

    /// Last value read or stored.
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.value
    }

    /// Store a value for standalone writes.
    pub fn set_value(&mut self, value: u64) {
        self.value = value;
    }

    /// Checksum of `data` truncated to the serialized width.
    #[must_use]
    pub fn compute(&self, data: &[u8]) -> u64 {
        self.alg.compute(data) & max_unsigned(self.width)
    }
}

impl Field for ChecksumField {
    fn length(&self) -> usize {
        self.width
    }

    fn read(&mut self, reader: &mut Reader<'_>) -> Result<()> {
        self.value = reader.read_uint(self.width, self.endian)?;
        Ok(())
    }

    fn write(&self, out: &mut BytesMut) -> Result<()> {
        put_uint(out, self.value & max_unsigned(self.width), self.width, self.endian);
        Ok(())
    }

    fn read_in_group(&mut self, reader: &mut Reader<'_>, offsets: &[usize]) -> Result<()> {
        let start = offsets
            .get(self.from)
            .copied()
            .ok_or(Error::Protocol("checksum range starts after the checksum"))?;
        let expected = self.compute(reader.consumed_since(start));
        self.read(reader)?;
        if self.value != expected {
            trace!(expected, found = self.value, "checksum mismatch");
            return Err(Error::ChecksumMismatch {
                expected,
                found: self.value,
            });
        }
        Ok(())
    }

    fn write_in_group(&self, out: &mut BytesMut, offsets: &[usize]) -> Result<()> {
        let start = offsets
            .get(self.from)
            .copied()
            .ok_or(Error::Protocol("checksum range starts after the checksum"))?;
        let value = self.compute(&out[start..]);
        put_uint(out, value, self.width, self.endian);
        Ok(())
    }
}
