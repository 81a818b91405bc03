//! Length fields derived from the serialized size of siblings.

use bytes::BytesMut;

use super::{Field, IntField, IntValue, OverflowPolicy};
use crate::protocol::{Endian, Reader, Result};

/// Integer holding the serialized length of one or more sibling fields.
///
/// The owning group recomputes it in
/// [`GroupHooks::refresh_members`](crate::GroupHooks::refresh_members) via
/// [`refresh_from`](Self::refresh_from) and, when reading, forces the
/// referenced fields to [`expected`](Self::expected) bytes from
/// [`GroupHooks::prepare_read`](crate::GroupHooks::prepare_read) through
/// [`ListField::force_read_length`](crate::ListField::force_read_length) or
/// [`DataField::force_read_length`](crate::DataField::force_read_length). Its
/// value is authoritative only after a refresh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LengthField<T: IntValue> {
    inner: IntField<T>,
}

impl<T: IntValue> LengthField<T> {
    /// Length field in the storage type's natural width.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialized width in bytes.
    #[must_use]
    pub fn with_width(mut self, width: usize) -> Self {
        self.inner = self.inner.with_width(width);
        self
    }

    /// Set the byte order.
    #[must_use]
    pub fn with_endian(mut self, endian: Endian) -> Self {
        self.inner = self.inner.with_endian(endian);
        self
    }

    /// Wire value bias.
    #[must_use]
    pub fn with_offset(mut self, offset: i64) -> Self {
        self.inner = self.inner.with_offset(offset);
        self
    }

    /// Overflow handling when the length does not fit the width.
    #[must_use]
    pub fn with_overflow(mut self, overflow: OverflowPolicy) -> Self {
        self.inner = self.inner.with_overflow(overflow);
        self
    }

    /// Stored length.
    #[must_use]
    pub fn value(&self) -> T {
        self.inner.value()
    }

    /// Overwrite the stored length.
    pub fn set_value(&mut self, value: T) {
        self.inner.set_value(value);
    }

    /// Stored length as a byte count; negative values count as zero.
    #[must_use]
    pub fn expected(&self) -> usize {
        usize::try_from(self.inner.value().to_i128()).unwrap_or(0)
    }

    /// Store `len`, clamped into the storage type; returns `true` when the
    /// value changed.
    pub fn refresh_from(&mut self, len: usize) -> bool {
        let len = i128::try_from(len).unwrap_or(i128::MAX);
        let value = T::from_i128_saturating(len);
        if self.inner.value() == value {
            return false;
        }
        self.inner.set_value(value);
        true
    }
}

impl<T: IntValue> Field for LengthField<T> {
    fn length(&self) -> usize {
        self.inner.length()
    }

    fn read(&mut self, reader: &mut Reader<'_>) -> Result<()> {
        self.inner.read(reader)
    }

    fn write(&self, out: &mut BytesMut) -> Result<()> {
        self.inner.write(out)
    }
}
