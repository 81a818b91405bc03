//! Enumeration fields.
//!
//! Storage and validity are separate: any raw value of the representation
//! type can be stored, encoded and decoded, while [`Field::valid`] only
//! accepts values that name an enumerator.

use bytes::BytesMut;

use super::{Field, IntField, IntValue};
use crate::protocol::{Endian, Reader, Result};

/// Enumeration usable as the value of an [`EnumField`].
pub trait EnumValue: Copy + PartialEq + std::fmt::Debug {
    /// Wire representation.
    type Repr: IntValue;

    /// Raw value of the enumerator.
    fn to_repr(self) -> Self::Repr;

    /// Enumerator for a raw value, if one exists.
    fn from_repr(repr: Self::Repr) -> Option<Self>;
}

/// Field holding an enumeration value.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumField<E: EnumValue> {
    raw: IntField<E::Repr>,
}

impl<E: EnumValue> EnumField<E> {
    /// Field initialized to `default`.
    #[must_use]
    pub fn new(default: E) -> Self {
        Self {
            raw: IntField::new().with_default(default.to_repr()),
        }
    }

    /// Set the serialized width.
    #[must_use]
    pub fn with_width(mut self, width: usize) -> Self {
        self.raw = self.raw.with_width(width);
        self
    }

    /// Set the byte order.
    #[must_use]
    pub fn with_endian(mut self, endian: Endian) -> Self {
        self.raw = self.raw.with_endian(endian);
        self
    }

    /// Enumerator for the stored value; `None` when the raw value is unnamed.
    #[must_use]
    pub fn value(&self) -> Option<E> {
        E::from_repr(self.raw.value())
    }

    /// Store an enumerator.
    pub fn set_value(&mut self, value: E) {
        self.raw.set_value(value.to_repr());
    }

    /// Stored raw value.
    #[must_use]
    pub fn raw(&self) -> E::Repr {
        self.raw.value()
    }

    /// Store any raw value, named or not.
    pub fn set_raw(&mut self, raw: E::Repr) {
        self.raw.set_value(raw);
    }
}

impl<E: EnumValue + Default> Default for EnumField<E> {
    fn default() -> Self {
        Self::new(E::default())
    }
}

impl<E: EnumValue> Field for EnumField<E> {
    fn length(&self) -> usize {
        self.raw.length()
    }

    fn read(&mut self, reader: &mut Reader<'_>) -> Result<()> {
        self.raw.read(reader)
    }

    fn write(&self, out: &mut BytesMut) -> Result<()> {
        self.raw.write(out)
    }

    fn valid(&self) -> bool {
        self.value().is_some()
    }
}
