//! Bitmask (set) fields: independent flags packed into one integer.

use bytes::BytesMut;

use super::{Field, IntField};
use crate::protocol::{Endian, Reader, Result};

/// Set of single-bit flags over a `u64` storage.
///
/// Bits covered by the reserved mask must hold the reserved value for the
/// field to be [`valid`](Field::valid).
#[derive(Debug, Clone, PartialEq)]
pub struct BitmaskField {
    bits: IntField<u64>,
    reserved_mask: u64,
    reserved_value: u64,
}

impl BitmaskField {
    /// Bitmask serialized in `width` bytes.
    #[must_use]
    pub fn new(width: usize) -> Self {
        Self {
            bits: IntField::new().with_width(width),
            reserved_mask: 0,
            reserved_value: 0,
        }
    }

    /// Set the byte order.
    #[must_use]
    pub fn with_endian(mut self, endian: Endian) -> Self {
        self.bits = self.bits.with_endian(endian);
        self
    }

    /// Initial bits.
    #[must_use]
    pub fn with_default(mut self, bits: u64) -> Self {
        self.bits.set_value(bits);
        self
    }

    /// Bits that must hold `value` (masked) to be valid.
    #[must_use]
    pub fn with_reserved(mut self, mask: u64, value: u64) -> Self {
        self.reserved_mask = mask;
        self.reserved_value = value & mask;
        self
    }

    /// All bits.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.bits.value()
    }

    /// Replace all bits.
    pub fn set_value(&mut self, bits: u64) {
        self.bits.set_value(bits);
    }

    /// Read a single bit.
    #[must_use]
    pub fn bit(&self, index: u32) -> bool {
        index < 64 && self.bits.value() & (1u64 << index) != 0
    }

    /// Write a single bit.
    pub fn set_bit(&mut self, index: u32, on: bool) {
        if index >= 64 {
            return;
        }
        let mask = 1u64 << index;
        let bits = self.bits.value();
        self.bits.set_value(if on { bits | mask } else { bits & !mask });
    }

    /// Check whether every bit in `mask` is set.
    #[must_use]
    pub fn has_all(&self, mask: u64) -> bool {
        self.bits.value() & mask == mask
    }

    /// Set or clear every bit in `mask`.
    pub fn set_bits(&mut self, mask: u64, on: bool) {
        let bits = self.bits.value();
        self.bits
            .set_value(if on { bits | mask } else { bits & !mask });
    }
}

impl Field for BitmaskField {
    fn length(&self) -> usize {
        self.bits.length()
    }

    fn read(&mut self, reader: &mut Reader<'_>) -> Result<()> {
        self.bits.read(reader)
    }

    fn write(&self, out: &mut BytesMut) -> Result<()> {
        self.bits.write(out)
    }

    fn valid(&self) -> bool {
        self.bits.value() & self.reserved_mask == self.reserved_value
    }
}
