//! Bitfield: one packed integer partitioned into named bit ranges.

use bytes::BytesMut;

use super::{Field, IntField, ValidRange};
use crate::protocol::{Endian, Error, Reader, Result};

/// Bit range of one bitfield member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitMember {
    /// Member name
    pub name: &'static str,
    /// Index of the least significant bit
    pub offset: u32,
    /// Number of bits
    pub bits: u32,
    /// Valid values of the member, if restricted
    pub valid: Option<ValidRange>,
}

impl BitMember {
    /// Unrestricted member.
    #[must_use]
    pub const fn new(name: &'static str, offset: u32, bits: u32) -> Self {
        Self {
            name,
            offset,
            bits,
            valid: None,
        }
    }

    /// Member whose value must lie in `min..=max`.
    #[must_use]
    pub const fn with_valid(mut self, min: i128, max: i128) -> Self {
        self.valid = Some(ValidRange { min, max });
        self
    }

    const fn mask(&self) -> u64 {
        if self.bits >= 64 {
            u64::MAX
        } else {
            (1u64 << self.bits) - 1
        }
    }
}

/// Bit-packed group of members sharing one serialized integer.
///
/// Member accessors are views over the packed value: a write through one
/// member is immediately visible through [`value`](Self::value), through
/// [`bit`](Self::bit), and through any member overlapping the same bits.
#[derive(Debug, Clone)]
pub struct BitfieldField {
    packed: IntField<u64>,
    members: &'static [BitMember],
}

impl PartialEq for BitfieldField {
    fn eq(&self, other: &Self) -> bool {
        self.packed == other.packed
    }
}

impl BitfieldField {
    /// Bitfield of `width` bytes with the given member layout.
    #[must_use]
    pub fn new(width: usize, members: &'static [BitMember]) -> Self {
        debug_assert!(
            members
                .iter()
                .all(|m| m.bits > 0 && m.offset + m.bits <= (width * 8) as u32),
            "bitfield member exceeds width"
        );
        Self {
            packed: IntField::new().with_width(width),
            members,
        }
    }

    /// Set the byte order.
    #[must_use]
    pub fn with_endian(mut self, endian: Endian) -> Self {
        self.packed = self.packed.with_endian(endian);
        self
    }

    /// Initial packed value.
    #[must_use]
    pub fn with_default(mut self, packed: u64) -> Self {
        self.packed.set_value(packed);
        self
    }

    /// Packed value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.packed.value()
    }

    /// Replace the packed value.
    pub fn set_value(&mut self, packed: u64) {
        self.packed.set_value(packed);
    }

    /// Member layout.
    #[must_use]
    pub const fn members(&self) -> &'static [BitMember] {
        self.members
    }

    /// Value of the member at `index`.
    #[must_use]
    pub fn member(&self, index: usize) -> Option<u64> {
        let member = self.members.get(index)?;
        Some((self.packed.value() >> member.offset) & member.mask())
    }

    /// Value of the member called `name`.
    #[must_use]
    pub fn member_by_name(&self, name: &str) -> Option<u64> {
        let index = self.members.iter().position(|m| m.name == name)?;
        self.member(index)
    }

    /// Store `value` into the member at `index`.
    pub fn set_member(&mut self, index: usize, value: u64) -> Result<()> {
        let member = self
            .members
            .get(index)
            .ok_or(Error::NotSupported("unknown bitfield member"))?;
        let mask = member.mask();
        if value > mask {
            return Err(Error::NumericValueTooBig {
                value: i128::from(value),
                width: member.bits.div_ceil(8) as usize,
            });
        }
        let cleared = self.packed.value() & !(mask << member.offset);
        self.packed.set_value(cleared | (value << member.offset));
        Ok(())
    }

    /// Store `value` into the member called `name`.
    pub fn set_member_by_name(&mut self, name: &str, value: u64) -> Result<()> {
        let index = self
            .members
            .iter()
            .position(|m| m.name == name)
            .ok_or(Error::NotSupported("unknown bitfield member"))?;
        self.set_member(index, value)
    }

    /// Single bit of the packed value.
    #[must_use]
    pub fn bit(&self, position: u32) -> bool {
        position < 64 && self.packed.value() & (1u64 << position) != 0
    }

    /// Set a single bit of the packed value.
    pub fn set_bit(&mut self, position: u32, on: bool) {
        if position >= 64 {
            return;
        }
        let mask = 1u64 << position;
        let packed = self.packed.value();
        self.packed
            .set_value(if on { packed | mask } else { packed & !mask });
    }
}

impl Field for BitfieldField {
    fn length(&self) -> usize {
        self.packed.length()
    }

    fn read(&mut self, reader: &mut Reader<'_>) -> Result<()> {
        self.packed.read(reader)
    }

    fn write(&self, out: &mut BytesMut) -> Result<()> {
        self.packed.write(out)
    }

    fn valid(&self) -> bool {
        self.members.iter().enumerate().all(|(index, member)| {
            match (member.valid, self.member(index)) {
                (Some(range), Some(value)) => range.contains(i128::from(value)),
                _ => true,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAYOUT: &[BitMember] = &[
        BitMember::new("low", 0, 4),
        BitMember::new("flag", 4, 1),
        BitMember::new("high", 5, 3).with_valid(0, 5),
    ];

    #[test]
    fn test_member_views() {
        let mut field = BitfieldField::new(1, LAYOUT);
        field.set_member(0, 0xA).unwrap();
        field.set_member_by_name("flag", 1).unwrap();
        assert_eq!(field.value(), 0x1A);
        assert!(field.bit(4));
        field.set_bit(4, false);
        assert_eq!(field.member_by_name("flag"), Some(0));
        field.set_value(0b1010_0011);
        assert_eq!(field.member(0), Some(0b0011));
        assert_eq!(field.member(2), Some(0b101));
        assert!(field.valid());
    }

    #[test]
    fn test_member_overflow_rejected() {
        let mut field = BitfieldField::new(1, LAYOUT);
        assert!(matches!(
            field.set_member(1, 2),
            Err(Error::NumericValueTooBig { .. })
        ));
        assert_eq!(field.value(), 0);
    }

    #[test]
    fn test_member_validity() {
        let mut field = BitfieldField::new(1, LAYOUT);
        field.set_member(2, 7).unwrap();
        assert!(!field.valid());
    }

    #[test]
    fn test_roundtrip() {
        let mut field = BitfieldField::new(2, LAYOUT).with_endian(Endian::Big);
        field.set_value(0x01FF);
        let mut out = BytesMut::new();
        field.write(&mut out).unwrap();
        let mut decoded = BitfieldField::new(2, LAYOUT).with_endian(Endian::Big);
        decoded.read(&mut Reader::new(&out)).unwrap();
        assert_eq!(decoded, field);
    }
}
