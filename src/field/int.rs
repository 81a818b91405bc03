//! Integral fields, including fixed-point scaling and physical units.

use std::fmt;

use bytes::BytesMut;

use super::{Field, Units};
use crate::protocol::{
    Endian, Error, MAX_INT_WIDTH, Reader, Result, max_unsigned, put_uint, sign_extend,
};

/// Storage type of an integral field.
pub trait IntValue:
    Copy + Default + PartialEq + PartialOrd + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    /// Natural serialized width in bytes.
    const WIDTH: usize;
    /// Whether the type is signed.
    const SIGNED: bool;
    /// Smallest value.
    const MIN: i128;
    /// Largest value.
    const MAX: i128;

    /// Widen losslessly.
    fn to_i128(self) -> i128;

    /// Narrow, clamping into the type's range.
    fn from_i128_saturating(value: i128) -> Self;
}

macro_rules! impl_int_value {
    ($($ty:ty => $signed:expr),+ $(,)?) => {
        $(
            impl IntValue for $ty {
                const WIDTH: usize = std::mem::size_of::<$ty>();
                const SIGNED: bool = $signed;
                const MIN: i128 = <$ty>::MIN as i128;
                const MAX: i128 = <$ty>::MAX as i128;

                fn to_i128(self) -> i128 {
                    i128::from(self)
                }

                fn from_i128_saturating(value: i128) -> Self {
                    value.clamp(<Self as IntValue>::MIN, <Self as IntValue>::MAX) as $ty
                }
            }
        )+
    };
}

impl_int_value!(
    u8 => false,
    u16 => false,
    u32 => false,
    u64 => false,
    i8 => true,
    i16 => true,
    i32 => true,
    i64 => true,
);

/// What happens when a value does not fit the serialized width.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Fail the write with [`Error::NumericValueTooBig`].
    #[default]
    Reject,
    /// Clamp to the nearest representable value.
    Saturate,
}

/// Inclusive range of valid values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidRange {
    /// Lower bound
    pub min: i128,
    /// Upper bound
    pub max: i128,
}

impl ValidRange {
    /// Check membership.
    #[must_use]
    pub const fn contains(&self, value: i128) -> bool {
        self.min <= value && value <= self.max
    }
}

/// Fixed-width integral field.
///
/// The serialized width may be narrower than the storage type (a 3-byte
/// value stored in `u32`). The wire value is `value + offset`.
#[derive(Debug, Clone)]
pub struct IntField<T: IntValue> {
    value: T,
    width: usize,
    endian: Endian,
    offset: i64,
    overflow: OverflowPolicy,
    valid_ranges: Vec<ValidRange>,
    specials: Vec<(&'static str, T)>,
    scaling: (i64, i64),
    units: Option<Units>,
}

impl<T: IntValue> Default for IntField<T> {
    fn default() -> Self {
        Self {
            value: T::default(),
            width: T::WIDTH,
            endian: Endian::default(),
            offset: 0,
            overflow: OverflowPolicy::default(),
            valid_ranges: Vec::new(),
            specials: Vec::new(),
            scaling: (1, 1),
            units: None,
        }
    }
}

impl<T: IntValue> PartialEq for IntField<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T: IntValue> IntField<T> {
    /// Field with the type's natural width, little-endian, value zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the serialized width (1..=8 bytes).
    #[must_use]
    pub fn with_width(mut self, width: usize) -> Self {
        debug_assert!((1..=MAX_INT_WIDTH).contains(&width), "invalid width");
        self.width = width.clamp(1, MAX_INT_WIDTH);
        self
    }

    /// Set the byte order.
    #[must_use]
    pub fn with_endian(mut self, endian: Endian) -> Self {
        self.endian = endian;
        self
    }

    /// Set the default (initial) value.
    #[must_use]
    pub fn with_default(mut self, value: T) -> Self {
        self.value = value;
        self
    }

    /// Add a constant to the value on the wire.
    #[must_use]
    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }

    /// Set the overflow policy.
    #[must_use]
    pub fn with_overflow(mut self, overflow: OverflowPolicy) -> Self {
        self.overflow = overflow;
        self
    }

    /// Add an inclusive valid range. Without ranges every value is valid.
    #[must_use]
    pub fn with_valid_range(mut self, min: T, max: T) -> Self {
        self.valid_ranges.push(ValidRange {
            min: min.to_i128(),
            max: max.to_i128(),
        });
        self
    }

    /// Add a single valid value.
    #[must_use]
    pub fn with_valid_value(self, value: T) -> Self {
        self.with_valid_range(value, value)
    }

    /// Name a special value.
    #[must_use]
    pub fn with_special(mut self, name: &'static str, value: T) -> Self {
        self.specials.push((name, value));
        self
    }

    /// Scaled value is `value * num / den`.
    #[must_use]
    pub fn with_scaling(mut self, num: i64, den: i64) -> Self {
        debug_assert!(num != 0 && den != 0, "scaling ratio must be non-zero");
        self.scaling = (num, den);
        self
    }

    /// Units of the scaled value.
    #[must_use]
    pub fn with_units(mut self, units: Units) -> Self {
        self.units = Some(units);
        self
    }

    /// Stored value.
    #[must_use]
    pub fn value(&self) -> T {
        self.value
    }

    /// Replace the stored value.
    pub fn set_value(&mut self, value: T) {
        self.value = value;
    }

    /// Mutable access to the stored value.
    pub fn value_mut(&mut self) -> &mut T {
        &mut self.value
    }

    /// Serialized width in bytes.
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Byte order.
    #[must_use]
    pub const fn endian(&self) -> Endian {
        self.endian
    }

    /// Name of the special value currently stored, if any.
    #[must_use]
    pub fn special_name(&self) -> Option<&'static str> {
        self.specials
            .iter()
            .find(|(_, value)| *value == self.value)
            .map(|(name, _)| *name)
    }

    /// Check whether the stored value is the named special.
    #[must_use]
    pub fn is_special(&self, name: &str) -> bool {
        self.specials
            .iter()
            .any(|(special, value)| *special == name && *value == self.value)
    }

    /// Store the named special; returns `false` for unknown names.
    pub fn set_special(&mut self, name: &str) -> bool {
        match self.specials.iter().find(|(special, _)| *special == name) {
            Some((_, value)) => {
                self.value = *value;
                true
            }
            None => false,
        }
    }

    /// Value after applying the scaling ratio.
    #[must_use]
    pub fn scaled(&self) -> f64 {
        let (num, den) = self.scaling;
        self.value.to_i128() as f64 * num as f64 / den as f64
    }

    /// Store the raw value closest to `scaled`.
    pub fn set_scaled(&mut self, scaled: f64) {
        let (num, den) = self.scaling;
        let raw = (scaled * den as f64 / num as f64).round();
        self.value = T::from_i128_saturating(raw as i128);
    }

    /// Declared units of the scaled value.
    #[must_use]
    pub const fn units(&self) -> Option<Units> {
        self.units
    }

    /// Scaled value converted into `units`.
    pub fn value_in(&self, units: Units) -> Result<f64> {
        let own = self
            .units
            .ok_or(Error::NotSupported("field declares no units"))?;
        own.convert(self.scaled(), units)
            .ok_or(Error::NotSupported("units of a different kind"))
    }

    /// Store a value expressed in `units`.
    pub fn set_in(&mut self, units: Units, value: f64) -> Result<()> {
        let own = self
            .units
            .ok_or(Error::NotSupported("field declares no units"))?;
        let scaled = units
            .convert(value, own)
            .ok_or(Error::NotSupported("units of a different kind"))?;
        self.set_scaled(scaled);
        Ok(())
    }

    fn wire_range(&self) -> (i128, i128) {
        let max = i128::from(max_unsigned(self.width));
        if T::SIGNED {
            let half = (max + 1) / 2;
            (-half, half - 1)
        } else {
            (0, max)
        }
    }
}

impl<T: IntValue> Field for IntField<T> {
    fn length(&self) -> usize {
        self.width
    }

    fn read(&mut self, reader: &mut Reader<'_>) -> Result<()> {
        let raw = reader.read_uint(self.width, self.endian)?;
        let wire = if T::SIGNED {
            i128::from(sign_extend(raw, self.width))
        } else {
            i128::from(raw)
        };
        self.value = T::from_i128_saturating(wire - i128::from(self.offset));
        Ok(())
    }

    fn write(&self, out: &mut BytesMut) -> Result<()> {
        let mut wire = self.value.to_i128() + i128::from(self.offset);
        let (min, max) = self.wire_range();
        if wire < min || wire > max {
            match self.overflow {
                OverflowPolicy::Reject => {
                    return Err(Error::NumericValueTooBig {
                        value: wire,
                        width: self.width,
                    });
                }
                OverflowPolicy::Saturate => wire = wire.clamp(min, max),
            }
        }
        put_uint(out, wire as u64, self.width, self.endian);
        Ok(())
    }

    fn valid(&self) -> bool {
        let value = self.value.to_i128();
        self.valid_ranges.is_empty() || self.valid_ranges.iter().any(|r| r.contains(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode<F: Field>(field: &F) -> Result<Vec<u8>> {
        let mut out = BytesMut::new();
        field.write(&mut out)?;
        Ok(out.to_vec())
    }

    #[test]
    fn test_narrow_width_roundtrip() {
        let mut field = IntField::<u32>::new().with_width(3);
        field.set_value(0x03_0201);
        let bytes = encode(&field).unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);

        let mut decoded = IntField::<u32>::new().with_width(3);
        decoded.read(&mut Reader::new(&bytes)).unwrap();
        assert_eq!(decoded.value(), 0x03_0201);
    }

    #[test]
    fn test_signed_narrow_width() {
        let mut field = IntField::<i32>::new().with_width(2).with_endian(Endian::Big);
        field.set_value(-2);
        let bytes = encode(&field).unwrap();
        assert_eq!(bytes, vec![0xFF, 0xFE]);

        let mut decoded = IntField::<i32>::new().with_width(2).with_endian(Endian::Big);
        decoded.read(&mut Reader::new(&bytes)).unwrap();
        assert_eq!(decoded.value(), -2);
    }

    #[test]
    fn test_overflow_policies() {
        let mut rejecting = IntField::<u16>::new().with_width(1);
        rejecting.set_value(300);
        assert!(matches!(
            encode(&rejecting),
            Err(Error::NumericValueTooBig { value: 300, width: 1 })
        ));

        let mut saturating = IntField::<u16>::new()
            .with_width(1)
            .with_overflow(OverflowPolicy::Saturate);
        saturating.set_value(300);
        assert_eq!(encode(&saturating).unwrap(), vec![0xFF]);
    }

    #[test]
    fn test_saturating_narrowing() {
        assert_eq!(u8::from_i128_saturating(300), u8::MAX);
        assert_eq!(u8::from_i128_saturating(-5), 0);
        assert_eq!(i16::from_i128_saturating(-40_000), i16::MIN);
        assert_eq!(i64::from_i128_saturating(i128::MAX), i64::MAX);
        assert_eq!(u32::from_i128_saturating(7), 7);

        let mut field = IntField::<i8>::new().with_width(2);
        field.read(&mut Reader::new(&[0x00, 0x01])).unwrap();
        assert_eq!(field.value(), i8::MAX);
    }

    #[test]
    fn test_offset() {
        let mut field = IntField::<u16>::new().with_width(1).with_offset(-2000);
        field.set_value(2024);
        assert_eq!(encode(&field).unwrap(), vec![24]);

        let mut decoded = IntField::<u16>::new().with_width(1).with_offset(-2000);
        decoded.read(&mut Reader::new(&[25])).unwrap();
        assert_eq!(decoded.value(), 2025);
    }

    #[test]
    fn test_valid_ranges_and_specials() {
        let mut field = IntField::<u8>::new()
            .with_valid_range(1, 10)
            .with_valid_value(0xFF)
            .with_special("unknown", 0xFF)
            .with_default(1);
        assert!(field.valid());
        field.set_value(11);
        assert!(!field.valid());
        assert!(field.set_special("unknown"));
        assert!(field.valid());
        assert!(field.is_special("unknown"));
        assert_eq!(field.special_name(), Some("unknown"));
        assert!(!field.set_special("missing"));
    }

    #[test]
    fn test_units_consistency() {
        let mut distance = IntField::<u32>::new()
            .with_scaling(1, 100)
            .with_units(Units::Millimeters);
        distance.set_in(Units::Meters, 0.1).unwrap();
        assert_eq!(distance.value(), 10_000);
        assert!((distance.scaled() - 100.0).abs() < f64::EPSILON);
        let meters = distance.value_in(Units::Meters).unwrap();
        assert!((meters - 0.1).abs() < 1e-9);
        assert!(matches!(
            distance.value_in(Units::Seconds),
            Err(Error::NotSupported(_))
        ));
    }

    #[test]
    fn test_short_input() {
        let mut field = IntField::<u32>::new();
        let err = field.read(&mut Reader::new(&[1, 2])).unwrap_err();
        assert!(matches!(err, Error::NotEnoughData { needed: 4, available: 2 }));
    }
}
