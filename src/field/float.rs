//! IEEE 754 floating point fields.

use std::fmt;

use bytes::BytesMut;

use super::{Field, Units};
use crate::protocol::{Endian, Error, Reader, Result, put_uint};

/// Storage type of a floating point field.
pub trait FloatValue:
    Copy + Default + PartialOrd + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    /// Serialized width in bytes.
    const WIDTH: usize;

    /// Widen losslessly.
    fn to_f64(self) -> f64;

    /// Narrow, rounding to the nearest representable value.
    fn from_f64(value: f64) -> Self;

    /// Raw IEEE 754 bits.
    fn to_bits_u64(self) -> u64;

    /// Rebuild from raw IEEE 754 bits.
    fn from_bits_u64(bits: u64) -> Self;
}

impl FloatValue for f32 {
    const WIDTH: usize = 4;

    fn to_f64(self) -> f64 {
        f64::from(self)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn from_f64(value: f64) -> Self {
        value as f32
    }

    fn to_bits_u64(self) -> u64 {
        u64::from(self.to_bits())
    }

    #[allow(clippy::cast_possible_truncation)]
    fn from_bits_u64(bits: u64) -> Self {
        f32::from_bits(bits as u32)
    }
}

impl FloatValue for f64 {
    const WIDTH: usize = 8;

    fn to_f64(self) -> f64 {
        self
    }

    fn from_f64(value: f64) -> Self {
        value
    }

    fn to_bits_u64(self) -> u64 {
        self.to_bits()
    }

    fn from_bits_u64(bits: u64) -> Self {
        f64::from_bits(bits)
    }
}

/// Equality that treats every NaN as the same value.
fn same_value(a: f64, b: f64) -> bool {
    (a.is_nan() && b.is_nan()) || a == b
}

/// Floating point field serialized as its raw IEEE 754 bits.
///
/// Valid ranges are inclusive; a range whose bounds are NaN accepts only
/// NaN, and infinite bounds accept the matching infinity.
#[derive(Debug, Clone)]
pub struct FloatField<T: FloatValue> {
    value: T,
    endian: Endian,
    valid_ranges: Vec<(f64, f64)>,
    specials: Vec<(&'static str, f64)>,
    units: Option<Units>,
}

impl<T: FloatValue> Default for FloatField<T> {
    fn default() -> Self {
        Self {
            value: T::default(),
            endian: Endian::default(),
            valid_ranges: Vec::new(),
            specials: Vec::new(),
            units: None,
        }
    }
}

impl<T: FloatValue> PartialEq for FloatField<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value.to_bits_u64() == other.value.to_bits_u64()
    }
}

impl<T: FloatValue> FloatField<T> {
    /// Little-endian field with value zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
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

    /// Add an inclusive valid range. Without ranges every value is valid.
    #[must_use]
    pub fn with_valid_range(mut self, min: T, max: T) -> Self {
        self.valid_ranges.push((min.to_f64(), max.to_f64()));
        self
    }

    /// Add a single valid value, NaN included.
    #[must_use]
    pub fn with_valid_value(self, value: T) -> Self {
        self.with_valid_range(value, value)
    }

    /// Name a special value such as NaN or an infinity.
    #[must_use]
    pub fn with_special(mut self, name: &'static str, value: T) -> Self {
        self.specials.push((name, value.to_f64()));
        self
    }

    /// Units of the stored value.
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

    /// Byte order.
    #[must_use]
    pub const fn endian(&self) -> Endian {
        self.endian
    }

    /// Name of the special value currently stored, if any.
    #[must_use]
    pub fn special_name(&self) -> Option<&'static str> {
        let value = self.value.to_f64();
        self.specials
            .iter()
            .find(|(_, special)| same_value(*special, value))
            .map(|(name, _)| *name)
    }

    /// Check whether the stored value is the named special.
    #[must_use]
    pub fn is_special(&self, name: &str) -> bool {
        let value = self.value.to_f64();
        self.specials
            .iter()
            .any(|(special, v)| *special == name && same_value(*v, value))
    }

    /// Store the named special; returns `false` for unknown names.
    pub fn set_special(&mut self, name: &str) -> bool {
        match self.specials.iter().find(|(special, _)| *special == name) {
            Some((_, value)) => {
                self.value = T::from_f64(*value);
                true
            }
            None => false,
        }
    }

    /// Declared units.
    #[must_use]
    pub const fn units(&self) -> Option<Units> {
        self.units
    }

    /// Value converted into `units`.
    pub fn value_in(&self, units: Units) -> Result<f64> {
        let own = self
            .units
            .ok_or(Error::NotSupported("field declares no units"))?;
        own.convert(self.value.to_f64(), units)
            .ok_or(Error::NotSupported("units of a different kind"))
    }

    /// Store a value expressed in `units`.
    pub fn set_in(&mut self, units: Units, value: f64) -> Result<()> {
        let own = self
            .units
            .ok_or(Error::NotSupported("field declares no units"))?;
        let converted = units
            .convert(value, own)
            .ok_or(Error::NotSupported("units of a different kind"))?;
        self.value = T::from_f64(converted);
        Ok(())
    }
}

impl<T: FloatValue> Field for FloatField<T> {
    fn length(&self) -> usize {
        T::WIDTH
    }

    fn read(&mut self, reader: &mut Reader<'_>) -> Result<()> {
        let bits = reader.read_uint(T::WIDTH, self.endian)?;
        self.value = T::from_bits_u64(bits);
        Ok(())
    }

    fn write(&self, out: &mut BytesMut) -> Result<()> {
        put_uint(out, self.value.to_bits_u64(), T::WIDTH, self.endian);
        Ok(())
    }

    fn valid(&self) -> bool {
        let value = self.value.to_f64();
        if self.valid_ranges.is_empty() {
            return true;
        }
        self.valid_ranges.iter().any(|&(min, max)| {
            if value.is_nan() {
                min.is_nan() || max.is_nan()
            } else {
                min <= value && value <= max
            }
        })
    }
}
