//! String fields: byte sequences with a textual interpretation.

use std::borrow::Cow;

use bytes::BytesMut;

use super::{DataField, Field, SizeMode};
use crate::protocol::{Reader, Result};

/// Text stored as raw bytes.
///
/// Non-UTF-8 input is preserved byte for byte; [`as_str`](Self::as_str)
/// reports it, [`value`](Self::value) replaces it lossily. Fixed-capacity
/// strings are zero padded on write and cut at the first zero on read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StringField {
    data: DataField,
}

impl StringField {
    /// Empty string with the given size mode.
    #[must_use]
    pub fn new(mode: SizeMode) -> Self {
        Self {
            data: DataField::new(mode),
        }
    }

    /// Initial value.
    #[must_use]
    pub fn with_default(mut self, value: &str) -> Self {
        self.set_value(value);
        self
    }

    /// Text, with invalid UTF-8 replaced.
    #[must_use]
    pub fn value(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.data.value())
    }

    /// Text, if valid UTF-8.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(self.data.value()).ok()
    }

    /// Raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.data.value()
    }

    /// Replace the text. Fixed-capacity strings keep at most their capacity.
    pub fn set_value(&mut self, value: &str) {
        let bytes = value.as_bytes();
        match self.data.mode() {
            SizeMode::Fixed(capacity) if bytes.len() > capacity => {
                self.data.set_value(&bytes[..capacity]);
            }
            _ => self.data.set_value(bytes),
        }
    }

    /// Number of stored bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check whether the string is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Read exactly `len` bytes on the next read, whatever the mode.
    pub fn force_read_length(&mut self, len: usize) {
        self.data.force_read_length(len);
    }
}

impl Field for StringField {
    fn length(&self) -> usize {
        self.data.length()
    }

    fn read(&mut self, reader: &mut Reader<'_>) -> Result<()> {
        self.data.read(reader)?;
        if matches!(self.data.mode(), SizeMode::Fixed(_)) {
            let bytes = self.data.value_mut();
            if let Some(end) = bytes.iter().position(|byte| *byte == 0) {
                bytes.truncate(end);
            }
        }
        Ok(())
    }

    fn write(&self, out: &mut BytesMut) -> Result<()> {
        self.data.write(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Error;

    #[test]
    fn test_empty_default() {
        let field = StringField::new(SizeMode::length_prefix(1));
        assert!(field.is_empty());
        assert_eq!(field.length(), 1);
    }

    #[test]
    fn test_fixed_capacity() {
        let field = StringField::new(SizeMode::Fixed(5)).with_default("hello world");
        assert_eq!(field.value(), "hello");

        let short = StringField::new(SizeMode::Fixed(5)).with_default("hi");
        let mut out = BytesMut::new();
        short.write(&mut out).unwrap();
        assert_eq!(out.as_ref(), b"hi\0\0\0");

        let mut decoded = StringField::new(SizeMode::Fixed(5));
        decoded.read(&mut Reader::new(&out)).unwrap();
        assert_eq!(decoded, short);
    }

    #[test]
    fn test_zero_terminated_roundtrip() {
        let field = StringField::new(SizeMode::ZeroTerminated).with_default("abc");
        let mut out = BytesMut::new();
        field.write(&mut out).unwrap();
        assert_eq!(out.as_ref(), b"abc\0");

        let mut decoded = StringField::new(SizeMode::ZeroTerminated);
        decoded.read(&mut Reader::new(&out)).unwrap();
        assert_eq!(decoded.as_str(), Some("abc"));
    }

    #[test]
    fn test_truncated_input() {
        let mut field = StringField::new(SizeMode::length_prefix(1));
        let err = field.read(&mut Reader::new(&[4, b'a'])).unwrap_err();
        assert!(matches!(err, Error::NotEnoughData { .. }));
    }

    #[test]
    fn test_invalid_utf8_preserved() {
        let mut field = StringField::new(SizeMode::Implicit);
        field.read(&mut Reader::new(&[0xFF, b'a'])).unwrap();
        assert_eq!(field.as_str(), None);
        assert_eq!(field.as_bytes(), &[0xFF, b'a']);
        assert_eq!(field.value(), "\u{FFFD}a");
    }
}
