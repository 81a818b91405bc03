//! Sequences of homogeneous fields, and the size modes shared with raw data
//! and string fields.

use bytes::BytesMut;

use super::Field;
use crate::protocol::{Endian, Error, Reader, Result, max_unsigned, put_uint};

/// How the extent of a sequence is determined on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SizeMode {
    /// Consume everything left in the input.
    #[default]
    Implicit,
    /// Fixed number of elements (bytes for data and string fields).
    Fixed(usize),
    /// Preceded by the number of elements.
    CountPrefix {
        /// Prefix width in bytes
        width: usize,
        /// Prefix byte order
        endian: Endian,
    },
    /// Preceded by the serialized length in bytes.
    LengthPrefix {
        /// Prefix width in bytes
        width: usize,
        /// Prefix byte order
        endian: Endian,
    },
    /// Followed by a single zero byte (data and string fields only).
    ZeroTerminated,
    /// Size is carried by a sibling and forced before every read.
    External,
}

impl SizeMode {
    /// Count prefix of `width` bytes, little-endian.
    #[must_use]
    pub const fn count_prefix(width: usize) -> Self {
        Self::CountPrefix {
            width,
            endian: Endian::Little,
        }
    }

    /// Length prefix of `width` bytes, little-endian.
    #[must_use]
    pub const fn length_prefix(width: usize) -> Self {
        Self::LengthPrefix {
            width,
            endian: Endian::Little,
        }
    }

    /// Bytes taken by the prefix or suffix.
    #[must_use]
    pub const fn overhead(&self) -> usize {
        match self {
            Self::CountPrefix { width, .. } | Self::LengthPrefix { width, .. } => *width,
            Self::ZeroTerminated => 1,
            Self::Implicit | Self::Fixed(_) | Self::External => 0,
        }
    }
}

/// Write a size prefix, rejecting values that do not fit.
pub(crate) fn put_prefix(out: &mut BytesMut, value: usize, width: usize, endian: Endian) -> Result<()> {
    let value = value as u64;
    if value > max_unsigned(width) {
        return Err(Error::NumericValueTooBig {
            value: i128::from(value),
            width,
        });
    }
    put_uint(out, value, width, endian);
    Ok(())
}

/// Read a size prefix.
pub(crate) fn read_prefix(reader: &mut Reader<'_>, width: usize, endian: Endian) -> Result<usize> {
    let value = reader.read_uint(width, endian)?;
    usize::try_from(value).map_err(|_| Error::Protocol("size prefix does not fit in memory"))
}

/// Ordered sequence of fields of one type.
///
/// New elements are clones of the list's prototype, so narrow or otherwise
/// customized element fields keep their schema settings.
#[derive(Debug, Clone)]
pub struct ListField<F: Field + Clone> {
    elements: Vec<F>,
    prototype: F,
    mode: SizeMode,
    forced: Option<Forced>,
}

/// One-shot size override set by the owning group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Forced {
    Count(usize),
    Length(usize),
}

impl<F: Field + Clone + Default> Default for ListField<F> {
    fn default() -> Self {
        Self::new(F::default(), SizeMode::Implicit)
    }
}

impl<F: Field + Clone + PartialEq> PartialEq for ListField<F> {
    fn eq(&self, other: &Self) -> bool {
        self.elements == other.elements
    }
}

impl<F: Field + Clone> ListField<F> {
    /// Empty list whose new elements start as copies of `prototype`.
    #[must_use]
    pub fn new(prototype: F, mode: SizeMode) -> Self {
        Self {
            elements: Vec::new(),
            prototype,
            mode,
            forced: None,
        }
    }

    /// Size mode.
    #[must_use]
    pub const fn mode(&self) -> SizeMode {
        self.mode
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Check whether the list has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Element at `index`.
    #[must_use]
    pub fn at(&self, index: usize) -> Option<&F> {
        self.elements.get(index)
    }

    /// Live mutable reference to the element at `index`.
    pub fn at_mut(&mut self, index: usize) -> Option<&mut F> {
        self.elements.get_mut(index)
    }

    /// Append an element.
    pub fn push(&mut self, element: F) {
        self.elements.push(element);
    }

    /// Grow with prototype copies or shrink to `len` elements.
    pub fn resize(&mut self, len: usize) {
        self.elements.resize(len, self.prototype.clone());
    }

    /// Remove all elements.
    pub fn clear(&mut self) {
        self.elements.clear();
    }

    /// Iterate over the elements.
    pub fn iter(&self) -> std::slice::Iter<'_, F> {
        self.elements.iter()
    }

    /// Elements as a slice.
    #[must_use]
    pub fn elements(&self) -> &[F] {
        &self.elements
    }

    /// Direct access to the element storage.
    pub fn elements_mut(&mut self) -> &mut Vec<F> {
        &mut self.elements
    }

    /// Read exactly `count` elements on the next read, whatever the mode.
    pub fn force_read_count(&mut self, count: usize) {
        self.forced = Some(Forced::Count(count));
    }

    /// Read elements from exactly the next `len` bytes on the next read,
    /// whatever the mode. An element crossing that boundary is a protocol
    /// error.
    pub fn force_read_length(&mut self, len: usize) {
        self.forced = Some(Forced::Length(len));
    }

    fn elements_length(&self) -> usize {
        self.elements.iter().map(Field::length).sum()
    }

    fn read_counted(&mut self, reader: &mut Reader<'_>, count: usize) -> Result<()> {
        let mut elements = Vec::with_capacity(count.min(reader.remaining()));
        for _ in 0..count {
            let mut element = self.prototype.clone();
            element.read(reader)?;
            elements.push(element);
        }
        self.elements = elements;
        Ok(())
    }

    fn read_to_end(&mut self, reader: &mut Reader<'_>) -> Result<()> {
        let mut elements = Vec::new();
        while !reader.is_empty() {
            let before = reader.position();
            let mut element = self.prototype.clone();
            element.read(reader)?;
            elements.push(element);
            if reader.position() == before {
                break;
            }
        }
        self.elements = elements;
        Ok(())
    }
}

impl<F: Field + Clone> Field for ListField<F> {
    fn length(&self) -> usize {
        match self.mode {
            SizeMode::Fixed(count) => {
                let written: usize = self.elements.iter().take(count).map(Field::length).sum();
                let padding = count.saturating_sub(self.elements.len()) * self.prototype.length();
                written + padding
            }
            mode => mode.overhead() + self.elements_length(),
        }
    }

    fn read(&mut self, reader: &mut Reader<'_>) -> Result<()> {
        match self.forced.take() {
            Some(Forced::Count(count)) => return self.read_counted(reader, count),
            Some(Forced::Length(len)) => {
                let mut sub = reader.split(len)?;
                return self.read_to_end(&mut sub);
            }
            None => {}
        }
        match self.mode {
            SizeMode::Implicit => self.read_to_end(reader),
            SizeMode::Fixed(count) => self.read_counted(reader, count),
            SizeMode::CountPrefix { width, endian } => {
                let count = read_prefix(reader, width, endian)?;
                self.read_counted(reader, count)
            }
            SizeMode::LengthPrefix { width, endian } => {
                let len = read_prefix(reader, width, endian)?;
                let mut sub = reader.split(len)?;
                self.read_to_end(&mut sub)
            }
            SizeMode::ZeroTerminated => Err(Error::NotSupported(
                "zero-terminated lists are not supported",
            )),
            SizeMode::External => Err(Error::Protocol("list size was not forced before read")),
        }
    }

    fn write(&self, out: &mut BytesMut) -> Result<()> {
        match self.mode {
            SizeMode::CountPrefix { width, endian } => {
                put_prefix(out, self.elements.len(), width, endian)?;
            }
            SizeMode::LengthPrefix { width, endian } => {
                put_prefix(out, self.elements_length(), width, endian)?;
            }
            SizeMode::ZeroTerminated => {
                return Err(Error::NotSupported(
                    "zero-terminated lists are not supported",
                ));
            }
            SizeMode::Fixed(count) => {
                for element in self.elements.iter().take(count) {
                    element.write(out)?;
                }
                for _ in self.elements.len()..count {
                    self.prototype.write(out)?;
                }
                return Ok(());
            }
            SizeMode::Implicit | SizeMode::External => {}
        }
        for element in &self.elements {
            element.write(out)?;
        }
        Ok(())
    }

    fn valid(&self) -> bool {
        self.elements.iter().all(Field::valid)
    }

    fn refresh(&mut self) -> bool {
        let mut updated = false;
        for element in &mut self.elements {
            updated |= element.refresh();
        }
        updated
    }
}
