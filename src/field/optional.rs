//! Presence-gated fields.

use bytes::BytesMut;
use tracing::trace;

use super::Field;
use crate::protocol::{Reader, Result};

/// Observable existence of an optional field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Inner field is serialized.
    Exists,
    /// Inner field takes no bytes.
    Missing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Tentative,
    Exists,
    Missing,
}

/// Inner field plus an existence flag.
///
/// A freshly constructed field is *tentative*: it reads the inner field when
/// input remains and becomes missing otherwise. Until resolved it reports
/// [`Presence::Missing`] and serializes to nothing.
///
/// [`field`](Self::field) always returns the inner value, even while the
/// field is missing; it then holds the last decoded value or the schema
/// default. Use [`get`](Self::get) to observe existence and value together.
#[derive(Debug, Clone)]
pub struct OptionalField<F: Field> {
    field: F,
    mode: Mode,
    missing_on_read_fail: bool,
    missing_on_invalid: bool,
    since_version: Option<u64>,
    until_version: Option<u64>,
}

impl<F: Field + Default> Default for OptionalField<F> {
    fn default() -> Self {
        Self::new(F::default())
    }
}

impl<F: Field + PartialEq> PartialEq for OptionalField<F> {
    fn eq(&self, other: &Self) -> bool {
        match (self.presence(), other.presence()) {
            (Presence::Exists, Presence::Exists) => self.field == other.field,
            (Presence::Missing, Presence::Missing) => true,
            _ => false,
        }
    }
}

impl<F: Field> OptionalField<F> {
    /// Tentative optional around `field`.
    #[must_use]
    pub fn new(field: F) -> Self {
        Self {
            field,
            mode: Mode::Tentative,
            missing_on_read_fail: false,
            missing_on_invalid: false,
            since_version: None,
            until_version: None,
        }
    }

    /// Optional that starts out existing.
    #[must_use]
    pub fn existing(field: F) -> Self {
        Self {
            mode: Mode::Exists,
            ..Self::new(field)
        }
    }

    /// Optional that starts out missing.
    #[must_use]
    pub fn missing(field: F) -> Self {
        Self {
            mode: Mode::Missing,
            ..Self::new(field)
        }
    }

    /// Become missing instead of failing when the inner read fails.
    #[must_use]
    pub fn with_missing_on_read_fail(mut self) -> Self {
        self.missing_on_read_fail = true;
        self
    }

    /// Become missing when the decoded inner value is invalid.
    #[must_use]
    pub fn with_missing_on_invalid(mut self) -> Self {
        self.missing_on_invalid = true;
        self
    }

    /// Exist only for protocol versions in `since..=until`.
    #[must_use]
    pub fn with_version_range(mut self, since: Option<u64>, until: Option<u64>) -> Self {
        self.since_version = since;
        self.until_version = until;
        self
    }

    /// Current existence.
    #[must_use]
    pub fn presence(&self) -> Presence {
        match self.mode {
            Mode::Exists => Presence::Exists,
            Mode::Tentative | Mode::Missing => Presence::Missing,
        }
    }

    /// Check whether the field exists.
    #[must_use]
    pub fn does_exist(&self) -> bool {
        self.mode == Mode::Exists
    }

    /// Check whether the field is missing.
    #[must_use]
    pub fn is_missing(&self) -> bool {
        !self.does_exist()
    }

    /// Mark the field as existing.
    pub fn set_exists(&mut self) {
        self.mode = Mode::Exists;
    }

    /// Mark the field as missing.
    pub fn set_missing(&mut self) {
        self.mode = Mode::Missing;
    }

    /// Let the next read decide existence from the remaining input.
    pub fn set_tentative(&mut self) {
        self.mode = Mode::Tentative;
    }

    /// Set existence from a flag.
    pub fn set_presence(&mut self, exists: bool) {
        self.mode = if exists { Mode::Exists } else { Mode::Missing };
    }

    /// Inner field, whatever the existence.
    #[must_use]
    pub fn field(&self) -> &F {
        &self.field
    }

    /// Mutable inner field, whatever the existence.
    pub fn field_mut(&mut self) -> &mut F {
        &mut self.field
    }

    /// Inner field if it exists.
    #[must_use]
    pub fn get(&self) -> Option<&F> {
        self.does_exist().then_some(&self.field)
    }

    /// Mutable inner field if it exists.
    pub fn get_mut(&mut self) -> Option<&mut F> {
        if self.does_exist() {
            Some(&mut self.field)
        } else {
            None
        }
    }

    /// Replace the inner field and mark it existing.
    pub fn set(&mut self, field: F) {
        self.field = field;
        self.mode = Mode::Exists;
    }

    /// Resolve existence for protocol `version`; returns `true` when it
    /// changed. Fields without a version range are left untouched.
    pub fn refresh_for_version(&mut self, version: u64) -> bool {
        if self.since_version.is_none() && self.until_version.is_none() {
            return false;
        }
        let exists = self.since_version.is_none_or(|since| version >= since)
            && self.until_version.is_none_or(|until| version <= until);
        let mode = if exists { Mode::Exists } else { Mode::Missing };
        if self.mode == mode {
            return false;
        }
        trace!(version, exists, "optional field resolved by version");
        self.mode = mode;
        true
    }
}

impl<F: Field> Field for OptionalField<F> {
    fn length(&self) -> usize {
        if self.does_exist() {
            self.field.length()
        } else {
            0
        }
    }

    fn read(&mut self, reader: &mut Reader<'_>) -> Result<()> {
        self.read_inner(reader, |field, reader| field.read(reader))
    }

    fn write(&self, out: &mut BytesMut) -> Result<()> {
        if self.does_exist() {
            self.field.write(out)
        } else {
            Ok(())
        }
    }

    fn valid(&self) -> bool {
        self.is_missing() || self.field.valid()
    }

    fn refresh(&mut self) -> bool {
        if self.does_exist() {
            self.field.refresh()
        } else {
            false
        }
    }

    fn read_in_group(&mut self, reader: &mut Reader<'_>, offsets: &[usize]) -> Result<()> {
        self.read_inner(reader, |field, reader| field.read_in_group(reader, offsets))
    }

    fn write_in_group(&self, out: &mut BytesMut, offsets: &[usize]) -> Result<()> {
        if self.does_exist() {
            self.field.write_in_group(out, offsets)
        } else {
            Ok(())
        }
    }
}

impl<F: Field> OptionalField<F> {
    fn read_inner(
        &mut self,
        reader: &mut Reader<'_>,
        read: impl FnOnce(&mut F, &mut Reader<'_>) -> Result<()>,
    ) -> Result<()> {
        match self.mode {
            Mode::Missing => return Ok(()),
            Mode::Tentative if reader.is_empty() => {
                trace!("optional field missing at end of input");
                self.mode = Mode::Missing;
                return Ok(());
            }
            Mode::Tentative | Mode::Exists => {}
        }

        let start = reader.position();
        if let Err(err) = read(&mut self.field, reader) {
            if !self.missing_on_read_fail {
                return Err(err);
            }
            trace!(error = ?err, "optional field missing after failed read");
            reader.set_position(start);
            self.mode = Mode::Missing;
            return Ok(());
        }

        if self.missing_on_invalid && !self.field.valid() {
            trace!("optional field missing after invalid read");
            reader.set_position(start);
            self.mode = Mode::Missing;
            return Ok(());
        }
        self.mode = Mode::Exists;
        Ok(())
    }
}
