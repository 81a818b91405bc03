//! Field abstraction and the concrete field kinds
//!
//! A field owns a typed value, knows how many bytes it serializes to, and
//! reads/writes itself from a [`Reader`] or into a [`BytesMut`]. Composite
//! fields (bundles and messages) are plain structs whose members are fields;
//! [`field_group!`](crate::field_group) derives their [`Field`]
//! implementation from the ordered member list.

mod bitfield;
mod bitmask;
mod checksum;
mod data;
mod enumeration;
mod float;
mod int;
mod length;
mod list;
mod optional;
mod string;
mod units;
mod variant;

use std::fmt;

use bytes::BytesMut;

use crate::protocol::{Reader, Result};

pub use bitfield::{BitMember, BitfieldField};
pub use bitmask::BitmaskField;
pub use checksum::ChecksumField;
pub use data::DataField;
pub use enumeration::{EnumField, EnumValue};
pub use float::{FloatField, FloatValue};
pub use int::{IntField, IntValue, OverflowPolicy, ValidRange};
pub use length::LengthField;
pub use list::{ListField, SizeMode};
pub use optional::{OptionalField, Presence};
pub use string::StringField;
pub use units::{UnitKind, Units};
pub use variant::{VariantField, VariantMember, VariantMembers};

/// A serializable unit of protocol state.
pub trait Field: fmt::Debug {
    /// Serialized length in bytes of the current value.
    fn length(&self) -> usize;

    /// Decode the value from `reader`, advancing it past the consumed bytes.
    fn read(&mut self, reader: &mut Reader<'_>) -> Result<()>;

    /// Append the serialized value to `out`.
    fn write(&self, out: &mut BytesMut) -> Result<()>;

    /// Whether the current value satisfies the schema's validity rules.
    fn valid(&self) -> bool {
        true
    }

    /// Recompute derived state; returns `true` when anything changed.
    fn refresh(&mut self) -> bool {
        false
    }

    /// Read as member of a group. `offsets` holds the absolute start
    /// position of every member read so far, this one included.
    fn read_in_group(&mut self, reader: &mut Reader<'_>, offsets: &[usize]) -> Result<()> {
        let _ = offsets;
        self.read(reader)
    }

    /// Write as member of a group. `offsets` holds the absolute start
    /// position in `out` of every member written so far, this one included.
    fn write_in_group(&self, out: &mut BytesMut, offsets: &[usize]) -> Result<()> {
        let _ = offsets;
        self.write(out)
    }
}

/// Per-group customization points used by [`field_group!`](crate::field_group).
///
/// Member names are passed as written in the group declaration.
pub trait GroupHooks {
    /// Called right before `member` is read, after all preceding members
    /// were decoded. Typical uses: force a list count from a sibling, resolve
    /// an optional field's existence from a flag.
    fn prepare_read(&mut self, member: &'static str, reader: &Reader<'_>) -> Result<()> {
        let _ = (member, reader);
        Ok(())
    }

    /// Recompute members derived from siblings; runs after every member's
    /// own refresh.
    fn refresh_members(&mut self) -> bool {
        false
    }

    /// Cross-member validity rules on top of per-member validity.
    fn valid_members(&self) -> bool {
        true
    }
}

/// Implement [`Field`] and [`PartialEq`] for a struct from its ordered list
/// of member fields.
///
/// Members are serialized in the listed order; equality compares exactly the
/// listed members. The plain form also provides an empty [`GroupHooks`]
/// implementation; prefix the type with `custom_hooks` to supply your own.
///
/// ```
/// use fieldwire::{field_group, IntField};
///
/// #[derive(Debug, Default)]
/// struct Point {
///     x: IntField<u16>,
///     y: IntField<u16>,
/// }
///
/// field_group!(Point { x, y });
/// ```
#[macro_export]
macro_rules! field_group {
    (custom_hooks $group:ty { $($member:ident),+ $(,)? }) => {
        impl $crate::Field for $group {
            fn length(&self) -> usize {
                0 $(+ $crate::Field::length(&self.$member))+
            }

            fn read(&mut self, reader: &mut $crate::Reader<'_>) -> $crate::Result<()> {
                let mut offsets: ::std::vec::Vec<usize> = ::std::vec::Vec::new();
                $(
                    $crate::GroupHooks::prepare_read(self, stringify!($member), reader)?;
                    offsets.push(reader.position());
                    $crate::Field::read_in_group(&mut self.$member, reader, &offsets)?;
                )+
                Ok(())
            }

            fn write(&self, out: &mut $crate::bytes::BytesMut) -> $crate::Result<()> {
                let mut offsets: ::std::vec::Vec<usize> = ::std::vec::Vec::new();
                $(
                    offsets.push(out.len());
                    $crate::Field::write_in_group(&self.$member, out, &offsets)?;
                )+
                Ok(())
            }

            fn valid(&self) -> bool {
                true $(&& $crate::Field::valid(&self.$member))+
                    && $crate::GroupHooks::valid_members(self)
            }

            fn refresh(&mut self) -> bool {
                let mut updated = false;
                $(
                    updated |= $crate::Field::refresh(&mut self.$member);
                )+
                updated |= $crate::GroupHooks::refresh_members(self);
                updated
            }
        }

        impl ::core::cmp::PartialEq for $group {
            fn eq(&self, other: &Self) -> bool {
                true $(&& self.$member == other.$member)+
            }
        }
    };
    ($group:ty { $($member:ident),+ $(,)? }) => {
        $crate::field_group!(custom_hooks $group { $($member),+ });

        impl $crate::GroupHooks for $group {}
    };
}
