//! Variant fields: tagged unions over a closed list of member fields.

use std::fmt;

use bytes::BytesMut;
use tracing::trace;

use super::Field;
use crate::protocol::{Error, Reader, Result};

/// Closed set of alternatives a [`VariantField`] can hold.
///
/// Usually generated by [`variant_members!`](crate::variant_members).
pub trait VariantMembers: Sized + Clone + PartialEq + fmt::Debug {
    /// Visitor receiving the active member.
    type Handler: ?Sized;

    /// Number of alternatives.
    const COUNT: usize;

    /// Default-initialized member at `index`.
    fn create(index: usize) -> Option<Self>;

    /// Index of this member in declaration order.
    fn index(&self) -> usize;

    /// Declared name of this member.
    fn name(&self) -> &'static str;

    /// Member as a field.
    fn as_field(&self) -> &dyn Field;

    /// Member as a mutable field.
    fn as_field_mut(&mut self) -> &mut dyn Field;

    /// Hand the member to its handler method.
    fn exec(&self, handler: &mut Self::Handler);
}

/// Typed access to one alternative of `M`.
///
/// Implemented by [`variant_members!`](crate::variant_members) for every
/// member type, which is why member types within one set must be distinct.
pub trait VariantMember<M: VariantMembers>: Field + Default + Sized {
    /// Wrap into the member set.
    fn wrap(self) -> M;

    /// This alternative, if `members` holds it.
    fn peek(members: &M) -> Option<&Self>;

    /// This alternative mutably, if `members` holds it.
    fn peek_mut(members: &mut M) -> Option<&mut Self>;

    /// Store a default-initialized instance into `slot` and return it.
    fn init_in(slot: &mut Option<M>) -> &mut Self;
}

/// Runtime-selected tagged union.
///
/// Holds at most one member; with none the field is invalid and serializes
/// to nothing. Decoding tries members in declaration order and keeps the
/// first one that reads successfully and is valid.
#[derive(Debug, Clone)]
pub struct VariantField<M: VariantMembers> {
    current: Option<M>,
}

impl<M: VariantMembers> Default for VariantField<M> {
    fn default() -> Self {
        Self { current: None }
    }
}

impl<M: VariantMembers> PartialEq for VariantField<M> {
    fn eq(&self, other: &Self) -> bool {
        self.current == other.current
    }
}

impl<M: VariantMembers> VariantField<M> {
    /// Variant with no active member.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the active member.
    #[must_use]
    pub fn current_field(&self) -> Option<usize> {
        self.current.as_ref().map(VariantMembers::index)
    }

    /// Active member.
    #[must_use]
    pub fn current(&self) -> Option<&M> {
        self.current.as_ref()
    }

    /// Active member, mutably.
    pub fn current_mut(&mut self) -> Option<&mut M> {
        self.current.as_mut()
    }

    /// Switch to the member at `index`, default-initialized. An out of range
    /// index leaves the variant without a member.
    pub fn select_field(&mut self, index: usize) -> bool {
        self.current = M::create(index);
        self.current.is_some()
    }

    /// Switch to member `T`, default-initialized, and return it.
    pub fn init_field<T: VariantMember<M>>(&mut self) -> &mut T {
        T::init_in(&mut self.current)
    }

    /// Replace the active member.
    pub fn set(&mut self, member: M) {
        self.current = Some(member);
    }

    /// Member `T` if it is the active one.
    #[must_use]
    pub fn access_field<T: VariantMember<M>>(&self) -> Option<&T> {
        self.current.as_ref().and_then(T::peek)
    }

    /// Member `T` mutably if it is the active one.
    pub fn access_field_mut<T: VariantMember<M>>(&mut self) -> Option<&mut T> {
        self.current.as_mut().and_then(T::peek_mut)
    }

    /// Drop the active member.
    pub fn reset(&mut self) {
        self.current = None;
    }

    /// Hand the active member to `handler`; returns `false` when there is
    /// none.
    pub fn current_field_exec(&self, handler: &mut M::Handler) -> bool {
        match &self.current {
            Some(member) => {
                member.exec(handler);
                true
            }
            None => false,
        }
    }
}

impl<M: VariantMembers> Field for VariantField<M> {
    fn length(&self) -> usize {
        self.current.as_ref().map_or(0, |m| m.as_field().length())
    }

    fn read(&mut self, reader: &mut Reader<'_>) -> Result<()> {
        self.current = None;
        let mut short = None;
        for index in 0..M::COUNT {
            let Some(mut member) = M::create(index) else {
                continue;
            };
            let mut attempt = reader.clone();
            match member.as_field_mut().read(&mut attempt) {
                Ok(()) if member.as_field().valid() => {
                    trace!(member = member.name(), "variant member selected");
                    *reader = attempt;
                    self.current = Some(member);
                    return Ok(());
                }
                Ok(()) => {}
                Err(err) if err.is_incomplete() => {
                    short.get_or_insert(err);
                }
                Err(_) => {}
            }
        }
        Err(short.unwrap_or(Error::InvalidVariant))
    }

    fn write(&self, out: &mut BytesMut) -> Result<()> {
        match &self.current {
            Some(member) => member.as_field().write(out),
            None => Ok(()),
        }
    }

    fn valid(&self) -> bool {
        self.current.as_ref().is_some_and(|m| m.as_field().valid())
    }

    fn refresh(&mut self) -> bool {
        self.current
            .as_mut()
            .is_some_and(|m| m.as_field_mut().refresh())
    }
}

/// Declare the members of a variant field.
///
/// Generates the member enum with its [`VariantMembers`] implementation, a
/// [`VariantMember`] implementation per member type, and a handler trait with
/// one method per member. Every handler method defaults to
/// `handle_member`, which ignores the member unless overridden.
///
/// ```
/// use fieldwire::{variant_members, IntField, VariantField};
///
/// variant_members! {
///     /// Either a byte or a word.
///     pub enum Value: ValueHandler {
///         Byte(IntField<u8>) => handle_byte,
///         Word(IntField<u16>) => handle_word,
///     }
/// }
///
/// let mut field = VariantField::<Value>::new();
/// field.init_field::<IntField<u16>>().set_value(7);
/// assert_eq!(field.current_field(), Some(1));
/// ```
#[macro_export]
macro_rules! variant_members {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident : $handler:ident {
            $($member:ident($ty:ty) => $method:ident),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        $vis enum $name {
            $(
                #[doc = concat!("`", stringify!($member), "` member")]
                $member($ty),
            )+
        }

        #[doc = concat!("Handler of the members of [`", stringify!($name), "`].")]
        $vis trait $handler {
            $(
                #[doc = concat!("Handle the `", stringify!($member), "` member.")]
                fn $method(&mut self, member: &$ty) {
                    self.handle_member(member);
                }
            )+

            /// Fallback for members without a dedicated handler.
            fn handle_member(&mut self, member: &dyn $crate::Field) {
                let _ = member;
            }
        }

        impl $crate::VariantMembers for $name {
            type Handler = dyn $handler;

            const COUNT: usize = [$(stringify!($member)),+].len();

            fn create(index: usize) -> ::core::option::Option<Self> {
                let mut current = 0usize;
                $(
                    if index == current {
                        return ::core::option::Option::Some(
                            Self::$member(::core::default::Default::default()),
                        );
                    }
                    current += 1;
                )+
                let _ = current;
                ::core::option::Option::None
            }

            fn index(&self) -> usize {
                let mut current = 0usize;
                $(
                    if matches!(self, Self::$member(_)) {
                        return current;
                    }
                    current += 1;
                )+
                current
            }

            fn name(&self) -> &'static str {
                match self {
                    $(Self::$member(_) => stringify!($member),)+
                }
            }

            fn as_field(&self) -> &dyn $crate::Field {
                match self {
                    $(Self::$member(member) => member,)+
                }
            }

            fn as_field_mut(&mut self) -> &mut dyn $crate::Field {
                match self {
                    $(Self::$member(member) => member,)+
                }
            }

            fn exec(&self, handler: &mut Self::Handler) {
                match self {
                    $(Self::$member(member) => handler.$method(member),)+
                }
            }
        }

        $(
            #[allow(unreachable_patterns)]
            impl $crate::VariantMember<$name> for $ty {
                fn wrap(self) -> $name {
                    $name::$member(self)
                }

                fn peek(members: &$name) -> ::core::option::Option<&Self> {
                    match members {
                        $name::$member(member) => ::core::option::Option::Some(member),
                        _ => ::core::option::Option::None,
                    }
                }

                fn peek_mut(members: &mut $name) -> ::core::option::Option<&mut Self> {
                    match members {
                        $name::$member(member) => ::core::option::Option::Some(member),
                        _ => ::core::option::Option::None,
                    }
                }

                fn init_in(slot: &mut ::core::option::Option<$name>) -> &mut Self {
                    match slot.insert($name::$member(::core::default::Default::default())) {
                        $name::$member(member) => member,
                        _ => unreachable!("member was just initialized"),
                    }
                }
            }
        )+
    };
}
