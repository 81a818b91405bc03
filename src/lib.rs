//! fieldwire - declarative binary protocol codec
//!
//! Protocols are described as plain Rust types: typed fields compose into
//! bundles and messages, a message set lists the messages a protocol knows,
//! and a frame layout adds sync, size, id, transport and checksum layers
//! around the payload.
//!
//! # Quick Start
//!
//! ```rust
//! use fieldwire::{
//!     field_group, message_set, DataBuffer, Frame, FrameBuilder, IntField, Message,
//!     MessageHandler,
//! };
//!
//! #[derive(Debug, Clone)]
//! pub struct Msg1 {
//!     f1: IntField<u32>,
//!     f2: IntField<u8>,
//! }
//!
//! impl Default for Msg1 {
//!     fn default() -> Self {
//!         Self { f1: IntField::new().with_width(3), f2: IntField::new() }
//!     }
//! }
//!
//! field_group!(Msg1 { f1, f2 });
//!
//! impl Message for Msg1 {
//!     const ID: u64 = 1;
//!     const NAME: &'static str = "Msg1";
//! }
//!
//! message_set! {
//!     /// Demo protocol.
//!     pub enum Demo: DemoHandler {
//!         Msg1 => handle_msg1,
//!     }
//! }
//!
//! struct Printer;
//!
//! impl MessageHandler for Printer {}
//!
//! impl DemoHandler for Printer {
//!     fn handle_msg1(&mut self, msg: &Msg1) {
//!         assert_eq!(msg.f1.value(), 0x030201);
//!     }
//! }
//!
//! let frame = Frame::<Demo>::new(FrameBuilder::new().id(1).payload().build()?);
//! let mut buffer = DataBuffer::from(&[1u8, 1, 2, 3, 4][..]);
//! let summary = frame.process_input_data(&mut buffer, &mut Printer);
//! assert_eq!(summary.dispatched, 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Features
//!
//! - **Typed fields** - integers of any width 1..=8 bytes, enums, bitmasks,
//!   bitfields, strings, raw data, lists, optionals, variants, checksums and
//!   length fields
//! - **Derived data** - `refresh` recomputes lengths and presence explicitly
//! - **Framing** - sync, size, id, transport values and checksums in any order
//! - **Static dispatch** - decoded messages reach a per-type handler method
//!   with a catch-all fallback
//! - **Little-endian by default** - big-endian per field and per layer

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod field;
pub mod protocol;

pub use bytes;

pub use field::{
    BitMember, BitfieldField, BitmaskField, ChecksumField, DataField, EnumField, EnumValue, Field,
    FloatField, FloatValue, GroupHooks, IntField, IntValue, LengthField, ListField, OptionalField,
    OverflowPolicy, Presence, SizeMode, StringField, UnitKind, Units, ValidRange, VariantField,
    VariantMember, VariantMembers,
};
pub use protocol::{
    ChecksumAlg, DataBuffer, Endian, Error, ErrorStatus, Frame, FrameBuilder, FrameConfig,
    FrameFields, FrameLayout, Layer, LayoutError, MAX_FRAME_LEN, Message, MessageBase,
    MessageHandler, MessageSet, ProcessSummary, Reader, ResyncPolicy, Result,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
