//! Protocol core: byte codec, buffers, messages, and framing
//!
//! This module provides the wire primitives every field builds on, the
//! message traits, and the frame layer that turns messages into bytes and
//! back.

mod buffer;
mod checksum;
mod codec;
mod error;
mod frame;
mod layer;
mod message;

pub use buffer::DataBuffer;
pub use checksum::ChecksumAlg;
pub use codec::{Endian, MAX_INT_WIDTH, Reader, max_unsigned, put_uint, sign_extend, uint_from_slice};
pub use error::{Error, ErrorStatus, LayoutError, Result};
pub use frame::{Frame, FrameConfig, FrameFields, ProcessSummary, ResyncPolicy};
pub use layer::{FrameBuilder, FrameLayout, Layer};
pub use message::{Message, MessageBase, MessageHandler, MessageSet};

/// Largest frame accepted by default (16 MB)
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;
