//! Codec error types and the shared outcome enumeration

use std::fmt;

use thiserror::Error;

/// Outcome of an encode/decode operation.
///
/// Every [`Error`] maps onto exactly one status through [`Error::status`], so
/// callers that only care about the kind of failure can branch on this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorStatus {
    /// Operation completed.
    Success,
    /// A derived field must be refreshed before the operation can proceed.
    UpdateRequired,
    /// More bytes are needed; retry once they arrive.
    NotEnoughData,
    /// Structurally invalid input.
    ProtocolError,
    /// Message id does not map to a known message.
    InvalidMsgId,
    /// Message decoded but its contents are not valid.
    InvalidMsgData,
    /// Value does not fit the serialized width.
    NumericValueTooBig,
    /// Output does not fit the available space.
    BufferOverflow,
    /// Operation is not supported by the field or layer.
    NotSupported,
}

impl ErrorStatus {
    /// Collapse a result into its status.
    #[must_use]
    pub fn of<T>(result: &Result<T>) -> Self {
        match result {
            Ok(_) => Self::Success,
            Err(err) => err.status(),
        }
    }

    /// Check whether this status signals success.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Success => "Success",
            Self::UpdateRequired => "UpdateRequired",
            Self::NotEnoughData => "NotEnoughData",
            Self::ProtocolError => "ProtocolError",
            Self::InvalidMsgId => "InvalidMsgId",
            Self::InvalidMsgData => "InvalidMsgData",
            Self::NumericValueTooBig => "NumericValueTooBig",
            Self::BufferOverflow => "BufferOverflow",
            Self::NotSupported => "NotSupported",
        };
        write!(f, "{name}")
    }
}

/// Codec errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Input ended before the value was complete
    #[error("not enough data: need {needed} bytes, got {available}")]
    NotEnoughData {
        /// Bytes required by the read
        needed: usize,
        /// Bytes left in the input
        available: usize,
    },

    /// Read ran past the end of a frame whose extent is already known
    #[error("field overruns frame: need {needed} bytes, {available} left in frame")]
    FrameOverrun {
        /// Bytes required by the read
        needed: usize,
        /// Bytes left before the frame boundary
        available: usize,
    },

    /// Checksum mismatch
    #[error("checksum mismatch: expected {expected:#x}, got {found:#x}")]
    ChecksumMismatch {
        /// Checksum computed over the received bytes
        expected: u64,
        /// Checksum carried on the wire
        found: u64,
    },

    /// Sync prefix did not match
    #[error("invalid sync prefix at offset {offset}")]
    InvalidSync {
        /// Offset of the first mismatching byte
        offset: usize,
    },

    /// Size layer announced an impossible frame length
    #[error("invalid frame size: {size} (allowed {min}..={max})")]
    InvalidFrameSize {
        /// Announced size
        size: u64,
        /// Smallest acceptable size
        min: u64,
        /// Largest acceptable size
        max: u64,
    },

    /// No variant member accepted the input
    #[error("no variant member matches the input")]
    InvalidVariant,

    /// Other structural violation
    #[error("protocol error: {0}")]
    Protocol(&'static str),

    /// Unknown message id
    #[error("invalid message id: {id:#x}")]
    InvalidMsgId {
        /// Id read from the wire
        id: u64,
    },

    /// Decoded message failed its validity check
    #[error("invalid message data in {name}")]
    InvalidMsgData {
        /// Message name
        name: &'static str,
    },

    /// Value does not fit into the serialized width
    #[error("numeric value too big: {value} does not fit into {width} bytes")]
    NumericValueTooBig {
        /// Value being written
        value: i128,
        /// Serialized width in bytes
        width: usize,
    },

    /// Output limit exceeded
    #[error("buffer overflow: need {needed} bytes, limit {limit}")]
    BufferOverflow {
        /// Bytes required
        needed: usize,
        /// Configured limit
        limit: usize,
    },

    /// Operation not supported
    #[error("not supported: {0}")]
    NotSupported(&'static str),
}

impl Error {
    /// Map the error onto the outcome enumeration.
    #[must_use]
    pub const fn status(&self) -> ErrorStatus {
        match self {
            Self::NotEnoughData { .. } => ErrorStatus::NotEnoughData,
            Self::FrameOverrun { .. }
            | Self::ChecksumMismatch { .. }
            | Self::InvalidSync { .. }
            | Self::InvalidFrameSize { .. }
            | Self::InvalidVariant
            | Self::Protocol(_) => ErrorStatus::ProtocolError,
            Self::InvalidMsgId { .. } => ErrorStatus::InvalidMsgId,
            Self::InvalidMsgData { .. } => ErrorStatus::InvalidMsgData,
            Self::NumericValueTooBig { .. } => ErrorStatus::NumericValueTooBig,
            Self::BufferOverflow { .. } => ErrorStatus::BufferOverflow,
            Self::NotSupported(_) => ErrorStatus::NotSupported,
        }
    }

    /// Check whether retrying with more input may succeed.
    #[must_use]
    pub const fn is_incomplete(&self) -> bool {
        matches!(self, Self::NotEnoughData { .. })
    }
}

impl From<Error> for ErrorStatus {
    fn from(err: Error) -> Self {
        err.status()
    }
}

/// Errors raised while assembling a frame layout.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    /// Layout does not have exactly one id layer
    #[error("frame layout requires exactly one id layer, found {0}")]
    IdLayerCount(usize),

    /// Layout does not have exactly one payload layer
    #[error("frame layout requires exactly one payload layer, found {0}")]
    PayloadLayerCount(usize),

    /// Width outside 1..=8 bytes
    #[error("layer {layer} has unsupported width {width}")]
    InvalidWidth {
        /// Layer index
        layer: usize,
        /// Declared width
        width: usize,
    },

    /// Checksum coverage does not precede the checksum layer
    #[error("checksum layer {layer} covers from layer {from}, which does not precede it")]
    InvalidChecksumRange {
        /// Checksum layer index
        layer: usize,
        /// First covered layer index
        from: usize,
    },

    /// Size layer appears after the payload
    #[error("size layer {0} must precede the payload")]
    SizeAfterPayload(usize),

    /// Id layer appears after the payload
    #[error("id layer {0} must precede the payload")]
    IdAfterPayload(usize),

    /// Empty sync prefix
    #[error("sync layer {0} has an empty pattern")]
    EmptySync(usize),

    /// Selected checksum without choices, or without a transport value
    /// layer preceding the payload to select from
    #[error("checksum layer {layer} cannot be selected by transport value {index}")]
    UnboundChecksumSelector {
        /// Checksum layer index
        layer: usize,
        /// Selecting transport value index
        index: usize,
    },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
