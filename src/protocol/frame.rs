//! Frame: the outermost protocol layer
//!
//! A [`Frame`] wraps messages of one [`MessageSet`] with the layers of its
//! [`FrameLayout`] on write, and on read strips and validates those layers,
//! decodes the payload into the message selected by the id layer, and hands
//! the result to a handler.

use std::marker::PhantomData;
use std::ops::Range;

use bytes::{BufMut, BytesMut};
use tracing::{debug, instrument, trace};

use super::{
    ChecksumAlg, DataBuffer, Endian, Error, ErrorStatus, FrameLayout, Layer, MAX_FRAME_LEN,
    MessageBase, MessageHandler, MessageSet, Reader, Result, max_unsigned, put_uint,
};

/// What to do with input that cannot be parsed as a frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ResyncPolicy {
    /// Drop one byte and try again.
    #[default]
    SkipByte,
    /// Stop processing, leaving the bytes in the buffer.
    Abort,
}

/// Frame behavior settings.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FrameConfig {
    /// Recovery from malformed input
    pub resync: ResyncPolicy,
    /// Report decoded messages that fail their validity check as
    /// [`ErrorStatus::InvalidMsgData`] instead of dispatching them
    pub reject_invalid: bool,
    /// Largest frame accepted from a size layer or produced on write
    pub max_frame_len: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            resync: ResyncPolicy::SkipByte,
            reject_invalid: false,
            max_frame_len: MAX_FRAME_LEN,
        }
    }
}

/// Raw framing values of the last parsed frame, for diagnostics.
///
/// Offsets are relative to the start of the frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameFields {
    /// Wire value of the size layer
    pub size: Option<u64>,
    /// Message id
    pub id: Option<u64>,
    /// Transport values as `(index, value)`
    pub values: Vec<(usize, u64)>,
    /// Byte range of the payload
    pub payload: Option<Range<usize>>,
    /// Checksum carried on the wire (last checksum layer)
    pub checksum: Option<u64>,
    /// Total frame length, once known
    pub frame_len: Option<usize>,
}

impl FrameFields {
    /// Last value read for transport value `index`.
    #[must_use]
    pub fn value(&self, index: usize) -> Option<u64> {
        self.values
            .iter()
            .rev()
            .find(|(value_index, _)| *value_index == index)
            .map(|(_, value)| *value)
    }
}

/// Outcome of a processing pass over a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessSummary {
    /// Bytes removed from the buffer
    pub consumed: usize,
    /// Messages handed to the handler
    pub dispatched: usize,
    /// Status of the last parse attempt
    pub status: ErrorStatus,
}

impl Default for ProcessSummary {
    fn default() -> Self {
        Self {
            consumed: 0,
            dispatched: 0,
            status: ErrorStatus::Success,
        }
    }
}

enum Step {
    Dispatched,
    Resynced,
    Discarded,
    Stop,
}

/// Codec for the messages of `M` framed by a fixed layout.
///
/// Frames hold no receive state: every call parses from the start of the
/// given bytes, and only the unconsumed suffix of a [`DataBuffer`] carries
/// over between calls.
#[derive(Debug)]
pub struct Frame<M: MessageSet> {
    layout: FrameLayout,
    config: FrameConfig,
    _messages: PhantomData<fn() -> M>,
}

impl<M: MessageSet> Frame<M> {
    /// Frame with the default configuration.
    #[must_use]
    pub fn new(layout: FrameLayout) -> Self {
        Self::with_config(layout, FrameConfig::default())
    }

    /// Frame with an explicit configuration.
    #[must_use]
    pub fn with_config(layout: FrameLayout, config: FrameConfig) -> Self {
        Self {
            layout,
            config,
            _messages: PhantomData,
        }
    }

    /// Layout in use.
    #[must_use]
    pub const fn layout(&self) -> &FrameLayout {
        &self.layout
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &FrameConfig {
        &self.config
    }

    /// Serialized length of `msg` once framed.
    #[must_use]
    pub fn length(&self, msg: &dyn MessageBase) -> usize {
        self.layout
            .layers()
            .iter()
            .map(|layer| match layer {
                Layer::Payload => msg.length(),
                Layer::SelectedChecksum { index, .. } => layer
                    .checksum_for(msg.transport_value(*index))
                    .map_or(0, |(_, width)| width),
                _ => layer.fixed_len().unwrap_or(0),
            })
            .sum()
    }

    /// Append `msg` framed to `buffer`. Nothing is appended on failure.
    ///
    /// Derived fields are written as they are; call
    /// [`refresh`](crate::Field::refresh) first when needed.
    #[instrument(level = "trace", skip(self, msg, buffer), fields(name = msg.name(), id = msg.id()))]
    pub fn write_message(&self, msg: &dyn MessageBase, buffer: &mut DataBuffer) -> Result<()> {
        let start = buffer.len();
        let result = self.write_frame(msg, buffer.bytes_mut(), start);
        if let Err(err) = &result {
            debug!(error = %err, "frame write failed");
            buffer.truncate(start);
        }
        result
    }

    /// Parse one frame from the start of `data`.
    ///
    /// Returns the refreshed message and the number of bytes the frame took.
    #[instrument(level = "trace", skip(self, data), fields(len = data.len()))]
    pub fn read_message(&self, data: &[u8]) -> Result<(M, usize)> {
        self.read_frame(data, &mut FrameFields::default())
    }

    /// Like [`read_message`](Self::read_message), also recording the raw
    /// framing values into `fields`.
    pub fn read_message_fields(&self, data: &[u8], fields: &mut FrameFields) -> Result<(M, usize)> {
        *fields = FrameFields::default();
        self.read_frame(data, fields)
    }

    /// Parse and dispatch every complete frame in `buffer`.
    ///
    /// Consumed bytes are removed from the buffer; an incomplete trailing
    /// frame stays for the next call. Malformed input is reported through
    /// [`MessageHandler::handle_invalid_data`] and then skipped byte by byte
    /// or left in place, per [`FrameConfig::resync`]. Frames with an unknown
    /// id or rejected contents are skipped whole when their extent is known.
    #[instrument(level = "trace", skip(self, buffer, handler), fields(len = buffer.len()))]
    pub fn process_input_data(
        &self,
        buffer: &mut DataBuffer,
        handler: &mut M::Handler,
    ) -> ProcessSummary {
        let mut summary = ProcessSummary::default();
        while !buffer.is_empty() {
            let mut fields = FrameFields::default();
            if let Step::Stop = self.step(buffer, handler, &mut fields, &mut summary) {
                break;
            }
        }
        summary
    }

    /// Parse and dispatch at most one message from `buffer`.
    ///
    /// Malformed leading bytes are handled as in
    /// [`process_input_data`](Self::process_input_data); processing ends
    /// after the first frame that was dispatched or discarded. The raw
    /// framing values of that frame are stored into `all_fields`.
    #[instrument(level = "trace", skip(self, buffer, handler, all_fields), fields(len = buffer.len()))]
    pub fn process_input_data_single_msg(
        &self,
        buffer: &mut DataBuffer,
        handler: &mut M::Handler,
        mut all_fields: Option<&mut FrameFields>,
    ) -> ProcessSummary {
        let mut summary = ProcessSummary::default();
        while !buffer.is_empty() {
            let mut fields = FrameFields::default();
            let step = self.step(buffer, handler, &mut fields, &mut summary);
            if let Some(out) = all_fields.as_deref_mut() {
                *out = fields;
            }
            match step {
                Step::Resynced => {}
                Step::Dispatched | Step::Discarded | Step::Stop => break,
            }
        }
        summary
    }

    fn step(
        &self,
        buffer: &mut DataBuffer,
        handler: &mut M::Handler,
        fields: &mut FrameFields,
        summary: &mut ProcessSummary,
    ) -> Step {
        let err = match self.read_frame(buffer.as_slice(), fields) {
            Ok((msg, consumed)) => {
                trace!(id = msg.id(), consumed, "dispatching message");
                msg.dispatch(handler);
                buffer.consume(consumed);
                summary.consumed += consumed;
                summary.dispatched += 1;
                summary.status = ErrorStatus::Success;
                return Step::Dispatched;
            }
            Err(err) => err,
        };

        let status = err.status();
        summary.status = status;
        if err.is_incomplete() {
            trace!(error = %err, "waiting for more data");
            return Step::Stop;
        }

        let frame_len = match status {
            ErrorStatus::InvalidMsgId | ErrorStatus::InvalidMsgData => fields.frame_len,
            _ => None,
        };
        if let Some(len) = frame_len {
            let len = len.clamp(1, buffer.len());
            debug!(error = %err, skipped = len, "discarding frame");
            handler.handle_invalid_data(&buffer.as_slice()[..len], status);
            buffer.consume(len);
            summary.consumed += len;
            return Step::Discarded;
        }

        match self.config.resync {
            ResyncPolicy::SkipByte => {
                debug!(error = %err, "resynchronizing");
                handler.handle_invalid_data(&buffer.as_slice()[..1], status);
                buffer.consume(1);
                summary.consumed += 1;
                Step::Resynced
            }
            ResyncPolicy::Abort => {
                debug!(error = %err, remaining = buffer.len(), "aborting on invalid input");
                handler.handle_invalid_data(buffer.as_slice(), status);
                Step::Stop
            }
        }
    }

    fn write_frame(&self, msg: &dyn MessageBase, out: &mut BytesMut, start: usize) -> Result<()> {
        let total = self.length(msg);
        if total > self.config.max_frame_len {
            return Err(Error::BufferOverflow {
                needed: total,
                limit: self.config.max_frame_len,
            });
        }
        out.reserve(total);

        let mut offsets = Vec::with_capacity(self.layout.layers().len());
        for layer in self.layout.layers() {
            offsets.push(out.len());
            match layer {
                Layer::Sync(pattern) => out.put_slice(pattern),
                Layer::Size {
                    width,
                    endian,
                    offset,
                } => {
                    let after = total - (out.len() - start) - width;
                    let wire = i128::try_from(after).unwrap_or(i128::MAX) + i128::from(*offset);
                    put_checked(out, wire, *width, *endian)?;
                    trace!(size = after, "wrote size");
                }
                Layer::Id { width, endian } => {
                    put_checked(out, i128::from(msg.id()), *width, *endian)?;
                }
                Layer::Value { pseudo: Some(_), .. } => {}
                Layer::Value {
                    index,
                    width,
                    endian,
                    pseudo: None,
                } => {
                    let value = msg.transport_value(*index).unwrap_or(0);
                    put_checked(out, i128::from(value), *width, *endian)?;
                }
                Layer::Payload => {
                    msg.write(out)?;
                    trace!(len = msg.length(), "wrote payload");
                }
                Layer::Checksum { endian, from, .. }
                | Layer::SelectedChecksum { endian, from, .. } => {
                    let selector = match layer {
                        Layer::SelectedChecksum { index, .. } => msg.transport_value(*index),
                        _ => None,
                    };
                    let (alg, width) = layer
                        .checksum_for(selector)
                        .ok_or(Error::NotSupported("transport value selects no checksum"))?;
                    let value = alg.compute(&out[offsets[*from]..]) & max_unsigned(width);
                    put_uint(out, value, width, *endian);
                    trace!(checksum = value, width, "wrote checksum");
                }
            }
        }
        Ok(())
    }

    fn read_frame(&self, data: &[u8], fields: &mut FrameFields) -> Result<(M, usize)> {
        let result = self.read_layers(data, fields);
        if let Err(err) = &result {
            if !err.is_incomplete() {
                debug!(error = %err, id = ?fields.id, "frame read failed");
            }
        }
        result
    }

    fn read_layers(&self, data: &[u8], fields: &mut FrameFields) -> Result<(M, usize)> {
        let layers = self.layout.layers();
        let mut reader = Reader::new(data);
        let mut offsets = Vec::with_capacity(layers.len());
        let mut msg: Option<M> = None;

        for (index, layer) in layers.iter().enumerate() {
            offsets.push(reader.position());
            match layer {
                Layer::Sync(pattern) => read_sync(&mut reader, pattern)?,
                Layer::Size {
                    width,
                    endian,
                    offset,
                } => {
                    let wire = reader.read_uint(*width, *endian)?;
                    fields.size = Some(wire);
                    let size = self.check_size(wire, *offset, index, fields)?;
                    reader.ensure(size)?;
                    let end = reader.position() + size;
                    fields.frame_len = Some(end);
                    reader = Reader::with_range(data, reader.position(), end, true);
                    trace!(size, "read size");
                }
                Layer::Id { width, endian } => {
                    let id = reader.read_uint(*width, *endian)?;
                    fields.id = Some(id);
                    let mut created = M::create(id).ok_or(Error::InvalidMsgId { id })?;
                    for (value_index, value) in &fields.values {
                        created
                            .as_message_mut()
                            .set_transport_value(*value_index, *value);
                    }
                    msg = Some(created);
                    trace!(id, "read id");
                }
                Layer::Value {
                    index: value_index,
                    width,
                    endian,
                    pseudo,
                } => {
                    let value = match pseudo {
                        Some(value) => *value,
                        None => reader.read_uint(*width, *endian)?,
                    };
                    fields.values.push((*value_index, value));
                    if let Some(msg) = msg.as_mut() {
                        msg.as_message_mut().set_transport_value(*value_index, value);
                    }
                    trace!(index = value_index, value, "read transport value");
                }
                Layer::Payload => {
                    let msg = msg
                        .as_mut()
                        .ok_or(Error::Protocol("payload precedes the id layer"))?;
                    let start = reader.position();
                    let trailer = self
                        .layout
                        .len_after(self.layout.payload_index(), |i| fields.value(i));
                    if reader.is_bounded() {
                        if reader.remaining() < trailer {
                            return Err(Error::FrameOverrun {
                                needed: trailer,
                                available: reader.remaining(),
                            });
                        }
                        let len = reader.remaining() - trailer;
                        self.verify_early(data, &offsets, start + reader.remaining(), fields)?;
                        let mut payload = reader.split(len)?;
                        msg.as_message_mut().read(&mut payload)?;
                        fields.payload = Some(start..start + len);
                    } else {
                        let end = data.len().saturating_sub(trailer).max(start);
                        let mut payload = Reader::with_range(data, start, end, false);
                        msg.as_message_mut().read(&mut payload)?;
                        fields.payload = Some(start..payload.position());
                        reader.set_position(payload.position());
                    }
                    trace!(payload = ?fields.payload, "read payload");
                }
                Layer::Checksum { endian, from, .. }
                | Layer::SelectedChecksum { endian, from, .. } => {
                    let selector = match layer {
                        Layer::SelectedChecksum { index, .. } => fields.value(*index),
                        _ => None,
                    };
                    let (alg, width) = layer
                        .checksum_for(selector)
                        .ok_or(Error::Protocol("transport value selects no checksum"))?;
                    let covered = reader.consumed_since(offsets[*from]);
                    let found = reader.read_uint(width, *endian)?;
                    fields.checksum = Some(found);
                    verify_checksum(alg, width, covered, found)?;
                    trace!(checksum = found, width, "verified checksum");
                }
            }
        }

        let consumed = fields.frame_len.unwrap_or_else(|| reader.position());
        fields.frame_len = Some(consumed);
        let mut msg = msg.ok_or(Error::Protocol("frame layout has no id layer"))?;
        msg.as_message_mut().refresh();
        if self.config.reject_invalid && !msg.as_message().valid() {
            return Err(Error::InvalidMsgData {
                name: msg.as_message().name(),
            });
        }
        Ok((msg, consumed))
    }

    fn check_size(
        &self,
        wire: u64,
        offset: i64,
        index: usize,
        fields: &FrameFields,
    ) -> Result<usize> {
        let min = self.layout.len_after(index, |i| fields.value(i));
        let max = self.config.max_frame_len;
        let size = i128::from(wire) - i128::from(offset);
        usize::try_from(size)
            .ok()
            .filter(|size| (min..=max).contains(size))
            .ok_or(Error::InvalidFrameSize {
                size: wire,
                min: min as u64,
                max: max as u64,
            })
    }

    /// Verify checksum layers flagged for early verification, given the end
    /// of a bounded frame.
    fn verify_early(
        &self,
        data: &[u8],
        offsets: &[usize],
        frame_end: usize,
        fields: &FrameFields,
    ) -> Result<()> {
        let layers = self.layout.layers();
        for (index, layer) in layers.iter().enumerate().skip(self.layout.payload_index() + 1) {
            let Layer::Checksum {
                alg,
                width,
                endian,
                from,
                verify_before_read: true,
            } = layer
            else {
                continue;
            };
            let Some(&start) = offsets.get(*from) else {
                continue;
            };
            let at = frame_end - self.layout.len_after(index, |i| fields.value(i)) - width;
            let found = Reader::with_range(data, at, at + width, true).read_uint(*width, *endian)?;
            verify_checksum(*alg, *width, &data[start..at], found)?;
            trace!(checksum = found, "verified checksum before payload");
        }
        Ok(())
    }
}

fn read_sync(reader: &mut Reader<'_>, pattern: &[u8]) -> Result<()> {
    let offset = reader.position();
    let available = reader.peek_rest();
    let len = available.len().min(pattern.len());
    if available[..len] != pattern[..len] {
        return Err(Error::InvalidSync { offset });
    }
    reader.take(pattern.len())?;
    Ok(())
}

fn verify_checksum(alg: ChecksumAlg, width: usize, covered: &[u8], found: u64) -> Result<()> {
    let expected = alg.compute(covered) & max_unsigned(width);
    if expected == found {
        Ok(())
    } else {
        Err(Error::ChecksumMismatch { expected, found })
    }
}

fn put_checked(out: &mut BytesMut, value: i128, width: usize, endian: Endian) -> Result<()> {
    if value < 0 || value > i128::from(max_unsigned(width)) {
        return Err(Error::NumericValueTooBig { value, width });
    }
    put_uint(out, value as u64, width, endian);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{Field, IntField, ListField, SizeMode};
    use crate::protocol::{FrameBuilder, Message};

    #[derive(Debug, Clone)]
    struct Short {
        f1: IntField<u32>,
        f2: IntField<u8>,
    }

    impl Default for Short {
        fn default() -> Self {
            Self {
                f1: IntField::new().with_width(3),
                f2: IntField::new(),
            }
        }
    }

    crate::field_group!(Short { f1, f2 });

    impl Message for Short {
        const ID: u64 = 1;
        const NAME: &'static str = "Short";
    }

    #[derive(Debug, Clone)]
    struct Bytes {
        items: ListField<IntField<u8>>,
        version: IntField<u8>,
    }

    impl Default for Bytes {
        fn default() -> Self {
            Self {
                items: ListField::new(IntField::new().with_valid_range(0, 100), SizeMode::Implicit),
                version: IntField::new(),
            }
        }
    }

    crate::field_group!(Bytes { items });

    impl Message for Bytes {
        const ID: u64 = 2;
        const NAME: &'static str = "Bytes";

        fn transport_value(&self, index: usize) -> Option<u64> {
            (index == 0).then(|| u64::from(self.version.value()))
        }

        fn set_transport_value(&mut self, index: usize, value: u64) {
            if index == 0 {
                self.version.set_value(u8::try_from(value).unwrap_or(u8::MAX));
            }
        }
    }

    crate::message_set! {
        enum Test: TestHandler {
            Short => handle_short,
            Bytes => handle_bytes,
        }
    }

    #[derive(Default)]
    struct Recorder {
        shorts: Vec<(u32, u8)>,
        bytes: Vec<(Vec<u8>, u8)>,
        invalid: Vec<(Vec<u8>, ErrorStatus)>,
    }

    impl MessageHandler for Recorder {
        fn handle_invalid_data(&mut self, bytes: &[u8], status: ErrorStatus) {
            self.invalid.push((bytes.to_vec(), status));
        }
    }

    impl TestHandler for Recorder {
        fn handle_short(&mut self, msg: &Short) {
            self.shorts.push((msg.f1.value(), msg.f2.value()));
        }

        fn handle_bytes(&mut self, msg: &Bytes) {
            let items = msg.items.iter().map(IntField::value).collect();
            self.bytes.push((items, msg.version.value()));
        }
    }

    fn plain() -> Frame<Test> {
        Frame::new(FrameBuilder::new().id(1).payload().build().unwrap())
    }

    fn sized() -> Frame<Test> {
        let layout = FrameBuilder::new()
            .sync(&[0xAA])
            .size(1)
            .id(1)
            .value(0, 1)
            .payload()
            .checksum(ChecksumAlg::Sum, 2)
            .build()
            .unwrap();
        Frame::new(layout)
    }

    fn bytes_msg(items: &[u8], version: u8) -> Bytes {
        let mut msg = Bytes::default();
        for item in items {
            msg.items.push(IntField::new().with_default(*item));
        }
        msg.version.set_value(version);
        msg
    }

    #[test]
    fn test_read_plain_frame() {
        let (msg, consumed) = plain().read_message(&[1, 1, 2, 3, 4]).unwrap();
        assert_eq!(consumed, 5);
        let Test::Short(msg) = msg else {
            panic!("expected Short");
        };
        assert_eq!(msg.f1.value(), 0x03_0201);
        assert_eq!(msg.f2.value(), 4);
    }

    #[test]
    fn test_write_sized_frame() {
        let frame = sized();
        let mut buffer = DataBuffer::new();
        frame.write_message(&bytes_msg(&[5, 6], 3), &mut buffer).unwrap();
        assert_eq!(buffer.as_slice(), &[0xAA, 5, 2, 3, 5, 6, 16]);
        assert_eq!(frame.length(&bytes_msg(&[5, 6], 3)), 7);
    }

    #[test]
    fn test_sized_frame_roundtrip_with_fields() {
        let frame = sized();
        let mut buffer = DataBuffer::new();
        frame.write_message(&bytes_msg(&[9], 7), &mut buffer).unwrap();

        let mut fields = FrameFields::default();
        let (msg, consumed) = frame.read_message_fields(buffer.as_slice(), &mut fields).unwrap();
        assert_eq!(consumed, buffer.len());
        assert_eq!(msg, Test::Bytes(bytes_msg(&[9], 7)));
        assert_eq!(fields.id, Some(2));
        assert_eq!(fields.values, vec![(0, 7)]);
        assert_eq!(fields.payload, Some(4..5));
        assert_eq!(fields.size, Some(4));
    }

    #[test]
    fn test_unknown_id() {
        let err = plain().read_message(&[9, 0, 0]).unwrap_err();
        assert!(matches!(err, Error::InvalidMsgId { id: 9 }));
    }

    #[test]
    fn test_checksum_corruption() {
        let frame = sized();
        let mut buffer = DataBuffer::new();
        frame.write_message(&bytes_msg(&[1, 2, 3], 0), &mut buffer).unwrap();
        buffer.as_mut_slice()[5] ^= 0x01;
        let result = frame.read_message(buffer.as_slice());
        assert_eq!(ErrorStatus::of(&result), ErrorStatus::ProtocolError);
    }

    #[test]
    fn test_partial_then_complete() {
        let frame = sized();
        let mut wire = DataBuffer::new();
        frame.write_message(&bytes_msg(&[1, 2], 4), &mut wire).unwrap();
        let bytes = wire.to_vec();

        let mut recorder = Recorder::default();
        let mut buffer = DataBuffer::from(&bytes[..4]);
        let summary = frame.process_input_data(&mut buffer, &mut recorder);
        assert_eq!(summary.status, ErrorStatus::NotEnoughData);
        assert_eq!(summary.consumed, 0);
        assert_eq!(buffer.len(), 4);

        buffer.extend_from_slice(&bytes[4..]);
        let summary = frame.process_input_data(&mut buffer, &mut recorder);
        assert_eq!(summary.dispatched, 1);
        assert!(buffer.is_empty());
        assert_eq!(recorder.bytes, vec![(vec![1, 2], 4)]);
    }

    #[test]
    fn test_resync_skips_garbage() {
        let frame = sized();
        let mut buffer = DataBuffer::from(&[0x00, 0x13][..]);
        frame.write_message(&bytes_msg(&[8], 1), &mut buffer).unwrap();

        let mut recorder = Recorder::default();
        let summary = frame.process_input_data(&mut buffer, &mut recorder);
        assert_eq!(summary.dispatched, 1);
        assert_eq!(recorder.invalid.len(), 2);
        assert_eq!(recorder.invalid[0], (vec![0x00], ErrorStatus::ProtocolError));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_abort_policy_keeps_bytes() {
        let config = FrameConfig {
            resync: ResyncPolicy::Abort,
            ..FrameConfig::default()
        };
        let frame = Frame::<Test>::with_config(sized().layout().clone(), config);
        let mut buffer = DataBuffer::from(&[0x00, 0x01][..]);
        let mut recorder = Recorder::default();
        let summary = frame.process_input_data(&mut buffer, &mut recorder);
        assert_eq!(summary.status, ErrorStatus::ProtocolError);
        assert_eq!(buffer.len(), 2);
        assert_eq!(recorder.invalid, vec![(vec![0x00, 0x01], ErrorStatus::ProtocolError)]);
    }

    #[test]
    fn test_unknown_id_skips_whole_frame() {
        let frame = sized();
        // sync, size 3, id 9, value, checksum
        let mut buffer = DataBuffer::from(&[0xAA, 3, 9, 0, 9][..]);
        frame.write_message(&bytes_msg(&[4], 0), &mut buffer).unwrap();

        let mut recorder = Recorder::default();
        let summary = frame.process_input_data(&mut buffer, &mut recorder);
        assert_eq!(summary.dispatched, 1);
        assert_eq!(
            recorder.invalid,
            vec![(vec![0xAA, 3, 9, 0, 9], ErrorStatus::InvalidMsgId)]
        );
        assert!(recorder.shorts.is_empty());
    }

    #[test]
    fn test_reject_invalid() {
        let config = FrameConfig {
            reject_invalid: true,
            ..FrameConfig::default()
        };
        let frame = Frame::<Test>::with_config(sized().layout().clone(), config);
        let mut buffer = DataBuffer::new();
        frame.write_message(&bytes_msg(&[200], 0), &mut buffer).unwrap();

        let result = frame.read_message(buffer.as_slice());
        assert!(matches!(result, Err(Error::InvalidMsgData { name: "Bytes" })));
    }

    #[test]
    fn test_oversized_frame_rejected() {
        let config = FrameConfig {
            max_frame_len: 4,
            ..FrameConfig::default()
        };
        let frame = Frame::<Test>::with_config(sized().layout().clone(), config);
        let mut buffer = DataBuffer::new();
        let err = frame
            .write_message(&bytes_msg(&[1, 2, 3], 0), &mut buffer)
            .unwrap_err();
        assert!(matches!(err, Error::BufferOverflow { .. }));
        assert!(buffer.is_empty());

        let err = frame.read_message(&[0xAA, 9, 2, 0]).unwrap_err();
        assert!(matches!(err, Error::InvalidFrameSize { size: 9, .. }));
    }

    #[test]
    fn test_single_msg_stops_after_first() {
        let frame = sized();
        let mut buffer = DataBuffer::new();
        frame.write_message(&bytes_msg(&[1], 1), &mut buffer).unwrap();
        frame.write_message(&bytes_msg(&[2], 2), &mut buffer).unwrap();

        let mut recorder = Recorder::default();
        let mut fields = FrameFields::default();
        let summary = frame.process_input_data_single_msg(&mut buffer, &mut recorder, Some(&mut fields));
        assert_eq!(summary.dispatched, 1);
        assert_eq!(fields.values, vec![(0, 1)]);
        assert_eq!(buffer.len(), summary.consumed);
        assert_eq!(recorder.bytes.len(), 1);
    }

    #[test]
    fn test_selected_checksum() {
        let layout = FrameBuilder::new()
            .id(1)
            .value(0, 1)
            .payload()
            .selected_checksum(
                0,
                &[
                    (0, ChecksumAlg::Sum),
                    (1, ChecksumAlg::Crc16),
                    (2, ChecksumAlg::Crc32),
                ],
                0,
            )
            .build()
            .unwrap();
        let frame = Frame::<Test>::new(layout);

        for (version, len) in [(0, 5), (1, 6), (2, 8)] {
            let msg = bytes_msg(&[5, 6], version);
            let mut buffer = DataBuffer::new();
            frame.write_message(&msg, &mut buffer).unwrap();
            assert_eq!(buffer.len(), len);
            assert_eq!(frame.length(&msg), len);

            let mut fields = FrameFields::default();
            let (decoded, consumed) = frame
                .read_message_fields(buffer.as_slice(), &mut fields)
                .unwrap();
            assert_eq!(consumed, len);
            assert_eq!(fields.payload, Some(2..4));
            assert_eq!(decoded, Test::Bytes(msg));
        }

        let err = frame.read_message(&[2, 0, 5, 6, 11]).unwrap_err();
        assert_eq!(err, Error::ChecksumMismatch { expected: 13, found: 11 });
        let err = frame.read_message(&[2, 3, 5, 6, 0]).unwrap_err();
        assert_eq!(err, Error::Protocol("transport value selects no checksum"));
    }

    #[test]
    fn test_verify_before_read() {
        let layout = FrameBuilder::new()
            .size(1)
            .id(1)
            .payload()
            .checksum_verified_first(ChecksumAlg::Xor, 0)
            .build()
            .unwrap();
        let frame = Frame::<Test>::new(layout);
        let mut buffer = DataBuffer::new();
        let mut msg = Short::default();
        msg.f1.set_value(0x0A_0B0C);
        frame.write_message(&msg, &mut buffer).unwrap();
        assert_eq!(msg.length(), 4);

        buffer.as_mut_slice()[3] ^= 0xFF;
        let err = frame.read_message(buffer.as_slice()).unwrap_err();
        assert!(matches!(err, Error::ChecksumMismatch { .. }));
    }
}
