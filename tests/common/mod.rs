//! Demonstration protocol shared by the integration tests.

#![allow(dead_code)]

use fieldwire::{
    BitMember, BitfieldField, BitmaskField, ChecksumAlg, ChecksumField, DataField, EnumField,
    EnumValue, ErrorStatus, Field, FloatField, Frame, FrameBuilder, GroupHooks, IntField,
    LengthField, ListField, Message, MessageBase, MessageHandler, OptionalField, Reader, Result,
    SizeMode, StringField, Units, VariantField, field_group, message_set, variant_members,
};

pub const SYNC: [u8; 2] = [0xAB, 0xCD];

/// `[id:1][payload]`
pub fn plain_frame() -> Frame<DemoMessage> {
    let layout = FrameBuilder::new().id(1).payload().build().expect("valid layout");
    Frame::new(layout)
}

/// `[sync:2][size:2][id:1][version:1][payload][crc16:2]`, checksum from the size field.
pub fn full_frame() -> Frame<DemoMessage> {
    let layout = FrameBuilder::new()
        .sync(&SYNC)
        .size(2)
        .id(1)
        .value(0, 1)
        .payload()
        .checksum(ChecksumAlg::Crc16, 1)
        .build()
        .expect("valid layout");
    Frame::new(layout)
}

/// `[sync:2][size:2][id:1][version:1][payload][checksum]`, where version 1
/// selects CRC-16 and version 2 CRC-32.
pub fn versioned_frame() -> Frame<DemoMessage> {
    let layout = FrameBuilder::new()
        .sync(&SYNC)
        .size(2)
        .id(1)
        .value(0, 1)
        .payload()
        .selected_checksum(0, &[(1, ChecksumAlg::Crc16), (2, ChecksumAlg::Crc32)], 1)
        .build()
        .expect("valid layout");
    Frame::new(layout)
}

// ---------------------------------------------------------------------------
// Msg1: two integers, the first one three bytes wide

#[derive(Debug, Clone)]
pub struct Msg1 {
    pub f1: IntField<u32>,
    pub f2: IntField<u8>,
}

impl Default for Msg1 {
    fn default() -> Self {
        Self {
            f1: IntField::new().with_width(3),
            f2: IntField::new(),
        }
    }
}

field_group!(Msg1 { f1, f2 });

impl Message for Msg1 {
    const ID: u64 = 1;
    const NAME: &'static str = "Msg1";
}

impl Msg1 {
    pub fn with_values(f1: u32, f2: u8) -> Self {
        let mut msg = Self::default();
        msg.f1.set_value(f1);
        msg.f2.set_value(f2);
        msg
    }
}

// ---------------------------------------------------------------------------
// Msg2: list whose byte length is carried by a preceding length field

#[derive(Debug, Clone)]
pub struct Msg2 {
    pub len: LengthField<u16>,
    pub items: ListField<IntField<u16>>,
}

impl Default for Msg2 {
    fn default() -> Self {
        Self {
            len: LengthField::new(),
            items: ListField::new(IntField::new(), SizeMode::External),
        }
    }
}

field_group!(custom_hooks Msg2 { len, items });

impl GroupHooks for Msg2 {
    fn prepare_read(&mut self, member: &'static str, _reader: &Reader<'_>) -> Result<()> {
        if member == "items" {
            self.items.force_read_length(self.len.expected());
        }
        Ok(())
    }

    fn refresh_members(&mut self) -> bool {
        self.len.refresh_from(self.items.length())
    }
}

impl Message for Msg2 {
    const ID: u64 = 2;
    const NAME: &'static str = "Msg2";
}

// ---------------------------------------------------------------------------
// Msg3: enum, bitfield, bitmask, flag-gated optional, string, data, checksum

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Off,
    Standby,
    Active,
}

impl EnumValue for Mode {
    type Repr = u8;

    fn to_repr(self) -> u8 {
        match self {
            Self::Off => 0,
            Self::Standby => 1,
            Self::Active => 2,
        }
    }

    fn from_repr(repr: u8) -> Option<Self> {
        match repr {
            0 => Some(Self::Off),
            1 => Some(Self::Standby),
            2 => Some(Self::Active),
            _ => None,
        }
    }
}

pub const STATUS: &[BitMember] = &[
    BitMember::new("has_extra", 0, 1),
    BitMember::new("level", 1, 3),
    BitMember::new("code", 4, 4).with_valid(0, 9),
];

#[derive(Debug, Clone)]
pub struct Msg3 {
    pub mode: EnumField<Mode>,
    pub status: BitfieldField,
    pub flags: BitmaskField,
    pub extra: OptionalField<IntField<u32>>,
    pub name: StringField,
    pub blob: DataField,
    pub crc: ChecksumField,
}

impl Default for Msg3 {
    fn default() -> Self {
        Self {
            mode: EnumField::new(Mode::Off),
            status: BitfieldField::new(1, STATUS),
            flags: BitmaskField::new(2).with_reserved(0xF000, 0),
            extra: OptionalField::missing(IntField::new()),
            name: StringField::new(SizeMode::length_prefix(1)),
            blob: DataField::new(SizeMode::Fixed(4)),
            crc: ChecksumField::new(ChecksumAlg::CrcCcitt),
        }
    }
}

field_group!(custom_hooks Msg3 { mode, status, flags, extra, name, blob, crc });

impl GroupHooks for Msg3 {
    fn prepare_read(&mut self, member: &'static str, _reader: &Reader<'_>) -> Result<()> {
        if member == "extra" {
            self.extra.set_presence(self.status.member(0) == Some(1));
        }
        Ok(())
    }

    fn refresh_members(&mut self) -> bool {
        let exists = self.status.member(0) == Some(1);
        if self.extra.does_exist() == exists {
            return false;
        }
        self.extra.set_presence(exists);
        true
    }
}

impl Message for Msg3 {
    const ID: u64 = 3;
    const NAME: &'static str = "Msg3";
}

// ---------------------------------------------------------------------------
// Msg4: variant property plus a version-gated optional

#[derive(Debug, Clone)]
pub struct Prop1 {
    pub key: IntField<u8>,
    pub value: IntField<u16>,
}

impl Default for Prop1 {
    fn default() -> Self {
        Self {
            key: IntField::new().with_default(1).with_valid_value(1),
            value: IntField::new(),
        }
    }
}

field_group!(Prop1 { key, value });

#[derive(Debug, Clone)]
pub struct Prop2 {
    pub key: IntField<u8>,
    pub value: StringField,
}

impl Default for Prop2 {
    fn default() -> Self {
        Self {
            key: IntField::new().with_default(2).with_valid_value(2),
            value: StringField::new(SizeMode::length_prefix(1)),
        }
    }
}

field_group!(Prop2 { key, value });

variant_members! {
    /// Key/value property.
    pub enum Prop: PropHandler {
        P1(Prop1) => handle_p1,
        P2(Prop2) => handle_p2,
    }
}

#[derive(Debug, Clone)]
pub struct Msg4 {
    pub prop: VariantField<Prop>,
    pub since_v2: OptionalField<IntField<u16>>,
    pub version: IntField<u8>,
}

impl Default for Msg4 {
    fn default() -> Self {
        Self {
            prop: VariantField::new(),
            since_v2: OptionalField::missing(IntField::new()).with_version_range(Some(2), None),
            version: IntField::new().with_default(1),
        }
    }
}

field_group!(custom_hooks Msg4 { prop, since_v2 });

impl GroupHooks for Msg4 {
    fn prepare_read(&mut self, member: &'static str, _reader: &Reader<'_>) -> Result<()> {
        if member == "since_v2" {
            self.since_v2.refresh_for_version(u64::from(self.version.value()));
        }
        Ok(())
    }

    fn refresh_members(&mut self) -> bool {
        self.since_v2
            .refresh_for_version(u64::from(self.version.value()))
    }
}

impl Message for Msg4 {
    const ID: u64 = 4;
    const NAME: &'static str = "Msg4";

    fn transport_value(&self, index: usize) -> Option<u64> {
        (index == 0).then(|| u64::from(self.version.value()))
    }

    fn set_transport_value(&mut self, index: usize, value: u64) {
        if index == 0 {
            self.version
                .set_value(u8::try_from(value).unwrap_or(u8::MAX));
        }
    }
}

// ---------------------------------------------------------------------------
// Msg5: scaled distance in millimeters, raw unit 1/100 mm

#[derive(Debug, Clone)]
pub struct Msg5 {
    pub distance: IntField<u32>,
}

impl Default for Msg5 {
    fn default() -> Self {
        Self {
            distance: IntField::new()
                .with_scaling(1, 100)
                .with_units(Units::Millimeters),
        }
    }
}

field_group!(Msg5 { distance });

impl Message for Msg5 {
    const ID: u64 = 5;
    const NAME: &'static str = "Msg5";
}

// ---------------------------------------------------------------------------
// Msg6: data sized by a composite length (one byte, escaping to two more)

#[derive(Debug, Clone)]
pub struct CompositeLength {
    pub short: IntField<u8>,
    pub long: OptionalField<IntField<u16>>,
}

impl Default for CompositeLength {
    fn default() -> Self {
        Self {
            short: IntField::new(),
            long: OptionalField::missing(IntField::new()),
        }
    }
}

field_group!(custom_hooks CompositeLength { short, long });

impl GroupHooks for CompositeLength {
    fn prepare_read(&mut self, member: &'static str, _reader: &Reader<'_>) -> Result<()> {
        if member == "long" {
            self.long.set_presence(self.short.value() == u8::MAX);
        }
        Ok(())
    }

    fn refresh_members(&mut self) -> bool {
        let exists = self.short.value() == u8::MAX;
        if self.long.does_exist() == exists {
            return false;
        }
        self.long.set_presence(exists);
        true
    }
}

impl CompositeLength {
    pub fn value(&self) -> usize {
        match self.long.get() {
            Some(long) => usize::from(long.value()),
            None => usize::from(self.short.value()),
        }
    }

    pub fn set_value(&mut self, len: usize) -> bool {
        let before = (self.short.value(), self.long.get().map(IntField::value));
        match u8::try_from(len) {
            Ok(short) if short < u8::MAX => {
                self.short.set_value(short);
                self.long.set_missing();
            }
            _ => {
                self.short.set_value(u8::MAX);
                self.long
                    .field_mut()
                    .set_value(u16::try_from(len).unwrap_or(u16::MAX));
                self.long.set_exists();
            }
        }
        before != (self.short.value(), self.long.get().map(IntField::value))
    }
}

#[derive(Debug, Clone)]
pub struct Msg6 {
    pub len: CompositeLength,
    pub data: DataField,
}

impl Default for Msg6 {
    fn default() -> Self {
        Self {
            len: CompositeLength::default(),
            data: DataField::new(SizeMode::External),
        }
    }
}

field_group!(custom_hooks Msg6 { len, data });

impl GroupHooks for Msg6 {
    fn prepare_read(&mut self, member: &'static str, _reader: &Reader<'_>) -> Result<()> {
        if member == "data" {
            self.data.force_read_length(self.len.value());
        }
        Ok(())
    }

    fn refresh_members(&mut self) -> bool {
        self.len.set_value(self.data.len())
    }
}

impl Message for Msg6 {
    const ID: u64 = 6;
    const NAME: &'static str = "Msg6";
}

// ---------------------------------------------------------------------------
// Msg7: byte-length prefixed samples and a voltage reading

#[derive(Debug, Clone)]
pub struct Msg7 {
    pub samples: ListField<IntField<u16>>,
    pub voltage: FloatField<f32>,
}

impl Default for Msg7 {
    fn default() -> Self {
        Self {
            samples: ListField::new(IntField::new(), SizeMode::length_prefix(1)),
            voltage: FloatField::new()
                .with_units(Units::Volts)
                .with_valid_range(0.0, 50.0)
                .with_special("unknown", f32::NAN),
        }
    }
}

field_group!(Msg7 { samples, voltage });

impl Message for Msg7 {
    const ID: u64 = 7;
    const NAME: &'static str = "Msg7";
}

// ---------------------------------------------------------------------------

message_set! {
    /// Every message of the demonstration protocol.
    pub enum DemoMessage: DemoHandler {
        Msg1 => handle_msg1,
        Msg2 => handle_msg2,
        Msg3 => handle_msg3,
        Msg4 => handle_msg4,
        Msg5 => handle_msg5,
        Msg6 => handle_msg6,
        Msg7 => handle_msg7,
    }
}

/// Handler overriding `Msg1` and `Msg4` only; everything else reaches the
/// fallback.
#[derive(Debug, Default)]
pub struct Recorder {
    pub calls: Vec<String>,
    pub msg1: Vec<Msg1>,
    pub msg4: Vec<Msg4>,
    pub invalid: Vec<(Vec<u8>, ErrorStatus)>,
}

impl MessageHandler for Recorder {
    fn handle_message(&mut self, msg: &dyn MessageBase) {
        self.calls.push(format!("fallback:{}", msg.name()));
    }

    fn handle_invalid_data(&mut self, bytes: &[u8], status: ErrorStatus) {
        self.invalid.push((bytes.to_vec(), status));
    }
}

impl DemoHandler for Recorder {
    fn handle_msg1(&mut self, msg: &Msg1) {
        self.calls.push("msg1".to_owned());
        self.msg1.push(msg.clone());
    }

    fn handle_msg4(&mut self, msg: &Msg4) {
        self.calls.push("msg4".to_owned());
        self.msg4.push(msg.clone());
    }
}

/// Encode a bare payload.
pub fn payload_bytes<F: Field>(field: &F) -> Vec<u8> {
    let mut out = fieldwire::bytes::BytesMut::new();
    field.write(&mut out).expect("payload encodes");
    out.to_vec()
}
