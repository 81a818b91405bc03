//! Checksum algorithms shared by checksum fields and frame checksum layers.

use xxhash_rust::xxh3::xxh3_64;

/// Checksum algorithm.
///
/// The computed value is truncated to the serialized width by the caller.
/// Custom algorithms compare by function address; the compiler may merge
/// identical functions, so two distinct functions can compare equal.
#[derive(Debug, Clone, Copy)]
pub enum ChecksumAlg {
    /// Arithmetic sum of all bytes
    Sum,
    /// XOR of all bytes
    Xor,
    /// CRC-16/ARC (poly 0x8005, reflected, init 0)
    Crc16,
    /// CRC-16/CCITT-FALSE (poly 0x1021, init 0xFFFF)
    CrcCcitt,
    /// CRC-32 (IEEE 802.3)
    Crc32,
    /// 64-bit XXH3
    Xxh3,
    /// Caller-provided algorithm
    Custom(fn(&[u8]) -> u64),
}

impl PartialEq for ChecksumAlg {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Custom(a), Self::Custom(b)) => std::ptr::fn_addr_eq(*a, *b),
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}

impl Eq for ChecksumAlg {}

impl ChecksumAlg {
    /// Compute the checksum of `data`.
    #[must_use]
    pub fn compute(self, data: &[u8]) -> u64 {
        match self {
            Self::Sum => data
                .iter()
                .fold(0u64, |acc, byte| acc.wrapping_add(u64::from(*byte))),
            Self::Xor => u64::from(data.iter().fold(0u8, |acc, byte| acc ^ byte)),
            Self::Crc16 => u64::from(crc16_arc(data)),
            Self::CrcCcitt => u64::from(crc16_ccitt_false(data)),
            Self::Crc32 => u64::from(crc32fast::hash(data)),
            Self::Xxh3 => xxh3_64(data),
            Self::Custom(func) => func(data),
        }
    }

    /// Natural serialized width of the algorithm in bytes.
    #[must_use]
    pub const fn natural_width(self) -> usize {
        match self {
            Self::Sum | Self::Xor => 1,
            Self::Crc16 | Self::CrcCcitt => 2,
            Self::Crc32 => 4,
            Self::Xxh3 | Self::Custom(_) => 8,
        }
    }
}

fn crc16_arc(data: &[u8]) -> u16 {
    let mut crc = 0u16;
    for byte in data {
        crc ^= u16::from(*byte);
        for _ in 0..8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ 0xA001
            } else {
                crc >> 1
            };
        }
    }
    crc
}

fn crc16_ccitt_false(data: &[u8]) -> u16 {
    let mut crc = 0xFFFFu16;
    for byte in data {
        crc ^= u16::from(*byte) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x1021
            } else {
                crc << 1
            };
        }
    }
    crc
}
