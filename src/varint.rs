// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use core::fmt;
use s2n_codec::{Encoder, EncoderValue};

//= https://www.rfc-editor.org/rfc/rfc9000#section-16
//# QUIC packets and frames commonly use a variable-length encoding for
//# non-negative integer values.  This encoding ensures that smaller
//# integer values need fewer bytes to encode.
//#
//# The QUIC variable-length integer encoding reserves the two most
//# significant bits of the first byte to encode the base-2 logarithm of
//# the integer encoding length in bytes.  The integer value is encoded
//# on the remaining bits, in network byte order.

pub const MAX_VARINT_VALUE: u64 = (1 << 62) - 1;

const ONE_BYTE_MAX: u64 = (1 << 6) - 1;
const TWO_BYTE_MAX: u64 = (1 << 14) - 1;
const FOUR_BYTE_MAX: u64 = (1 << 30) - 1;

const TWO_BYTE_TAG: u16 = 0b01 << 14;
const FOUR_BYTE_TAG: u32 = 0b10 << 30;
const EIGHT_BYTE_TAG: u64 = 0b11 << 62;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VarIntError;

impl fmt::Display for VarIntError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "value exceeds the maximum varint range")
    }
}

impl std::error::Error for VarIntError {}

/// A variable-length integer in the range `0..=2^62-1`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarInt(u64);

impl VarInt {
    pub const MAX: Self = Self(MAX_VARINT_VALUE);

    #[inline]
    pub fn new(value: u64) -> Result<Self, VarIntError> {
        if value > MAX_VARINT_VALUE {
            return Err(VarIntError);
        }
        Ok(Self(value))
    }

    #[inline]
    pub const fn from_u32(value: u32) -> Self {
        Self(value as u64)
    }

    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl TryFrom<usize> for VarInt {
    type Error = VarIntError;

    #[inline]
    fn try_from(value: usize) -> Result<Self, Self::Error> {
        Self::new(value as u64)
    }
}

impl TryFrom<u64> for VarInt {
    type Error = VarIntError;

    #[inline]
    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for VarInt {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[inline]
fn encoding_size(value: u64) -> usize {
    #[allow(clippy::match_overlapping_arm)]
    match value {
        0..=ONE_BYTE_MAX => 1,
        0..=TWO_BYTE_MAX => 2,
        0..=FOUR_BYTE_MAX => 4,
        _ => 8,
    }
}

impl EncoderValue for VarInt {
    #[inline]
    fn encode<E: Encoder>(&self, encoder: &mut E) {
        let value = self.0;
        #[allow(clippy::match_overlapping_arm)]
        match value {
            0..=ONE_BYTE_MAX => (value as u8).encode(encoder),
            0..=TWO_BYTE_MAX => (value as u16 | TWO_BYTE_TAG).encode(encoder),
            0..=FOUR_BYTE_MAX => (value as u32 | FOUR_BYTE_TAG).encode(encoder),
            _ => (value | EIGHT_BYTE_TAG).encode(encoder),
        }
    }

    #[inline]
    fn encoding_size(&self) -> usize {
        encoding_size(self.0)
    }

    #[inline]
    fn encoding_size_for_encoder<E: Encoder>(&self, _encoder: &E) -> usize {
        encoding_size(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_vec(value: u64) -> Vec<u8> {
        VarInt::new(value).unwrap().encode_to_vec()
    }

    //= https://www.rfc-editor.org/rfc/rfc9000#appendix-A.1
    //# For example, the eight-byte sequence 0xc2197c5eff14e88c decodes to
    //# the decimal value 151,288,809,941,952,652; the four-byte sequence
    //# 0x9d7f3e7d decodes to 494,878,333; the two-byte sequence 0x7bbd
    //# decodes to 15,293; and the single byte 0x25 decodes to 37
    #[test]
    fn rfc_examples() {
        assert_eq!(encode_vec(151_288_809_941_952_652), hex("c2197c5eff14e88c"));
        assert_eq!(encode_vec(494_878_333), hex("9d7f3e7d"));
        assert_eq!(encode_vec(15_293), hex("7bbd"));
        assert_eq!(encode_vec(37), hex("25"));
    }

    #[test]
    fn boundaries() {
        assert_eq!(encode_vec(0).len(), 1);
        assert_eq!(encode_vec(63).len(), 1);
        assert_eq!(encode_vec(64).len(), 2);
        assert_eq!(encode_vec(16_383).len(), 2);
        assert_eq!(encode_vec(16_384).len(), 4);
        assert_eq!(encode_vec(MAX_VARINT_VALUE).len(), 8);
        assert!(VarInt::new(MAX_VARINT_VALUE + 1).is_err());
    }

    #[test]
    fn size_matches_encoding() {
        bolero::check!().with_type::<u64>().for_each(|value| {
            let value = value & MAX_VARINT_VALUE;
            let varint = VarInt::new(value).unwrap();
            assert_eq!(varint.encoding_size(), varint.encode_to_vec().len());
        });
    }

    fn hex(s: &str) -> Vec<u8> {
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
            .collect()
    }
}
