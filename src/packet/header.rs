// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::{
    error::Error,
    level::EncryptionLevel,
    packet::{
        number::TruncatedPacketNumber, KeyPhase, Tag, FIXED_BIT, LONG_HEADER_TAG,
    },
    varint::VarInt,
};
use s2n_codec::{Encoder, EncoderValue};

//= https://www.rfc-editor.org/rfc/rfc9000#section-17.2
//# Destination Connection ID Length:  The byte following the version
//#    contains the length in bytes of the Destination Connection ID
//#    field that follows it.  This length is encoded as an 8-bit
//#    unsigned integer.  In QUIC version 1, this value MUST NOT exceed
//#    20.
pub const CONNECTION_ID_MAX_LEN: usize = 20;

//= https://www.rfc-editor.org/rfc/rfc9000#section-17.2
//# In this version of QUIC, the following packet types with the long
//# header are defined:
//#
//#                 +======+===========+================+
//#                 | Type | Name      | Section        |
//#                 +======+===========+================+
//#                 | 0x00 | Initial   | Section 17.2.2 |
//#                 +------+-----------+----------------+
//#                 | 0x01 | 0-RTT     | Section 17.2.3 |
//#                 +------+-----------+----------------+
//#                 | 0x02 | Handshake | Section 17.2.4 |
//#                 +------+-----------+----------------+
const INITIAL_TYPE: u8 = 0x00 << 4;
const ZERO_RTT_TYPE: u8 = 0x01 << 4;
const HANDSHAKE_TYPE: u8 = 0x02 << 4;

//= https://www.rfc-editor.org/rfc/rfc9000#section-17.3.1
//# Spin Bit:  The third most significant bit (0x20) of byte 0 is the
//#    latency spin bit, set as described in Section 17.4.
const SPIN_BIT_MASK: u8 = 0x20;

/// Latency spin bit, chosen by the caller per RFC 9000 §17.4
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SpinBit {
    #[default]
    Zero,
    One,
}

impl SpinBit {
    #[inline]
    fn into_packet_tag_mask(self) -> u8 {
        match self {
            Self::One => SPIN_BIT_MASK,
            Self::Zero => 0,
        }
    }
}

/// The caller-visible portion of an outgoing packet header
///
/// This is input only: the record layer serializes it together with the
/// packet number, key phase and payload length without writing back into
/// the caller's fields.
#[derive(Clone, Copy, Debug)]
pub enum PacketHeader<'a> {
    Initial {
        version: u32,
        destination_connection_id: &'a [u8],
        source_connection_id: &'a [u8],
        token: &'a [u8],
    },
    ZeroRtt {
        version: u32,
        destination_connection_id: &'a [u8],
        source_connection_id: &'a [u8],
    },
    Handshake {
        version: u32,
        destination_connection_id: &'a [u8],
        source_connection_id: &'a [u8],
    },
    Short {
        destination_connection_id: &'a [u8],
        spin_bit: SpinBit,
    },
}

impl PacketHeader<'_> {
    /// The encryption level whose keys seal packets of this type
    #[inline]
    pub fn encryption_level(&self) -> EncryptionLevel {
        match self {
            Self::Initial { .. } => EncryptionLevel::Initial,
            Self::ZeroRtt { .. } => EncryptionLevel::ZeroRtt,
            Self::Handshake { .. } => EncryptionLevel::Handshake,
            Self::Short { .. } => EncryptionLevel::OneRtt,
        }
    }

    #[inline]
    pub fn is_short(&self) -> bool {
        matches!(self, Self::Short { .. })
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        let (dcid, scid) = match self {
            Self::Initial {
                destination_connection_id,
                source_connection_id,
                ..
            }
            | Self::ZeroRtt {
                destination_connection_id,
                source_connection_id,
                ..
            }
            | Self::Handshake {
                destination_connection_id,
                source_connection_id,
                ..
            } => (*destination_connection_id, Some(*source_connection_id)),
            Self::Short {
                destination_connection_id,
                ..
            } => (*destination_connection_id, None),
        };

        if dcid.len() > CONNECTION_ID_MAX_LEN {
            return Err(Error::BadPacketShape);
        }
        if scid.is_some_and(|scid| scid.len() > CONNECTION_ID_MAX_LEN) {
            return Err(Error::BadPacketShape);
        }
        Ok(())
    }
}

/// A header with every record-layer field decided, ready to serialize
///
/// The wire image doubles as the AEAD associated data, so it is encoded
/// exactly once and sampled from the output buffer afterwards.
#[derive(Debug)]
pub(crate) struct FinalizedHeader<'a> {
    pub header: PacketHeader<'a>,
    pub key_phase: KeyPhase,
    pub packet_number: TruncatedPacketNumber,
    /// Ciphertext length following the packet number, tag included
    pub payload_and_tag_len: usize,
}

impl FinalizedHeader<'_> {
    #[inline]
    fn first_byte(&self) -> Tag {
        let pn_bits = self.packet_number.len().into_packet_tag_mask();
        match self.header {
            PacketHeader::Initial { .. } => LONG_HEADER_TAG | FIXED_BIT | INITIAL_TYPE | pn_bits,
            PacketHeader::ZeroRtt { .. } => LONG_HEADER_TAG | FIXED_BIT | ZERO_RTT_TYPE | pn_bits,
            PacketHeader::Handshake { .. } => {
                LONG_HEADER_TAG | FIXED_BIT | HANDSHAKE_TYPE | pn_bits
            }
            PacketHeader::Short { spin_bit, .. } => {
                FIXED_BIT
                    | spin_bit.into_packet_tag_mask()
                    | self.key_phase.into_packet_tag_mask()
                    | pn_bits
            }
        }
    }

    //= https://www.rfc-editor.org/rfc/rfc9000#section-17.2
    //# Length:  This is the length of the remainder of the packet (that is,
    //# the Packet Number and Payload fields) in bytes, encoded as a
    //# variable-length integer (Section 16).
    #[inline]
    fn remaining_len(&self) -> VarInt {
        let len = self.packet_number.len().bytesize() + self.payload_and_tag_len;
        VarInt::try_from(len).expect("packet lengths are bounded by the datagram size")
    }
}

impl EncoderValue for FinalizedHeader<'_> {
    fn encode<E: Encoder>(&self, encoder: &mut E) {
        self.first_byte().encode(encoder);

        match self.header {
            PacketHeader::Initial {
                version,
                destination_connection_id,
                source_connection_id,
                token,
            } => {
                version.encode(encoder);
                destination_connection_id.encode_with_len_prefix::<u8, E>(encoder);
                source_connection_id.encode_with_len_prefix::<u8, E>(encoder);
                //= https://www.rfc-editor.org/rfc/rfc9000#section-17.2.2
                //# Token Length:  A variable-length integer specifying the length of the
                //# Token field, in bytes.  This value is 0 if no token is present.
                token.encode_with_len_prefix::<VarInt, E>(encoder);
                self.remaining_len().encode(encoder);
            }
            PacketHeader::ZeroRtt {
                version,
                destination_connection_id,
                source_connection_id,
            }
            | PacketHeader::Handshake {
                version,
                destination_connection_id,
                source_connection_id,
            } => {
                version.encode(encoder);
                destination_connection_id.encode_with_len_prefix::<u8, E>(encoder);
                source_connection_id.encode_with_len_prefix::<u8, E>(encoder);
                self.remaining_len().encode(encoder);
            }
            //= https://www.rfc-editor.org/rfc/rfc9000#section-17.3.1
            //# Destination Connection ID:  The Destination Connection ID is a
            //#    connection ID that is chosen by the intended recipient of the
            //#    packet.
            PacketHeader::Short {
                destination_connection_id,
                ..
            } => {
                destination_connection_id.encode(encoder);
            }
        }

        self.packet_number.encode(encoder);
    }
}
