// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Seals one logical packet into a datagram buffer
//!
//! Everything happens in a single pass over the output buffer: the header
//! is serialized, the payload chunks are copied in behind it, the AEAD
//! encrypts that region in place and appends its tag, and header
//! protection is applied over the finished ciphertext. Nothing is staged
//! in intermediate buffers.

use crate::{
    error::Error,
    level::LevelState,
    packet::{
        header::{FinalizedHeader, PacketHeader},
        header_protection_mask_for_tag,
        number::PacketNumberLen,
        KeyPhase,
    },
    tx::Transmission,
};
use s2n_codec::{Encoder, EncoderBuffer, EncoderValue};

/// Exact on-the-wire size of a packet once sealed
///
/// Header protection rewrites bits in place, so the sealed size is the
/// serialized header (packet number included) plus payload plus tag.
pub(crate) fn sealed_len(
    header: &PacketHeader,
    packet_number_len: PacketNumberLen,
    payload_len: usize,
    tag_len: usize,
) -> usize {
    // neither the key phase nor the packet number value changes the size
    let header = FinalizedHeader {
        header: *header,
        key_phase: KeyPhase::Zero,
        packet_number: packet_number_len.truncate(0),
        payload_and_tag_len: payload_len + tag_len,
    };
    header.encoding_size() + payload_len + tag_len
}

//= https://www.rfc-editor.org/rfc/rfc9001#section-5.4.2
//# in sampling packet ciphertext for header protection,
//# the Packet Number field is assumed to be 4 bytes long
//
//= https://www.rfc-editor.org/rfc/rfc9001#section-5.4.2
//# An endpoint MUST NOT apply header protection to packets where the
//# entire sample would not be available.
pub(crate) fn check_sample_room(
    packet_number_len: PacketNumberLen,
    payload_len: usize,
    tag_len: usize,
    sample_len: usize,
) -> Result<(), Error> {
    let ciphertext_len = payload_len + tag_len;
    let required = (PacketNumberLen::MAX_LEN - packet_number_len.bytesize()) + sample_len;
    if ciphertext_len < required {
        return Err(Error::BadPacketShape);
    }
    Ok(())
}

/// Seals `tx` into the front of `encoder` and returns the sealed length
///
/// The encoder must be freshly positioned at the start of the packet's
/// slot and hold capacity for the whole sealed packet; the caller has
/// already sized it via [`sealed_len`]. On any error the buffer contents
/// are unobservable because the caller discards the written region.
pub(crate) fn seal_packet(
    state: &mut LevelState,
    tx: &Transmission,
    encoder: &mut EncoderBuffer,
) -> Result<usize, Error> {
    let tag_len = state.suite().tag_len();
    let sample_len = state.header_key().sample_len();
    let payload_len: usize = tx.payload.iter().map(|chunk| chunk.len()).sum();

    tx.header.validate()?;
    check_sample_room(tx.packet_number_len, payload_len, tag_len, sample_len)?;
    state.check_epoch()?;

    let packet_number = tx.packet_number_len.truncate(tx.packet_number);
    let header = FinalizedHeader {
        header: tx.header,
        key_phase: state.key_phase(),
        packet_number,
        payload_and_tag_len: payload_len + tag_len,
    };

    let header_len = header.encoding_size();
    let total_len = header_len + payload_len + tag_len;
    if total_len > encoder.remaining_capacity() {
        return Err(Error::PacketTooLarge);
    }

    header.encode(encoder);
    for chunk in tx.payload {
        encoder.write_slice(chunk);
    }

    let tag = {
        let written = encoder.as_mut_slice();
        let (associated_data, payload) = written.split_at_mut(header_len);
        state
            .sealing_keys()
            .seal_in_place(tx.packet_number, associated_data, payload)
    };
    encoder.write_slice(tag.as_ref());

    //= https://www.rfc-editor.org/rfc/rfc9001#section-5.4.2
    //# the sample of ciphertext is taken starting from an offset of 4 bytes
    //# after the start of the Packet Number field
    let packet = encoder.as_mut_slice();
    let pn_offset = header_len - tx.packet_number_len.bytesize();
    let sample_offset = pn_offset + PacketNumberLen::MAX_LEN;
    let mask = {
        let sample = &packet[sample_offset..sample_offset + sample_len];
        state.header_key().mask(sample)
    };

    packet[0] ^= mask[0] & header_protection_mask_for_tag(packet[0]);
    for (byte, mask) in packet[pn_offset..pn_offset + tx.packet_number_len.bytesize()]
        .iter_mut()
        .zip(&mask[1..])
    {
        *byte ^= mask;
    }

    state.on_sealed();

    Ok(total_len)
}
