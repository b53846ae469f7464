// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

//! Transmit-side record layer for a QUIC endpoint
//!
//! This crate turns logical QUIC packets into encrypted datagrams. The
//! packet scheduler above it decides what to send and when; this layer
//! owns how those packets are protected and packed:
//!
//! * per-encryption-level key state, provisioned once and discarded
//!   irreversibly, with 1-RTT key updates (RFC 9001 §6)
//! * AEAD sealing with per-packet nonces and per-epoch packet limits
//! * header protection over the first byte and the packet number
//!   (RFC 9001 §5.4)
//! * coalescing of multiple packets into one datagram under a maximum
//!   datagram payload length, short-header packets always last
//!
//! ```
//! use quic_record_tx::{
//!     CipherSuite, EncryptionLevel, HashId, PacketHeader, PacketNumberLen,
//!     RecordTx, Transmission,
//! };
//!
//! let mut tx = RecordTx::builder().build();
//! tx.provide_secret(
//!     EncryptionLevel::Initial,
//!     CipherSuite::TLS_AES_128_GCM_SHA256,
//!     HashId::Sha256,
//!     &[0x42; 32],
//! )?;
//!
//! let crypto_frame = [0x06, 0x00, 0x00, 0x05, b'H', b'E', b'L', b'L', b'O'];
//! let payload: &[&[u8]] = &[&crypto_frame];
//! tx.write_pkt(&Transmission {
//!     header: PacketHeader::Initial {
//!         version: 1,
//!         destination_connection_id: b"abcd",
//!         source_connection_id: b"xy",
//!         token: &[],
//!     },
//!     packet_number: 0,
//!     packet_number_len: PacketNumberLen::U8,
//!     payload,
//!     peer: None,
//!     local: None,
//!     coalesce: false,
//! })?;
//!
//! let datagram = tx.pop_dgram().expect("one datagram was finalized");
//! assert!(!datagram.is_empty());
//! # Ok::<(), quic_record_tx::Error>(())
//! ```

pub mod crypto;
pub mod dgram;
pub mod error;
pub mod level;
pub mod packet;
pub mod sink;
pub mod tx;
pub mod varint;

mod queue;
mod seal;

pub use crate::{
    crypto::suite::{CipherSuite, HashId},
    dgram::Datagram,
    error::Error,
    level::EncryptionLevel,
    packet::{
        header::{PacketHeader, SpinBit},
        number::PacketNumberLen,
        KeyPhase,
    },
    sink::DatagramSink,
    tx::{RecordTx, Transmission, MIN_MDPL},
};
