// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::sink;
use core::fmt;

/// Errors surfaced by the transmit record layer.
///
/// Every failure is local: a failed call leaves the record layer in the
/// state it was in before the call. The one exception is [`EpochExhausted`],
/// which marks the affected encryption level as permanently unable to seal
/// further packets; other levels remain usable.
///
/// [`EpochExhausted`]: Error::EpochExhausted
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The encryption level already holds keys
    AlreadyProvisioned,
    /// The encryption level was discarded and can never be provisioned again
    AlreadyDiscarded,
    /// The traffic secret length does not match the hash output length
    BadSecretLen,
    /// The requested maximum datagram payload length is below the QUIC minimum
    TooSmall,
    /// The encryption level holds no usable keys
    NoKeys,
    /// A key update is already pending
    UpdateInFlight,
    /// Initial and Handshake keys must be discarded before a key update
    PrereqNotMet,
    /// No datagram sink is installed
    SinkMissing,
    /// The packet cannot be sealed as shaped
    BadPacketShape,
    /// The sealed packet would not fit into an empty datagram
    PacketTooLarge,
    /// The packet limit for the current keys has been reached
    EpochExhausted,
    /// The installed sink cannot route packets carrying an explicit local address
    LocalAddrNotSupported,
    /// The datagram sink failed while draining the queue
    Sink(sink::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::AlreadyProvisioned => write!(f, "encryption level is already provisioned"),
            Self::AlreadyDiscarded => write!(f, "encryption level has been discarded"),
            Self::BadSecretLen => write!(f, "traffic secret length does not match the hash"),
            Self::TooSmall => write!(f, "maximum datagram payload length is below the minimum"),
            Self::NoKeys => write!(f, "encryption level holds no keys"),
            Self::UpdateInFlight => write!(f, "a key update is already pending"),
            Self::PrereqNotMet => write!(f, "handshake keys must be discarded before a key update"),
            Self::SinkMissing => write!(f, "no datagram sink is installed"),
            Self::BadPacketShape => write!(f, "packet cannot be sealed as shaped"),
            Self::PacketTooLarge => write!(f, "sealed packet exceeds the datagram payload length"),
            Self::EpochExhausted => write!(f, "packet limit reached for the current keys"),
            Self::LocalAddrNotSupported => {
                write!(f, "sink does not support explicit local addresses")
            }
            Self::Sink(error) => write!(f, "datagram sink error: {error}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<sink::Error> for Error {
    fn from(error: sink::Error) -> Self {
        Self::Sink(error)
    }
}
