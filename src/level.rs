// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Per-encryption-level key state
//!
//! Each level moves through `Unset -> Active -> Discarded` exactly once.
//! Discard is irreversible: the slot remembers it so a late secret install
//! is rejected rather than silently resurrecting a retired level.

use crate::{
    crypto::{
        keys::{self, EpochKeys, HeaderKey},
        suite::{CipherSuite, HashId},
    },
    error::Error,
    packet::KeyPhase,
};

//= https://www.rfc-editor.org/rfc/rfc9001#section-2.1
//# Data is protected using a number of encryption levels:
//#
//# *  Initial keys
//#
//# *  Early data (0-RTT) keys
//#
//# *  Handshake keys
//#
//# *  1-RTT keys
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EncryptionLevel {
    Initial,
    ZeroRtt,
    Handshake,
    OneRtt,
}

impl EncryptionLevel {
    pub(crate) const COUNT: usize = 4;

    #[inline]
    pub(crate) fn index(self) -> usize {
        match self {
            Self::Initial => 0,
            Self::ZeroRtt => 1,
            Self::Handshake => 2,
            Self::OneRtt => 3,
        }
    }
}

/// Keys and counters for one active encryption level
pub(crate) struct LevelState {
    suite: CipherSuite,
    hash: HashId,
    keys: EpochKeys,
    /// Present between a triggered key update and the first seal at the
    /// new phase (1-RTT only)
    next_keys: Option<EpochKeys>,
    header_key: HeaderKey,
    key_phase: KeyPhase,
    epoch_pkt_count: u64,
    max_epoch_pkt_count: u64,
}

impl LevelState {
    pub fn new(suite: CipherSuite, hash: HashId, secret: &[u8]) -> Result<Self, Error> {
        let (keys, header_key) = keys::derive(suite, hash, secret)?;
        Ok(Self {
            suite,
            hash,
            keys,
            next_keys: None,
            header_key,
            key_phase: KeyPhase::default(),
            epoch_pkt_count: 0,
            max_epoch_pkt_count: suite.confidentiality_limit(),
        })
    }

    #[inline]
    pub fn suite(&self) -> CipherSuite {
        self.suite
    }

    #[inline]
    pub fn key_phase(&self) -> KeyPhase {
        self.key_phase
    }

    #[inline]
    pub fn epoch_pkt_count(&self) -> u64 {
        self.epoch_pkt_count
    }

    #[inline]
    pub fn max_epoch_pkt_count(&self) -> u64 {
        self.max_epoch_pkt_count
    }

    #[inline]
    pub fn header_key(&self) -> &HeaderKey {
        &self.header_key
    }

    /// Fails once the current keys have sealed their packet allowance
    ///
    /// A pending key update is about to reset the counter, so the check
    /// passes regardless of the current count in that case.
    #[inline]
    pub fn check_epoch(&self) -> Result<(), Error> {
        if self.next_keys.is_none() && self.epoch_pkt_count >= self.max_epoch_pkt_count {
            return Err(Error::EpochExhausted);
        }
        Ok(())
    }

    /// Promotes pending key-update keys, then returns the sealing keys
    #[inline]
    pub fn sealing_keys(&mut self) -> &EpochKeys {
        if let Some(next) = self.next_keys.take() {
            self.keys = next;
            self.epoch_pkt_count = 0;
        }
        &self.keys
    }

    #[inline]
    pub fn on_sealed(&mut self) {
        self.epoch_pkt_count += 1;
    }

    //= https://www.rfc-editor.org/rfc/rfc9001#section-6.1
    //# An endpoint initiates a key update by updating its
    //# packet protection write secret and using that to protect new packets.
    pub fn trigger_update(&mut self) -> Result<(), Error> {
        if self.next_keys.is_some() {
            return Err(Error::UpdateInFlight);
        }

        self.next_keys = Some(self.keys.update(self.suite, self.hash));
        self.key_phase = self.key_phase.next_phase();
        Ok(())
    }

    #[doc(hidden)]
    pub fn set_max_epoch_pkt_count(&mut self, limit: u64) {
        self.max_epoch_pkt_count = limit;
    }
}

/// Lifecycle slot for one encryption level
pub(crate) enum Slot {
    Unset,
    Active(Box<LevelState>),
    Discarded,
}

impl Slot {
    #[inline]
    pub fn active(&self) -> Option<&LevelState> {
        match self {
            Self::Active(state) => Some(state),
            _ => None,
        }
    }

    #[inline]
    pub fn active_mut(&mut self) -> Option<&mut LevelState> {
        match self {
            Self::Active(state) => Some(state),
            _ => None,
        }
    }

    #[inline]
    pub fn is_discarded(&self) -> bool {
        matches!(self, Self::Discarded)
    }
}
