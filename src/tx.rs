// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! The transmit record layer facade
//!
//! [`RecordTx`] owns the per-level key state, the in-progress datagram and
//! the transmit queue, and enforces every ordering rule between them. It is
//! a plain mutable state machine: one logical owner drives it, nothing
//! suspends, and a failed call leaves all observable state unchanged.

use crate::{
    crypto::suite::{CipherSuite, HashId},
    dgram::{Coalescer, Datagram, MIN_COALESCING_SPACE},
    error::Error,
    level::{EncryptionLevel, LevelState, Slot},
    packet::{header::PacketHeader, number::PacketNumberLen},
    queue::TransmitQueue,
    seal,
    sink::DatagramSink,
};
use std::net::SocketAddr;

//= https://www.rfc-editor.org/rfc/rfc9000#section-14
//# QUIC MUST NOT be used if the network path cannot support a
//# maximum datagram size of at least 1200 bytes.
pub const MIN_MDPL: usize = 1200;

/// One logical packet to seal and transmit
///
/// The record layer reads this and nothing more: the header is taken by
/// value, the packet number length is caller-owned and authoritative, and
/// the payload is whatever frame bytes the packet scheduler assembled,
/// possibly scattered over several chunks.
#[derive(Clone, Copy, Debug)]
pub struct Transmission<'a> {
    pub header: PacketHeader<'a>,
    pub packet_number: u64,
    pub packet_number_len: PacketNumberLen,
    pub payload: &'a [&'a [u8]],
    pub peer: Option<SocketAddr>,
    pub local: Option<SocketAddr>,
    /// Allow later packets to share the datagram this packet starts
    pub coalesce: bool,
}

/// Configures and builds a [`RecordTx`]
pub struct Builder {
    mdpl: usize,
    sink: Option<Box<dyn DatagramSink>>,
}

impl Builder {
    /// Sets the maximum datagram payload length for new datagrams
    pub fn with_mdpl(mut self, mdpl: usize) -> Result<Self, Error> {
        if mdpl < MIN_MDPL {
            return Err(Error::TooSmall);
        }
        self.mdpl = mdpl;
        Ok(self)
    }

    /// Installs the initial datagram sink
    pub fn with_sink(mut self, sink: Box<dyn DatagramSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn build(self) -> RecordTx {
        RecordTx {
            levels: [Slot::Unset, Slot::Unset, Slot::Unset, Slot::Unset],
            coalescer: Coalescer::default(),
            queue: TransmitQueue::default(),
            sink: self.sink,
            mdpl: self.mdpl,
        }
    }
}

/// Transmit-side record layer of a QUIC endpoint
///
/// Accepts logical packets from the packet scheduler, seals them under the
/// keys of their encryption level, coalesces the results into datagrams no
/// larger than the configured MDPL, and drains finished datagrams to the
/// installed [`DatagramSink`].
pub struct RecordTx {
    levels: [Slot; EncryptionLevel::COUNT],
    coalescer: Coalescer,
    queue: TransmitQueue,
    sink: Option<Box<dyn DatagramSink>>,
    mdpl: usize,
}

impl RecordTx {
    pub fn builder() -> Builder {
        Builder {
            mdpl: MIN_MDPL,
            sink: None,
        }
    }

    /// Installs the traffic secret for an encryption level
    ///
    /// Each level is provisioned at most once; a discarded level stays
    /// unusable forever. The secret itself is consumed here and only the
    /// expanded keys are retained.
    pub fn provide_secret(
        &mut self,
        level: EncryptionLevel,
        suite: CipherSuite,
        hash: HashId,
        secret: &[u8],
    ) -> Result<(), Error> {
        let slot = &mut self.levels[level.index()];
        match slot {
            Slot::Active(_) => Err(Error::AlreadyProvisioned),
            Slot::Discarded => Err(Error::AlreadyDiscarded),
            Slot::Unset => {
                let state = LevelState::new(suite, hash, secret)?;
                *slot = Slot::Active(Box::new(state));
                tracing::debug!(?level, %suite, "write keys installed");
                Ok(())
            }
        }
    }

    /// Drops an encryption level's keys, wiping the key material
    ///
    /// Idempotent; discarding a level that was never provisioned still
    /// pins it shut. Packets of that level already coalesced or queued
    /// are unaffected.
    pub fn discard_enc_level(&mut self, level: EncryptionLevel) {
        let slot = &mut self.levels[level.index()];
        if !slot.is_discarded() {
            *slot = Slot::Discarded;
            tracing::debug!(?level, "write keys discarded");
        }
    }

    /// Whether the level currently holds usable keys
    pub fn is_provisioned(&self, level: EncryptionLevel) -> bool {
        self.levels[level.index()].active().is_some()
    }

    /// Seals one packet and appends it to the in-progress datagram
    ///
    /// The packet either lands in the datagram in one piece or the call
    /// fails with every counter unchanged; nothing is ever split across
    /// datagrams.
    pub fn write_pkt(&mut self, tx: &Transmission) -> Result<(), Error> {
        let level = tx.header.encryption_level();

        // Every failure is detected before the coalescer or the queue is
        // touched, so a failed call cannot finalize or grow a datagram.
        let state = self.levels[level.index()]
            .active_mut()
            .ok_or(Error::NoKeys)?;

        if tx.local.is_some()
            && !self
                .sink
                .as_ref()
                .is_some_and(|sink| sink.supports_local_addr())
        {
            return Err(Error::LocalAddrNotSupported);
        }

        tx.header.validate()?;

        let payload_len: usize = tx.payload.iter().map(|chunk| chunk.len()).sum();
        let tag_len = state.suite().tag_len();
        seal::check_sample_room(
            tx.packet_number_len,
            payload_len,
            tag_len,
            state.header_key().sample_len(),
        )?;

        let need = seal::sealed_len(&tx.header, tx.packet_number_len, payload_len, tag_len);
        if need > self.mdpl {
            return Err(Error::PacketTooLarge);
        }

        state.check_epoch()?;

        let (finalized, open) = self.coalescer.prepare(self.mdpl, tx.peer, tx.local, need);
        if let Some(datagram) = finalized {
            self.queue.push(datagram);
        }

        let sealed_len = {
            let mut encoder = open.encoder();
            seal::seal_packet(state, tx, &mut encoder)?
        };
        open.commit(sealed_len);

        tracing::trace!(
            ?level,
            packet_number = tx.packet_number,
            len = sealed_len,
            "packet sealed"
        );

        //= https://www.rfc-editor.org/rfc/rfc9000#section-12.2
        //# Packets with a short header (Section 17.3) do not contain a
        //# Length field and so cannot be followed by other packets in the
        //# same UDP datagram.
        if !tx.coalesce || tx.header.is_short() || open.remaining() < MIN_COALESCING_SPACE {
            self.finish_dgram();
        }

        Ok(())
    }

    /// Finalizes the in-progress datagram, if any
    pub fn finish_dgram(&mut self) {
        if let Some(datagram) = self.coalescer.finish() {
            self.queue.push(datagram);
        }
    }

    /// Drains queued datagrams to the installed sink
    ///
    /// Returns how many datagrams the sink accepted. Backpressure is not
    /// an error: the remainder simply stays queued. A missing sink fails
    /// with [`Error::SinkMissing`] and also leaves everything queued.
    pub fn flush_net(&mut self) -> Result<usize, Error> {
        let sink = self.sink.as_deref_mut().ok_or(Error::SinkMissing)?;
        self.queue.flush(sink).map_err(Error::Sink)
    }

    /// Removes and returns the head of the datagram queue
    ///
    /// Diagnostic access: the in-progress datagram is never returned, only
    /// finalized ones.
    pub fn pop_dgram(&mut self) -> Option<Datagram> {
        self.queue.pop()
    }

    /// Finalized datagrams waiting for the sink
    pub fn queue_len_datagrams(&self) -> usize {
        self.queue.len()
    }

    /// Total payload bytes across the queued datagrams
    pub fn queue_len_bytes(&self) -> usize {
        self.queue.bytes()
    }

    /// Bytes in the in-progress datagram, 0 when none is open
    pub fn cur_dgram_len_bytes(&self) -> usize {
        self.coalescer.cur_dgram_len()
    }

    /// Packets sealed into the in-progress datagram
    pub fn unflushed_pkt_count(&self) -> usize {
        self.coalescer.unflushed_pkt_count()
    }

    /// Replaces or clears the datagram sink
    pub fn set_sink(&mut self, sink: Option<Box<dyn DatagramSink>>) {
        tracing::debug!(installed = sink.is_some(), "datagram sink replaced");
        self.sink = sink;
    }

    /// Sets the maximum datagram payload length for future datagrams
    ///
    /// An already open datagram keeps the MDPL it was created with.
    pub fn set_mdpl(&mut self, mdpl: usize) -> Result<(), Error> {
        if mdpl < MIN_MDPL {
            return Err(Error::TooSmall);
        }
        self.mdpl = mdpl;
        Ok(())
    }

    /// The MDPL applied to newly opened datagrams
    pub fn mdpl(&self) -> usize {
        self.mdpl
    }

    //= https://www.rfc-editor.org/rfc/rfc9001#section-6.1
    //# An endpoint MUST NOT initiate a key update prior to having confirmed
    //# the handshake (Section 4.1.2).
    /// Begins a 1-RTT key update
    ///
    /// The next packet sealed at 1-RTT uses the new keys and the flipped
    /// key phase bit. Requires the Initial and Handshake levels to be
    /// discarded and no update to be already pending; a failed call
    /// changes nothing.
    pub fn trigger_key_update(&mut self) -> Result<(), Error> {
        for level in [EncryptionLevel::Initial, EncryptionLevel::Handshake] {
            if !self.levels[level.index()].is_discarded() {
                return Err(Error::PrereqNotMet);
            }
        }

        let state = self.levels[EncryptionLevel::OneRtt.index()]
            .active_mut()
            .ok_or(Error::NoKeys)?;
        state.trigger_update()?;
        tracing::debug!(key_phase = ?state.key_phase(), "key update triggered");
        Ok(())
    }

    /// Packets sealed under the level's current keys, `None` when the
    /// level holds no keys
    pub fn cur_epoch_pkt_count(&self, level: EncryptionLevel) -> Option<u64> {
        Some(self.levels[level.index()].active()?.epoch_pkt_count())
    }

    /// Packets the level's current keys may seal in total
    pub fn max_epoch_pkt_count(&self, level: EncryptionLevel) -> Option<u64> {
        Some(self.levels[level.index()].active()?.max_epoch_pkt_count())
    }

    /// Exact sealed size of a packet with the given shape
    ///
    /// Useful to the packet scheduler for budgeting frames against the
    /// remaining datagram space before committing to a payload.
    pub fn sealed_len(
        &self,
        header: &PacketHeader,
        packet_number_len: PacketNumberLen,
        payload_len: usize,
    ) -> Result<usize, Error> {
        let state = self.levels[header.encryption_level().index()]
            .active()
            .ok_or(Error::NoKeys)?;
        Ok(seal::sealed_len(
            header,
            packet_number_len,
            payload_len,
            state.suite().tag_len(),
        ))
    }

    /// Largest payload that fits in a fresh datagram for this header shape
    ///
    /// `None` when even an empty payload would overflow the current MDPL.
    pub fn max_plaintext_len(
        &self,
        header: &PacketHeader,
        packet_number_len: PacketNumberLen,
    ) -> Option<usize> {
        let state = self.levels[header.encryption_level().index()].active()?;
        let tag_len = state.suite().tag_len();

        // the long-header length field grows with the payload, so probe
        // downward from the budget until the sealed size fits
        let budget = self.mdpl;
        let overhead = seal::sealed_len(header, packet_number_len, 0, tag_len);
        let mut candidate = budget.checked_sub(overhead)?;
        while seal::sealed_len(header, packet_number_len, candidate, tag_len) > budget {
            candidate = candidate.checked_sub(1)?;
        }
        Some(candidate)
    }

    #[doc(hidden)]
    pub fn set_max_epoch_pkt_count(&mut self, level: EncryptionLevel, limit: u64) {
        if let Some(state) = self.levels[level.index()].active_mut() {
            state.set_max_epoch_pkt_count(limit);
        }
    }
}
