// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Datagram coalescing
//!
//! Sealed packets accumulate in a single in-progress datagram until it is
//! finalized, either explicitly or because the next packet cannot share it.
//! The in-progress datagram captures its addresses and its maximum payload
//! length when it is opened; changing the configured MDPL afterwards only
//! affects datagrams opened later.

use s2n_codec::EncoderBuffer;
use std::net::SocketAddr;

/// A fully coalesced datagram ready for the sink
#[derive(Clone, Debug)]
pub struct Datagram {
    bytes: Vec<u8>,
    peer: Option<SocketAddr>,
    local: Option<SocketAddr>,
}

impl Datagram {
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Address the datagram is destined for, when the caller supplied one
    #[inline]
    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Source address the datagram should be sent from
    #[inline]
    pub fn local(&self) -> Option<SocketAddr> {
        self.local
    }

    #[inline]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Remaining capacity below which starting another packet is pointless:
/// the smallest sealable packet is a short header byte, a 1-byte packet
/// number, 3 payload bytes of sample room and a 16-byte tag.
pub(crate) const MIN_COALESCING_SPACE: usize = 1 + 1 + 3 + 16;

/// The single in-progress datagram
pub(crate) struct OpenDgram {
    buf: Box<[u8]>,
    len: usize,
    peer: Option<SocketAddr>,
    local: Option<SocketAddr>,
    pkt_count: usize,
}

impl OpenDgram {
    fn new(mdpl: usize, peer: Option<SocketAddr>, local: Option<SocketAddr>) -> Self {
        Self {
            buf: vec![0u8; mdpl].into_boxed_slice(),
            len: 0,
            peer,
            local,
            pkt_count: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.len
    }

    #[inline]
    pub fn pkt_count(&self) -> usize {
        self.pkt_count
    }

    #[inline]
    fn matches(&self, peer: Option<SocketAddr>, local: Option<SocketAddr>) -> bool {
        self.peer == peer && self.local == local
    }

    /// Encoder over the unused tail of the datagram buffer
    #[inline]
    pub fn encoder(&mut self) -> EncoderBuffer {
        EncoderBuffer::new(&mut self.buf[self.len..])
    }

    /// Accounts for a packet sealed through [`Self::encoder`]
    #[inline]
    pub fn commit(&mut self, len: usize) {
        debug_assert!(len <= self.remaining());
        self.len += len;
        self.pkt_count += 1;
    }

    fn finalize(self) -> Datagram {
        let mut bytes = self.buf.into_vec();
        bytes.truncate(self.len);
        Datagram {
            bytes,
            peer: self.peer,
            local: self.local,
        }
    }
}

/// Coalescer state: either no datagram is open, or exactly one is
#[derive(Default)]
pub(crate) struct Coalescer {
    open: Option<OpenDgram>,
}

impl Coalescer {
    #[inline]
    pub fn open(&self) -> Option<&OpenDgram> {
        self.open.as_ref()
    }

    /// Bytes buffered in the open datagram, 0 when none is open
    #[inline]
    pub fn cur_dgram_len(&self) -> usize {
        self.open.as_ref().map_or(0, OpenDgram::len)
    }

    /// Packets buffered in the open datagram awaiting finalization
    #[inline]
    pub fn unflushed_pkt_count(&self) -> usize {
        self.open.as_ref().map_or(0, OpenDgram::pkt_count)
    }

    /// Opens (or reuses) a datagram that can take `need` more bytes for the
    /// given addresses
    ///
    /// Returns the previously open datagram when it had to be finalized to
    /// make room, together with the datagram to seal into. `need` must not
    /// exceed `mdpl`; the caller has already rejected oversized packets.
    pub fn prepare(
        &mut self,
        mdpl: usize,
        peer: Option<SocketAddr>,
        local: Option<SocketAddr>,
        need: usize,
    ) -> (Option<Datagram>, &mut OpenDgram) {
        debug_assert!(need <= mdpl);

        let finalized = match self.open.take() {
            Some(open) if open.matches(peer, local) && open.remaining() >= need => {
                self.open = Some(open);
                None
            }
            Some(open) => Some(open.finalize()),
            None => None,
        };

        let open = self
            .open
            .get_or_insert_with(|| OpenDgram::new(mdpl, peer, local));
        (finalized, open)
    }

    /// Finalizes the open datagram, if any
    pub fn finish(&mut self) -> Option<Datagram> {
        self.open.take().map(OpenDgram::finalize)
    }
}
