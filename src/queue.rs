// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::{
    dgram::Datagram,
    sink::{self, DatagramSink},
};
use std::collections::VecDeque;

/// FIFO of finalized datagrams awaiting the sink
///
/// The queue is unbounded; backpressure is the caller's job, observed
/// through [`Self::len`] and [`Self::bytes`].
#[derive(Default)]
pub(crate) struct TransmitQueue {
    datagrams: VecDeque<Datagram>,
    bytes: usize,
}

impl TransmitQueue {
    pub fn push(&mut self, datagram: Datagram) {
        self.bytes += datagram.len();
        tracing::trace!(
            len = datagram.len(),
            queued = self.datagrams.len() + 1,
            "datagram finalized"
        );
        self.datagrams.push_back(datagram);
    }

    pub fn pop(&mut self) -> Option<Datagram> {
        let datagram = self.datagrams.pop_front()?;
        self.bytes -= datagram.len();
        Some(datagram)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.datagrams.len()
    }

    #[inline]
    pub fn bytes(&self) -> usize {
        self.bytes
    }

    /// Drains as many queued datagrams into the sink as it will take
    ///
    /// Stops at the first backpressure signal or error; whatever was not
    /// accepted stays queued, still in order.
    pub fn flush(&mut self, sink: &mut dyn DatagramSink) -> Result<usize, sink::Error> {
        let mut sent = 0;

        loop {
            let (front_len, accepted) = {
                let (front, _) = self.datagrams.as_slices();
                if front.is_empty() {
                    break;
                }
                (front.len(), sink.send(front)?)
            };

            for _ in 0..accepted {
                self.pop();
            }
            sent += accepted;

            if accepted < front_len {
                // sink backpressured
                break;
            }
        }

        if sent > 0 {
            tracing::trace!(sent, remaining = self.len(), "drained datagrams to sink");
        }

        Ok(sent)
    }
}
