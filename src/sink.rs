// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! The capability through which finished datagrams leave the record layer
//!
//! The record layer does not care whether the other side is a connected
//! UDP socket, a `sendmmsg` batcher or a test capture; it only needs a way
//! to hand over a batch of datagrams and learn how many were accepted.

use crate::dgram::Datagram;
use core::fmt;

/// Error reported by a datagram sink
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Error {
    pub reason: &'static str,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if !self.reason.is_empty() {
            self.reason.fmt(f)
        } else {
            write!(f, "sink::Error")
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("sink::Error");

        if !self.reason.is_empty() {
            d.field("reason", &self.reason);
        }

        d.finish()
    }
}

impl std::error::Error for Error {}

/// Consumer of finished datagrams
pub trait DatagramSink {
    /// Attempts to send the given datagrams, in order
    ///
    /// Returns how many were accepted; anything less than
    /// `datagrams.len()` means the sink backpressured and the remainder
    /// stays queued. An error also leaves the unsent remainder queued.
    fn send(&mut self, datagrams: &[Datagram]) -> Result<usize, Error>;

    /// Whether submitted datagrams may carry an explicit local address
    fn supports_local_addr(&self) -> bool {
        false
    }
}

pub mod testing {
    use super::{DatagramSink, Error};
    use crate::dgram::Datagram;
    use std::{cell::RefCell, rc::Rc};

    /// Records every datagram it is handed; clones share the same store
    #[derive(Clone, Default)]
    pub struct Capture {
        store: Rc<RefCell<Vec<Datagram>>>,
    }

    impl Capture {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn datagrams(&self) -> Vec<Datagram> {
            self.store.borrow().clone()
        }

        pub fn len(&self) -> usize {
            self.store.borrow().len()
        }

        pub fn is_empty(&self) -> bool {
            self.store.borrow().is_empty()
        }
    }

    impl DatagramSink for Capture {
        fn send(&mut self, datagrams: &[Datagram]) -> Result<usize, Error> {
            self.store.borrow_mut().extend_from_slice(datagrams);
            Ok(datagrams.len())
        }

        fn supports_local_addr(&self) -> bool {
            true
        }
    }

    /// Accepts a fixed number of datagrams per call, then backpressures
    pub struct Backpressure {
        pub accept_per_call: usize,
        pub inner: Capture,
    }

    impl DatagramSink for Backpressure {
        fn send(&mut self, datagrams: &[Datagram]) -> Result<usize, Error> {
            let accepted = datagrams.len().min(self.accept_per_call);
            self.inner.send(&datagrams[..accepted])
        }

        fn supports_local_addr(&self) -> bool {
            true
        }
    }

    /// Fails every send
    #[derive(Clone, Copy, Debug, Default)]
    pub struct Broken;

    impl DatagramSink for Broken {
        fn send(&mut self, _datagrams: &[Datagram]) -> Result<usize, Error> {
            Err(Error {
                reason: "sink is broken",
            })
        }
    }
}
