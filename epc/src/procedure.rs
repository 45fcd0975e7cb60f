//! procedure - what every control procedure needs, whichever node it runs on

use crate::{Interface, Transport};
use anyhow::Result;
use gtp::GtpcPdu;
use slog::{Logger, debug};
use std::net::Ipv4Addr;

pub struct Procedure<'a, A: Transport> {
    pub api: &'a A,
    pub logger: &'a Logger,
}

impl<'a, A: Transport> Procedure<'a, A> {
    pub fn new(api: &'a A, logger: &'a Logger) -> Self {
        Procedure { api, logger }
    }

    pub fn log_message(&self, s: &str) {
        debug!(self.logger, "{}", s)
    }

    /// Encode a GTP-C message and queue it for the peer at `destination`.
    pub fn send_gtpc(&self, interface: Interface, destination: Ipv4Addr, pdu: GtpcPdu) -> Result<()> {
        let datagram = pdu.encode()?;
        debug!(
            self.logger,
            "{:?} on {interface} to {destination}, TEID {} seq {}",
            pdu.message_type(),
            pdu.teid,
            pdu.sequence_number
        );
        self.api.send(interface, destination, datagram);
        Ok(())
    }
}

impl<A: Transport> std::ops::Deref for Procedure<'_, A> {
    type Target = A;

    fn deref(&self) -> &Self::Target {
        self.api
    }
}
