//! userplane - TEID preserving GTP-U relay between the S1-U and S5-U legs

use crate::data::userplane_counter_indices::*;
use crate::data::{SgwConfig, UserplaneCounters};
use crate::{Interface, Transport};
use atomic_counter::AtomicCounter;
use slog::{Logger, warn};
use std::collections::HashMap;
use std::net::Ipv4Addr;

pub struct Userplane<'a, A: Transport> {
    pub api: &'a A,
    pub config: &'a SgwConfig,
    pub gnb_by_teid: &'a HashMap<u32, Ipv4Addr>,
    pub counters: &'a UserplaneCounters,
    pub logger: &'a Logger,
}

impl<A: Transport> Userplane<'_, A> {
    /// S1-U -> S5-U
    pub fn uplink(&self, packet: &[u8]) {
        self.counters[RX_PKTS].inc();
        match gtp::decapsulate(packet) {
            Ok(_) => {
                self.counters[TX_PKTS].inc();
                self.api
                    .send(Interface::S5u, self.config.pgw_addr, packet.to_vec());
            }
            Err(e) => {
                self.counters[DROP_BAD_GTPU].inc();
                warn!(self.logger, "Drop uplink packet - {e}");
            }
        }
    }

    /// S5-U -> S1-U
    pub fn downlink(&self, packet: &[u8]) {
        self.counters[RX_PKTS].inc();
        let teid = match gtp::decapsulate(packet) {
            Ok((teid, _)) => teid,
            Err(e) => {
                self.counters[DROP_BAD_GTPU].inc();
                warn!(self.logger, "Drop downlink packet - {e}");
                return;
            }
        };
        let Some(gnb) = self.gnb_by_teid.get(&teid) else {
            self.counters[DROP_UNKNOWN_TEID].inc();
            warn!(self.logger, "Drop downlink packet for unknown TEID {teid}");
            return;
        };
        self.counters[TX_PKTS].inc();
        self.api.send(Interface::S1u, *gnb, packet.to_vec());
    }
}
