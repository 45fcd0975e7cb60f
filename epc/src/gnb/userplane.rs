//! userplane - GTP-U tunnel to the SGW on one side, radio bearers on the other

use crate::data::userplane_counter_indices::*;
use crate::data::{FlowId, FlowTable, GnbConfig, UserplaneCounters};
use crate::{GnbApi, Interface, IpVersion};
use atomic_counter::AtomicCounter;
use slog::{Logger, warn};

pub struct Userplane<'a, A: GnbApi> {
    pub api: &'a A,
    pub config: &'a GnbConfig,
    pub flows: &'a FlowTable,
    pub counters: &'a UserplaneCounters,
    pub logger: &'a Logger,
}

impl<A: GnbApi> Userplane<'_, A> {
    /// Radio -> S1-U
    pub fn uplink(&self, packet: &[u8], rnti: u16, qfi: u8) {
        self.counters[RX_PKTS].inc();
        let flow = FlowId { rnti, qfi };
        let Some(teid) = self.flows.teid(flow) else {
            self.counters[DROP_UNKNOWN_FLOW].inc();
            warn!(self.logger, "Drop uplink packet - no tunnel for {flow}");
            return;
        };
        match gtp::encapsulate(teid, packet) {
            Ok(packet) => {
                self.counters[TX_PKTS].inc();
                self.api
                    .send(Interface::S1u, self.config.sgw_s1u_addr, packet);
            }
            Err(e) => {
                self.counters[DROP_BAD_GTPU].inc();
                warn!(self.logger, "Drop uplink packet for {flow} - {e}");
            }
        }
    }

    /// S1-U -> radio
    pub fn downlink(&self, packet: &[u8]) {
        self.counters[RX_PKTS].inc();
        let (teid, inner) = match gtp::decapsulate(packet) {
            Ok(x) => x,
            Err(e) => {
                self.counters[DROP_BAD_GTPU].inc();
                warn!(self.logger, "Drop downlink packet - {e}");
                return;
            }
        };
        let Some(flow) = self.flows.flow(teid) else {
            self.counters[DROP_UNKNOWN_TEID].inc();
            warn!(self.logger, "Drop downlink packet - no flow for TEID {teid}");
            return;
        };
        let ip_version = match inner.first().map(|b| b >> 4) {
            Some(4) => IpVersion::V4,
            Some(6) => IpVersion::V6,
            other => {
                self.counters[DROP_UNKNOWN_IP_VERSION].inc();
                warn!(
                    self.logger,
                    "Drop downlink packet for {flow} - IP version {other:?}"
                );
                return;
            }
        };
        self.counters[TX_PKTS].inc();
        self.api
            .send_to_radio(inner.to_vec(), flow.rnti, flow.qfi, ip_version);
    }
}
