//! sgw - relays GTP-C between MME and PGW and GTP-U between gNBs and PGW

mod create_session;
mod delete_flow;
mod modify_flow;
mod userplane;

use crate::data::{SgwConfig, TeidAllocator, UserplaneCounters};
use crate::{DatagramHandler, Interface, Procedure, Transport};
use anyhow::{Result, anyhow, bail};
use create_session::CreateSessionProcedure;
use delete_flow::DeleteFlowProcedure;
use gtp::{Fteid, GtpcMessage, GtpcPdu};
use modify_flow::ModifyFlowProcedure;
use slog::{Logger, info};
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;
use userplane::Userplane;

pub struct Sgw<A: Transport> {
    api: A,
    config: SgwConfig,
    state: SgwState,
    logger: Logger,
    counters: Arc<UserplaneCounters>,
}

#[derive(Default)]
struct SgwState {
    gnb_by_cell_id: HashMap<u32, Ipv4Addr>,

    // Where to send downlink GTP-U for each TEID this SGW has allocated.
    gnb_by_teid: HashMap<u32, Ipv4Addr>,

    // The MME F-TEID of each session, keyed by S5-C TEID.
    mme_fteid_by_teid: HashMap<u32, Fteid>,

    // The user plane TEID of each flow, by QFI, keyed by S5-C TEID.
    flow_teids_by_session: HashMap<u32, HashMap<u8, u32>>,

    teids: TeidAllocator,
}

impl<A: Transport> Sgw<A> {
    pub fn new(config: SgwConfig, api: A, logger: Logger) -> Self {
        Self::new_with_teids(config, api, logger, TeidAllocator::default())
    }

    /// Construct an SGW whose TEIDs come from the given allocator.
    pub fn new_with_teids(
        config: SgwConfig,
        api: A,
        logger: Logger,
        teids: TeidAllocator,
    ) -> Self {
        let gnb_by_cell_id = config.gnbs.iter().map(|g| (g.cell_id, g.addr)).collect();
        Sgw {
            api,
            config,
            state: SgwState {
                gnb_by_cell_id,
                teids,
                ..Default::default()
            },
            logger,
            counters: Arc::new(UserplaneCounters::default()),
        }
    }

    /// Add or replace the S1-U address of the gNB serving a cell.
    pub fn add_gnb(&mut self, cell_id: u32, addr: Ipv4Addr) {
        info!(self.logger, "gNB for cell {cell_id} is at {addr}");
        self.state.gnb_by_cell_id.insert(cell_id, addr);
    }

    /// The gNB that downlink GTP-U with this TEID is sent to.
    pub fn gnb_for_teid(&self, teid: u32) -> Option<Ipv4Addr> {
        self.state.gnb_by_teid.get(&teid).copied()
    }

    fn procedure(&mut self) -> SgwProcedure<'_, A> {
        SgwProcedure {
            base: Procedure::new(&self.api, &self.logger),
            config: &self.config,
            state: &mut self.state,
        }
    }

    fn handle_from_mme(&mut self, datagram: &[u8]) -> Result<()> {
        let GtpcPdu {
            teid,
            sequence_number,
            message,
        } = GtpcPdu::decode(datagram)?;
        match message {
            GtpcMessage::CreateSessionRequest(r) => {
                CreateSessionProcedure::new(self.procedure()).request(sequence_number, r)
            }
            GtpcMessage::ModifyFlowRequest(r) => {
                ModifyFlowProcedure::new(self.procedure()).request(teid, sequence_number, r)
            }
            GtpcMessage::DeleteFlowCommand(r) => {
                DeleteFlowProcedure::new(self.procedure()).command(teid, sequence_number, r)
            }
            GtpcMessage::DeleteFlowResponse(r) => {
                DeleteFlowProcedure::new(self.procedure()).response(teid, sequence_number, r)
            }
            m => bail!("Unexpected {:?} on S11", m.message_type()),
        }
    }

    fn handle_from_pgw(&mut self, datagram: &[u8]) -> Result<()> {
        let GtpcPdu {
            teid,
            sequence_number,
            message,
        } = GtpcPdu::decode(datagram)?;
        match message {
            GtpcMessage::CreateSessionResponse(r) => {
                CreateSessionProcedure::new(self.procedure()).response(teid, sequence_number, r)
            }
            GtpcMessage::ModifyFlowResponse(r) => {
                ModifyFlowProcedure::new(self.procedure()).response(teid, sequence_number, r)
            }
            GtpcMessage::DeleteFlowRequest(r) => {
                DeleteFlowProcedure::new(self.procedure()).request(teid, sequence_number, r)
            }
            m => bail!("Unexpected {:?} on S5-C", m.message_type()),
        }
    }

    fn userplane(&self) -> Userplane<'_, A> {
        Userplane {
            api: &self.api,
            config: &self.config,
            gnb_by_teid: &self.state.gnb_by_teid,
            counters: &self.counters,
            logger: &self.logger,
        }
    }
}

impl<A: Transport> DatagramHandler for Sgw<A> {
    fn handle_datagram(&mut self, interface: Interface, datagram: &[u8]) -> Result<()> {
        match interface {
            Interface::S11 => self.handle_from_mme(datagram),
            Interface::S5c => self.handle_from_pgw(datagram),
            Interface::S1u => {
                self.userplane().uplink(datagram);
                Ok(())
            }
            Interface::S5u => {
                self.userplane().downlink(datagram);
                Ok(())
            }
        }
    }

    fn counters(&self) -> Arc<UserplaneCounters> {
        self.counters.clone()
    }
}

pub struct SgwProcedure<'a, A: Transport> {
    base: Procedure<'a, A>,
    config: &'a SgwConfig,
    state: &'a mut SgwState,
}

impl<'a, A: Transport> std::ops::Deref for SgwProcedure<'a, A> {
    type Target = Procedure<'a, A>;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}

impl<A: Transport> SgwProcedure<'_, A> {
    fn gnb_for_cell(&self, cell_id: u32) -> Result<Ipv4Addr> {
        self.state
            .gnb_by_cell_id
            .get(&cell_id)
            .copied()
            .ok_or_else(|| anyhow!("could not find any gNB with cell ID {cell_id}"))
    }

    fn mme_fteid(&self, teid: u32) -> Result<Fteid> {
        self.state
            .mme_fteid_by_teid
            .get(&teid)
            .copied()
            .ok_or_else(|| anyhow!("could not find any session with S5-C TEID {teid}"))
    }

    /// Forget a session's tunnels, returning how many there were.
    fn remove_session_tunnels(&mut self, s5c_teid: u32) -> usize {
        let flows = self
            .state
            .flow_teids_by_session
            .remove(&s5c_teid)
            .unwrap_or_default();
        for teid in flows.values() {
            self.state.gnb_by_teid.remove(teid);
        }
        flows.len()
    }

    fn remove_flow_tunnels(&mut self, s5c_teid: u32, qfis: &[u8]) {
        let Some(session) = self.state.flow_teids_by_session.get_mut(&s5c_teid) else {
            return;
        };
        for qfi in qfis {
            if let Some(teid) = session.remove(qfi) {
                self.state.gnb_by_teid.remove(&teid);
                info!(self.base.logger, "Removed TEID {teid} of flow {qfi}");
            }
        }
    }

    fn send_to_pgw(&self, pdu: GtpcPdu) -> Result<()> {
        self.send_gtpc(Interface::S5c, self.config.pgw_addr, pdu)
    }

    fn send_to_mme(&self, mme: Ipv4Addr, pdu: GtpcPdu) -> Result<()> {
        self.send_gtpc(Interface::S11, mme, pdu)
    }
}
