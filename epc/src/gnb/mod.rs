//! gnb - bridge between the radio stack and the core network
//!
//! Towards the MME the gNB speaks S1AP.  Towards the SGW it tunnels user plane packets in
//! GTP-U, using a flow table to map between radio bearers and TEIDs.

mod flow_release;
mod initial_access;
mod path_switch;
mod ue_context_release;
mod userplane;

use crate::data::{FlowTable, GnbConfig, UserplaneCounters};
use crate::{DatagramHandler, GnbApi, Interface, Procedure, S1apGnbMessage};
use anyhow::{Result, anyhow, ensure};
use flow_release::FlowReleaseProcedure;
use initial_access::InitialAccessProcedure;
use path_switch::PathSwitchProcedure;
use slog::Logger;
use std::collections::HashMap;
use std::sync::Arc;
use ue_context_release::UeContextReleaseProcedure;
use userplane::Userplane;

/// A flow that the target gNB of a handover takes over, keeping the TEID it had at the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowToBeSwitched {
    pub qfi: u8,
    pub teid: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSwitchParameters {
    pub imsi: u64,
    pub rnti: u16,
    pub flows: Vec<FlowToBeSwitched>,
}

pub struct Gnb<A: GnbApi> {
    api: A,
    config: GnbConfig,
    state: GnbState,
    logger: Logger,
    counters: Arc<UserplaneCounters>,
}

#[derive(Default)]
struct GnbState {
    // Kept in step with each other by add_ue and remove_ue.
    rnti_by_imsi: HashMap<u64, u16>,
    imsi_by_rnti: HashMap<u16, u64>,

    flows: FlowTable,
}

impl GnbState {
    fn add_ue(&mut self, imsi: u64, rnti: u16) {
        if let Some(old_rnti) = self.rnti_by_imsi.insert(imsi, rnti) {
            self.imsi_by_rnti.remove(&old_rnti);
        }
        if let Some(old_imsi) = self.imsi_by_rnti.insert(rnti, imsi) {
            if old_imsi != imsi {
                self.rnti_by_imsi.remove(&old_imsi);
            }
        }
    }

    fn remove_ue(&mut self, rnti: u16) -> Option<u64> {
        let imsi = self.imsi_by_rnti.remove(&rnti)?;
        self.rnti_by_imsi.remove(&imsi);
        Some(imsi)
    }
}

impl<A: GnbApi> Gnb<A> {
    pub fn new(config: GnbConfig, api: A, logger: Logger) -> Self {
        Gnb {
            api,
            config,
            state: GnbState::default(),
            logger,
            counters: Arc::new(UserplaneCounters::default()),
        }
    }

    pub fn cell_id(&self) -> u32 {
        self.config.cell_id
    }

    pub fn flow_table(&self) -> &FlowTable {
        &self.state.flows
    }

    pub fn initial_ue_message(&mut self, imsi: u64, rnti: u16) -> Result<()> {
        InitialAccessProcedure::new(self.procedure()).initial_ue_message(imsi, rnti)
    }

    pub fn path_switch_request(&mut self, params: PathSwitchParameters) -> Result<()> {
        PathSwitchProcedure::new(self.procedure()).request(params)
    }

    pub fn ue_context_release(&mut self, rnti: u16) -> Result<()> {
        UeContextReleaseProcedure::new(self.procedure()).run(rnti)
    }

    pub fn release_indication(&mut self, imsi: u64, rnti: u16, qfi: u8) -> Result<()> {
        FlowReleaseProcedure::new(self.procedure()).release_indication(imsi, rnti, qfi)
    }

    /// An uplink packet from the radio stack.
    pub fn recv_from_radio(&self, packet: &[u8], rnti: u16, qfi: u8) {
        self.userplane().uplink(packet, rnti, qfi)
    }

    pub fn handle_s1ap(&mut self, message: S1apGnbMessage) -> Result<()> {
        match message {
            S1apGnbMessage::InitialContextSetupRequest(r) => {
                InitialAccessProcedure::new(self.procedure()).initial_context_setup_request(r)
            }
            S1apGnbMessage::PathSwitchRequestAcknowledge(r) => {
                PathSwitchProcedure::new(self.procedure()).acknowledge(r)
            }
            S1apGnbMessage::ErabReleaseCommand(r) => {
                FlowReleaseProcedure::new(self.procedure()).erab_release_command(r)
            }
        }
    }

    fn procedure(&mut self) -> GnbProcedure<'_, A> {
        GnbProcedure {
            base: Procedure::new(&self.api, &self.logger),
            config: &self.config,
            state: &mut self.state,
        }
    }

    fn userplane(&self) -> Userplane<'_, A> {
        Userplane {
            api: &self.api,
            config: &self.config,
            flows: &self.state.flows,
            counters: &self.counters,
            logger: &self.logger,
        }
    }
}

impl<A: GnbApi> DatagramHandler for Gnb<A> {
    fn handle_datagram(&mut self, interface: Interface, datagram: &[u8]) -> Result<()> {
        ensure!(
            interface == Interface::S1u,
            "gNB received datagram on {interface}, which it does not have"
        );
        self.userplane().downlink(datagram);
        Ok(())
    }

    fn counters(&self) -> Arc<UserplaneCounters> {
        self.counters.clone()
    }
}

pub struct GnbProcedure<'a, A: GnbApi> {
    base: Procedure<'a, A>,
    config: &'a GnbConfig,
    state: &'a mut GnbState,
}

impl<'a, A: GnbApi> std::ops::Deref for GnbProcedure<'a, A> {
    type Target = Procedure<'a, A>;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}

impl<A: GnbApi> GnbProcedure<'_, A> {
    fn rnti_for_imsi(&self, imsi: u64) -> Result<u16> {
        self.state
            .rnti_by_imsi
            .get(&imsi)
            .copied()
            .ok_or_else(|| anyhow!("could not find any UE with IMSI {imsi}"))
    }
}
