//! mme - per-UE flow registry that turns S1AP primitives from gNBs into GTP-C towards the SGW

mod attach;
mod flow_release;
mod path_switch;
mod ue_context_release;

use crate::data::{MmeConfig, UeContext, UserplaneCounters};
use crate::{DatagramHandler, Interface, MmeApi, Procedure, S1apMmeMessage};
use anyhow::{Result, anyhow, bail, ensure};
use attach::AttachProcedure;
use flow_release::FlowReleaseProcedure;
use gtp::{GtpcMessage, GtpcPdu, MAX_SEQUENCE_NUMBER, QosFlow, QosRule};
use path_switch::PathSwitchProcedure;
use slog::{Logger, info};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use ue_context_release::UeContextReleaseProcedure;

pub struct Mme<A: MmeApi> {
    api: A,
    config: MmeConfig,
    state: MmeState,
    logger: Logger,
    counters: Arc<UserplaneCounters>,
}

#[derive(Default)]
struct MmeState {
    ues: HashMap<u64, UeContext>,
    imsi_by_s11_teid: HashMap<u32, u64>,
    gnbs: HashSet<u32>,
    sequence_number: u32,
}

impl<A: MmeApi> Mme<A> {
    pub fn new(config: MmeConfig, api: A, logger: Logger) -> Self {
        Mme {
            api,
            config,
            state: MmeState::default(),
            logger,
            counters: Arc::new(UserplaneCounters::default()),
        }
    }

    /// Provision a subscriber.
    pub fn add_ue(&mut self, imsi: u64) -> Result<()> {
        let ue = UeContext::new(imsi);
        let teid = ue.s11_teid();
        if let Some(other) = self.state.imsi_by_s11_teid.get(&teid) {
            bail!("IMSI {imsi} clashes with known IMSI {other} on S11 TEID {teid}")
        }
        self.state.imsi_by_s11_teid.insert(teid, imsi);
        self.state.ues.insert(imsi, ue);
        info!(self.logger, "Added UE with IMSI {imsi}");
        Ok(())
    }

    /// Provision a flow to be activated whenever the UE attaches.  Returns its QFI.
    pub fn add_flow(&mut self, imsi: u64, rule: QosRule, qos: QosFlow) -> Result<u8> {
        let ue = self
            .state
            .ues
            .get_mut(&imsi)
            .ok_or_else(|| anyhow!("could not find any UE with IMSI {imsi}"))?;
        qos.validate()?;
        let qfi = ue.add_flow(rule, qos)?;
        match qos.five_qi.characteristics() {
            Some(c) => info!(
                self.logger,
                "Provisioned flow {qfi} for IMSI {imsi}, 5QI {} is {:?} with priority {}",
                qos.five_qi.0,
                c.resource_type,
                c.priority
            ),
            None => info!(
                self.logger,
                "Provisioned flow {qfi} for IMSI {imsi} with non-standard 5QI {}", qos.five_qi.0
            ),
        }
        Ok(qfi)
    }

    /// Make a gNB known, so that S1AP can be sent to the cell it serves.
    pub fn add_gnb(&mut self, cell_id: u32) {
        self.state.gnbs.insert(cell_id);
    }

    pub fn ue(&self, imsi: u64) -> Option<&UeContext> {
        self.state.ues.get(&imsi)
    }

    pub fn handle_s1ap(&mut self, message: S1apMmeMessage) -> Result<()> {
        match message {
            S1apMmeMessage::InitialUeMessage(m) => {
                AttachProcedure::new(self.procedure()).initial_ue_message(m)
            }
            S1apMmeMessage::PathSwitchRequest(m) => {
                PathSwitchProcedure::new(self.procedure()).path_switch_request(m)
            }
            S1apMmeMessage::ErabReleaseIndication(m) => {
                FlowReleaseProcedure::new(self.procedure()).erab_release_indication(m)
            }
            S1apMmeMessage::UeContextReleaseIndication(m) => {
                UeContextReleaseProcedure::new(self.procedure()).run(m)
            }
        }
    }

    fn procedure(&mut self) -> MmeProcedure<'_, A> {
        MmeProcedure {
            base: Procedure::new(&self.api, &self.logger),
            config: &self.config,
            state: &mut self.state,
        }
    }
}

impl<A: MmeApi> DatagramHandler for Mme<A> {
    fn handle_datagram(&mut self, interface: Interface, datagram: &[u8]) -> Result<()> {
        ensure!(
            interface == Interface::S11,
            "MME received datagram on {interface}, which it does not have"
        );
        let GtpcPdu {
            teid,
            sequence_number,
            message,
        } = GtpcPdu::decode(datagram)?;
        match message {
            GtpcMessage::CreateSessionResponse(r) => {
                AttachProcedure::new(self.procedure()).create_session_response(teid, r)
            }
            GtpcMessage::ModifyFlowResponse(r) => {
                PathSwitchProcedure::new(self.procedure()).modify_flow_response(teid, r)
            }
            GtpcMessage::DeleteFlowRequest(r) => FlowReleaseProcedure::new(self.procedure())
                .delete_flow_request(teid, sequence_number, r),
            m => bail!("Unexpected {:?} on S11", m.message_type()),
        }
    }

    fn counters(&self) -> Arc<UserplaneCounters> {
        self.counters.clone()
    }
}

pub struct MmeProcedure<'a, A: MmeApi> {
    base: Procedure<'a, A>,
    config: &'a MmeConfig,
    state: &'a mut MmeState,
}

impl<'a, A: MmeApi> std::ops::Deref for MmeProcedure<'a, A> {
    type Target = Procedure<'a, A>;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}

impl<A: MmeApi> MmeProcedure<'_, A> {
    fn ue(&self, imsi: u64) -> Result<&UeContext> {
        self.state
            .ues
            .get(&imsi)
            .ok_or_else(|| anyhow!("could not find any UE with IMSI {imsi}"))
    }

    fn ue_mut(&mut self, imsi: u64) -> Result<&mut UeContext> {
        self.state
            .ues
            .get_mut(&imsi)
            .ok_or_else(|| anyhow!("could not find any UE with IMSI {imsi}"))
    }

    fn imsi_for_teid(&self, teid: u32) -> Result<u64> {
        self.state
            .imsi_by_s11_teid
            .get(&teid)
            .copied()
            .ok_or_else(|| anyhow!("could not find any UE with S11 TEID {teid}"))
    }

    fn check_gnb(&self, cell_id: u32) -> Result<()> {
        ensure!(
            self.state.gnbs.contains(&cell_id),
            "could not find any gNB with cell ID {cell_id}"
        );
        Ok(())
    }

    fn next_sequence_number(&mut self) -> u32 {
        let sequence_number = self.state.sequence_number;
        self.state.sequence_number = (sequence_number + 1) & MAX_SEQUENCE_NUMBER;
        sequence_number
    }

    fn send_to_sgw(&self, pdu: GtpcPdu) -> Result<()> {
        self.send_gtpc(Interface::S11, self.config.sgw_s11_addr, pdu)
    }
}
