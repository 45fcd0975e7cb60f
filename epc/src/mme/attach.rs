//! attach - activate a UE's provisioned flows when it first makes contact through a gNB

use super::MmeProcedure;
use crate::{
    ErabToBeSetupItem, InitialContextSetupRequest, InitialUeMessage, MmeApi, S1apGnbMessage,
};
use anyhow::{Result, ensure};
use derive_deref::{Deref, DerefMut};
use gtp::{
    Cause, CreateSessionRequest, CreateSessionResponse, FlowContext, Fteid, GtpcPdu,
    InterfaceType,
};
use slog::info;
use std::net::Ipv4Addr;

#[derive(Deref, DerefMut)]
pub struct AttachProcedure<'a, A: MmeApi>(MmeProcedure<'a, A>);

impl<'a, A: MmeApi> AttachProcedure<'a, A> {
    pub fn new(inner: MmeProcedure<'a, A>) -> Self {
        AttachProcedure(inner)
    }

    // Attach Procedure
    // 1.    S1ap InitialUeMessage >>
    // 2.    Gtpc CreateSessionRequest <<
    // 3.    Gtpc CreateSessionResponse >>
    // 4.    S1ap InitialContextSetupRequest <<
    pub fn initial_ue_message(&mut self, m: InitialUeMessage) -> Result<()> {
        self.log_message(">> S1ap InitialUeMessage");
        let mme_addr = self.config.s11_addr;
        let ue = self.ue_mut(m.imsi)?;
        ue.cell_id = m.cell_id;
        ue.gnb_ue_s1ap_id = m.gnb_ue_s1ap_id;
        ue.attached = true;
        let s11_teid = ue.s11_teid();

        // The SGW assigns the user plane F-TEIDs.
        let flows: Vec<FlowContext> = ue
            .flows()
            .map(|(qfi, f)| FlowContext {
                qfi,
                rule: f.rule.clone(),
                fteid: Fteid::new(InterfaceType::S5SgwGtpu, Ipv4Addr::UNSPECIFIED, 0),
                qos: f.qos,
            })
            .collect();
        info!(
            self.logger,
            "IMSI {} attached in cell {} with rnti {}, requesting {} flows",
            m.imsi,
            m.cell_id,
            m.gnb_ue_s1ap_id,
            flows.len()
        );

        let request = CreateSessionRequest {
            imsi: m.imsi,
            cell_id: m.cell_id,
            sender_fteid: Fteid::new(InterfaceType::S11MmeGtpc, mme_addr, s11_teid),
            flows,
        };
        let sequence_number = self.next_sequence_number();
        self.log_message("<< Gtpc CreateSessionRequest");
        self.send_to_sgw(GtpcPdu::new(0, sequence_number, request))
    }

    pub fn create_session_response(&mut self, teid: u32, r: CreateSessionResponse) -> Result<()> {
        self.log_message(">> Gtpc CreateSessionResponse");
        let imsi = self.imsi_for_teid(teid)?;
        ensure!(
            r.cause == Cause::RequestAccepted,
            "CreateSessionResponse for IMSI {imsi} with cause {:?} not handled",
            r.cause
        );
        let ue = self.ue(imsi)?;
        let (cell_id, rnti) = (ue.cell_id, ue.gnb_ue_s1ap_id);
        self.check_gnb(cell_id)?;

        let erabs_to_be_setup = r
            .flows
            .iter()
            .map(|f| ErabToBeSetupItem {
                erab_id: f.qfi,
                qos: f.qos,
                transport_layer_address: f.fteid.addr,
                sgw_teid: f.fteid.teid,
            })
            .collect();
        self.log_message("<< S1ap InitialContextSetupRequest");
        self.s1ap_to_gnb(
            cell_id,
            S1apGnbMessage::InitialContextSetupRequest(InitialContextSetupRequest {
                mme_ue_s1ap_id: imsi,
                gnb_ue_s1ap_id: rnti,
                erabs_to_be_setup,
            }),
        );
        Ok(())
    }
}
