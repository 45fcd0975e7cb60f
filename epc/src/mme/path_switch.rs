//! path_switch - re-point a UE's tunnels at the gNB it has been handed over to

use super::MmeProcedure;
use crate::{MmeApi, PathSwitchRequest, PathSwitchRequestAcknowledge, S1apGnbMessage};
use anyhow::{Result, ensure};
use derive_deref::{Deref, DerefMut};
use gtp::{
    Cause, FlowToBeModified, Fteid, GtpcPdu, InterfaceType, ModifyFlowRequest, ModifyFlowResponse,
};
use slog::info;

#[derive(Deref, DerefMut)]
pub struct PathSwitchProcedure<'a, A: MmeApi>(MmeProcedure<'a, A>);

impl<'a, A: MmeApi> PathSwitchProcedure<'a, A> {
    pub fn new(inner: MmeProcedure<'a, A>) -> Self {
        PathSwitchProcedure(inner)
    }

    // Path Switch Procedure
    // 1.    S1ap PathSwitchRequest >>
    // 2.    Gtpc ModifyFlowRequest <<
    // 3.    Gtpc ModifyFlowResponse >>
    // 4.    S1ap PathSwitchRequestAcknowledge <<
    pub fn path_switch_request(&mut self, r: PathSwitchRequest) -> Result<()> {
        self.log_message(">> S1ap PathSwitchRequest");
        let imsi = r.mme_ue_s1ap_id;
        let ue = self.ue_mut(imsi)?;
        let old_cell_id = ue.cell_id;
        ue.cell_id = r.cell_id;
        ue.gnb_ue_s1ap_id = r.gnb_ue_s1ap_id;
        ue.attached = true;
        let s11_teid = ue.s11_teid();
        info!(
            self.logger,
            "IMSI {imsi} switching path from cell {old_cell_id} to cell {}", r.cell_id
        );

        let flows = r
            .erabs_switched_in_downlink
            .iter()
            .map(|e| FlowToBeModified {
                qfi: e.erab_id,
                fteid: Fteid::new(
                    InterfaceType::S1uGnbGtpu,
                    e.gnb_transport_layer_address,
                    e.gnb_teid,
                ),
            })
            .collect();
        let request = ModifyFlowRequest {
            imsi,
            cell_id: r.cell_id,
            flows,
        };
        let sequence_number = self.next_sequence_number();
        self.log_message("<< Gtpc ModifyFlowRequest");
        self.send_to_sgw(GtpcPdu::new(s11_teid, sequence_number, request))
    }

    pub fn modify_flow_response(&mut self, teid: u32, r: ModifyFlowResponse) -> Result<()> {
        self.log_message(">> Gtpc ModifyFlowResponse");
        let imsi = self.imsi_for_teid(teid)?;
        ensure!(
            r.cause == Cause::RequestAccepted,
            "ModifyFlowResponse for IMSI {imsi} with cause {:?} not handled",
            r.cause
        );
        let ue = self.ue(imsi)?;
        let (cell_id, rnti) = (ue.cell_id, ue.gnb_ue_s1ap_id);
        self.check_gnb(cell_id)?;
        self.log_message("<< S1ap PathSwitchRequestAcknowledge");
        self.s1ap_to_gnb(
            cell_id,
            S1apGnbMessage::PathSwitchRequestAcknowledge(PathSwitchRequestAcknowledge {
                mme_ue_s1ap_id: imsi,
                gnb_ue_s1ap_id: rnti,
            }),
        );
        Ok(())
    }
}
