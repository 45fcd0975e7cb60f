//! flow_release - tear down individual flows, at the request of either the gNB or the PGW

use super::MmeProcedure;
use crate::{ErabReleaseCommand, ErabReleaseIndication, MmeApi, S1apGnbMessage};
use anyhow::Result;
use derive_deref::{Deref, DerefMut};
use gtp::{Cause, DeleteFlowCommand, DeleteFlowRequest, DeleteFlowResponse, GtpcPdu};
use slog::info;

#[derive(Deref, DerefMut)]
pub struct FlowReleaseProcedure<'a, A: MmeApi>(MmeProcedure<'a, A>);

impl<'a, A: MmeApi> FlowReleaseProcedure<'a, A> {
    pub fn new(inner: MmeProcedure<'a, A>) -> Self {
        FlowReleaseProcedure(inner)
    }

    // gNB initiated Flow Release Procedure
    // 1.    S1ap ErabReleaseIndication >>
    // 2.    Gtpc DeleteFlowCommand <<
    // ...   (PGW initiated procedure follows)
    pub fn erab_release_indication(&mut self, r: ErabReleaseIndication) -> Result<()> {
        self.log_message(">> S1ap ErabReleaseIndication");
        let s11_teid = self.ue(r.mme_ue_s1ap_id)?.s11_teid();
        info!(
            self.logger,
            "gNB requests release of flows {:?} of IMSI {}", r.erabs_to_be_released, r.mme_ue_s1ap_id
        );
        let sequence_number = self.next_sequence_number();
        self.log_message("<< Gtpc DeleteFlowCommand");
        self.send_to_sgw(GtpcPdu::new(
            s11_teid,
            sequence_number,
            DeleteFlowCommand {
                qfis: r.erabs_to_be_released,
            },
        ))
    }

    // PGW initiated Flow Release Procedure
    // 1.    Gtpc DeleteFlowRequest >>
    // 2.    S1ap ErabReleaseCommand << (if the UE is attached)
    // 3.    Gtpc DeleteFlowResponse <<
    pub fn delete_flow_request(
        &mut self,
        teid: u32,
        sequence_number: u32,
        r: DeleteFlowRequest,
    ) -> Result<()> {
        self.log_message(">> Gtpc DeleteFlowRequest");
        let imsi = self.imsi_for_teid(teid)?;
        let ue = self.ue_mut(imsi)?;
        let (attached, cell_id, rnti) = (ue.attached, ue.cell_id, ue.gnb_ue_s1ap_id);

        // Provisioning survives the release of an attached UE's flows, so that they come back
        // at its next attach.
        let mut deprovisioned = vec![];
        if !attached {
            for qfi in r.qfis.iter() {
                if ue.remove_flow(*qfi) {
                    deprovisioned.push(*qfi);
                }
            }
        }
        if !deprovisioned.is_empty() {
            info!(self.logger, "Deprovisioned flows {deprovisioned:?} of IMSI {imsi}");
        }

        if attached && !r.qfis.is_empty() {
            self.check_gnb(cell_id)?;
            self.log_message("<< S1ap ErabReleaseCommand");
            self.s1ap_to_gnb(
                cell_id,
                S1apGnbMessage::ErabReleaseCommand(ErabReleaseCommand {
                    mme_ue_s1ap_id: imsi,
                    gnb_ue_s1ap_id: rnti,
                    erabs_to_be_released: r.qfis.clone(),
                }),
            );
        }

        self.log_message("<< Gtpc DeleteFlowResponse");
        self.send_to_sgw(GtpcPdu::new(
            teid,
            sequence_number,
            DeleteFlowResponse {
                cause: Cause::RequestAccepted,
                qfis: r.qfis,
            },
        ))
    }
}
