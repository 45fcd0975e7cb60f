//! flow_release - release of individual flows

use super::GnbProcedure;
use crate::data::FlowId;
use crate::{ErabReleaseCommand, ErabReleaseIndication, GnbApi, S1apMmeMessage};
use anyhow::Result;
use derive_deref::{Deref, DerefMut};
use slog::{debug, info};

#[derive(Deref, DerefMut)]
pub struct FlowReleaseProcedure<'a, A: GnbApi>(GnbProcedure<'a, A>);

impl<'a, A: GnbApi> FlowReleaseProcedure<'a, A> {
    pub fn new(inner: GnbProcedure<'a, A>) -> Self {
        FlowReleaseProcedure(inner)
    }

    // Flow Release Procedure
    // 1.    Radio ReleaseIndication >>
    // 2.    S1ap ErabReleaseIndication <<
    // ...   (core deletes the flow)
    // 3.    S1ap ErabReleaseCommand >>
    pub fn release_indication(&mut self, imsi: u64, rnti: u16, qfi: u8) -> Result<()> {
        self.log_message(">> Radio ReleaseIndication");
        self.log_message("<< S1ap ErabReleaseIndication");
        self.s1ap_to_mme(S1apMmeMessage::ErabReleaseIndication(ErabReleaseIndication {
            mme_ue_s1ap_id: imsi,
            gnb_ue_s1ap_id: rnti,
            erabs_to_be_released: vec![qfi],
        }));
        Ok(())
    }

    pub fn erab_release_command(&mut self, r: ErabReleaseCommand) -> Result<()> {
        self.log_message(">> S1ap ErabReleaseCommand");

        // The UE may have been released while the command was in flight.
        let Some(rnti) = self.state.rnti_by_imsi.get(&r.mme_ue_s1ap_id).copied() else {
            debug!(
                self.logger,
                "Ignore release of flows {:?} of unknown IMSI {}",
                r.erabs_to_be_released,
                r.mme_ue_s1ap_id
            );
            return Ok(());
        };
        for qfi in r.erabs_to_be_released.iter() {
            let flow = FlowId { rnti, qfi: *qfi };
            if let Some(teid) = self.state.flows.remove_flow(flow) {
                info!(self.logger, "Removed flow {flow} with TEID {teid}");
            }
        }
        Ok(())
    }
}
