//! path_switch - the target side of a handover

use super::{GnbProcedure, PathSwitchParameters};
use crate::data::FlowId;
use crate::{
    ErabSwitchedInDownlinkItem, GnbApi, PathSwitchRequest, PathSwitchRequestAcknowledge,
    S1apMmeMessage,
};
use anyhow::Result;
use derive_deref::{Deref, DerefMut};
use slog::info;

#[derive(Deref, DerefMut)]
pub struct PathSwitchProcedure<'a, A: GnbApi>(GnbProcedure<'a, A>);

impl<'a, A: GnbApi> PathSwitchProcedure<'a, A> {
    pub fn new(inner: GnbProcedure<'a, A>) -> Self {
        PathSwitchProcedure(inner)
    }

    // Path Switch Procedure
    // 1.    Radio PathSwitchRequest >>
    // 2.    S1ap PathSwitchRequest <<
    // 3.    S1ap PathSwitchRequestAcknowledge >>
    // 4.    Radio PathSwitchRequestAcknowledge <<
    pub fn request(&mut self, params: PathSwitchParameters) -> Result<()> {
        self.log_message(">> Radio PathSwitchRequest");
        let PathSwitchParameters { imsi, rnti, flows } = params;
        let local_addr = self.config.s1u_addr;
        let cell_id = self.config.cell_id;

        self.state.add_ue(imsi, rnti);
        let mut erabs_switched_in_downlink = Vec::with_capacity(flows.len());
        for f in flows.iter() {
            let flow = FlowId { rnti, qfi: f.qfi };
            self.state.flows.insert(flow, f.teid);
            info!(self.logger, "Flow {flow} switched in with TEID {}", f.teid);
            erabs_switched_in_downlink.push(ErabSwitchedInDownlinkItem {
                erab_id: f.qfi,
                gnb_transport_layer_address: local_addr,
                gnb_teid: f.teid,
            });
        }

        self.log_message("<< S1ap PathSwitchRequest");
        self.s1ap_to_mme(S1apMmeMessage::PathSwitchRequest(PathSwitchRequest {
            mme_ue_s1ap_id: imsi,
            gnb_ue_s1ap_id: rnti,
            cell_id,
            erabs_switched_in_downlink,
        }));
        Ok(())
    }

    pub fn acknowledge(&mut self, r: PathSwitchRequestAcknowledge) -> Result<()> {
        self.log_message(">> S1ap PathSwitchRequestAcknowledge");
        let rnti = self.rnti_for_imsi(r.mme_ue_s1ap_id)?;
        self.log_message("<< Radio PathSwitchRequestAcknowledge");
        self.api.path_switch_request_acknowledge(rnti);
        Ok(())
    }
}
