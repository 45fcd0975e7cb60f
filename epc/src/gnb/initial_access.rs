//! initial_access - first contact of a UE, up to the point where its bearers are in place

use super::GnbProcedure;
use crate::data::FlowId;
use crate::{GnbApi, InitialContextSetupRequest, InitialUeMessage, S1apMmeMessage};
use anyhow::Result;
use derive_deref::{Deref, DerefMut};
use slog::{info, warn};

#[derive(Deref, DerefMut)]
pub struct InitialAccessProcedure<'a, A: GnbApi>(GnbProcedure<'a, A>);

impl<'a, A: GnbApi> InitialAccessProcedure<'a, A> {
    pub fn new(inner: GnbProcedure<'a, A>) -> Self {
        InitialAccessProcedure(inner)
    }

    // Initial Access Procedure
    // 1.    Radio InitialUeMessage >>
    // 2.    S1ap InitialUeMessage <<
    // 3.    S1ap InitialContextSetupRequest >>
    // 4.    Radio SetupDataRadioBearer << (per flow)
    // 5.    Radio InitialContextSetupRequest <<
    pub fn initial_ue_message(&mut self, imsi: u64, rnti: u16) -> Result<()> {
        self.log_message(">> Radio InitialUeMessage");
        self.state.add_ue(imsi, rnti);
        info!(self.logger, "IMSI {imsi} has rnti {rnti}");
        let cell_id = self.config.cell_id;
        self.log_message("<< S1ap InitialUeMessage");
        self.s1ap_to_mme(S1apMmeMessage::InitialUeMessage(InitialUeMessage {
            mme_ue_s1ap_id: imsi,
            gnb_ue_s1ap_id: rnti,
            imsi,
            cell_id,
        }));
        Ok(())
    }

    pub fn initial_context_setup_request(&mut self, r: InitialContextSetupRequest) -> Result<()> {
        self.log_message(">> S1ap InitialContextSetupRequest");
        let rnti = self.rnti_for_imsi(r.mme_ue_s1ap_id)?;
        for erab in r.erabs_to_be_setup.iter() {
            let flow = FlowId {
                rnti,
                qfi: erab.erab_id,
            };

            // The bearer goes in before the mapping so that nothing is routed to a flow that
            // the radio stack does not have.
            self.log_message("<< Radio SetupDataRadioBearer");
            if let Err(e) = self.setup_data_radio_bearer(rnti, erab.erab_id, &erab.qos, erab.sgw_teid)
            {
                warn!(self.logger, "Failed to set up bearer for {flow} - {e}");
                continue;
            }
            self.state.flows.insert(flow, erab.sgw_teid);
            info!(
                self.logger,
                "Flow {flow} uses TEID {} at SGW {}", erab.sgw_teid, erab.transport_layer_address
            );
        }
        self.log_message("<< Radio InitialContextSetupRequest");
        self.api.initial_context_setup_request(rnti);
        Ok(())
    }
}
