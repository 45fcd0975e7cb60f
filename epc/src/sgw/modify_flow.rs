//! modify_flow - redirect downlink tunnels to the gNB a UE has been handed over to

use super::SgwProcedure;
use crate::Transport;
use anyhow::{Result, anyhow, ensure};
use derive_deref::{Deref, DerefMut};
use gtp::{FlowToBeModified, Fteid, GtpcPdu, InterfaceType, ModifyFlowRequest, ModifyFlowResponse};
use slog::info;

#[derive(Deref, DerefMut)]
pub struct ModifyFlowProcedure<'a, A: Transport>(SgwProcedure<'a, A>);

impl<'a, A: Transport> ModifyFlowProcedure<'a, A> {
    pub fn new(inner: SgwProcedure<'a, A>) -> Self {
        ModifyFlowProcedure(inner)
    }

    // Modify Flow Procedure
    // 1.    Gtpc ModifyFlowRequest >> (from MME)
    // 2.    Gtpc ModifyFlowRequest << (to PGW)
    // 3.    Gtpc ModifyFlowResponse >> (from PGW)
    // 4.    Gtpc ModifyFlowResponse << (to MME)
    pub fn request(&mut self, teid: u32, sequence_number: u32, r: ModifyFlowRequest) -> Result<()> {
        self.log_message(">> Gtpc ModifyFlowRequest");
        let gnb_addr = self.gnb_for_cell(r.cell_id)?;
        let s5_addr = self.config.s5_addr;

        // Check every flow before redirecting any of them.
        let s5c_teid = r.imsi as u32;
        let session = self
            .state
            .flow_teids_by_session
            .get(&s5c_teid)
            .ok_or_else(|| anyhow!("could not find any session for IMSI {}", r.imsi))?;
        for f in r.flows.iter() {
            ensure!(
                f.fteid.interface_type == InterfaceType::S1uGnbGtpu,
                "ModifyFlowRequest for IMSI {} flow {} has F-TEID of type {:?}",
                r.imsi,
                f.qfi,
                f.fteid.interface_type
            );
            ensure!(
                session.values().any(|teid| *teid == f.fteid.teid),
                "could not find any flow of IMSI {} with TEID {}",
                r.imsi,
                f.fteid.teid
            );
        }

        let mut flows = Vec::with_capacity(r.flows.len());
        for f in r.flows.iter() {
            self.state.gnb_by_teid.insert(f.fteid.teid, gnb_addr);
            info!(
                self.logger,
                "Downlink TEID {} of IMSI {} now goes to gNB {gnb_addr}", f.fteid.teid, r.imsi
            );
            flows.push(FlowToBeModified {
                qfi: f.qfi,
                fteid: Fteid::new(InterfaceType::S5SgwGtpu, s5_addr, f.fteid.teid),
            });
        }

        let request = ModifyFlowRequest {
            imsi: r.imsi,
            cell_id: r.cell_id,
            flows,
        };
        self.log_message("<< Gtpc ModifyFlowRequest");
        self.send_to_pgw(GtpcPdu::new(teid, sequence_number, request))
    }

    pub fn response(
        &mut self,
        teid: u32,
        sequence_number: u32,
        r: ModifyFlowResponse,
    ) -> Result<()> {
        self.log_message(">> Gtpc ModifyFlowResponse");
        let mme = self.mme_fteid(teid)?;
        self.log_message("<< Gtpc ModifyFlowResponse");
        self.send_to_mme(mme.addr, GtpcPdu::new(mme.teid, sequence_number, r))
    }
}
