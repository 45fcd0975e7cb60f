//! delete_flow - pass flow deletions between MME and PGW

use super::SgwProcedure;
use crate::Transport;
use anyhow::Result;
use derive_deref::{Deref, DerefMut};
use gtp::{Cause, DeleteFlowCommand, DeleteFlowRequest, DeleteFlowResponse, GtpcPdu};

#[derive(Deref, DerefMut)]
pub struct DeleteFlowProcedure<'a, A: Transport>(SgwProcedure<'a, A>);

impl<'a, A: Transport> DeleteFlowProcedure<'a, A> {
    pub fn new(inner: SgwProcedure<'a, A>) -> Self {
        DeleteFlowProcedure(inner)
    }

    // Delete Flow Procedure
    // 1.    Gtpc DeleteFlowCommand >> (from MME, only if gNB initiated)
    // 2.    Gtpc DeleteFlowCommand << (to PGW)
    // 3.    Gtpc DeleteFlowRequest >> (from PGW)
    // 4.    Gtpc DeleteFlowRequest << (to MME)
    // 5.    Gtpc DeleteFlowResponse >> (from MME)
    // 6.    Gtpc DeleteFlowResponse << (to PGW)
    pub fn command(&mut self, teid: u32, sequence_number: u32, r: DeleteFlowCommand) -> Result<()> {
        self.log_message(">> Gtpc DeleteFlowCommand");
        self.log_message("<< Gtpc DeleteFlowCommand");
        self.send_to_pgw(GtpcPdu::new(teid, sequence_number, r))
    }

    pub fn request(&mut self, teid: u32, sequence_number: u32, r: DeleteFlowRequest) -> Result<()> {
        self.log_message(">> Gtpc DeleteFlowRequest");
        let mme = self.mme_fteid(teid)?;
        self.log_message("<< Gtpc DeleteFlowRequest");
        self.send_to_mme(mme.addr, GtpcPdu::new(mme.teid, sequence_number, r))
    }

    pub fn response(
        &mut self,
        teid: u32,
        sequence_number: u32,
        r: DeleteFlowResponse,
    ) -> Result<()> {
        self.log_message(">> Gtpc DeleteFlowResponse");
        if r.cause == Cause::RequestAccepted {
            self.remove_flow_tunnels(teid, &r.qfis);
        }
        self.log_message("<< Gtpc DeleteFlowResponse");
        self.send_to_pgw(GtpcPdu::new(teid, sequence_number, r))
    }
}
