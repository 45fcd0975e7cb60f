//! create_session - set up the S5 leg of a UE's tunnels and relay the PGW's answer to the MME

use super::SgwProcedure;
use crate::Transport;
use anyhow::{Result, ensure};
use derive_deref::{Deref, DerefMut};
use gtp::{
    CreateSessionRequest, CreateSessionResponse, FlowContext, Fteid, GtpcPdu, InterfaceType,
};
use slog::info;
use std::collections::HashMap;

#[derive(Deref, DerefMut)]
pub struct CreateSessionProcedure<'a, A: Transport>(SgwProcedure<'a, A>);

impl<'a, A: Transport> CreateSessionProcedure<'a, A> {
    pub fn new(inner: SgwProcedure<'a, A>) -> Self {
        CreateSessionProcedure(inner)
    }

    // Create Session Procedure
    // 1.    Gtpc CreateSessionRequest >> (from MME)
    // 2.    Gtpc CreateSessionRequest << (to PGW)
    // 3.    Gtpc CreateSessionResponse >> (from PGW)
    // 4.    Gtpc CreateSessionResponse << (to MME)
    pub fn request(&mut self, sequence_number: u32, r: CreateSessionRequest) -> Result<()> {
        self.log_message(">> Gtpc CreateSessionRequest");
        ensure!(
            r.sender_fteid.interface_type == InterfaceType::S11MmeGtpc,
            "CreateSessionRequest for IMSI {} has sender F-TEID of type {:?}",
            r.imsi,
            r.sender_fteid.interface_type
        );
        let gnb_addr = self.gnb_for_cell(r.cell_id)?;
        let s5_addr = self.config.s5_addr;

        let s5c_teid = r.imsi as u32;
        let stale = self.remove_session_tunnels(s5c_teid);
        if stale > 0 {
            info!(
                self.logger,
                "Removed {stale} tunnels of previous session of IMSI {}", r.imsi
            );
        }
        self.state.mme_fteid_by_teid.insert(s5c_teid, r.sender_fteid);

        let mut flows = Vec::with_capacity(r.flows.len());
        let mut flow_teids = HashMap::with_capacity(r.flows.len());
        for f in r.flows.into_iter() {
            let teid = self.state.teids.allocate()?;
            flow_teids.insert(f.qfi, teid);
            info!(
                self.logger,
                "Allocated TEID {teid} for flow {} of IMSI {} via gNB {gnb_addr}", f.qfi, r.imsi
            );
            flows.push(FlowContext {
                fteid: Fteid::new(InterfaceType::S5SgwGtpu, s5_addr, teid),
                ..f
            });
        }

        for teid in flow_teids.values() {
            self.state.gnb_by_teid.insert(*teid, gnb_addr);
        }
        self.state
            .flow_teids_by_session
            .insert(s5c_teid, flow_teids);

        let request = CreateSessionRequest {
            imsi: r.imsi,
            cell_id: r.cell_id,
            sender_fteid: Fteid::new(InterfaceType::S5SgwGtpc, s5_addr, s5c_teid),
            flows,
        };
        self.log_message("<< Gtpc CreateSessionRequest");
        self.send_to_pgw(GtpcPdu::new(0, sequence_number, request))
    }

    pub fn response(
        &mut self,
        teid: u32,
        sequence_number: u32,
        r: CreateSessionResponse,
    ) -> Result<()> {
        self.log_message(">> Gtpc CreateSessionResponse");
        ensure!(
            r.sender_fteid.interface_type == InterfaceType::S5PgwGtpc,
            "CreateSessionResponse on TEID {teid} has sender F-TEID of type {:?}",
            r.sender_fteid.interface_type
        );
        let mme = self.mme_fteid(teid)?;
        let s1u_addr = self.config.s1u_addr;

        // The gNB sends uplink to the SGW with the same TEID that the PGW expects.
        let flows = r
            .flows
            .into_iter()
            .map(|f| FlowContext {
                fteid: Fteid::new(InterfaceType::S1uSgwGtpu, s1u_addr, f.fteid.teid),
                ..f
            })
            .collect();
        let response = CreateSessionResponse {
            cause: r.cause,
            sender_fteid: Fteid::new(InterfaceType::S11SgwGtpc, self.config.s11_addr, teid),
            flows,
        };
        self.log_message("<< Gtpc CreateSessionResponse");
        self.send_to_mme(mme.addr, GtpcPdu::new(mme.teid, sequence_number, response))
    }
}
