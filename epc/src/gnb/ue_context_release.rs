//! ue_context_release - the radio stack has let go of a UE

use super::GnbProcedure;
use crate::{GnbApi, S1apMmeMessage, UeContextReleaseIndication};
use anyhow::Result;
use derive_deref::{Deref, DerefMut};
use slog::info;

#[derive(Deref, DerefMut)]
pub struct UeContextReleaseProcedure<'a, A: GnbApi>(GnbProcedure<'a, A>);

impl<'a, A: GnbApi> UeContextReleaseProcedure<'a, A> {
    pub fn new(inner: GnbProcedure<'a, A>) -> Self {
        UeContextReleaseProcedure(inner)
    }

    // UE Context Release Procedure
    // 1.    Radio UeContextRelease >>
    // 2.    S1ap UeContextReleaseIndication << (if the UE was known)
    pub fn run(&mut self, rnti: u16) -> Result<()> {
        self.log_message(">> Radio UeContextRelease");
        let teids = self.state.flows.remove_ue(rnti);
        if !teids.is_empty() {
            info!(self.logger, "Removed flows of rnti {rnti} with TEIDs {teids:?}");
        }

        let Some(imsi) = self.state.remove_ue(rnti) else {
            return Ok(());
        };
        let cell_id = self.config.cell_id;
        self.log_message("<< S1ap UeContextReleaseIndication");
        self.s1ap_to_mme(S1apMmeMessage::UeContextReleaseIndication(
            UeContextReleaseIndication {
                mme_ue_s1ap_id: imsi,
                gnb_ue_s1ap_id: rnti,
                cell_id,
            },
        ));
        Ok(())
    }
}
