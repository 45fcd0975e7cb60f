//! ue_context_release - a gNB has let go of a UE, so it no longer counts as attached

use super::MmeProcedure;
use crate::{MmeApi, UeContextReleaseIndication};
use anyhow::Result;
use derive_deref::{Deref, DerefMut};
use slog::{debug, info};

#[derive(Deref, DerefMut)]
pub struct UeContextReleaseProcedure<'a, A: MmeApi>(MmeProcedure<'a, A>);

impl<'a, A: MmeApi> UeContextReleaseProcedure<'a, A> {
    pub fn new(inner: MmeProcedure<'a, A>) -> Self {
        UeContextReleaseProcedure(inner)
    }

    pub fn run(&mut self, r: UeContextReleaseIndication) -> Result<()> {
        self.log_message(">> S1ap UeContextReleaseIndication");
        let imsi = r.mme_ue_s1ap_id;
        let ue = self.ue_mut(imsi)?;

        // After a handover the source gNB releases its copy of the context.  That must not
        // detach the UE from its new cell.
        if !ue.attached || ue.cell_id != r.cell_id {
            let current_cell_id = ue.cell_id;
            debug!(
                self.logger,
                "Ignore release of IMSI {imsi} by cell {} - UE is served by cell {current_cell_id}",
                r.cell_id
            );
            return Ok(());
        }
        ue.attached = false;
        ue.cell_id = 0;
        ue.gnb_ue_s1ap_id = 0;
        info!(self.logger, "IMSI {imsi} detached");
        Ok(())
    }
}
