use anyhow::{Result, bail};
use gtp::{QosFlow, QosRule};

/// Number of flows a UE can have provisioned.  Flows are identified by QFIs 1 to 64.
pub const MAX_FLOWS_PER_UE: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedFlow {
    pub rule: QosRule,
    pub qos: QosFlow,
}

/// The MME's view of a subscriber.
#[derive(Debug)]
pub struct UeContext {
    pub imsi: u64,

    // The RNTI that the serving gNB knows the UE by.
    pub gnb_ue_s1ap_id: u16,

    // Cell of the serving gNB.
    pub cell_id: u32,

    pub attached: bool,

    flows: Vec<Option<ProvisionedFlow>>,
}

impl UeContext {
    pub fn new(imsi: u64) -> Self {
        UeContext {
            imsi,
            gnb_ue_s1ap_id: 0,
            cell_id: 0,
            attached: false,
            flows: vec![None; MAX_FLOWS_PER_UE],
        }
    }

    /// The control plane TEID that the MME and SGW use for this UE on S11 and S5-C.
    pub fn s11_teid(&self) -> u32 {
        self.imsi as u32
    }

    /// Provision a flow in the lowest free slot.  The rule's QFI is overwritten with the slot's
    /// QFI, which is returned.
    pub fn add_flow(&mut self, mut rule: QosRule, qos: QosFlow) -> Result<u8> {
        let Some(index) = self.flows.iter().position(Option::is_none) else {
            bail!(
                "IMSI {} already has the maximum of {MAX_FLOWS_PER_UE} flows",
                self.imsi
            )
        };
        let qfi = index as u8 + 1;
        rule.qfi = qfi;
        self.flows[index] = Some(ProvisionedFlow { rule, qos });
        Ok(qfi)
    }

    pub fn remove_flow(&mut self, qfi: u8) -> bool {
        self.slot(qfi).and_then(Option::take).is_some()
    }

    pub fn flow(&self, qfi: u8) -> Option<&ProvisionedFlow> {
        let index = (qfi as usize).checked_sub(1)?;
        self.flows.get(index)?.as_ref()
    }

    /// Provisioned flows in QFI order.
    pub fn flows(&self) -> impl Iterator<Item = (u8, &ProvisionedFlow)> {
        self.flows
            .iter()
            .enumerate()
            .filter_map(|(index, f)| f.as_ref().map(|f| (index as u8 + 1, f)))
    }

    fn slot(&mut self, qfi: u8) -> Option<&mut Option<ProvisionedFlow>> {
        let index = (qfi as usize).checked_sub(1)?;
        self.flows.get_mut(index)
    }
}
