use std::collections::HashMap;
use std::fmt;

/// A radio bearer: the UE's RNTI plus the QoS flow on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FlowId {
    pub rnti: u16,
    pub qfi: u8,
}

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rnti={} qfi={}", self.rnti, self.qfi)
    }
}

/// Bidirectional mapping between radio bearers and tunnel endpoint identifiers.  Every flow maps
/// to exactly one TEID and that TEID maps back to the same flow.
#[derive(Debug, Default)]
pub struct FlowTable {
    teid_by_flow: HashMap<u16, HashMap<u8, u32>>,
    flow_by_teid: HashMap<u32, FlowId>,
}

impl FlowTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `flow` to `teid`, displacing any mapping that either of them was part of.
    pub fn insert(&mut self, flow: FlowId, teid: u32) {
        self.remove_flow(flow);
        if let Some(previous) = self.flow_by_teid.remove(&teid) {
            self.remove_forward(previous);
        }
        self.teid_by_flow
            .entry(flow.rnti)
            .or_default()
            .insert(flow.qfi, teid);
        self.flow_by_teid.insert(teid, flow);
    }

    pub fn teid(&self, flow: FlowId) -> Option<u32> {
        self.teid_by_flow
            .get(&flow.rnti)
            .and_then(|flows| flows.get(&flow.qfi))
            .copied()
    }

    pub fn flow(&self, teid: u32) -> Option<FlowId> {
        self.flow_by_teid.get(&teid).copied()
    }

    /// Remove one flow, returning the TEID it was mapped to.
    pub fn remove_flow(&mut self, flow: FlowId) -> Option<u32> {
        let teid = self.remove_forward(flow)?;
        self.flow_by_teid.remove(&teid);
        Some(teid)
    }

    /// Remove every flow of a UE, returning the TEIDs that were freed.
    pub fn remove_ue(&mut self, rnti: u16) -> Vec<u32> {
        let Some(flows) = self.teid_by_flow.remove(&rnti) else {
            return vec![];
        };
        let mut teids: Vec<u32> = flows.into_values().collect();
        teids.sort_unstable();
        for teid in teids.iter() {
            self.flow_by_teid.remove(teid);
        }
        teids
    }

    pub fn len(&self) -> usize {
        self.flow_by_teid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flow_by_teid.is_empty()
    }

    /// Check that the two directions of the mapping agree.
    pub fn is_consistent(&self) -> bool {
        let forward_len: usize = self.teid_by_flow.values().map(HashMap::len).sum();
        forward_len == self.flow_by_teid.len()
            && self.teid_by_flow.values().all(|flows| !flows.is_empty())
            && self
                .flow_by_teid
                .iter()
                .all(|(teid, flow)| self.teid(*flow) == Some(*teid))
    }

    fn remove_forward(&mut self, flow: FlowId) -> Option<u32> {
        let flows = self.teid_by_flow.get_mut(&flow.rnti)?;
        let teid = flows.remove(&flow.qfi);
        if flows.is_empty() {
            self.teid_by_flow.remove(&flow.rnti);
        }
        teid
    }
}
