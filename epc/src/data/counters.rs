use atomic_counter::RelaxedCounter;

pub mod userplane_counter_indices {
    pub const RX_PKTS: usize = 0;
    pub const TX_PKTS: usize = 1;
    pub const DROP_BAD_GTPU: usize = 2;
    pub const DROP_UNKNOWN_TEID: usize = 3;
    pub const DROP_UNKNOWN_FLOW: usize = 4;
    pub const DROP_UNKNOWN_IP_VERSION: usize = 5;
    pub const NUM_COUNTERS: usize = 6;
}

/// Packet counters shared between a node and its stats task.  Indexed by the constants in
/// `userplane_counter_indices`; everything from `DROP_BAD_GTPU` onwards is a drop reason.
pub type UserplaneCounters = [RelaxedCounter; userplane_counter_indices::NUM_COUNTERS];
