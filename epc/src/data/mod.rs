mod config;
mod counters;
mod flow_table;
mod teid;
mod ue_context;

pub use config::*;
pub use counters::*;
pub use flow_table::*;
pub use teid::*;
pub use ue_context::*;
