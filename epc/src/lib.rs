mod api;
mod data;
mod gnb;
mod mme;
mod procedure;
mod s1ap;
mod service;
mod sgw;

use procedure::Procedure;

pub use api::*;
pub use data::*;
pub use gnb::{FlowToBeSwitched, Gnb, PathSwitchParameters};
pub use mme::Mme;
pub use s1ap::*;
pub use service::{NodeService, UdpTransport};
pub use sgw::Sgw;
