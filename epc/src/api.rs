use crate::data::UserplaneCounters;
use crate::s1ap::{S1apGnbMessage, S1apMmeMessage};
use anyhow::Result;
use gtp::{GTPC_PORT, GTPU_PORT, QosFlow};
use std::fmt;
use std::net::Ipv4Addr;
use std::sync::Arc;

/// A node's local endpoints.  Each interface is one UDP socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interface {
    S1u,
    S5u,
    S5c,
    S11,
}

impl Interface {
    pub fn port(&self) -> u16 {
        match self {
            Interface::S1u | Interface::S5u => GTPU_PORT,
            Interface::S5c | Interface::S11 => GTPC_PORT,
        }
    }
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Interface::S1u => "S1-U",
            Interface::S5u => "S5-U",
            Interface::S5c => "S5-C",
            Interface::S11 => "S11",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpVersion {
    V4,
    V6,
}

/// Datagram transmission.  Sending never blocks; the datagram is queued for delivery to
/// the interface's well known port at `destination`.
pub trait Transport {
    fn send(&self, interface: Interface, destination: Ipv4Addr, datagram: Vec<u8>);
}

/// Services needed by the gNB bridge, which sits between the radio stack and the core.
pub trait GnbApi: Transport {
    fn s1ap_to_mme(&self, message: S1apMmeMessage);

    /// Ask the radio stack to set up a data radio bearer for a flow.
    fn setup_data_radio_bearer(&self, rnti: u16, qfi: u8, qos: &QosFlow, teid: u32) -> Result<()>;

    /// Tell the radio stack that all of a UE's bearers are in place.
    fn initial_context_setup_request(&self, rnti: u16);

    fn path_switch_request_acknowledge(&self, rnti: u16);

    fn send_to_radio(&self, packet: Vec<u8>, rnti: u16, qfi: u8, ip_version: IpVersion);
}

/// Services needed by the MME.
pub trait MmeApi: Transport {
    fn s1ap_to_gnb(&self, cell_id: u32, message: S1apGnbMessage);
}

/// A node that processes datagrams arriving on its interfaces, one at a time and each to
/// completion.
pub trait DatagramHandler {
    fn handle_datagram(&mut self, interface: Interface, datagram: &[u8]) -> Result<()>;

    fn counters(&self) -> Arc<UserplaneCounters>;
}
