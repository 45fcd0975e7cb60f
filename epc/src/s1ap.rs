//! s1ap - the S1AP-style primitives exchanged between gNB and MME
//!
//! These are passed as values by whatever links the two nodes; they have no wire encoding.
//! The MME UE S1AP ID is always the IMSI and the gNB UE S1AP ID is always the RNTI.

use gtp::QosFlow;
use std::net::Ipv4Addr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErabToBeSetupItem {
    pub erab_id: u8,
    pub qos: QosFlow,
    pub transport_layer_address: Ipv4Addr,
    pub sgw_teid: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErabSwitchedInDownlinkItem {
    pub erab_id: u8,
    pub gnb_transport_layer_address: Ipv4Addr,
    pub gnb_teid: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitialUeMessage {
    pub mme_ue_s1ap_id: u64,
    pub gnb_ue_s1ap_id: u16,
    pub imsi: u64,
    pub cell_id: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSwitchRequest {
    pub mme_ue_s1ap_id: u64,
    pub gnb_ue_s1ap_id: u16,
    pub cell_id: u32,
    pub erabs_switched_in_downlink: Vec<ErabSwitchedInDownlinkItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErabReleaseIndication {
    pub mme_ue_s1ap_id: u64,
    pub gnb_ue_s1ap_id: u16,
    pub erabs_to_be_released: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UeContextReleaseIndication {
    pub mme_ue_s1ap_id: u64,
    pub gnb_ue_s1ap_id: u16,
    pub cell_id: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitialContextSetupRequest {
    pub mme_ue_s1ap_id: u64,
    pub gnb_ue_s1ap_id: u16,
    pub erabs_to_be_setup: Vec<ErabToBeSetupItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSwitchRequestAcknowledge {
    pub mme_ue_s1ap_id: u64,
    pub gnb_ue_s1ap_id: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErabReleaseCommand {
    pub mme_ue_s1ap_id: u64,
    pub gnb_ue_s1ap_id: u16,
    pub erabs_to_be_released: Vec<u8>,
}

/// gNB -> MME
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum S1apMmeMessage {
    InitialUeMessage(InitialUeMessage),
    PathSwitchRequest(PathSwitchRequest),
    ErabReleaseIndication(ErabReleaseIndication),
    UeContextReleaseIndication(UeContextReleaseIndication),
}

/// MME -> gNB
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum S1apGnbMessage {
    InitialContextSetupRequest(InitialContextSetupRequest),
    PathSwitchRequestAcknowledge(PathSwitchRequestAcknowledge),
    ErabReleaseCommand(ErabReleaseCommand),
}
