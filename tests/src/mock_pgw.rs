//! mock_pgw - a PGW that accepts everything and records user plane traffic

use crate::mock_radio::NodeHandle;
use anyhow::{Result, anyhow, bail};
use epc::{DatagramHandler, Interface, Transport, UserplaneCounters};
use gtp::{
    Cause, CreateSessionRequest, CreateSessionResponse, DeleteFlowCommand, DeleteFlowRequest,
    DeleteFlowResponse, Direction, FlowContext, Fteid, GtpcMessage, GtpcPdu, InterfaceType,
    ModifyFlowRequest, ModifyFlowResponse, QosRule,
};
use pnet_packet::Packet;
use pnet_packet::ipv4::Ipv4Packet;
use pnet_packet::udp::UdpPacket;
use slog::{Logger, info};
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;

struct Session {
    imsi: u64,
    sgw: Fteid,
    // S5-U TEID by QFI
    teids: HashMap<u8, u32>,
    rules: Vec<QosRule>,
}

pub struct MockPgw {
    api: NodeHandle,
    addr: Ipv4Addr,
    // Keyed by the SGW's S5-C TEID
    sessions: HashMap<u32, Session>,
    sequence_number: u32,
    uplink: Vec<(u32, Vec<u8>)>,
    delete_responses: Vec<DeleteFlowResponse>,
    modified: Vec<ModifyFlowRequest>,
    counters: Arc<UserplaneCounters>,
    logger: Logger,
}

impl MockPgw {
    pub fn new(addr: Ipv4Addr, api: NodeHandle, logger: Logger) -> Self {
        MockPgw {
            api,
            addr,
            sessions: HashMap::new(),
            sequence_number: 0,
            uplink: vec![],
            delete_responses: vec![],
            modified: vec![],
            counters: Arc::new(UserplaneCounters::default()),
            logger,
        }
    }

    /// S5-U TEID of a UE's flow.
    pub fn teid(&self, imsi: u64, qfi: u8) -> Option<u32> {
        self.session_for_imsi(imsi)
            .and_then(|(_, s)| s.teids.get(&qfi).copied())
    }

    /// Uplink packets received since the last call, with their TEIDs.
    pub fn take_uplink(&mut self) -> Vec<(u32, Vec<u8>)> {
        std::mem::take(&mut self.uplink)
    }

    pub fn take_delete_responses(&mut self) -> Vec<DeleteFlowResponse> {
        std::mem::take(&mut self.delete_responses)
    }

    pub fn take_modify_requests(&mut self) -> Vec<ModifyFlowRequest> {
        std::mem::take(&mut self.modified)
    }

    /// Tunnel a packet down to a UE's flow.
    pub fn send_downlink(&self, imsi: u64, qfi: u8, packet: &[u8]) -> Result<()> {
        let (_, session) = self
            .session_for_imsi(imsi)
            .ok_or_else(|| anyhow!("PGW has no session for IMSI {imsi}"))?;
        let teid = session
            .teids
            .get(&qfi)
            .ok_or_else(|| anyhow!("PGW has no flow {qfi} for IMSI {imsi}"))?;
        let datagram = gtp::encapsulate(*teid, packet)?;
        self.api.send(Interface::S5u, session.sgw.addr, datagram);
        Ok(())
    }

    /// Tunnel a UDP packet down to whichever of a UE's flows has the best matching QoS rule.
    /// Returns the QFI chosen.
    pub fn send_downlink_classified(&self, imsi: u64, packet: &[u8]) -> Result<u8> {
        let (_, session) = self
            .session_for_imsi(imsi)
            .ok_or_else(|| anyhow!("PGW has no session for IMSI {imsi}"))?;
        let ip = Ipv4Packet::new(packet).ok_or_else(|| anyhow!("Not an IPv4 packet"))?;
        let udp = UdpPacket::new(ip.payload()).ok_or_else(|| anyhow!("Not a UDP packet"))?;
        let type_of_service = ip.get_dscp() << 2 | ip.get_ecn();

        // Filters are written from the UE's point of view, so the server is the remote end.
        let qfi = session
            .rules
            .iter()
            .filter(|rule| session.teids.contains_key(&rule.qfi))
            .filter(|rule| {
                rule.matches(
                    Direction::Downlink,
                    ip.get_source(),
                    ip.get_destination(),
                    udp.get_source(),
                    udp.get_destination(),
                    type_of_service,
                )
            })
            .min_by_key(|rule| (rule.precedence, rule.qfi))
            .map(|rule| rule.qfi)
            .ok_or_else(|| anyhow!("No QoS rule of IMSI {imsi} matches the packet"))?;
        self.send_downlink(imsi, qfi, packet)?;
        Ok(qfi)
    }

    /// Start deletion of a UE's flows from the network side.
    pub fn delete_flows(&mut self, imsi: u64, qfis: Vec<u8>) -> Result<()> {
        let (teid, sgw) = self
            .session_for_imsi(imsi)
            .map(|(teid, s)| (teid, s.sgw))
            .ok_or_else(|| anyhow!("PGW has no session for IMSI {imsi}"))?;
        let sequence_number = self.next_sequence_number();
        self.send(sgw.addr, GtpcPdu::new(teid, sequence_number, DeleteFlowRequest { qfis }))
    }

    fn session_for_imsi(&self, imsi: u64) -> Option<(u32, &Session)> {
        self.sessions
            .iter()
            .find(|(_, s)| s.imsi == imsi)
            .map(|(teid, s)| (*teid, s))
    }

    fn next_sequence_number(&mut self) -> u32 {
        self.sequence_number += 1;
        self.sequence_number
    }

    fn send(&self, sgw_addr: Ipv4Addr, pdu: GtpcPdu) -> Result<()> {
        self.api.send(Interface::S5c, sgw_addr, pdu.encode()?);
        Ok(())
    }

    fn create_session(&mut self, sequence_number: u32, r: CreateSessionRequest) -> Result<()> {
        info!(self.logger, ">> Gtpc CreateSessionRequest for IMSI {}", r.imsi);
        let mut teids = HashMap::new();
        let mut rules = vec![];
        let flows: Vec<FlowContext> = r
            .flows
            .into_iter()
            .map(|f| {
                teids.insert(f.qfi, f.fteid.teid);
                rules.push(f.rule.clone());
                FlowContext {
                    fteid: Fteid::new(InterfaceType::S5PgwGtpu, self.addr, f.fteid.teid),
                    ..f
                }
            })
            .collect();
        self.sessions.insert(
            r.sender_fteid.teid,
            Session {
                imsi: r.imsi,
                sgw: r.sender_fteid,
                teids,
                rules,
            },
        );
        let response = CreateSessionResponse {
            cause: Cause::RequestAccepted,
            sender_fteid: Fteid::new(InterfaceType::S5PgwGtpc, self.addr, r.sender_fteid.teid),
            flows,
        };
        info!(self.logger, "<< Gtpc CreateSessionResponse");
        self.send(
            r.sender_fteid.addr,
            GtpcPdu::new(r.sender_fteid.teid, sequence_number, response),
        )
    }

    fn session(&self, teid: u32) -> Result<&Session> {
        self.sessions
            .get(&teid)
            .ok_or_else(|| anyhow!("PGW has no session with TEID {teid}"))
    }

    fn modify_flow(&mut self, teid: u32, sequence_number: u32, r: ModifyFlowRequest) -> Result<()> {
        info!(self.logger, ">> Gtpc ModifyFlowRequest for IMSI {}", r.imsi);
        let sgw = self.session(teid)?.sgw;
        self.modified.push(r);
        let response = ModifyFlowResponse {
            cause: Cause::RequestAccepted,
        };
        self.send(sgw.addr, GtpcPdu::new(teid, sequence_number, response))
    }

    fn delete_flow_command(&mut self, teid: u32, r: DeleteFlowCommand) -> Result<()> {
        info!(self.logger, ">> Gtpc DeleteFlowCommand for flows {:?}", r.qfis);
        let sgw = self.session(teid)?.sgw;
        let sequence_number = self.next_sequence_number();
        let request = DeleteFlowRequest { qfis: r.qfis };
        self.send(sgw.addr, GtpcPdu::new(teid, sequence_number, request))
    }

    fn delete_flow_response(&mut self, teid: u32, r: DeleteFlowResponse) -> Result<()> {
        info!(self.logger, ">> Gtpc DeleteFlowResponse for flows {:?}", r.qfis);
        let session = self
            .sessions
            .get_mut(&teid)
            .ok_or_else(|| anyhow!("PGW has no session with TEID {teid}"))?;
        for qfi in r.qfis.iter() {
            session.teids.remove(qfi);
        }
        self.delete_responses.push(r);
        Ok(())
    }
}

impl DatagramHandler for MockPgw {
    fn handle_datagram(&mut self, interface: Interface, datagram: &[u8]) -> Result<()> {
        match interface {
            Interface::S5c => {
                let GtpcPdu {
                    teid,
                    sequence_number,
                    message,
                } = GtpcPdu::decode(datagram)?;
                match message {
                    GtpcMessage::CreateSessionRequest(r) => self.create_session(sequence_number, r),
                    GtpcMessage::ModifyFlowRequest(r) => {
                        self.modify_flow(teid, sequence_number, r)
                    }
                    GtpcMessage::DeleteFlowCommand(r) => self.delete_flow_command(teid, r),
                    GtpcMessage::DeleteFlowResponse(r) => self.delete_flow_response(teid, r),
                    m => bail!("PGW does not handle {:?}", m.message_type()),
                }
            }
            Interface::S5u => {
                let (teid, inner) = gtp::decapsulate(datagram)?;
                self.uplink.push((teid, inner.to_vec()));
                Ok(())
            }
            _ => bail!("PGW has no {interface} interface"),
        }
    }

    fn counters(&self) -> Arc<UserplaneCounters> {
        self.counters.clone()
    }
}
