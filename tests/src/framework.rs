use crate::mock_radio::{Message, NodeHandle, RadioEvent, Wire};
use crate::{MockPgw, packets};
use anyhow::{Result, anyhow, bail};
use epc::{
    DatagramHandler, Gnb, GnbConfig, GnbEntry, Interface, Mme, MmeConfig, Sgw, SgwConfig,
};
use gtp::{GTPC_PORT, GTPU_PORT, PacketFilter, QosFlow, QosRule};
use slog::{Drain, Logger, debug, o};
use std::net::Ipv4Addr;

pub const MME_S11: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);
pub const SGW_S11: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 2);
pub const SGW_S1U: Ipv4Addr = Ipv4Addr::new(10, 0, 1, 2);
pub const SGW_S5: Ipv4Addr = Ipv4Addr::new(10, 0, 2, 2);
pub const PGW: Ipv4Addr = Ipv4Addr::new(10, 0, 2, 3);
pub const GNB_CELL_1: Ipv4Addr = Ipv4Addr::new(10, 0, 1, 10);
pub const GNB_CELL_2: Ipv4Addr = Ipv4Addr::new(10, 0, 1, 11);

const UE_ADDR: Ipv4Addr = Ipv4Addr::new(10, 255, 0, 2);
const SERVER_ADDR: Ipv4Addr = Ipv4Addr::new(192, 168, 7, 1);
const TEST_UDP_PORT: u16 = 23215;

/// An MME, an SGW, a PGW and a gNB in each of two cells, wired together in one thread.
/// Nothing moves until `run()` is called; it then delivers messages one at a time, each to
/// completion, until the network is quiet.
pub struct Network {
    pub mme: Mme<NodeHandle>,
    pub sgw: Sgw<NodeHandle>,
    pub pgw: MockPgw,
    gnbs: Vec<(Ipv4Addr, Gnb<NodeHandle>)>,
    wire: Wire,
    logger: Logger,
}

impl Network {
    pub fn new() -> Self {
        let logger = init_logging();
        let wire = Wire::default();

        let mut mme = Mme::new(
            MmeConfig {
                s11_addr: MME_S11,
                sgw_s11_addr: SGW_S11,
            },
            wire.handle(0),
            logger.new(o!("node" => "mme")),
        );
        let sgw = Sgw::new(
            SgwConfig {
                s11_addr: SGW_S11,
                s1u_addr: SGW_S1U,
                s5_addr: SGW_S5,
                pgw_addr: PGW,
                gnbs: vec![
                    GnbEntry {
                        cell_id: 1,
                        addr: GNB_CELL_1,
                    },
                    GnbEntry {
                        cell_id: 2,
                        addr: GNB_CELL_2,
                    },
                ],
            },
            wire.handle(0),
            logger.new(o!("node" => "sgw")),
        );
        let pgw = MockPgw::new(PGW, wire.handle(0), logger.new(o!("node" => "pgw")));
        let gnbs = [(1, GNB_CELL_1), (2, GNB_CELL_2)]
            .into_iter()
            .map(|(cell_id, s1u_addr)| {
                mme.add_gnb(cell_id);
                let gnb = Gnb::new(
                    GnbConfig {
                        cell_id,
                        s1u_addr,
                        sgw_s1u_addr: SGW_S1U,
                    },
                    wire.handle(cell_id),
                    logger.new(o!("node" => "gnb", "cell" => cell_id)),
                );
                (s1u_addr, gnb)
            })
            .collect();

        Network {
            mme,
            sgw,
            pgw,
            gnbs,
            wire,
            logger,
        }
    }

    pub fn gnb(&mut self, cell_id: u32) -> &mut Gnb<NodeHandle> {
        self.gnbs
            .iter_mut()
            .map(|(_, gnb)| gnb)
            .find(|gnb| gnb.cell_id() == cell_id)
            .unwrap_or_else(|| panic!("No gNB in cell {cell_id}"))
    }

    pub fn wire(&self) -> &Wire {
        &self.wire
    }

    /// Provision a UE at the MME with some default flows.  Returns their QFIs.
    pub fn provision(&mut self, imsi: u64, num_flows: usize) -> Result<Vec<u8>> {
        self.mme.add_ue(imsi)?;
        let mut qfis = vec![];
        for _ in 0..num_flows {
            let mut rule = QosRule::new(255, 0);
            rule.add(PacketFilter::default())?;
            qfis.push(self.mme.add_flow(imsi, rule, QosFlow::non_gbr(9))?);
        }
        Ok(qfis)
    }

    /// Attach a provisioned UE in a cell and let the network settle.
    pub fn attach(&mut self, imsi: u64, cell_id: u32, rnti: u16) -> Result<()> {
        self.gnb(cell_id).initial_ue_message(imsi, rnti)?;
        self.run()
    }

    /// Deliver everything in flight, including whatever is sent in response.
    pub fn run(&mut self) -> Result<()> {
        loop {
            let Some(message) = self.wire.outbox.borrow_mut().pop_front() else {
                return Ok(());
            };
            self.deliver(message)?;
            self.check_symmetry()?;
        }
    }

    /// Everything the gNBs have asked of the radio stack since the last call.
    pub fn take_radio_events(&self) -> Vec<RadioEvent> {
        self.wire.radio.take()
    }

    fn deliver(&mut self, message: Message) -> Result<()> {
        match message {
            Message::S1apToMme(m) => {
                debug!(self.logger, "S1AP to MME: {m:?}");
                self.mme.handle_s1ap(m)
            }
            Message::S1apToGnb(cell_id, m) => {
                debug!(self.logger, "S1AP to cell {cell_id}: {m:?}");
                self.gnb(cell_id).handle_s1ap(m)
            }
            Message::Datagram {
                interface,
                destination,
                datagram,
            } => {
                let (node, interface) = self.route(destination, interface.port())?;
                node.handle_datagram(interface, &datagram)
            }
        }
    }

    fn route(&mut self, addr: Ipv4Addr, port: u16) -> Result<(&mut dyn DatagramHandler, Interface)> {
        let gtpc = match port {
            GTPC_PORT => true,
            GTPU_PORT => false,
            _ => bail!("Nothing listens on port {port}"),
        };
        let routed: (&mut dyn DatagramHandler, Interface) = if addr == MME_S11 && gtpc {
            (&mut self.mme, Interface::S11)
        } else if addr == SGW_S11 && gtpc {
            (&mut self.sgw, Interface::S11)
        } else if addr == SGW_S1U && !gtpc {
            (&mut self.sgw, Interface::S1u)
        } else if addr == SGW_S5 {
            (&mut self.sgw, if gtpc { Interface::S5c } else { Interface::S5u })
        } else if addr == PGW {
            (&mut self.pgw, if gtpc { Interface::S5c } else { Interface::S5u })
        } else {
            let gnb = self
                .gnbs
                .iter_mut()
                .find(|(s1u_addr, _)| *s1u_addr == addr && !gtpc)
                .map(|(_, gnb)| gnb)
                .ok_or_else(|| anyhow!("Nothing at {addr}:{port}"))?;
            (gnb, Interface::S1u)
        };
        Ok(routed)
    }

    /// Every flow table must map the same pairs in both directions whenever the network is
    /// between messages.
    fn check_symmetry(&self) -> Result<()> {
        for (_, gnb) in self.gnbs.iter() {
            if !gnb.flow_table().is_consistent() {
                bail!("Flow table of cell {} is inconsistent", gnb.cell_id())
            }
        }
        Ok(())
    }
}

impl Default for Network {
    fn default() -> Self {
        Self::new()
    }
}

/// A packet from the UE to a server in the data network.
pub fn uplink_packet(data: &[u8]) -> Vec<u8> {
    packets::ipv4_udp(UE_ADDR, SERVER_ADDR, TEST_UDP_PORT, TEST_UDP_PORT, data)
}

/// A packet from the data network server to the UE.
pub fn downlink_packet(data: &[u8]) -> Vec<u8> {
    packets::ipv4_udp(SERVER_ADDR, UE_ADDR, TEST_UDP_PORT, TEST_UDP_PORT, data)
}

/// A packet to the UE from a given port on the data network server.
pub fn downlink_packet_from_port(port: u16, data: &[u8]) -> Vec<u8> {
    packets::ipv4_udp(SERVER_ADDR, UE_ADDR, port, TEST_UDP_PORT, data)
}

pub fn init_logging() -> Logger {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::CompactFormat::new(decorator).build();
    let drain = std::sync::Mutex::new(drain).fuse();
    let drain = slog_envlogger::new(drain);
    slog::Logger::root(drain, o!())
}
