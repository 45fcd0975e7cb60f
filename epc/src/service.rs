//! service - runs a node against real UDP sockets
//!
//! Each interface gets its own socket and receive task.  The receive tasks feed a single queue
//! that one node task drains, so the node sees one datagram at a time and handles it to
//! completion before the next.  Outgoing datagrams are queued to a sender task.

use crate::data::UserplaneCounters;
use crate::data::userplane_counter_indices::*;
use crate::{DatagramHandler, Interface, Transport};
use anyhow::{Context, Result};
use async_channel::{Receiver, Sender};
use async_std::net::UdpSocket;
use async_std::task::{self, JoinHandle};
use atomic_counter::AtomicCounter;
use slog::{Logger, error, info, warn};
use socket2::{Domain, Protocol, Socket, Type};
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use stop_token::prelude::*;
use stop_token::{StopSource, StopToken};

const MAX_DATAGRAM_LEN: usize = 65535;

struct Incoming {
    interface: Interface,
    datagram: Vec<u8>,
}

struct Outgoing {
    interface: Interface,
    destination: Ipv4Addr,
    datagram: Vec<u8>,
}

/// Transport that hands datagrams to the service's sender task.
#[derive(Clone)]
pub struct UdpTransport(Sender<Outgoing>);

impl Transport for UdpTransport {
    fn send(&self, interface: Interface, destination: Ipv4Addr, datagram: Vec<u8>) {
        // The queue is unbounded, so this only fails once the service is shutting down.
        let _ = self.0.try_send(Outgoing {
            interface,
            destination,
            datagram,
        });
    }
}

pub struct NodeService {
    stop_source: StopSource,
    node_task: JoinHandle<Result<()>>,
    other_tasks: Vec<JoinHandle<()>>,
    stopped: Receiver<()>,
    logger: Logger,
}

impl NodeService {
    /// Bind a socket for each of the given interfaces, build the node with a transport that
    /// sends from those sockets, and start running it.
    pub fn start<N, F>(
        interfaces: &[(Interface, Ipv4Addr)],
        build_node: F,
        logger: Logger,
    ) -> Result<Self>
    where
        N: DatagramHandler + Send + 'static,
        F: FnOnce(UdpTransport) -> N,
    {
        let mut sockets = HashMap::new();
        for (interface, local_ip) in interfaces.iter() {
            let socket = create_udp_socket(*interface, *local_ip, &logger)?;
            sockets.insert(*interface, Arc::new(UdpSocket::from(socket)));
        }

        let (outgoing_sender, outgoing_receiver) = async_channel::unbounded();
        let (incoming_sender, incoming_receiver) = async_channel::unbounded();
        let (stopped_sender, stopped) = async_channel::bounded(1);
        let node = build_node(UdpTransport(outgoing_sender));
        let counters = node.counters();
        let stop_source = StopSource::new();

        let mut other_tasks = vec![];
        for (interface, socket) in sockets.iter() {
            other_tasks.push(task::spawn(receive_datagrams(
                *interface,
                socket.clone(),
                incoming_sender.clone(),
                stop_source.token(),
                logger.clone(),
            )));
        }
        other_tasks.push(task::spawn(send_datagrams(
            sockets,
            outgoing_receiver,
            stop_source.token(),
            logger.clone(),
        )));
        other_tasks.push(task::spawn(dump_stats(
            counters,
            stop_source.token(),
            logger.clone(),
        )));
        let node_task = task::spawn(run_node(
            node,
            incoming_receiver,
            stopped_sender,
            stop_source.token(),
            logger.clone(),
        ));

        Ok(NodeService {
            stop_source,
            node_task,
            other_tasks,
            stopped,
            logger,
        })
    }

    /// A receiver that closes when the node stops, either because of shutdown or because it
    /// failed to handle a datagram.
    pub fn stopped(&self) -> Receiver<()> {
        self.stopped.clone()
    }

    /// Stop all tasks.  Returns the error that stopped the node, if there was one.
    pub async fn graceful_shutdown(self) -> Result<()> {
        let NodeService {
            stop_source,
            node_task,
            other_tasks,
            logger,
            ..
        } = self;
        info!(&logger, "Shutting down");
        drop(stop_source);
        for t in other_tasks.into_iter() {
            t.await;
        }
        node_task.await
    }
}

fn create_udp_socket(
    interface: Interface,
    local_ip: Ipv4Addr,
    logger: &Logger,
) -> Result<std::net::UdpSocket> {
    let transport_address = SocketAddr::new(IpAddr::V4(local_ip), interface.port());
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_port(true)?;
    socket
        .bind(&transport_address.into())
        .context(format!("Failed to bind {}", transport_address))?;
    info!(logger, "Serving {interface} on {transport_address}");
    Ok(socket.into())
}

async fn run_node<N: DatagramHandler>(
    mut node: N,
    incoming: Receiver<Incoming>,
    _stopped: Sender<()>,
    stop_token: StopToken,
    logger: Logger,
) -> Result<()> {
    while let Ok(Ok(Incoming {
        interface,
        datagram,
    })) = incoming.recv().timeout_at(stop_token.clone()).await
    {
        node.handle_datagram(interface, &datagram)
            .inspect_err(|e| error!(logger, "Stopping - failed to handle datagram on {interface}: {e:#}"))?;
    }
    Ok(())
}

async fn receive_datagrams(
    interface: Interface,
    socket: Arc<UdpSocket>,
    incoming: Sender<Incoming>,
    stop_token: StopToken,
    logger: Logger,
) {
    let mut buf = vec![0u8; MAX_DATAGRAM_LEN];
    loop {
        let (len, _peer) = match socket.recv_from(&mut buf).timeout_at(stop_token.clone()).await {
            Ok(Ok(x)) => x,
            Ok(Err(e)) => {
                warn!(logger, "Stop receiving on {interface} - {e}");
                return;
            }
            Err(_) => return,
        };
        let datagram = buf[..len].to_vec();
        if incoming.send(Incoming { interface, datagram }).await.is_err() {
            return;
        }
    }
}

async fn send_datagrams(
    sockets: HashMap<Interface, Arc<UdpSocket>>,
    outgoing: Receiver<Outgoing>,
    stop_token: StopToken,
    logger: Logger,
) {
    while let Ok(Ok(o)) = outgoing.recv().timeout_at(stop_token.clone()).await {
        let Some(socket) = sockets.get(&o.interface) else {
            warn!(
                logger,
                "Drop datagram for {} - no {} interface", o.destination, o.interface
            );
            continue;
        };
        if let Err(e) = socket
            .send_to(&o.datagram, (o.destination, o.interface.port()))
            .await
        {
            warn!(
                logger,
                "Failed to send to {}:{} - {e}",
                o.destination,
                o.interface.port()
            );
        }
    }
}

async fn dump_stats(counters: Arc<UserplaneCounters>, stop_token: StopToken, logger: Logger) {
    let mut last = [0usize; NUM_COUNTERS];
    while task::sleep(Duration::new(5, 0))
        .timeout_at(stop_token.clone())
        .await
        .is_ok()
    {
        if counters[RX_PKTS].get() != last[RX_PKTS] {
            last[RX_PKTS] = counters[RX_PKTS].get();
            last[TX_PKTS] = counters[TX_PKTS].get();
            info!(&logger, "Userplane rx={} tx={}", last[RX_PKTS], last[TX_PKTS]);
        }

        let mut warn_needed = false;
        for idx in DROP_BAD_GTPU..NUM_COUNTERS {
            if last[idx] != counters[idx].get() {
                warn_needed = true;
            }
            last[idx] = counters[idx].get();
        }
        if warn_needed {
            warn!(
                &logger,
                "Userplane DROPS bad_gtpu={} unknown_teid={} unknown_flow={} ip_version={}",
                last[DROP_BAD_GTPU],
                last[DROP_UNKNOWN_TEID],
                last[DROP_UNKNOWN_FLOW],
                last[DROP_UNKNOWN_IP_VERSION]
            );
        }
    }
}
