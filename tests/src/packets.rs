//! packets - small inner IP packets for user plane tests

use pnet_packet::ip::IpNextHeaderProtocols;
use pnet_packet::ipv4::{self, MutableIpv4Packet};
use pnet_packet::udp::{self, MutableUdpPacket};
use std::net::Ipv4Addr;

const IPV4_HEADER_LEN: usize = 20;
const UDP_HEADER_LEN: usize = 8;

/// An IPv4 UDP packet with valid checksums.
pub fn ipv4_udp(src: Ipv4Addr, dst: Ipv4Addr, src_port: u16, dst_port: u16, data: &[u8]) -> Vec<u8> {
    let udp_len = UDP_HEADER_LEN + data.len();
    let mut packet = vec![0u8; IPV4_HEADER_LEN + udp_len];

    {
        let mut udp_packet = MutableUdpPacket::new(&mut packet[IPV4_HEADER_LEN..]).unwrap();
        udp_packet.set_source(src_port);
        udp_packet.set_destination(dst_port);
        udp_packet.set_length(udp_len as u16);
        udp_packet.set_payload(data);
        let checksum = udp::ipv4_checksum(&udp_packet.to_immutable(), &src, &dst);
        udp_packet.set_checksum(checksum);
    }

    let mut ipv4_packet = MutableIpv4Packet::new(&mut packet).unwrap();
    ipv4_packet.set_version(4);
    ipv4_packet.set_header_length(5);
    ipv4_packet.set_total_length((IPV4_HEADER_LEN + udp_len) as u16);
    ipv4_packet.set_ttl(64);
    ipv4_packet.set_next_level_protocol(IpNextHeaderProtocols::Udp);
    ipv4_packet.set_source(src);
    ipv4_packet.set_destination(dst);
    let checksum = ipv4::checksum(&ipv4_packet.to_immutable());
    ipv4_packet.set_checksum(checksum);

    packet
}

/// Enough of an IPv6 packet for the version nibble to be read.
pub fn ipv6_stub(data: &[u8]) -> Vec<u8> {
    let mut packet = vec![0x60, 0, 0, 0];
    packet.extend_from_slice(&(data.len() as u16).to_be_bytes());
    packet.extend_from_slice(&[17, 64]);
    packet.extend_from_slice(&[0; 32]);
    packet.extend_from_slice(data);
    packet
}
