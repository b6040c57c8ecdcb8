use std::net::IpAddr;
use bytes::Bytes;
use pnet::packet::{Packet as PacketExt, PacketSize};
use pnet::packet::ethernet::{EthernetPacket, EtherTypes};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::Ipv4Packet;
use pnet::packet::tcp::TcpPacket;
use pnet::packet::vlan::VlanPacket;
use crate::flow::Host;
use super::Captured;

pub fn decode(target: IpAddr, data: &[u8]) -> Option<Captured> {
    let eth = EthernetPacket::new(data)?;

    let mut ethertype = eth.get_ethertype();
    let mut payload   = eth.payload();

    while ethertype == EtherTypes::Vlan {
        let pkt = VlanPacket::new(payload)?;
        ethertype = pkt.get_ethertype();
        payload   = &payload[pkt.packet_size()..];
    }

    if ethertype != EtherTypes::Ipv4 {
        return None;
    }

    let ip = Ipv4Packet::new(payload)?;
    if ip.get_next_level_protocol() != IpNextHeaderProtocols::Tcp {
        return None;
    }

    let ihl     = ip.get_header_length() as usize * 4;
    let segment = payload.get(ihl..)?;
    let tcp     = TcpPacket::new(segment)?;
    let doff    = tcp.get_data_offset() as usize * 4;

    let len  = (ip.get_total_length() as usize).saturating_sub(ihl + doff);
    let body = segment.get(doff..)?;
    let body = &body[..len.min(body.len())];

    let src = Host::new(IpAddr::V4(ip.get_source()),      tcp.get_source());
    let dst = Host::new(IpAddr::V4(ip.get_destination()), tcp.get_destination());

    Some(Captured {
        payload:  Bytes::copy_from_slice(body),
        outgoing: dst.addr == target,
        src:      src,
        dst:      dst,
    })
}
