//! Frame decoding: raw bytes to an ordered stack of layers
//!
//! The walk runs outer-to-inner (link, network, transport, payload) and
//! never fails: anything truncated or unrecognized at any depth becomes a
//! raw payload-only layer and the walk stops there.

use wiretap_core::{Layer, RawFrame, Record};

use crate::arp::ArpPacket;
use crate::ethernet::{EtherType, EthernetHeader, VlanTag};
use crate::ip::{protocol_name, Ipv4Header, Ipv6Header};
use crate::transport::{IcmpHeader, TcpHeader, UdpHeader};

/// Decode one captured frame into a record
///
/// Pure and infallible; decoding degradation shows up as a trailing
/// "Raw" layer, never as an error.
pub fn decode(frame: &RawFrame) -> Record {
    let mut layers = Vec::with_capacity(4);
    decode_link(&frame.data, &mut layers);

    Record {
        device_index: frame.device_index,
        timestamp: frame.timestamp,
        length: frame.wire_length,
        capture_length: frame.captured_length,
        layers,
    }
}

fn decode_link(data: &[u8], layers: &mut Vec<Layer>) {
    let Some((eth, rest)) = EthernetHeader::parse(data) else {
        if !data.is_empty() {
            layers.push(Layer::raw(data));
        }
        return;
    };

    let mut layer = Layer::new("Ethernet");
    layer.src = eth.source.to_string();
    layer.dst = eth.destination.to_string();
    layer.field("SrcMAC", &eth.source);
    layer.field("DstMAC", &eth.destination);
    layer.field("EthernetType", eth.ethertype);
    layer.payload = rest.to_vec();
    layers.push(layer);

    decode_network(eth.ethertype, rest, layers);
}

fn decode_network(ethertype: EtherType, data: &[u8], layers: &mut Vec<Layer>) {
    match ethertype {
        EtherType::IPv4 => decode_ipv4(data, layers),
        EtherType::IPv6 => decode_ipv6(data, layers),
        EtherType::ARP => decode_arp(data, layers),
        EtherType::VLAN => decode_vlan(data, layers),
        EtherType::LLC | EtherType::Custom(_) => {
            if !data.is_empty() {
                layers.push(Layer::raw(data));
            }
        }
    }
}

fn decode_vlan(data: &[u8], layers: &mut Vec<Layer>) {
    let Some((tag, rest)) = VlanTag::parse(data) else {
        if !data.is_empty() {
            layers.push(Layer::raw(data));
        }
        return;
    };

    let mut layer = Layer::new("Dot1Q");
    layer.field("Priority", tag.priority);
    layer.field("VLANIdentifier", tag.vlan_id);
    layer.field("Type", tag.ethertype);
    layer.payload = rest.to_vec();
    layers.push(layer);

    decode_network(tag.ethertype, rest, layers);
}

fn decode_ipv4(data: &[u8], layers: &mut Vec<Layer>) {
    let Some((ip, rest)) = Ipv4Header::parse(data) else {
        if !data.is_empty() {
            layers.push(Layer::raw(data));
        }
        return;
    };

    let mut layer = Layer::new("IPv4");
    layer.src = ip.source.to_string();
    layer.dst = ip.destination.to_string();
    layer.field("Version", ip.version);
    layer.field("IHL", ip.header_length / 4);
    layer.field("TOS", ip.tos);
    layer.field("Length", ip.total_length);
    layer.field("Id", ip.identification);
    layer.field("Flags", ip.flags);
    layer.field("FragOffset", ip.fragment_offset);
    layer.field("TTL", ip.ttl);
    layer.field("Protocol", protocol_name(ip.protocol));
    layer.field("Checksum", ip.checksum);
    layer.field("SrcIP", &ip.source);
    layer.field("DstIP", &ip.destination);
    layer.payload = rest.to_vec();
    layers.push(layer);

    decode_transport(ip.protocol, rest, layers);
}

fn decode_ipv6(data: &[u8], layers: &mut Vec<Layer>) {
    let Some((ip, rest)) = Ipv6Header::parse(data) else {
        if !data.is_empty() {
            layers.push(Layer::raw(data));
        }
        return;
    };

    let mut layer = Layer::new("IPv6");
    layer.src = ip.source.to_string();
    layer.dst = ip.destination.to_string();
    layer.field("Version", ip.version);
    layer.field("TrafficClass", ip.traffic_class);
    layer.field("FlowLabel", ip.flow_label);
    layer.field("Length", ip.payload_length);
    layer.field("NextHeader", protocol_name(ip.next_header));
    layer.field("HopLimit", ip.hop_limit);
    layer.field("SrcIP", &ip.source);
    layer.field("DstIP", &ip.destination);
    layer.payload = rest.to_vec();
    layers.push(layer);

    decode_transport(ip.next_header, rest, layers);
}

fn decode_arp(data: &[u8], layers: &mut Vec<Layer>) {
    let Some(arp) = ArpPacket::parse(data) else {
        if !data.is_empty() {
            layers.push(Layer::raw(data));
        }
        return;
    };

    let mut layer = Layer::new("ARP");
    layer.field("HwType", arp.hardware_type);
    layer.field("ProtType", format!("0x{:04x}", arp.protocol_type));
    layer.field("Operation", arp.operation_name());
    layer.field("SenderMAC", &arp.sender_mac);
    layer.field("SenderIP", &arp.sender_ip);
    layer.field("TargetMAC", &arp.target_mac);
    layer.field("TargetIP", &arp.target_ip);
    layers.push(layer);
}

fn decode_transport(protocol: u8, data: &[u8], layers: &mut Vec<Layer>) {
    match protocol {
        6 => decode_tcp(data, layers),
        17 => decode_udp(data, layers),
        1 => decode_icmp("ICMPv4", data, layers),
        58 => decode_icmp("ICMPv6", data, layers),
        _ => {
            if !data.is_empty() {
                layers.push(Layer::raw(data));
            }
        }
    }
}

fn decode_tcp(data: &[u8], layers: &mut Vec<Layer>) {
    let Some((tcp, rest)) = TcpHeader::parse(data) else {
        if !data.is_empty() {
            layers.push(Layer::raw(data));
        }
        return;
    };

    let mut layer = Layer::new("TCP");
    layer.src = tcp.source_port.to_string();
    layer.dst = tcp.destination_port.to_string();
    layer.field("SrcPort", tcp.source_port);
    layer.field("DstPort", tcp.destination_port);
    layer.field("Seq", tcp.sequence);
    layer.field("Ack", tcp.acknowledgment);
    layer.field("DataOffset", tcp.header_length / 4);
    layer.field("Flags", tcp.flags_string());
    layer.field("Window", tcp.window);
    layer.field("Checksum", tcp.checksum);
    layer.payload = rest.to_vec();
    layers.push(layer);

    push_payload(rest, layers);
}

fn decode_udp(data: &[u8], layers: &mut Vec<Layer>) {
    let Some((udp, rest)) = UdpHeader::parse(data) else {
        if !data.is_empty() {
            layers.push(Layer::raw(data));
        }
        return;
    };

    let mut layer = Layer::new("UDP");
    layer.src = udp.source_port.to_string();
    layer.dst = udp.destination_port.to_string();
    layer.field("SrcPort", udp.source_port);
    layer.field("DstPort", udp.destination_port);
    layer.field("Length", udp.length);
    layer.field("Checksum", udp.checksum);
    layer.payload = rest.to_vec();
    layers.push(layer);

    push_payload(rest, layers);
}

fn decode_icmp(tag: &str, data: &[u8], layers: &mut Vec<Layer>) {
    let Some((icmp, body)) = IcmpHeader::parse(data) else {
        if !data.is_empty() {
            layers.push(Layer::raw(data));
        }
        return;
    };

    let mut layer = Layer::new(tag);
    layer.field("TypeCode", format!("{}/{}", icmp.icmp_type, icmp.code));
    layer.field("Checksum", icmp.checksum);
    layer.payload = body.to_vec();
    layers.push(layer);

    push_payload(body, layers);
}

fn push_payload(data: &[u8], layers: &mut Vec<Layer>) {
    if data.is_empty() {
        return;
    }
    let mut layer = Layer::new("Payload");
    layer.payload = data.to_vec();
    layers.push(layer);
}
