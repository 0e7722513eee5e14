//! ARP packet parsing (Ethernet/IPv4 flavor)

use crate::ethernet::MacAddress;
use std::net::Ipv4Addr;

/// Parsed ARP packet for the Ethernet + IPv4 address families
#[derive(Debug, Clone)]
pub struct ArpPacket {
    pub hardware_type: u16,
    pub protocol_type: u16,
    pub operation: u16,
    pub sender_mac: MacAddress,
    pub sender_ip: Ipv4Addr,
    pub target_mac: MacAddress,
    pub target_ip: Ipv4Addr,
}

impl ArpPacket {
    pub const LEN: usize = 28;

    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < Self::LEN {
            return None;
        }

        // Only Ethernet (hlen 6) + IPv4 (plen 4) is decoded here
        if data[4] != 6 || data[5] != 4 {
            return None;
        }

        Some(Self {
            hardware_type: u16::from_be_bytes([data[0], data[1]]),
            protocol_type: u16::from_be_bytes([data[2], data[3]]),
            operation: u16::from_be_bytes([data[6], data[7]]),
            sender_mac: MacAddress::from_slice(&data[8..14])?,
            sender_ip: Ipv4Addr::new(data[14], data[15], data[16], data[17]),
            target_mac: MacAddress::from_slice(&data[18..24])?,
            target_ip: Ipv4Addr::new(data[24], data[25], data[26], data[27]),
        })
    }

    /// Human-readable operation name
    pub fn operation_name(&self) -> &'static str {
        match self.operation {
            1 => "request",
            2 => "reply",
            _ => "unknown",
        }
    }
}
