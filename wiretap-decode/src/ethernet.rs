//! Ethernet frame header parsing
//!
//! Parses Ethernet II headers and 802.1Q VLAN tags, the link layer every
//! captured frame is expected to start with.

use std::fmt;

/// Common EtherType values the decoder dispatches on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EtherType {
    /// IPv4 (0x0800)
    IPv4,
    /// ARP (0x0806)
    ARP,
    /// VLAN-tagged frame (0x8100)
    VLAN,
    /// IPv6 (0x86DD)
    IPv6,
    /// 802.3 length field instead of a type (values <= 1500)
    LLC,
    /// Any other EtherType
    Custom(u16),
}

impl EtherType {
    /// Create EtherType from the wire value
    pub fn from_u16(value: u16) -> Self {
        match value {
            0x0800 => EtherType::IPv4,
            0x0806 => EtherType::ARP,
            0x8100 => EtherType::VLAN,
            0x86DD => EtherType::IPv6,
            v if v <= 1500 => EtherType::LLC,
            v => EtherType::Custom(v),
        }
    }
}

impl fmt::Display for EtherType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EtherType::IPv4 => write!(f, "IPv4"),
            EtherType::ARP => write!(f, "ARP"),
            EtherType::VLAN => write!(f, "VLAN"),
            EtherType::IPv6 => write!(f, "IPv6"),
            EtherType::LLC => write!(f, "LLC"),
            EtherType::Custom(val) => write!(f, "0x{val:04x}"),
        }
    }
}

/// MAC address (6 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacAddress(pub [u8; 6]);

impl MacAddress {
    /// Create a MAC address from a slice, which must be exactly 6 bytes
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        if slice.len() == 6 {
            let mut bytes = [0u8; 6];
            bytes.copy_from_slice(slice);
            Some(MacAddress(bytes))
        } else {
            None
        }
    }

    /// Check if this is the broadcast address
    pub fn is_broadcast(&self) -> bool {
        self.0 == [0xff; 6]
    }

    /// Check if this is a multicast address (bit 0 of first octet set)
    pub fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 == 0x01
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

/// Parsed Ethernet II header
#[derive(Debug, Clone)]
pub struct EthernetHeader {
    pub destination: MacAddress,
    pub source: MacAddress,
    pub ethertype: EtherType,
}

impl EthernetHeader {
    /// Header size: dst + src + type/length
    pub const LEN: usize = 14;

    /// Parse a header, returning it together with the remaining payload
    pub fn parse(data: &[u8]) -> Option<(Self, &[u8])> {
        if data.len() < Self::LEN {
            return None;
        }

        let destination = MacAddress::from_slice(&data[0..6])?;
        let source = MacAddress::from_slice(&data[6..12])?;
        let ethertype = EtherType::from_u16(u16::from_be_bytes([data[12], data[13]]));

        Some((
            Self {
                destination,
                source,
                ethertype,
            },
            &data[Self::LEN..],
        ))
    }
}

/// Parsed 802.1Q VLAN tag
#[derive(Debug, Clone)]
pub struct VlanTag {
    /// Priority code point
    pub priority: u8,
    /// VLAN identifier
    pub vlan_id: u16,
    /// EtherType of the encapsulated payload
    pub ethertype: EtherType,
}

impl VlanTag {
    /// Tag size: TCI + inner type
    pub const LEN: usize = 4;

    pub fn parse(data: &[u8]) -> Option<(Self, &[u8])> {
        if data.len() < Self::LEN {
            return None;
        }

        let tci = u16::from_be_bytes([data[0], data[1]]);
        let ethertype = EtherType::from_u16(u16::from_be_bytes([data[2], data[3]]));

        Some((
            Self {
                priority: (tci >> 13) as u8,
                vlan_id: tci & 0x0fff,
                ethertype,
            },
            &data[Self::LEN..],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ethertype_from_u16() {
        assert_eq!(EtherType::from_u16(0x0800), EtherType::IPv4);
        assert_eq!(EtherType::from_u16(0x0806), EtherType::ARP);
        assert_eq!(EtherType::from_u16(0x86DD), EtherType::IPv6);
        assert_eq!(EtherType::from_u16(100), EtherType::LLC);
        assert_eq!(EtherType::from_u16(0x9999), EtherType::Custom(0x9999));
    }

    #[test]
    fn test_mac_address_display() {
        let mac = MacAddress([0x00, 0x11, 0x22, 0xaa, 0xbb, 0xcc]);
        assert_eq!(mac.to_string(), "00:11:22:aa:bb:cc");
    }

    #[test]
    fn test_mac_address_classes() {
        assert!(MacAddress([0xff; 6]).is_broadcast());
        assert!(MacAddress([0x01, 0, 0, 0, 0, 0]).is_multicast());
        assert!(!MacAddress([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]).is_multicast());
    }

    #[test]
    fn test_parse_header() {
        let data = [
            0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff, // dst
            0x00, 0x11, 0x22, 0x33, 0x44, 0x55, // src
            0x08, 0x00, // IPv4
            0x01, 0x02, // payload
        ];

        let (header, payload) = EthernetHeader::parse(&data).unwrap();
        assert_eq!(header.destination.0, [0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]);
        assert_eq!(header.source.0, [0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
        assert_eq!(header.ethertype, EtherType::IPv4);
        assert_eq!(payload, &[0x01, 0x02]);
    }

    #[test]
    fn test_parse_truncated_header() {
        assert!(EthernetHeader::parse(&[0u8; 13]).is_none());
    }

    #[test]
    fn test_parse_vlan_tag() {
        // priority 5, vlan 100, inner IPv4
        let data = [0xa0, 0x64, 0x08, 0x00, 0xde, 0xad];
        let (tag, rest) = VlanTag::parse(&data).unwrap();
        assert_eq!(tag.priority, 5);
        assert_eq!(tag.vlan_id, 100);
        assert_eq!(tag.ethertype, EtherType::IPv4);
        assert_eq!(rest, &[0xde, 0xad]);
    }
}
