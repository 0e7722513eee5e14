//! TCP, UDP and ICMP header parsing

use std::fmt::Write;

/// Parsed TCP header
#[derive(Debug, Clone)]
pub struct TcpHeader {
    pub source_port: u16,
    pub destination_port: u16,
    pub sequence: u32,
    pub acknowledgment: u32,
    /// Header length in bytes (data offset * 4)
    pub header_length: usize,
    pub flags: u8,
    pub window: u16,
    pub checksum: u16,
}

impl TcpHeader {
    pub const MIN_LEN: usize = 20;

    const FLAG_NAMES: [(u8, &'static str); 6] = [
        (0x01, "FIN"),
        (0x02, "SYN"),
        (0x04, "RST"),
        (0x08, "PSH"),
        (0x10, "ACK"),
        (0x20, "URG"),
    ];

    /// Parse a header, returning it together with the segment payload
    pub fn parse(data: &[u8]) -> Option<(Self, &[u8])> {
        if data.len() < Self::MIN_LEN {
            return None;
        }

        let header_length = ((data[12] >> 4) as usize) * 4;
        if header_length < Self::MIN_LEN || header_length > data.len() {
            return None;
        }

        Some((
            Self {
                source_port: u16::from_be_bytes([data[0], data[1]]),
                destination_port: u16::from_be_bytes([data[2], data[3]]),
                sequence: u32::from_be_bytes([data[4], data[5], data[6], data[7]]),
                acknowledgment: u32::from_be_bytes([data[8], data[9], data[10], data[11]]),
                header_length,
                flags: data[13] & 0x3f,
                window: u16::from_be_bytes([data[14], data[15]]),
                checksum: u16::from_be_bytes([data[16], data[17]]),
            },
            &data[header_length..],
        ))
    }

    /// Render the flag bits as "SYN|ACK" style text
    pub fn flags_string(&self) -> String {
        let mut out = String::new();
        for (bit, name) in Self::FLAG_NAMES {
            if self.flags & bit != 0 {
                if !out.is_empty() {
                    let _ = write!(out, "|");
                }
                let _ = write!(out, "{name}");
            }
        }
        out
    }
}

/// Parsed UDP header
#[derive(Debug, Clone)]
pub struct UdpHeader {
    pub source_port: u16,
    pub destination_port: u16,
    pub length: u16,
    pub checksum: u16,
}

impl UdpHeader {
    pub const LEN: usize = 8;

    /// Parse a header, returning it together with the datagram payload
    pub fn parse(data: &[u8]) -> Option<(Self, &[u8])> {
        if data.len() < Self::LEN {
            return None;
        }

        Some((
            Self {
                source_port: u16::from_be_bytes([data[0], data[1]]),
                destination_port: u16::from_be_bytes([data[2], data[3]]),
                length: u16::from_be_bytes([data[4], data[5]]),
                checksum: u16::from_be_bytes([data[6], data[7]]),
            },
            &data[Self::LEN..],
        ))
    }
}

/// Parsed ICMP header, shared by ICMPv4 and ICMPv6
#[derive(Debug, Clone)]
pub struct IcmpHeader {
    pub icmp_type: u8,
    pub code: u8,
    pub checksum: u16,
}

impl IcmpHeader {
    pub const LEN: usize = 4;

    /// Parse a header, returning it together with the message body
    pub fn parse(data: &[u8]) -> Option<(Self, &[u8])> {
        if data.len() < Self::LEN {
            return None;
        }

        Some((
            Self {
                icmp_type: data[0],
                code: data[1],
                checksum: u16::from_be_bytes([data[2], data[3]]),
            },
            &data[Self::LEN..],
        ))
    }
}
