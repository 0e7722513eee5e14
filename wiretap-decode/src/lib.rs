//! Protocol layer decoding for Wiretap
//!
//! Turns raw captured frames into `Record`s: an ordered stack of decoded
//! layers (link, network, transport, payload), each with addressing where
//! the protocol exposes it and an explicit field map. Decoding is best
//! effort and never fails; unknown or truncated data degrades to a raw
//! payload-only layer.

pub mod arp;
pub mod decoder;
pub mod ethernet;
pub mod ip;
pub mod transport;

// Re-export main types
pub use arp::ArpPacket;
pub use decoder::decode;
pub use ethernet::{EtherType, EthernetHeader, MacAddress, VlanTag};
pub use ip::{protocol_name, Ipv4Header, Ipv6Header};
pub use transport::{IcmpHeader, TcpHeader, UdpHeader};
