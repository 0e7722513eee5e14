//! Captured frame and decoded record types

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// A raw frame as delivered by the capture device
#[derive(Debug, Clone)]
pub struct RawFrame {
    /// Index of the device the frame was captured on
    pub device_index: u32,
    /// Capture timestamp
    pub timestamp: DateTime<Utc>,
    /// Length of the frame on the wire
    pub wire_length: u32,
    /// Number of bytes actually captured (snaplen may truncate)
    pub captured_length: u32,
    /// Captured bytes, starting at the link layer
    pub data: Vec<u8>,
}

impl RawFrame {
    /// Create a frame stamped with the current time
    pub fn new(device_index: u32, data: Vec<u8>) -> Self {
        let len = data.len() as u32;
        Self {
            device_index,
            timestamp: Utc::now(),
            wire_length: len,
            captured_length: len,
            data,
        }
    }
}

/// One decoded protocol layer of a record
///
/// `src`/`dst` are populated only for layers that expose addressing:
/// MAC addresses for the link layer, IP addresses for the network layer,
/// bare port numbers for the transport layer. Application-level layers
/// leave them empty.
#[derive(Debug, Clone, Serialize)]
pub struct Layer {
    /// Layer type tag, e.g. "Ethernet", "IPv4", "TCP"
    pub layer_type: String,
    /// Source address in textual form, empty if the layer has none
    pub src: String,
    /// Destination address in textual form, empty if the layer has none
    pub dst: String,
    /// Bytes carried after this layer's header
    #[serde(serialize_with = "hex_bytes")]
    pub payload: Vec<u8>,
    /// Decoded header fields, keyed by field name
    pub fields: BTreeMap<String, String>,
}

impl Layer {
    /// Create an empty layer with the given type tag
    pub fn new(layer_type: impl Into<String>) -> Self {
        Self {
            layer_type: layer_type.into(),
            src: String::new(),
            dst: String::new(),
            payload: Vec::new(),
            fields: BTreeMap::new(),
        }
    }

    /// Create a raw layer carrying undecoded bytes only
    pub fn raw(data: &[u8]) -> Self {
        let mut layer = Self::new("Raw");
        layer.payload = data.to_vec();
        layer
    }

    /// Record a decoded header field
    pub fn field(&mut self, name: &str, value: impl ToString) {
        self.fields.insert(name.to_string(), value.to_string());
    }
}

/// A decoded packet record
///
/// Immutable once produced; the layer order reflects physical layering,
/// outermost link layer first.
#[derive(Debug, Clone, Serialize)]
pub struct Record {
    pub device_index: u32,
    pub timestamp: DateTime<Utc>,
    /// Length on the wire
    pub length: u32,
    /// Captured length after snaplen truncation
    pub capture_length: u32,
    pub layers: Vec<Layer>,
}

impl Record {
    /// The most high-level readable description of the record's flow,
    /// as `(src, dst)`.
    ///
    /// Precedence is a three-tier override: the link layer's addresses
    /// are replaced by the network layer's when present, and the
    /// transport layer's ports are appended as `addr:port`, bracketing
    /// addresses that contain a colon (IPv6).
    pub fn flow(&self) -> (String, String) {
        let mut src = String::new();
        let mut dst = String::new();
        if let Some(link) = self.layers.first() {
            src = link.src.clone();
            dst = link.dst.clone();
        }
        if let Some(network) = self.layers.get(1) {
            src = network.src.clone();
            dst = network.dst.clone();
        }
        if let Some(transport) = self.layers.get(2) {
            if src.contains(':') {
                src = format!("[{src}]");
            }
            if dst.contains(':') {
                dst = format!("[{dst}]");
            }
            src = format!("{}:{}", src, transport.src);
            dst = format!("{}:{}", dst, transport.dst);
        }
        (src, dst)
    }
}

/// Serialize a byte buffer as a lowercase hex string
fn hex_bytes<S>(bytes: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    use std::fmt::Write;

    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        // writing to a String cannot fail
        let _ = write!(out, "{b:02x}");
    }
    serializer.serialize_str(&out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(layer_type: &str, src: &str, dst: &str) -> Layer {
        let mut l = Layer::new(layer_type);
        l.src = src.to_string();
        l.dst = dst.to_string();
        l
    }

    fn record(layers: Vec<Layer>) -> Record {
        Record {
            device_index: 0,
            timestamp: Utc::now(),
            length: 0,
            capture_length: 0,
            layers,
        }
    }

    #[test]
    fn test_flow_no_layers() {
        let (src, dst) = record(vec![]).flow();
        assert_eq!(src, "");
        assert_eq!(dst, "");
    }

    #[test]
    fn test_flow_link_only() {
        let r = record(vec![layer("Ethernet", "A", "B")]);
        assert_eq!(r.flow(), ("A".to_string(), "B".to_string()));
    }

    #[test]
    fn test_flow_network_overrides_link() {
        let r = record(vec![
            layer("Ethernet", "aa:bb:cc:dd:ee:ff", "ff:ee:dd:cc:bb:aa"),
            layer("IPv4", "10.0.0.1", "10.0.0.2"),
        ]);
        assert_eq!(r.flow(), ("10.0.0.1".to_string(), "10.0.0.2".to_string()));
    }

    #[test]
    fn test_flow_transport_appends_ports() {
        let r = record(vec![
            layer("Ethernet", "aa:bb:cc:dd:ee:ff", "ff:ee:dd:cc:bb:aa"),
            layer("IPv4", "10.0.0.1", "10.0.0.2"),
            layer("TCP", "443", "51234"),
        ]);
        assert_eq!(
            r.flow(),
            ("10.0.0.1:443".to_string(), "10.0.0.2:51234".to_string())
        );
    }

    #[test]
    fn test_flow_brackets_ipv6() {
        let r = record(vec![
            layer("Ethernet", "aa:bb:cc:dd:ee:ff", "ff:ee:dd:cc:bb:aa"),
            layer("IPv6", "2001:db8::1", "2001:db8::2"),
            layer("TCP", "443", "51234"),
        ]);
        assert_eq!(
            r.flow(),
            (
                "[2001:db8::1]:443".to_string(),
                "[2001:db8::2]:51234".to_string()
            )
        );
    }

    #[test]
    fn test_layer_payload_serializes_as_hex() {
        let mut l = Layer::new("Raw");
        l.payload = vec![0x00, 0xde, 0xad, 0xbe, 0xef];
        let json = serde_json::to_value(&l).unwrap();
        assert_eq!(json["payload"], "00deadbeef");
    }

    #[test]
    fn test_raw_frame_lengths() {
        let frame = RawFrame::new(2, vec![1, 2, 3]);
        assert_eq!(frame.device_index, 2);
        assert_eq!(frame.wire_length, 3);
        assert_eq!(frame.captured_length, 3);
    }
}
