//! Network interface enumeration and information

use pnet_datalink::NetworkInterface;
use serde::Serialize;
use std::fmt;
use std::net::IpAddr;
use wiretap_core::{Error, Result};

/// A host network device suitable for capture
#[derive(Debug, Clone, Serialize)]
pub struct Device {
    /// Interface index as reported by the OS; positive, starts at one
    pub index: u32,
    /// Interface name (e.g. "eth0", "en0", "lo")
    pub name: String,
    /// MAC address, empty if the interface has none
    pub hardware_addr: String,
    /// Addresses assigned to the interface
    pub addrs: Vec<Addr>,
}

impl From<&NetworkInterface> for Device {
    fn from(iface: &NetworkInterface) -> Self {
        let hardware_addr = iface.mac.map(|mac| mac.to_string()).unwrap_or_default();

        let addrs = iface
            .ips
            .iter()
            .map(|network| Addr {
                network: "ip+net".to_string(),
                ip: network.ip(),
                prefix: network.prefix(),
                ip_type: IpType::classify(&network.ip()),
            })
            .collect();

        Device {
            index: iface.index,
            name: iface.name.clone(),
            hardware_addr,
            addrs,
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.index, self.name)?;
        if !self.hardware_addr.is_empty() {
            write!(f, " ({})", self.hardware_addr)?;
        }
        for addr in &self.addrs {
            write!(f, "\n    {addr}")?;
        }
        Ok(())
    }
}

/// One address assigned to a device
#[derive(Debug, Clone, Serialize)]
pub struct Addr {
    /// Address network name, e.g. "ip+net"
    pub network: String,
    /// IPv4 or IPv6 address
    pub ip: IpAddr,
    /// Subnet prefix length
    pub prefix: u8,
    /// Address classification bitset
    pub ip_type: IpType,
}

impl fmt::Display for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}/{} [{}]",
            self.network, self.ip, self.prefix, self.ip_type
        )
    }
}

/// IP address classification: a bitset of the categories below
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct IpType(pub u32);

impl IpType {
    /// IPv4 "0.0.0.0" or IPv6 "::"
    pub const UNSPECIFIED: Self = Self(1);
    pub const LOOPBACK: Self = Self(1 << 1);
    /// RFC 1918 (IPv4) or RFC 4193 unique-local (IPv6)
    pub const PRIVATE: Self = Self(1 << 2);
    pub const MULTICAST: Self = Self(1 << 3);
    pub const INTERFACE_LOCAL_MULTICAST: Self = Self(1 << 4);
    pub const LINK_LOCAL_MULTICAST: Self = Self(1 << 5);
    pub const LINK_LOCAL_UNICAST: Self = Self(1 << 6);
    /// Any unicast address that is not loopback or link-local,
    /// including private address space
    pub const GLOBAL_UNICAST: Self = Self(1 << 7);

    /// Classify an address into its category bitset
    pub fn classify(ip: &IpAddr) -> Self {
        let mut result = Self::default();
        for (ip_type, checker, _) in TYPE_CHECKS {
            if checker(ip) {
                result.0 |= ip_type.0;
            }
        }
        result
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for IpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (ip_type, _, name) in TYPE_CHECKS {
            if self.contains(*ip_type) {
                if !first {
                    write!(f, ", ")?;
                }
                write!(f, "{name}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Category bit, checker, human-readable name
type TypeCheck = (IpType, fn(&IpAddr) -> bool, &'static str);

const TYPE_CHECKS: &[TypeCheck] = &[
    (IpType::UNSPECIFIED, is_unspecified, "Unspecified"),
    (IpType::LOOPBACK, is_loopback, "Loopback"),
    (IpType::PRIVATE, is_private, "Private"),
    (IpType::MULTICAST, is_multicast, "Multicast"),
    (
        IpType::INTERFACE_LOCAL_MULTICAST,
        is_interface_local_multicast,
        "InterfaceLocalMulticast",
    ),
    (
        IpType::LINK_LOCAL_MULTICAST,
        is_link_local_multicast,
        "LinkLocalMulticast",
    ),
    (
        IpType::LINK_LOCAL_UNICAST,
        is_link_local_unicast,
        "LinkLocalUnicast",
    ),
    (IpType::GLOBAL_UNICAST, is_global_unicast, "GlobalUnicast"),
];

fn is_unspecified(ip: &IpAddr) -> bool {
    ip.is_unspecified()
}

fn is_loopback(ip: &IpAddr) -> bool {
    ip.is_loopback()
}

fn is_private(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private(),
        // fc00::/7 unique-local
        IpAddr::V6(v6) => v6.segments()[0] & 0xfe00 == 0xfc00,
    }
}

fn is_multicast(ip: &IpAddr) -> bool {
    ip.is_multicast()
}

fn is_interface_local_multicast(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(_) => false,
        // ff01::/16 (any scope-1 multicast flag variant)
        IpAddr::V6(v6) => v6.segments()[0] & 0xff0f == 0xff01,
    }
}

fn is_link_local_multicast(ip: &IpAddr) -> bool {
    match ip {
        // 224.0.0.0/24
        IpAddr::V4(v4) => v4.octets()[..3] == [224, 0, 0],
        // ff02::/16
        IpAddr::V6(v6) => v6.segments()[0] & 0xff0f == 0xff02,
    }
}

fn is_link_local_unicast(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_link_local(),
        // fe80::/10
        IpAddr::V6(v6) => v6.segments()[0] & 0xffc0 == 0xfe80,
    }
}

fn is_global_unicast(ip: &IpAddr) -> bool {
    !ip.is_unspecified() && !ip.is_loopback() && !ip.is_multicast() && !is_link_local_unicast(ip)
}

/// List all host network devices, ordered by interface index
pub fn list_devices() -> Result<Vec<Device>> {
    let interfaces = pnet_datalink::interfaces();

    if interfaces.is_empty() {
        return Err(Error::interface(
            "no network interfaces found; are you running with sufficient privileges?",
        ));
    }

    let mut devices: Vec<Device> = interfaces.iter().map(Device::from).collect();
    devices.sort_by_key(|d| d.index);
    Ok(devices)
}

/// Get a device by name
pub fn get_device(name: &str) -> Result<Device> {
    pnet_datalink::interfaces()
        .iter()
        .find(|iface| iface.name == name)
        .map(Device::from)
        .ok_or_else(|| Error::interface(format!("interface '{name}' not found")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    fn v4(a: u8, b: u8, c: u8, d: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(a, b, c, d))
    }

    #[test]
    fn test_classify_loopback() {
        let t = IpType::classify(&v4(127, 0, 0, 1));
        assert!(t.contains(IpType::LOOPBACK));
        assert!(!t.contains(IpType::GLOBAL_UNICAST));
        assert!(!t.contains(IpType::MULTICAST));
    }

    #[test]
    fn test_classify_private() {
        for ip in [v4(10, 1, 2, 3), v4(172, 16, 0, 1), v4(192, 168, 1, 1)] {
            let t = IpType::classify(&ip);
            assert!(t.contains(IpType::PRIVATE), "{ip} should be private");
            // Private space is still global unicast
            assert!(t.contains(IpType::GLOBAL_UNICAST));
        }
    }

    #[test]
    fn test_classify_multicast() {
        let t = IpType::classify(&v4(224, 0, 0, 5));
        assert!(t.contains(IpType::MULTICAST));
        assert!(t.contains(IpType::LINK_LOCAL_MULTICAST));
        assert!(!t.contains(IpType::GLOBAL_UNICAST));
    }

    #[test]
    fn test_classify_unspecified() {
        assert!(IpType::classify(&v4(0, 0, 0, 0)).contains(IpType::UNSPECIFIED));
        let v6 = IpAddr::V6(Ipv6Addr::UNSPECIFIED);
        assert!(IpType::classify(&v6).contains(IpType::UNSPECIFIED));
    }

    #[test]
    fn test_classify_ipv6_link_local() {
        let ip: IpAddr = "fe80::1".parse().unwrap();
        let t = IpType::classify(&ip);
        assert!(t.contains(IpType::LINK_LOCAL_UNICAST));
        assert!(!t.contains(IpType::GLOBAL_UNICAST));
    }

    #[test]
    fn test_classify_ipv6_unique_local() {
        let ip: IpAddr = "fd00::1".parse().unwrap();
        let t = IpType::classify(&ip);
        assert!(t.contains(IpType::PRIVATE));
        assert!(t.contains(IpType::GLOBAL_UNICAST));
    }

    #[test]
    fn test_ip_type_display() {
        let t = IpType::classify(&v4(127, 0, 0, 1));
        let rendered = t.to_string();
        assert!(rendered.contains("Loopback"));
    }

    #[test]
    fn test_list_devices() {
        // Should at least have loopback on any test machine
        let devices = list_devices().unwrap();
        assert!(!devices.is_empty());
        for device in &devices {
            assert!(!device.name.is_empty());
        }
    }

    #[test]
    fn test_devices_ordered_by_index() {
        let devices = list_devices().unwrap();
        for pair in devices.windows(2) {
            assert!(pair[0].index <= pair[1].index);
        }
    }

    #[test]
    fn test_get_nonexistent_device() {
        let result = get_device("nonexistent_interface_xyz");
        assert!(matches!(result, Err(Error::Interface(_))));
    }

    #[test]
    fn test_device_serializes() {
        let devices = list_devices().unwrap();
        let json = serde_json::to_value(&devices).unwrap();
        assert!(json.is_array());
        assert!(json[0]["name"].is_string());
        assert!(json[0]["addrs"].is_array());
    }
}
