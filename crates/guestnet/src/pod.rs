//! Pod network configuration data model.
//!
//! These types are the deserialization target of the host's pod setup
//! message. The agent's command layer parses the JSON envelope and hands the
//! typed pod to [`crate::network`] for application.

use serde::{Deserialize, Serialize};

/// One IPv4 address assignment.
///
/// `mask` is either a prefix length (`"24"`) or a dotted-quad netmask
/// (`"255.255.255.0"`); both forms are accepted everywhere the mask is
/// consumed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpAddress {
    /// Dotted-quad IPv4 address.
    #[serde(rename = "ipAddress")]
    pub address: String,
    /// Prefix length or dotted-quad netmask.
    #[serde(rename = "netMask")]
    pub mask: String,
}

impl IpAddress {
    /// Create a new address assignment.
    pub fn new(address: impl Into<String>, mask: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            mask: mask.into(),
        }
    }
}

/// One network interface to configure inside the guest.
///
/// At least one of `device` and `mac_addr` must be present. When only the
/// hardware address is given, the device name is resolved at apply time and
/// stored back into `device`; a successful rename also updates `device`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Interface {
    /// Interface name inside the guest, if known up front.
    #[serde(default)]
    pub device: Option<String>,
    /// Hardware (EUI-48) address identifying the interface.
    #[serde(rename = "macAddr", default)]
    pub mac_addr: Option<String>,
    /// Name to give the interface once configured.
    #[serde(rename = "newDeviceName", default)]
    pub new_device_name: Option<String>,
    /// MTU to set; 0 leaves the device default.
    #[serde(default)]
    pub mtu: u32,
    /// Addresses to assign, in order.
    #[serde(rename = "ipAddresses", default)]
    pub ip_addresses: Vec<IpAddress>,
}

impl Interface {
    /// The current device name, if any.
    pub fn device_name(&self) -> Option<&str> {
        self.device.as_deref()
    }
}

/// One route to install.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Route {
    /// `"default"`/`"any"`/`"all"`, or an address with optional `/prefix`.
    #[serde(rename = "dest", default)]
    pub destination: String,
    /// Gateway address.
    #[serde(default)]
    pub gateway: Option<String>,
    /// Outgoing interface name.
    #[serde(default)]
    pub device: Option<String>,
}

/// The full network configuration of one pod.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Pod {
    /// Interfaces to configure, in order. Order is authoritative: routes may
    /// depend on the final device names of earlier interfaces.
    #[serde(default)]
    pub interfaces: Vec<Interface>,
    /// Routes to install after all interfaces are up.
    #[serde(default)]
    pub routes: Vec<Route>,
    /// DNS server addresses for the resolver file.
    #[serde(default)]
    pub dns: Vec<String>,
    /// Raw rule-set text handed verbatim to the firewall loader's stdin.
    #[serde(rename = "firewallRules", default)]
    pub firewall_rules: Option<String>,
}

impl Pod {
    /// Drop all interface and route records after teardown.
    pub fn clear_network(&mut self) {
        self.interfaces.clear();
        self.routes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_pod() {
        let json = r#"{
            "interfaces": [{
                "device": "eth0",
                "newDeviceName": "net1",
                "mtu": 1500,
                "ipAddresses": [{"ipAddress": "10.0.2.15", "netMask": "24"}]
            }],
            "routes": [{"dest": "default", "gateway": "10.0.2.2", "device": "eth0"}],
            "dns": ["10.0.2.3"]
        }"#;

        let pod: Pod = serde_json::from_str(json).unwrap();
        assert_eq!(pod.interfaces.len(), 1);
        assert_eq!(pod.interfaces[0].device.as_deref(), Some("eth0"));
        assert_eq!(pod.interfaces[0].new_device_name.as_deref(), Some("net1"));
        assert_eq!(pod.interfaces[0].ip_addresses[0].mask, "24");
        assert_eq!(pod.routes[0].destination, "default");
        assert_eq!(pod.dns, vec!["10.0.2.3"]);
        assert!(pod.firewall_rules.is_none());
    }

    #[test]
    fn deserialize_mac_only_interface() {
        let json = r#"{"macAddr": "52:54:00:12:34:56",
                       "ipAddresses": [{"ipAddress": "10.0.0.2", "netMask": "255.255.255.0"}]}"#;
        let iface: Interface = serde_json::from_str(json).unwrap();
        assert!(iface.device.is_none());
        assert_eq!(iface.mac_addr.as_deref(), Some("52:54:00:12:34:56"));
        assert_eq!(iface.mtu, 0);
    }

    #[test]
    fn clear_network_empties_lists() {
        let mut pod = Pod {
            interfaces: vec![Interface::default()],
            routes: vec![Route::default()],
            dns: vec!["10.0.2.3".into()],
            firewall_rules: Some("*filter\nCOMMIT\n".into()),
        };
        pod.clear_network();
        assert!(pod.interfaces.is_empty());
        assert!(pod.routes.is_empty());
        // DNS and firewall state have their own lifecycles.
        assert!(!pod.dns.is_empty());
        assert!(pod.firewall_rules.is_some());
    }
}
