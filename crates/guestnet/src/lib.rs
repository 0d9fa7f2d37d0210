//! Pod network configuration for a VM guest agent.
//!
//! This crate programs the guest kernel's networking stack directly over
//! routing netlink and sysfs/ioctl: no `ip`, no `ifconfig`. Given a pod's
//! declarative description (interfaces, routes, DNS servers, firewall
//! rules), it discovers the backing devices, assigns addresses, renames and
//! resizes interfaces, installs routes, and reverses all of it on teardown.
//!
//! # Example
//!
//! ```ignore
//! use guestnet::{NetConfig, Pod};
//!
//! let cfg = NetConfig::default();
//! let mut pod: Pod = serde_json::from_slice(&payload)?;
//!
//! guestnet::network::apply_pod_network(&cfg, &mut pod)?;
//! guestnet::network::setup_dns(&cfg, &pod)?;
//! guestnet::network::apply_firewall_rules(&cfg, &mut pod)?;
//!
//! // ... pod runs ...
//!
//! guestnet::network::cleanup_pod_network(&cfg, &mut pod)?;
//! ```
//!
//! The design is single-threaded and blocking throughout; the only
//! unbounded suspension point is the hotplug wait in [`device`], and that
//! can be bounded via [`NetConfig::hotplug_timeout`].

pub mod channel;
pub mod device;
pub mod dns;
pub mod error;
pub mod firewall;
pub mod netlink;
pub mod network;
pub mod pod;
pub mod util;

pub use error::{Error, Result};
pub use network::{LOOPBACK_IFINDEX, NetConfig};
pub use pod::{Interface, IpAddress, Pod, Route};
