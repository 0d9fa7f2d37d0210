//! Pod network orchestration.
//!
//! Applies a pod's interfaces and routes in dependency order and reverses
//! the process on teardown. Interfaces are configured strictly in list
//! order: later routes may name devices that only exist once an earlier
//! interface has been resolved or renamed. Apply is fail-fast with no
//! rollback; teardown is best-effort and always visits every item.

use std::path::PathBuf;
use std::time::Duration;

use tracing::{info, warn};

use crate::device;
use crate::error::{Error, Result};
use crate::netlink::{Connection, RouteRequest};
use crate::pod::{Interface, Pod, Route};
use crate::util::addr::{parse_ipv4, parse_netmask};

/// Kernel interface index of the loopback device.
pub const LOOPBACK_IFINDEX: u32 = 1;

/// Loopback device name, exempt from teardown.
const LOOPBACK_NAME: &str = "lo";

/// Paths and policies for one pod's network setup.
///
/// Everything the orchestrator touches outside the netlink socket is named
/// here explicitly, so tests can point it at a scratch tree and embedders
/// can relocate the resolver file.
#[derive(Debug, Clone)]
pub struct NetConfig {
    /// Root of the kernel's per-interface sysfs tree.
    pub sysfs_net: PathBuf,
    /// PCI bus rescan trigger.
    pub pci_rescan: PathBuf,
    /// Resolver file written by DNS setup.
    pub resolv_conf: PathBuf,
    /// Firewall rule loader command line.
    pub firewall_loader: Vec<String>,
    /// Bound on the hotplug wait; `None` waits indefinitely.
    pub hotplug_timeout: Option<Duration>,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            sysfs_net: PathBuf::from("/sys/class/net"),
            pci_rescan: PathBuf::from("/sys/bus/pci/rescan"),
            resolv_conf: PathBuf::from("/etc/resolv.conf"),
            firewall_loader: crate::firewall::DEFAULT_LOADER
                .iter()
                .map(|s| s.to_string())
                .collect(),
            hotplug_timeout: None,
        }
    }
}

/// The kernel-mutation operations the orchestrator needs.
///
/// [`Connection`] is the real implementation; tests substitute a recording
/// mock to observe the resulting kernel state.
pub trait Rtnl {
    fn add_address(&self, ifindex: u32, addr: [u8; 4], prefix_len: u8) -> Result<()>;
    fn del_address(&self, ifindex: u32, addr: [u8; 4], prefix_len: u8) -> Result<()>;
    fn add_route(&self, route: &RouteRequest) -> Result<()>;
    fn del_route(&self, route: &RouteRequest) -> Result<()>;
    fn set_link_state(&self, ifindex: u32, up: bool) -> Result<()>;
    fn set_link_name(&self, ifindex: u32, name: &str) -> Result<()>;
    fn set_link_mtu(&self, ifindex: u32, mtu: u32) -> Result<()>;
}

impl Rtnl for Connection {
    fn add_address(&self, ifindex: u32, addr: [u8; 4], prefix_len: u8) -> Result<()> {
        self.add_address_by_index(ifindex, addr, prefix_len)
    }

    fn del_address(&self, ifindex: u32, addr: [u8; 4], prefix_len: u8) -> Result<()> {
        self.del_address_by_index(ifindex, addr, prefix_len)
    }

    fn add_route(&self, route: &RouteRequest) -> Result<()> {
        Connection::add_route(self, route)
    }

    fn del_route(&self, route: &RouteRequest) -> Result<()> {
        Connection::del_route(self, route)
    }

    fn set_link_state(&self, ifindex: u32, up: bool) -> Result<()> {
        self.set_link_state_by_index(ifindex, up)
    }

    fn set_link_name(&self, ifindex: u32, name: &str) -> Result<()> {
        self.set_link_name_by_index(ifindex, name)
    }

    fn set_link_mtu(&self, ifindex: u32, mtu: u32) -> Result<()> {
        self.set_link_mtu_by_index(ifindex, mtu)
    }
}

/// Configure one interface: wait, resolve, address, rename, MTU, up.
fn setup_interface(rtnl: &impl Rtnl, cfg: &NetConfig, iface: &mut Interface) -> Result<()> {
    if iface.device.is_none() && iface.mac_addr.is_none() {
        return Err(Error::InvalidConfig(
            "interface has neither device name nor hardware address".into(),
        ));
    }
    if iface.ip_addresses.is_empty() {
        return Err(Error::InvalidConfig(
            "interface has no addresses to assign".into(),
        ));
    }

    // udev may still be renaming the device to its predictable name; all
    // later steps depend on the name being final.
    device::wait_for_interface(
        &cfg.sysfs_net,
        iface.device.as_deref().unwrap_or(""),
        cfg.hotplug_timeout,
    )?;

    if let Some(mac_addr) = iface.mac_addr.clone() {
        match iface.device.clone() {
            Some(device) => device::verify_device_mac(&mac_addr, &device)?,
            None => {
                let resolved = device::resolve_name_by_mac(&mac_addr)?;
                info!(mac = %mac_addr, device = %resolved, "resolved interface name");
                iface.device = Some(resolved);
            }
        }
    }

    let device = iface
        .device
        .clone()
        .ok_or_else(|| Error::InvalidConfig("interface name did not resolve".into()))?;
    let ifindex = device::ifindex(&cfg.sysfs_net, &device)?;

    for ip in &iface.ip_addresses {
        let addr = parse_ipv4(&ip.address)?;
        let prefix_len = parse_netmask(&ip.mask)?;
        rtnl.add_address(ifindex, addr, prefix_len)
            .map_err(|e| e.with_context(format!("adding {}/{} on {}", ip.address, prefix_len, device)))?;
        info!(device = %device, address = %ip.address, prefix_len, "address assigned");
    }

    if let Some(new_name) = iface.new_device_name.clone() {
        if iface.device.as_deref() != Some(new_name.as_str()) {
            rtnl.set_link_name(ifindex, &new_name)
                .map_err(|e| e.with_context(format!("renaming {} to {}", device, new_name)))?;
            info!(from = %device, to = %new_name, "interface renamed");
            iface.device = Some(new_name);
        }
    }

    if iface.mtu > 0 {
        rtnl.set_link_mtu(ifindex, iface.mtu)
            .map_err(|e| e.with_context(format!("setting mtu on {}", device)))?;
        info!(device = %device, mtu = iface.mtu, "mtu set");
    }

    rtnl.set_link_state(ifindex, true)
        .map_err(|e| e.with_context(format!("bringing up {}", device)))?;
    info!(device = %iface.device.as_deref().unwrap_or(&device), "interface up");

    Ok(())
}

/// Tear one interface down: addresses off, link down, device removed.
///
/// Address deletions are individually best-effort so a vanished address
/// never blocks the link teardown behind it. The loopback device only ever
/// loses its addresses.
fn cleanup_interface(rtnl: &impl Rtnl, cfg: &NetConfig, iface: &Interface) -> Result<()> {
    let device = match iface.device.as_deref() {
        Some(device) if !iface.ip_addresses.is_empty() => device,
        _ => {
            return Err(Error::InvalidConfig(
                "interface record incomplete, skipping teardown".into(),
            ));
        }
    };

    let ifindex = device::ifindex(&cfg.sysfs_net, device)?;

    for ip in &iface.ip_addresses {
        let result = parse_ipv4(&ip.address)
            .and_then(|addr| Ok((addr, parse_netmask(&ip.mask)?)))
            .and_then(|(addr, prefix_len)| rtnl.del_address(ifindex, addr, prefix_len));
        if let Err(e) = result {
            warn!(device, address = %ip.address, error = %e, "failed to delete address");
        }
    }

    if device == LOOPBACK_NAME {
        return Ok(());
    }

    rtnl.set_link_state(ifindex, false)
        .map_err(|e| e.with_context(format!("bringing down {}", device)))?;

    device::remove_device(&cfg.sysfs_net, device)?;
    info!(device, "interface removed");

    Ok(())
}

/// Install one route.
fn setup_route(rtnl: &impl Rtnl, cfg: &NetConfig, route: &Route) -> Result<()> {
    let request = resolve_route(cfg, route)?;
    rtnl.add_route(&request)
        .map_err(|e| e.with_context(format!("adding route {}", route.destination)))?;
    info!(destination = %route.destination, gateway = ?route.gateway, "route added");
    Ok(())
}

/// Remove one route.
fn cleanup_route(rtnl: &impl Rtnl, cfg: &NetConfig, route: &Route) -> Result<()> {
    let request = resolve_route(cfg, route)?;
    rtnl.del_route(&request)
        .map_err(|e| e.with_context(format!("deleting route {}", route.destination)))
}

fn resolve_route(cfg: &NetConfig, route: &Route) -> Result<RouteRequest> {
    let oif = match route.device.as_deref() {
        Some(device) => Some(device::ifindex(&cfg.sysfs_net, device)?),
        None => None,
    };
    RouteRequest::parse(&route.destination, route.gateway.as_deref(), oif)
}

/// Apply a pod's full network configuration over one connection.
fn apply_pod(rtnl: &impl Rtnl, cfg: &NetConfig, pod: &mut Pod) -> Result<()> {
    for iface in &mut pod.interfaces {
        setup_interface(rtnl, cfg, iface)?;
    }

    // Loopback is brought up once per pod, independent of the interface
    // list, before any routes go in.
    rtnl.set_link_state(LOOPBACK_IFINDEX, true)
        .map_err(|e| e.with_context("bringing up loopback"))?;

    for route in &pod.routes {
        setup_route(rtnl, cfg, route)?;
    }

    Ok(())
}

/// Reverse a pod's network configuration over one connection.
///
/// Routes go first (they depend on the interfaces), then every interface is
/// attempted regardless of earlier failures. All records are cleared.
fn teardown_pod(rtnl: &impl Rtnl, cfg: &NetConfig, pod: &mut Pod) {
    for route in &pod.routes {
        if let Err(e) = cleanup_route(rtnl, cfg, route) {
            warn!(destination = %route.destination, error = %e, "route teardown failed");
        }
    }

    for iface in &pod.interfaces {
        if let Err(e) = cleanup_interface(rtnl, cfg, iface) {
            warn!(device = ?iface.device, error = %e, "interface teardown failed");
        }
    }

    pod.clear_network();
}

/// Apply the pod's interfaces and routes.
///
/// Fail-fast: the first failure aborts and propagates, leaving whatever was
/// already applied in place; [`cleanup_pod_network`] is the separate,
/// best-effort undo.
pub fn apply_pod_network(cfg: &NetConfig, pod: &mut Pod) -> Result<()> {
    let conn = Connection::new()?;
    apply_pod(&conn, cfg, pod)
}

/// Tear down the pod's interfaces and routes, best-effort.
///
/// Per-item failures are logged and never abort the pass; the only
/// reportable error is failing to open the netlink connection at all.
pub fn cleanup_pod_network(cfg: &NetConfig, pod: &mut Pod) -> Result<()> {
    let conn = Connection::new()?;
    teardown_pod(&conn, cfg, pod);
    Ok(())
}

/// Configure a single hot-added interface.
///
/// Rescans the PCI bus first so a just-attached NIC is visible, then runs
/// the normal interface state machine over a fresh connection.
pub fn apply_single_interface(cfg: &NetConfig, iface: &mut Interface) -> Result<()> {
    device::rescan_pci_bus(&cfg.pci_rescan)?;
    let conn = Connection::new()?;
    setup_interface(&conn, cfg, iface)
}

/// Install a batch of routes over a fresh connection, failing fast.
pub fn apply_routes(cfg: &NetConfig, routes: &[Route]) -> Result<()> {
    let conn = Connection::new()?;
    for route in routes {
        setup_route(&conn, cfg, route)?;
    }
    Ok(())
}

/// Write the pod's DNS servers to the configured resolver file.
pub fn setup_dns(cfg: &NetConfig, pod: &Pod) -> Result<()> {
    crate::dns::setup_dns(&cfg.resolv_conf, pod)
}

/// Clear the pod's DNS configuration and truncate the resolver file.
pub fn cleanup_dns(cfg: &NetConfig, pod: &mut Pod) {
    crate::dns::cleanup_dns(&cfg.resolv_conf, pod)
}

/// Load the pod's firewall rules through the configured loader.
pub fn apply_firewall_rules(cfg: &NetConfig, pod: &mut Pod) -> Result<()> {
    crate::firewall::apply_rules(&cfg.firewall_loader, pod)
}
