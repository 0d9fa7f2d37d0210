//! Network device discovery and removal.
//!
//! Interfaces handed to the guest may still be settling when configuration
//! starts: a hot-added virtio NIC takes a moment to appear, and udev may be
//! mid-rename. Resolution therefore goes through sysfs and the kernel's
//! hotplug event stream rather than assuming the device exists.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::net::UdpSocket;
use std::os::unix::io::AsRawFd;
use std::path::Path;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::netlink::UeventListener;
use crate::util::addr::format_mac;
use crate::util::ifname;

/// Read an interface's kernel index from sysfs.
pub fn ifindex(sysfs_net: &Path, name: &str) -> Result<u32> {
    ifname::name_to_index(sysfs_net, name)
}

/// Wait until a named interface is present.
///
/// An empty name succeeds immediately without touching any socket (no
/// device is expected). If the sysfs index file already exists the wait is
/// over before it starts; otherwise hotplug events are consumed until one
/// announces the interface, the sysfs path becomes visible, or the optional
/// deadline expires.
pub fn wait_for_interface(
    sysfs_net: &Path,
    name: &str,
    timeout: Option<Duration>,
) -> Result<()> {
    if name.is_empty() {
        return Ok(());
    }

    let index_path = sysfs_net.join(name).join("ifindex");
    if index_path.exists() {
        debug!(name, "interface already present");
        return Ok(());
    }

    let listener = UeventListener::new()?;
    listener.set_recv_timeout(timeout)?;
    let deadline = timeout.map(|t| Instant::now() + t);

    // The interface may have appeared between the first check and the
    // socket bind; events from before the bind are lost.
    if index_path.exists() {
        debug!(name, "interface appeared during socket setup");
        return Ok(());
    }

    loop {
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                return Err(Error::DeviceNotFound {
                    name: name.to_string(),
                });
            }
        }

        let event = match listener.recv() {
            Ok(event) => event,
            Err(Error::Io(e))
                if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) =>
            {
                return Err(Error::DeviceNotFound {
                    name: name.to_string(),
                });
            }
            Err(e) => return Err(e),
        };

        if index_path.exists() {
            info!(name, "interface detected");
            return Ok(());
        }

        if !event.names_interface() {
            continue;
        }

        if event.interface.as_deref() == Some(name) {
            info!(name, "interface detected");
            return Ok(());
        }
    }
}

/// Read the hardware address of `ifname` over an already-open AF_INET
/// datagram socket.
///
/// The socket is caller-provided so that a scan over many interfaces can
/// reuse one descriptor.
fn hardware_address(sock: &UdpSocket, ifname: &str) -> Result<[u8; 6]> {
    ifname::validate(ifname)?;

    // SAFETY: ifreq is a plain-old-data struct; all-zero is a valid
    // initial state.
    let mut ifr: libc::ifreq = unsafe { std::mem::zeroed() };
    for (slot, byte) in ifr.ifr_name.iter_mut().zip(ifname.bytes()) {
        *slot = byte as libc::c_char;
    }

    // SAFETY: fd is a valid open socket and ifr points to a properly
    // initialized ifreq that outlives the call.
    let ret = unsafe { libc::ioctl(sock.as_raw_fd(), libc::SIOCGIFHWADDR, &mut ifr) };
    if ret < 0 {
        return Err(io::Error::last_os_error().into());
    }

    // SAFETY: SIOCGIFHWADDR fills ifr_ifru with a sockaddr whose sa_data
    // holds the six octets of the hardware address.
    let sa_data = unsafe { ifr.ifr_ifru.ifru_hwaddr.sa_data };
    let mut mac = [0u8; 6];
    for (slot, byte) in mac.iter_mut().zip(sa_data.iter()) {
        *slot = *byte as u8;
    }
    Ok(mac)
}

/// Check whether `ifname` carries the expected EUI-48 hardware address.
///
/// The comparison is case-insensitive against canonical colon-hex.
pub fn hardware_address_matches(
    sock: &UdpSocket,
    expected_mac: &str,
    ifname: &str,
) -> Result<bool> {
    if expected_mac.is_empty() {
        return Err(Error::InvalidConfig("empty hardware address".into()));
    }

    let mac = hardware_address(sock, ifname)?;
    Ok(format_mac(&mac).eq_ignore_ascii_case(expected_mac))
}

/// Verify that a named interface carries the expected hardware address.
pub fn verify_device_mac(expected_mac: &str, device: &str) -> Result<()> {
    let sock = UdpSocket::bind("0.0.0.0:0")?;

    if hardware_address_matches(&sock, expected_mac, device)? {
        Ok(())
    } else {
        Err(Error::MacMismatch {
            device: device.to_string(),
            mac_addr: expected_mac.to_string(),
        })
    }
}

/// Find the name of the interface carrying the given hardware address.
///
/// Enumerates local interface addresses, skipping entries with no address,
/// and returns the first name whose hardware address matches.
pub fn resolve_name_by_mac(expected_mac: &str) -> Result<String> {
    if expected_mac.is_empty() {
        return Err(Error::InvalidConfig("empty hardware address".into()));
    }

    let sock = UdpSocket::bind("0.0.0.0:0")?;

    for ifa in nix::ifaddrs::getifaddrs().map_err(io::Error::from)? {
        if ifa.address.is_none() {
            continue;
        }

        match hardware_address_matches(&sock, expected_mac, &ifa.interface_name) {
            Ok(true) => {
                debug!(mac = expected_mac, device = %ifa.interface_name, "resolved interface by MAC");
                return Ok(ifa.interface_name);
            }
            // Interfaces the ioctl rejects are simply not a match.
            Ok(false) | Err(_) => continue,
        }
    }

    Err(Error::DeviceNotFound {
        name: expected_mac.to_string(),
    })
}

/// Write a sysfs attribute, whole value in one write.
fn write_attr(path: &Path, value: &str) -> Result<()> {
    let mut file = OpenOptions::new().write(true).open(path)?;
    file.write_all(value.as_bytes())?;
    Ok(())
}

/// Hot-remove the device backing a network interface.
///
/// `<sysfs_net>/<name>` is a symlink into the device tree; the owning PCI
/// device directory sits three levels above the resolved target, and
/// writing `1` to its `remove` attribute detaches it.
pub fn remove_device(sysfs_net: &Path, name: &str) -> Result<()> {
    ifname::validate(name)?;

    let real = std::fs::canonicalize(sysfs_net.join(name))?;
    let parent = real
        .ancestors()
        .nth(3)
        .ok_or_else(|| Error::DeviceNotFound {
            name: name.to_string(),
        })?;

    let remove = parent.join("remove");
    debug!(device = name, path = %remove.display(), "removing device");
    write_attr(&remove, "1\n")
}

/// Trigger a PCI bus rescan so hot-added NICs surface.
pub fn rescan_pci_bus(rescan_path: &Path) -> Result<()> {
    write_attr(rescan_path, "1\n")?;
    info!("pci bus rescan triggered");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wait_for_empty_name_is_immediate() {
        // No device expected, no socket touched; the sysfs root does not
        // even have to exist.
        assert!(wait_for_interface(Path::new("/nonexistent"), "", None).is_ok());
    }

    #[test]
    fn wait_for_existing_interface_is_immediate() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("eth0")).unwrap();
        std::fs::write(dir.path().join("eth0/ifindex"), "2\n").unwrap();

        assert!(wait_for_interface(dir.path(), "eth0", None).is_ok());
    }

    #[test]
    fn wait_for_missing_interface_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let result = wait_for_interface(dir.path(), "ghost0", Some(Duration::from_millis(50)));
        assert!(result.is_err());
    }

    #[test]
    fn loopback_hardware_address_is_zero() {
        let sock = UdpSocket::bind("127.0.0.1:0").unwrap();
        assert!(hardware_address_matches(&sock, "00:00:00:00:00:00", "lo").unwrap());
        assert!(!hardware_address_matches(&sock, "52:54:00:12:34:56", "lo").unwrap());
    }

    #[test]
    fn resolve_name_by_mac_no_match() {
        // No interface carries the broadcast address.
        assert!(resolve_name_by_mac("ff:ff:ff:ff:ff:ff").is_err());
    }

    #[test]
    fn resolve_rejects_empty_mac() {
        assert!(matches!(
            resolve_name_by_mac(""),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn remove_device_writes_parent_attribute() {
        let dir = tempfile::tempdir().unwrap();
        let device_dir = dir.path().join("devices/pci0000:00/0000:00:03.0");
        let net_dir = device_dir.join("virtio0/net/eth0");
        std::fs::create_dir_all(&net_dir).unwrap();
        std::fs::write(device_dir.join("remove"), "").unwrap();

        let class_net = dir.path().join("class/net");
        std::fs::create_dir_all(&class_net).unwrap();
        std::os::unix::fs::symlink(&net_dir, class_net.join("eth0")).unwrap();

        remove_device(&class_net, "eth0").unwrap();
        assert_eq!(
            std::fs::read_to_string(device_dir.join("remove")).unwrap(),
            "1\n"
        );
    }

    #[test]
    fn rescan_writes_trigger() {
        let dir = tempfile::tempdir().unwrap();
        let rescan = dir.path().join("rescan");
        std::fs::write(&rescan, "").unwrap();

        rescan_pci_bus(&rescan).unwrap();
        assert_eq!(std::fs::read_to_string(&rescan).unwrap(), "1\n");
    }
}
