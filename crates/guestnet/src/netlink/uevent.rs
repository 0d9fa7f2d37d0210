//! Kernel hotplug (kobject uevent) notifications.
//!
//! Uevents are NUL-separated `KEY=value` ASCII datagrams broadcast on a
//! netlink multicast group when devices appear, change, or vanish. The
//! device wait loop reads them to learn when a NIC has been hot-added.

use std::time::Duration;

use super::socket::{NetlinkSocket, Protocol};
use crate::error::Result;

/// Multicast group for kernel uevents.
const UEVENT_GROUP: u32 = 1;

/// One hotplug notification, discarded after evaluation.
///
/// Only the fields the device wait cares about are retained; the first
/// occurrence of each key wins.
#[derive(Debug, Clone, Default)]
pub struct Uevent {
    /// Action type: "add", "remove", "change", ...
    pub action: Option<String>,
    /// Module alias of the device.
    pub modalias: Option<String>,
    /// Driver name.
    pub driver: Option<String>,
    /// Device path in sysfs.
    pub devpath: Option<String>,
    /// Network interface name, for net subsystem events.
    pub interface: Option<String>,
}

impl Uevent {
    /// Parse a raw uevent datagram.
    ///
    /// Scans NUL-separated segments for the keys of interest; segments
    /// without an `=` (such as the leading `action@devpath` summary line)
    /// and unknown keys are skipped.
    pub fn parse(data: &[u8]) -> Self {
        let mut event = Self::default();

        for segment in data.split(|&b| b == 0) {
            let text = match std::str::from_utf8(segment) {
                Ok(t) => t,
                Err(_) => continue,
            };

            let (key, value) = match text.split_once('=') {
                Some(kv) => kv,
                None => continue,
            };

            let slot = match key {
                "ACTION" => &mut event.action,
                "MODALIAS" => &mut event.modalias,
                "DRIVER" => &mut event.driver,
                "DEVPATH" => &mut event.devpath,
                "INTERFACE" => &mut event.interface,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.to_string());
            }
        }

        event
    }

    /// Whether this event names a network interface action.
    ///
    /// Events without both an action and an interface are noise for the
    /// device wait and get discarded.
    pub fn names_interface(&self) -> bool {
        self.action.is_some() && self.interface.is_some()
    }
}

/// Blocking listener on the kernel uevent multicast group.
pub struct UeventListener {
    socket: NetlinkSocket,
}

impl UeventListener {
    /// Open a socket subscribed to kernel device events.
    pub fn new() -> Result<Self> {
        let mut socket = NetlinkSocket::new(Protocol::KobjectUevent)?;
        socket.add_membership(UEVENT_GROUP)?;
        Ok(Self { socket })
    }

    /// Arm a receive timeout; `None` blocks indefinitely.
    pub fn set_recv_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.socket.set_recv_timeout(timeout)
    }

    /// Block until the next uevent arrives.
    pub fn recv(&self) -> Result<Uevent> {
        let data = self.socket.recv_msg()?;
        Ok(Uevent::parse(&data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_net_add_event() {
        let msg = b"add@/devices/pci0000:00/0000:00:03.0/virtio0/net/eth1\0\
ACTION=add\0DEVPATH=/devices/pci0000:00/0000:00:03.0/virtio0/net/eth1\0\
SUBSYSTEM=net\0INTERFACE=eth1\0IFINDEX=3\0SEQNUM=1234\0";

        let event = Uevent::parse(msg);
        assert_eq!(event.action.as_deref(), Some("add"));
        assert_eq!(event.interface.as_deref(), Some("eth1"));
        assert_eq!(
            event.devpath.as_deref(),
            Some("/devices/pci0000:00/0000:00:03.0/virtio0/net/eth1")
        );
        assert!(event.names_interface());
    }

    #[test]
    fn parse_non_net_event() {
        let msg = b"add@/devices/virtual/block/loop0\0ACTION=add\0\
DEVPATH=/devices/virtual/block/loop0\0SUBSYSTEM=block\0DEVNAME=loop0\0";

        let event = Uevent::parse(msg);
        assert_eq!(event.action.as_deref(), Some("add"));
        assert!(event.interface.is_none());
        assert!(!event.names_interface());
    }

    #[test]
    fn first_occurrence_of_a_key_wins() {
        let msg = b"ACTION=add\0ACTION=remove\0INTERFACE=eth0\0";
        let event = Uevent::parse(msg);
        assert_eq!(event.action.as_deref(), Some("add"));
    }

    #[test]
    fn parse_tolerates_garbage() {
        let event = Uevent::parse(b"\0\0no-equals-sign\0\xff\xfe\0DRIVER=virtio_net\0");
        assert_eq!(event.driver.as_deref(), Some("virtio_net"));
        assert!(!event.names_interface());
    }
}
