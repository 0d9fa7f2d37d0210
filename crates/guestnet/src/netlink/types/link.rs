//! Link (network interface) message types.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Interface info message (struct ifinfomsg).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct IfInfoMsg {
    /// Address family (usually AF_UNSPEC).
    pub ifi_family: u8,
    /// Padding.
    pub __ifi_pad: u8,
    /// Device type (ARPHRD_*).
    pub ifi_type: u16,
    /// Interface index.
    pub ifi_index: i32,
    /// Device flags (IFF_*).
    pub ifi_flags: u32,
    /// Change mask.
    pub ifi_change: u32,
}

impl IfInfoMsg {
    /// Create a new interface info message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the interface index.
    pub fn with_index(mut self, index: i32) -> Self {
        self.ifi_index = index;
        self
    }

    /// Set the device flags.
    pub fn with_flags(mut self, flags: u32) -> Self {
        self.ifi_flags = flags;
        self
    }

    /// Set the change mask.
    pub fn with_change(mut self, change: u32) -> Self {
        self.ifi_change = change;
        self
    }
}

/// Interface link attributes (IFLA_*), the subset this agent sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum IflaAttr {
    Unspec = 0,
    Address = 1,
    Ifname = 3,
    Mtu = 4,
}

/// Device flags (IFF_*).
pub mod iff {
    pub const UP: u32 = 0x1;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ifinfomsg_layout() {
        // Must mirror the kernel ABI exactly.
        assert_eq!(std::mem::size_of::<IfInfoMsg>(), 16);
    }
}
