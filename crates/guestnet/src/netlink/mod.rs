//! Minimal routing-netlink implementation for guest network setup.
//!
//! This is deliberately not a general netlink client: only the request
//! shapes the agent needs exist (link attribute set, address add/delete,
//! route add/delete), plus the kobject-uevent listener used for device
//! hotplug waits. Requests are acknowledged; replies are decoded no further
//! than the embedded errno.

pub mod addr;
pub mod attr;
mod builder;
pub mod connection;
pub mod message;
pub mod route;
mod socket;
pub mod types;
pub mod uevent;

pub use builder::{MessageBuilder, REQ_BUFFER_LEN};
pub use connection::Connection;
pub use route::RouteRequest;
pub use socket::{NetlinkSocket, Protocol};
pub use uevent::{Uevent, UeventListener};

use message::{NLM_F_ACK, NLM_F_REQUEST};

/// Start an acknowledged request of the given type.
pub(crate) fn ack_request(msg_type: u16) -> MessageBuilder {
    MessageBuilder::new(msg_type, NLM_F_REQUEST | NLM_F_ACK)
}
