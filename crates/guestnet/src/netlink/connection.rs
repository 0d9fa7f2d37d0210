//! Routing-netlink connection with acknowledged requests.

use tracing::trace;

use super::builder::MessageBuilder;
use super::message::{MessageIter, NlMsgError};
use super::socket::{NetlinkSocket, Protocol};
use super::types::link::{IfInfoMsg, IflaAttr, iff};
use crate::error::{Error, Result};

/// A routing-netlink connection.
///
/// Owns one socket; each orchestration pass opens its own connection and
/// drops it when done. Requests are acknowledged: the kernel's reply is
/// read back and its embedded errno decoded, so a rejected request fails
/// here rather than silently disappearing.
pub struct Connection {
    socket: NetlinkSocket,
}

impl Connection {
    /// Open a new routing-netlink connection.
    pub fn new() -> Result<Self> {
        Ok(Self {
            socket: NetlinkSocket::new(Protocol::Route)?,
        })
    }

    /// Get the underlying socket.
    pub fn socket(&self) -> &NetlinkSocket {
        &self.socket
    }

    /// Send a request and wait for its acknowledgement.
    pub fn request_ack(&self, mut builder: MessageBuilder) -> Result<()> {
        let seq = self.socket.next_seq();
        builder.set_seq(seq);
        builder.set_pid(self.socket.pid());

        let msg = builder.finish();
        trace!(len = msg.len(), seq, "sending netlink request");
        self.socket.send(&msg)?;

        let response = self.socket.recv_msg()?;
        check_ack(&response, seq)
    }

    /// Bring a network interface up by index.
    pub fn set_link_up_by_index(&self, ifindex: u32) -> Result<()> {
        self.set_link_state_by_index(ifindex, true)
    }

    /// Bring a network interface down by index.
    pub fn set_link_down_by_index(&self, ifindex: u32) -> Result<()> {
        self.set_link_state_by_index(ifindex, false)
    }

    /// Set the administrative state of an interface.
    pub fn set_link_state_by_index(&self, ifindex: u32, up: bool) -> Result<()> {
        let ifinfo = IfInfoMsg::new()
            .with_index(ifindex as i32)
            .with_flags(if up { iff::UP } else { 0 })
            .with_change(iff::UP);

        let mut builder = super::ack_request(super::message::NlMsgType::RTM_SETLINK);
        builder.append(&ifinfo)?;

        self.request_ack(builder)
    }

    /// Set the MTU of an interface.
    pub fn set_link_mtu_by_index(&self, ifindex: u32, mtu: u32) -> Result<()> {
        let ifinfo = IfInfoMsg::new().with_index(ifindex as i32);

        let mut builder = super::ack_request(super::message::NlMsgType::RTM_SETLINK);
        builder.append(&ifinfo)?;
        builder.append_attr_u32(IflaAttr::Mtu as u16, mtu)?;

        self.request_ack(builder)
    }

    /// Rename an interface.
    pub fn set_link_name_by_index(&self, ifindex: u32, new_name: &str) -> Result<()> {
        crate::util::ifname::validate(new_name)?;

        let ifinfo = IfInfoMsg::new().with_index(ifindex as i32);

        let mut builder = super::ack_request(super::message::NlMsgType::RTM_SETLINK);
        builder.append(&ifinfo)?;
        builder.append_attr_str(IflaAttr::Ifname as u16, new_name)?;

        self.request_ack(builder)
    }
}

/// Scan a reply buffer for the acknowledgement of sequence `seq`.
///
/// An `NLMSG_ERROR` payload with errno 0 is a plain ACK; a non-zero errno
/// is the kernel rejecting the request.
pub(crate) fn check_ack(data: &[u8], seq: u32) -> Result<()> {
    for result in MessageIter::new(data) {
        let (header, payload) = result?;

        if header.nlmsg_seq != seq {
            continue;
        }

        if header.is_error() {
            let err = NlMsgError::from_bytes(payload)?;
            if !err.is_ack() {
                return Err(Error::from_errno(err.error));
            }
            return Ok(());
        }
    }

    Err(Error::InvalidMessage("expected ACK message".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlink::message::{
        NLM_F_REQUEST, NLMSG_HDRLEN, NlMsgHdr, NlMsgType, nlmsg_align,
    };

    fn ack_buffer(seq: u32, errno: i32) -> Vec<u8> {
        let inner = NlMsgHdr::new(NlMsgType::RTM_NEWADDR, NLM_F_REQUEST);
        let mut payload = errno.to_ne_bytes().to_vec();
        payload.extend_from_slice(inner.as_bytes());

        let mut hdr = NlMsgHdr::new(NlMsgType::ERROR, 0);
        hdr.nlmsg_seq = seq;
        hdr.nlmsg_len = (NLMSG_HDRLEN + payload.len()) as u32;

        let mut buf = hdr.as_bytes().to_vec();
        buf.extend_from_slice(&payload);
        buf.resize(nlmsg_align(buf.len()), 0);
        buf
    }

    #[test]
    fn ack_with_zero_errno_succeeds() {
        assert!(check_ack(&ack_buffer(5, 0), 5).is_ok());
    }

    #[test]
    fn ack_with_errno_is_kernel_error() {
        let err = check_ack(&ack_buffer(5, -17), 5).unwrap_err();
        assert!(err.is_already_exists());
    }

    #[test]
    fn foreign_sequence_is_skipped() {
        // An ack for a different request must not satisfy this one.
        let err = check_ack(&ack_buffer(4, 0), 5).unwrap_err();
        assert!(matches!(err, Error::InvalidMessage(_)));
    }

    #[test]
    fn empty_reply_is_invalid() {
        assert!(check_ack(&[], 1).is_err());
    }
}
