//! Request builder for outgoing netlink messages.
//!
//! Requests are a fixed header, one family-specific info struct, and a
//! 4-byte-aligned TLV attribute stream, all inside a bounded buffer.
//! Appends that would overflow the buffer fail with
//! [`Error::BufferExhausted`] instead of growing it; every request this
//! agent sends fits comfortably, so hitting the cap means a bug upstream.

use zerocopy::{Immutable, IntoBytes};

use super::attr::{NLA_HDRLEN, NlAttr, nla_align};
use super::message::{NLMSG_HDRLEN, NlMsgHdr, nlmsg_align};
use crate::error::{Error, Result};

/// Attribute buffer capacity of one request, beyond the netlink header.
pub const REQ_BUFFER_LEN: usize = 1024;

/// Builder for constructing netlink request messages.
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    buf: Vec<u8>,
}

impl MessageBuilder {
    /// Create a new request with the given type and flags.
    pub fn new(msg_type: u16, flags: u16) -> Self {
        let header = NlMsgHdr::new(msg_type, flags);
        let mut buf = Vec::with_capacity(NLMSG_HDRLEN + REQ_BUFFER_LEN);
        buf.extend_from_slice(header.as_bytes());
        buf.resize(NLMSG_HDRLEN, 0);
        Self { buf }
    }

    /// Get the current message length.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Check if the message is empty (header only).
    pub fn is_empty(&self) -> bool {
        self.buf.len() == NLMSG_HDRLEN
    }

    fn ensure_capacity(&self, additional: usize) -> Result<()> {
        let needed = nlmsg_align(self.buf.len() + additional);
        let capacity = NLMSG_HDRLEN + REQ_BUFFER_LEN;
        if needed > capacity {
            return Err(Error::BufferExhausted { needed, capacity });
        }
        Ok(())
    }

    /// Append raw bytes to the message (with alignment padding).
    pub fn append_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.ensure_capacity(data.len())?;
        self.buf.extend_from_slice(data);
        let aligned = nlmsg_align(self.buf.len());
        self.buf.resize(aligned, 0);
        Ok(())
    }

    /// Append a fixed-size info struct to the message.
    pub fn append<T: IntoBytes + Immutable>(&mut self, data: &T) -> Result<()> {
        self.append_bytes(data.as_bytes())
    }

    /// Append an attribute with the given type and data.
    pub fn append_attr(&mut self, attr_type: u16, data: &[u8]) -> Result<()> {
        self.ensure_capacity(NLA_HDRLEN + data.len())?;
        let attr = NlAttr::new(attr_type, data.len());
        self.buf.extend_from_slice(attr.as_bytes());
        self.buf.extend_from_slice(data);
        let aligned = nla_align(self.buf.len());
        self.buf.resize(aligned, 0);
        Ok(())
    }

    /// Append a u32 attribute (native endian).
    pub fn append_attr_u32(&mut self, attr_type: u16, value: u32) -> Result<()> {
        self.append_attr(attr_type, &value.to_ne_bytes())
    }

    /// Append a null-terminated string attribute.
    pub fn append_attr_str(&mut self, attr_type: u16, value: &str) -> Result<()> {
        let mut data = value.as_bytes().to_vec();
        data.push(0);
        self.append_attr(attr_type, &data)
    }

    /// Set the sequence number.
    pub fn set_seq(&mut self, seq: u32) {
        self.buf[8..12].copy_from_slice(&seq.to_ne_bytes());
    }

    /// Set the port ID.
    pub fn set_pid(&mut self, pid: u32) {
        self.buf[12..16].copy_from_slice(&pid.to_ne_bytes());
    }

    /// Finalize and return the message bytes.
    pub fn finish(mut self) -> Vec<u8> {
        let len = self.buf.len() as u32;
        self.buf[0..4].copy_from_slice(&len.to_ne_bytes());
        self.buf
    }

    /// Get the current buffer for inspection.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlink::attr::AttrIter;
    use crate::netlink::message::{NLM_F_REQUEST, NlMsgType};

    #[test]
    fn header_only_message() {
        let msg = MessageBuilder::new(NlMsgType::RTM_NEWLINK, NLM_F_REQUEST).finish();
        assert_eq!(msg.len(), NLMSG_HDRLEN);

        let header = NlMsgHdr::from_bytes(&msg).unwrap();
        assert_eq!(header.nlmsg_len as usize, NLMSG_HDRLEN);
        assert_eq!(header.nlmsg_type, NlMsgType::RTM_NEWLINK);
        assert_eq!(header.nlmsg_flags, NLM_F_REQUEST);
    }

    #[test]
    fn length_and_seq_are_stamped() {
        let mut builder = MessageBuilder::new(NlMsgType::RTM_NEWADDR, NLM_F_REQUEST);
        builder.append_attr_u32(1, 0x12345678).unwrap();
        builder.set_seq(42);
        builder.set_pid(99);

        let msg = builder.finish();
        let header = NlMsgHdr::from_bytes(&msg).unwrap();
        assert_eq!(header.nlmsg_len as usize, msg.len());
        assert_eq!(header.nlmsg_seq, 42);
        assert_eq!(header.nlmsg_pid, 99);
    }

    #[test]
    fn string_attr_is_null_terminated_and_padded() {
        let mut builder = MessageBuilder::new(NlMsgType::RTM_SETLINK, NLM_F_REQUEST);
        builder.append_attr_str(3, "net1").unwrap();
        let msg = builder.finish();

        let attrs: Vec<_> = AttrIter::new(&msg[NLMSG_HDRLEN..]).collect();
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs[0].0, 3);
        assert_eq!(attrs[0].1, b"net1\0");
        // Total length stays 4-byte aligned.
        assert_eq!(msg.len() % 4, 0);
    }

    #[test]
    fn buffer_exhaustion() {
        let mut builder = MessageBuilder::new(NlMsgType::RTM_NEWROUTE, NLM_F_REQUEST);
        let chunk = [0u8; 256];
        for _ in 0..3 {
            builder.append_attr(1, &chunk).unwrap();
        }
        let err = builder.append_attr(1, &chunk).unwrap_err();
        assert!(matches!(err, Error::BufferExhausted { .. }));
    }
}
