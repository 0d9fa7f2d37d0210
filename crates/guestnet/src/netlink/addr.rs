//! IPv4 address add/delete requests.

use super::builder::MessageBuilder;
use super::connection::Connection;
use super::message::{NLM_F_ACK, NLM_F_CREATE, NLM_F_EXCL, NLM_F_REQUEST, NlMsgType};
use super::types::AF_INET;
use super::types::addr::{IfAddrMsg, IfaAttr};
use crate::error::Result;

/// Build an address-add request.
///
/// Create-exclusive: adding an address that already exists fails with
/// EEXIST instead of silently succeeding.
pub fn build_addr_add(ifindex: u32, addr: [u8; 4], prefix_len: u8) -> Result<MessageBuilder> {
    let mut builder = MessageBuilder::new(
        NlMsgType::RTM_NEWADDR,
        NLM_F_REQUEST | NLM_F_ACK | NLM_F_CREATE | NLM_F_EXCL,
    );
    append_addr(&mut builder, ifindex, addr, prefix_len)?;
    Ok(builder)
}

/// Build an address-delete request.
pub fn build_addr_del(ifindex: u32, addr: [u8; 4], prefix_len: u8) -> Result<MessageBuilder> {
    let mut builder = MessageBuilder::new(NlMsgType::RTM_DELADDR, NLM_F_REQUEST | NLM_F_ACK);
    append_addr(&mut builder, ifindex, addr, prefix_len)?;
    Ok(builder)
}

fn append_addr(
    builder: &mut MessageBuilder,
    ifindex: u32,
    addr: [u8; 4],
    prefix_len: u8,
) -> Result<()> {
    let ifaddr = IfAddrMsg::new()
        .with_family(AF_INET)
        .with_prefixlen(prefix_len)
        .with_index(ifindex);

    builder.append(&ifaddr)?;
    builder.append_attr(IfaAttr::Local as u16, &addr)?;
    Ok(())
}

impl Connection {
    /// Add an IPv4 address to an interface by index.
    pub fn add_address_by_index(
        &self,
        ifindex: u32,
        addr: [u8; 4],
        prefix_len: u8,
    ) -> Result<()> {
        self.request_ack(build_addr_add(ifindex, addr, prefix_len)?)
    }

    /// Delete an IPv4 address from an interface by index.
    pub fn del_address_by_index(
        &self,
        ifindex: u32,
        addr: [u8; 4],
        prefix_len: u8,
    ) -> Result<()> {
        self.request_ack(build_addr_del(ifindex, addr, prefix_len)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlink::attr::AttrIter;
    use crate::netlink::message::{NLMSG_HDRLEN, NlMsgHdr};

    #[test]
    fn add_is_create_exclusive() {
        let msg = build_addr_add(2, [10, 0, 2, 15], 24).unwrap().finish();
        let header = NlMsgHdr::from_bytes(&msg).unwrap();

        assert_eq!(header.nlmsg_type, NlMsgType::RTM_NEWADDR);
        assert_ne!(header.nlmsg_flags & NLM_F_CREATE, 0);
        assert_ne!(header.nlmsg_flags & NLM_F_EXCL, 0);
        assert_ne!(header.nlmsg_flags & NLM_F_ACK, 0);
    }

    #[test]
    fn delete_carries_no_create_constraint() {
        let msg = build_addr_del(2, [10, 0, 2, 15], 24).unwrap().finish();
        let header = NlMsgHdr::from_bytes(&msg).unwrap();

        assert_eq!(header.nlmsg_type, NlMsgType::RTM_DELADDR);
        assert_eq!(header.nlmsg_flags & NLM_F_CREATE, 0);
        assert_eq!(header.nlmsg_flags & NLM_F_EXCL, 0);
    }

    #[test]
    fn payload_shape() {
        let msg = build_addr_add(3, [192, 168, 1, 5], 16).unwrap().finish();
        let body = &msg[NLMSG_HDRLEN..];

        let ifaddr_len = std::mem::size_of::<IfAddrMsg>();
        assert_eq!(body[0], AF_INET); // ifa_family
        assert_eq!(body[1], 16); // ifa_prefixlen
        assert_eq!(
            u32::from_ne_bytes(body[4..8].try_into().unwrap()),
            3 // ifa_index
        );

        let attrs: Vec<_> = AttrIter::new(&body[ifaddr_len..]).collect();
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs[0].0, IfaAttr::Local as u16);
        assert_eq!(attrs[0].1, &[192, 168, 1, 5]);
    }
}
