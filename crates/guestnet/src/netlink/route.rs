//! IPv4 route add/delete requests.

use super::builder::MessageBuilder;
use super::connection::Connection;
use super::message::{NLM_F_ACK, NLM_F_CREATE, NLM_F_EXCL, NLM_F_REQUEST, NlMsgType};
use super::types::AF_INET;
use super::types::route::{RtMsg, RtaAttr, rt_scope, rt_table, rtn, rtprot};
use crate::error::{Error, Result};
use crate::util::addr::{parse_ipv4, parse_netmask, split_destination};

/// One fully resolved route request: main table, universe scope, unicast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRequest {
    /// Destination address and prefix length; `None` is the default route.
    pub destination: Option<([u8; 4], u8)>,
    /// Gateway address.
    pub gateway: Option<[u8; 4]>,
    /// Outgoing interface index.
    pub oif: Option<u32>,
}

impl RouteRequest {
    /// Parse a route from its textual destination and gateway.
    ///
    /// `"default"`, `"any"`, and `"all"` mean the default route. A concrete
    /// destination defaults to /32, narrowed by an explicit CIDR suffix;
    /// the split is done on owned substrings, the input is never modified.
    pub fn parse(destination: &str, gateway: Option<&str>, oif: Option<u32>) -> Result<Self> {
        if destination.is_empty() {
            return Err(Error::InvalidConfig("route destination is empty".into()));
        }

        let gateway = match gateway {
            Some(gw) => Some(parse_ipv4(gw)?),
            None => None,
        };

        let destination = match destination {
            "default" | "any" | "all" => None,
            dest => {
                let (addr_part, mask_part) = split_destination(dest);
                let addr = parse_ipv4(addr_part)?;
                let prefix_len = match mask_part {
                    Some(mask) => parse_netmask(mask)?,
                    None => 32,
                };
                Some((addr, prefix_len))
            }
        };

        Ok(Self {
            destination,
            gateway,
            oif,
        })
    }

    /// Build the add request (create-exclusive).
    pub fn build(&self) -> Result<MessageBuilder> {
        let mut builder = MessageBuilder::new(
            NlMsgType::RTM_NEWROUTE,
            NLM_F_REQUEST | NLM_F_ACK | NLM_F_CREATE | NLM_F_EXCL,
        );
        self.append_to(&mut builder)?;
        Ok(builder)
    }

    /// Build the delete request.
    pub fn build_delete(&self) -> Result<MessageBuilder> {
        let mut builder = MessageBuilder::new(NlMsgType::RTM_DELROUTE, NLM_F_REQUEST | NLM_F_ACK);
        self.append_to(&mut builder)?;
        Ok(builder)
    }

    fn append_to(&self, builder: &mut MessageBuilder) -> Result<()> {
        let dst_len = self.destination.map(|(_, len)| len).unwrap_or(0);

        let rtmsg = RtMsg::new()
            .with_family(AF_INET)
            .with_dst_len(dst_len)
            .with_table(rt_table::MAIN)
            .with_protocol(rtprot::BOOT)
            .with_scope(rt_scope::UNIVERSE)
            .with_type(rtn::UNICAST);

        builder.append(&rtmsg)?;

        if let Some(gw) = self.gateway {
            builder.append_attr(RtaAttr::Gateway as u16, &gw)?;
        }

        if let Some(oif) = self.oif {
            builder.append_attr_u32(RtaAttr::Oif as u16, oif)?;
        }

        if let Some((addr, _)) = self.destination {
            builder.append_attr(RtaAttr::Dst as u16, &addr)?;
        }

        Ok(())
    }
}

impl Connection {
    /// Install a route.
    pub fn add_route(&self, route: &RouteRequest) -> Result<()> {
        self.request_ack(route.build()?)
    }

    /// Remove a route.
    pub fn del_route(&self, route: &RouteRequest) -> Result<()> {
        self.request_ack(route.build_delete()?)
    }
}
