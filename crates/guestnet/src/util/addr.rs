//! IPv4 address, netmask, and MAC parsing/formatting utilities.

use crate::error::{Error, Result};

/// Parse a dotted-quad IPv4 address into its four octets.
///
/// Accepts 1–4 dot-separated decimal groups, each 0–255; missing trailing
/// groups are zero-filled, so `"10.0.0"` parses to `10.0.0.0`. Empty groups,
/// out-of-range values, and trailing garbage are rejected.
pub fn parse_ipv4(text: &str) -> Result<[u8; 4]> {
    let mut octets = [0u8; 4];
    let mut groups = text.split('.');

    for (i, slot) in octets.iter_mut().enumerate() {
        let group = match groups.next() {
            Some(g) => g,
            // Fewer than four groups: remaining octets stay zero.
            None => break,
        };
        if group.is_empty() || !group.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::MalformedAddress(text.to_string()));
        }
        *slot = group
            .parse::<u8>()
            .map_err(|_| Error::MalformedAddress(text.to_string()))?;
        if i == 3 && groups.next().is_some() {
            // More than four groups.
            return Err(Error::MalformedAddress(text.to_string()));
        }
    }

    Ok(octets)
}

/// Compute the prefix length of a dotted-quad netmask.
///
/// The mask must be a contiguous run of leading ones: the inverted mask has
/// to be of the form 2^n - 1.
pub fn mask_to_prefix_len(mask: [u8; 4]) -> Result<u8> {
    let bits = u32::from_be_bytes(mask);
    let host = !bits;

    if host & host.wrapping_add(1) != 0 {
        return Err(Error::InvalidMask(format!(
            "{}.{}.{}.{}",
            mask[0], mask[1], mask[2], mask[3]
        )));
    }

    Ok(bits.count_ones() as u8)
}

/// Parse a netmask given either as a prefix length or as a dotted quad.
///
/// A plain decimal integer is treated as a prefix length and range-checked
/// to 0–32; `"24"` always means /24, never the address 24.0.0.0. Anything
/// else falls back to dotted-quad parsing plus [`mask_to_prefix_len`].
pub fn parse_netmask(text: &str) -> Result<u8> {
    if let Ok(len) = text.parse::<u32>() {
        if len > 32 {
            return Err(Error::InvalidMask(text.to_string()));
        }
        return Ok(len as u8);
    }

    mask_to_prefix_len(parse_ipv4(text)?)
}

/// Split a route destination into its address part and optional mask suffix.
///
/// `"10.1.0.0/16"` yields `("10.1.0.0", Some("16"))`; a destination without
/// a slash is returned whole.
pub fn split_destination(text: &str) -> (&str, Option<&str>) {
    match text.split_once('/') {
        Some((addr, mask)) => (addr, Some(mask)),
        None => (text, None),
    }
}

/// Format a hardware address as canonical lowercase colon-hex.
pub fn format_mac(bytes: &[u8; 6]) -> String {
    format!(
        "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5]
    )
}
