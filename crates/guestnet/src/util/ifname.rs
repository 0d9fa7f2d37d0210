//! Interface name validation and sysfs index lookup.

use std::path::Path;

use crate::error::{Error, Result};

/// Maximum interface name length (including null terminator).
pub const IFNAMSIZ: usize = 16;

/// Validate an interface name before it is used in a sysfs path or ioctl.
pub fn validate(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidConfig("empty interface name".to_string()));
    }

    if name.len() >= IFNAMSIZ {
        return Err(Error::InvalidConfig(format!(
            "interface name '{}' too long (max {} chars)",
            name,
            IFNAMSIZ - 1
        )));
    }

    if name.contains('/') || name.contains('\0') || name.chars().any(|c| c.is_whitespace()) {
        return Err(Error::InvalidConfig(format!(
            "interface name '{}' contains invalid characters",
            name
        )));
    }

    Ok(())
}

/// Read an interface's kernel index from `<sysfs_net>/<name>/ifindex`.
pub fn name_to_index(sysfs_net: &Path, name: &str) -> Result<u32> {
    validate(name)?;

    let path = sysfs_net.join(name).join("ifindex");
    let content = std::fs::read_to_string(&path).map_err(|_| Error::DeviceNotFound {
        name: name.to_string(),
    })?;

    content.trim().parse().map_err(|_| Error::DeviceNotFound {
        name: name.to_string(),
    })
}
