//! Kernel-mutating integration tests.
//!
//! These run against the real routing-netlink interface and therefore
//! require root; without it each test skips. They are additionally gated
//! behind the `integration` feature so a plain `cargo test` stays
//! hermetic:
//!
//! ```bash
//! sudo cargo test --test integration --features integration
//! ```
//!
//! Everything here confines itself to the loopback device and
//! documentation-range (203.0.113.0/24) routes, so a failed run leaves at
//! worst a stray loopback alias behind.

use guestnet::netlink::{Connection, RouteRequest};
use guestnet::{LOOPBACK_IFINDEX, Result};
use tracing_subscriber::EnvFilter;

/// Skip the test when not running as root.
macro_rules! require_root {
    () => {
        // SAFETY: geteuid has no preconditions.
        if unsafe { libc::geteuid() } != 0 {
            eprintln!("skipping: requires root");
            return Ok(());
        }
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .try_init();
    };
}

#[test]
fn loopback_address_lifecycle() -> Result<()> {
    require_root!();

    let conn = Connection::new()?;
    let addr = [127, 0, 0, 5];

    conn.add_address_by_index(LOOPBACK_IFINDEX, addr, 32)?;

    // Create-exclusive: the second add must fail distinguishably.
    let err = conn
        .add_address_by_index(LOOPBACK_IFINDEX, addr, 32)
        .unwrap_err();
    assert!(err.is_already_exists());

    conn.del_address_by_index(LOOPBACK_IFINDEX, addr, 32)?;

    // And the address is really gone.
    assert!(
        conn.del_address_by_index(LOOPBACK_IFINDEX, addr, 32)
            .is_err()
    );

    Ok(())
}

#[test]
fn loopback_can_be_brought_up() -> Result<()> {
    require_root!();

    let conn = Connection::new()?;
    conn.set_link_up_by_index(LOOPBACK_IFINDEX)?;
    Ok(())
}

#[test]
fn route_lifecycle_via_loopback() -> Result<()> {
    require_root!();

    let conn = Connection::new()?;
    let route = RouteRequest::parse("203.0.113.0/24", Some("127.0.0.1"), None)?;

    conn.add_route(&route)?;
    let err = conn.add_route(&route).unwrap_err();
    assert!(err.is_already_exists());

    conn.del_route(&route)?;
    assert!(conn.del_route(&route).is_err());

    Ok(())
}

#[test]
fn loopback_resolves_through_sysfs() -> Result<()> {
    require_root!();

    let sysfs = std::path::Path::new("/sys/class/net");
    assert_eq!(guestnet::device::ifindex(sysfs, "lo")?, LOOPBACK_IFINDEX);
    guestnet::device::wait_for_interface(sysfs, "lo", None)?;
    Ok(())
}
