//! Resolver file management.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::error::Result;
use crate::pod::Pod;

/// Write the pod's DNS servers to the resolver file.
///
/// The file is overwritten, one `nameserver <ip>` line per server. A pod
/// without DNS servers is a no-op.
pub fn setup_dns(resolv_conf: &Path, pod: &Pod) -> Result<()> {
    if pod.dns.is_empty() {
        return Ok(());
    }

    let mut content = String::new();
    for server in &pod.dns {
        // Infallible on String.
        let _ = writeln!(content, "nameserver {}", server);
    }

    fs::write(resolv_conf, content)?;
    info!(servers = ?pod.dns, path = %resolv_conf.display(), "resolver configured");
    Ok(())
}

/// Drop the pod's DNS configuration and truncate the resolver file.
///
/// Best-effort: a missing or unwritable file is logged, not propagated.
pub fn cleanup_dns(resolv_conf: &Path, pod: &mut Pod) {
    if pod.dns.is_empty() {
        return;
    }

    pod.dns.clear();

    if let Err(e) = fs::write(resolv_conf, "") {
        warn!(path = %resolv_conf.display(), error = %e, "failed to truncate resolver file");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pod_with_dns(servers: &[&str]) -> Pod {
        Pod {
            dns: servers.iter().map(|s| s.to_string()).collect(),
            ..Pod::default()
        }
    }

    #[test]
    fn writes_one_line_per_server() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resolv.conf");

        let pod = pod_with_dns(&["10.0.2.3", "8.8.8.8"]);
        setup_dns(&path, &pod).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "nameserver 10.0.2.3\nnameserver 8.8.8.8\n"
        );
    }

    #[test]
    fn overwrites_rather_than_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resolv.conf");

        setup_dns(&path, &pod_with_dns(&["10.0.2.3", "10.0.2.4"])).unwrap();
        setup_dns(&path, &pod_with_dns(&["192.168.0.1"])).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "nameserver 192.168.0.1\n"
        );
    }

    #[test]
    fn empty_dns_is_a_noop() {
        let pod = pod_with_dns(&[]);
        // Must not attempt to create the file.
        setup_dns(Path::new("/nonexistent/resolv.conf"), &pod).unwrap();
    }

    #[test]
    fn cleanup_truncates_and_clears() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resolv.conf");

        let mut pod = pod_with_dns(&["10.0.2.3"]);
        setup_dns(&path, &pod).unwrap();
        cleanup_dns(&path, &mut pod);

        assert!(pod.dns.is_empty());
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }
}
