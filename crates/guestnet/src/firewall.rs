//! Firewall rule-set loading via an external restore program.
//!
//! The host ships an opaque rule-set blob; it is streamed verbatim into the
//! loader's standard input and only a zero exit status counts as success.

use std::io::Write;
use std::os::unix::io::AsRawFd;
use std::process::{Command, Stdio};

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::pod::Pod;

/// Default loader command line.
pub const DEFAULT_LOADER: &[&str] = &["iptables-restore", "-v"];

/// Load a rule-set blob through the given loader command.
///
/// An empty blob is a successful no-op without spawning anything. All pipe
/// descriptors are owned by the child handle and closed on every exit path.
pub fn load_rules(command: &[String], rules: &str) -> Result<()> {
    if rules.is_empty() {
        return Ok(());
    }

    let (program, args) = command
        .split_first()
        .ok_or_else(|| Error::InvalidConfig("empty firewall loader command".into()))?;

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .spawn()
        .map_err(|e| Error::Subprocess(format!("failed to spawn {}: {}", program, e)))?;

    debug!(command = %program, bytes = rules.len(), "streaming rule-set to loader");

    // Taking stdin out of the handle means it is dropped (and the write end
    // closed) as soon as the blob is written, which is what signals EOF to
    // the loader.
    let write_result = match child.stdin.take() {
        Some(mut stdin) => {
            grow_pipe_buffer(stdin.as_raw_fd(), rules.len());
            stdin.write_all(rules.as_bytes())
        }
        None => Ok(()),
    };

    let status = child
        .wait()
        .map_err(|e| Error::Subprocess(format!("failed to wait for {}: {}", program, e)))?;

    if let Err(e) = write_result {
        return Err(Error::Subprocess(format!(
            "failed to write rule-set to {}: {}",
            program, e
        )));
    }

    if !status.success() {
        return Err(Error::Subprocess(format!(
            "{} exited with {}",
            program, status
        )));
    }

    info!(command = %program, "rule-set loaded");
    Ok(())
}

/// Grow the pipe's kernel buffer to hold the whole blob, so the write
/// completes even against a loader that only starts reading late.
///
/// Best-effort: the write loop below still makes progress at the default
/// pipe capacity, just in lock-step with the reader.
fn grow_pipe_buffer(fd: i32, len: usize) {
    // SAFETY: fd is the valid write end of the child's stdin pipe.
    let current = unsafe { libc::fcntl(fd, libc::F_GETPIPE_SZ) };
    if current >= 0 && (current as usize) <= len {
        // SAFETY: same fd; F_SETPIPE_SZ takes a plain int argument.
        let ret = unsafe { libc::fcntl(fd, libc::F_SETPIPE_SZ, (len + 1) as libc::c_int) };
        if ret < 0 {
            warn!(
                "failed to grow pipe buffer to {} bytes: {}",
                len + 1,
                std::io::Error::last_os_error()
            );
        }
    }
}

/// Apply the pod's firewall rules.
///
/// The blob is consumed by the attempt whether or not the loader succeeds;
/// there is exactly one shot at it.
pub fn apply_rules(command: &[String], pod: &mut Pod) -> Result<()> {
    let rules = match pod.firewall_rules.take() {
        Some(rules) => rules,
        None => return Ok(()),
    };

    load_rules(command, &rules)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_rules_do_not_spawn() {
        // A nonexistent program proves nothing was executed.
        load_rules(&cmd(&["/nonexistent/loader"]), "").unwrap();
    }

    #[test]
    fn blob_larger_than_pipe_buffer_does_not_deadlock() {
        // Default pipe capacity is 64 KiB; stream well past it.
        let rules = "-A INPUT -j ACCEPT\n".repeat(8192);
        assert!(rules.len() > 128 * 1024);

        load_rules(&cmd(&["sh", "-c", "cat >/dev/null"]), &rules).unwrap();
    }

    #[test]
    fn nonzero_exit_is_an_error() {
        let err = load_rules(&cmd(&["false"]), "*filter\nCOMMIT\n").unwrap_err();
        assert!(matches!(err, Error::Subprocess(_)));
    }

    #[test]
    fn missing_program_is_an_error() {
        let err = load_rules(&cmd(&["/nonexistent/loader"]), "rules").unwrap_err();
        assert!(matches!(err, Error::Subprocess(_)));
    }

    #[test]
    fn apply_consumes_the_blob() {
        let mut pod = Pod {
            firewall_rules: Some(String::new()),
            ..Pod::default()
        };
        apply_rules(&cmd(&["false"]), &mut pod).unwrap();
        assert!(pod.firewall_rules.is_none());

        // Absent blob stays a no-op.
        apply_rules(&cmd(&["false"]), &mut pod).unwrap();
    }

    #[test]
    fn apply_consumes_the_blob_on_failure_too() {
        let mut pod = Pod {
            firewall_rules: Some("*filter\nCOMMIT\n".into()),
            ..Pod::default()
        };
        assert!(apply_rules(&cmd(&["false"]), &mut pod).is_err());
        assert!(pod.firewall_rules.is_none());
    }
}
