//! Error types for pod network configuration.

use std::io;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while programming the guest network stack.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error from socket, sysfs, or pipe operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// An IPv4 address or CIDR destination failed to parse.
    #[error("malformed address: {0}")]
    MalformedAddress(String),

    /// A netmask is neither a prefix length nor a contiguous dotted quad.
    #[error("invalid netmask: {0}")]
    InvalidMask(String),

    /// The pod configuration is structurally invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// An interface could not be resolved via sysfs, ifindex, or MAC.
    #[error("device not found: {name}")]
    DeviceNotFound {
        /// The interface name or hardware address that was not found.
        name: String,
    },

    /// A named interface does not carry the expected hardware address.
    #[error("device {device} does not match hardware address {mac_addr}")]
    MacMismatch {
        /// The configured interface name.
        device: String,
        /// The expected hardware address.
        mac_addr: String,
    },

    /// The kernel rejected a netlink request.
    #[error("kernel error: {message} (errno {errno})")]
    Kernel {
        /// The errno value from the kernel's acknowledgement.
        errno: i32,
        /// Human-readable error message.
        message: String,
    },

    /// Kernel error with operation context.
    #[error("{operation}: {message} (errno {errno})")]
    KernelWithContext {
        /// The operation that failed.
        operation: String,
        /// The errno value from the kernel's acknowledgement.
        errno: i32,
        /// Human-readable error message.
        message: String,
    },

    /// An attribute would overflow the fixed request buffer.
    #[error("request buffer exhausted: need {needed} bytes, capacity {capacity}")]
    BufferExhausted {
        /// Bytes the message would occupy after the append.
        needed: usize,
        /// Fixed capacity of the request buffer.
        capacity: usize,
    },

    /// A netlink reply was shorter than its fixed header.
    #[error("message truncated: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Expected message length.
        expected: usize,
        /// Actual bytes received.
        actual: usize,
    },

    /// A netlink reply did not have the expected shape.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// The firewall rule loader failed (pipe error or nonzero exit).
    #[error("subprocess failed: {0}")]
    Subprocess(String),
}

impl Error {
    /// Create a kernel error from a (negative) errno value.
    pub fn from_errno(errno: i32) -> Self {
        let message = io::Error::from_raw_os_error(-errno).to_string();
        Self::Kernel {
            errno: -errno,
            message,
        }
    }

    /// Add operation context to this error.
    ///
    /// Wraps kernel errors; other errors are returned unchanged.
    pub fn with_context(self, operation: impl Into<String>) -> Self {
        match self {
            Self::Kernel { errno, message } => Self::KernelWithContext {
                operation: operation.into(),
                errno,
                message,
            },
            other => other,
        }
    }

    /// Check if this is a "not found" error (ENOENT, ENODEV).
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Kernel { errno, .. } | Self::KernelWithContext { errno, .. } => {
                matches!(*errno, 2 | 19) // ENOENT=2, ENODEV=19
            }
            Self::DeviceNotFound { .. } => true,
            _ => false,
        }
    }

    /// Check if this is an "already exists" error (EEXIST).
    ///
    /// Address adds are sent create-exclusive, so a duplicate add surfaces
    /// here rather than silently succeeding.
    pub fn is_already_exists(&self) -> bool {
        match self {
            Self::Kernel { errno, .. } | Self::KernelWithContext { errno, .. } => {
                *errno == 17 // EEXIST=17
            }
            _ => false,
        }
    }

    /// Get the errno value if this is a kernel error.
    pub fn errno(&self) -> Option<i32> {
        match self {
            Self::Kernel { errno, .. } | Self::KernelWithContext { errno, .. } => Some(*errno),
            _ => None,
        }
    }
}
