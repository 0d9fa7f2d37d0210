//! Byte framing for the host control channel.
//!
//! The agent talks to the host over a length-prefixed stream: an 8-byte
//! header of message type and total length, both big-endian u32, followed
//! by the payload. The channel event loop lives in the command layer; only
//! the codec and the write discipline are defined here.

use std::io;
use std::os::unix::io::RawFd;

use crate::error::{Error, Result};

/// Write a big-endian u32 into the first four bytes of `buf`.
pub fn put_be32(buf: &mut [u8], val: u32) {
    buf[..4].copy_from_slice(&val.to_be_bytes());
}

/// Read a big-endian u32 from the first four bytes of `buf`.
pub fn get_be32(buf: &[u8]) -> u32 {
    u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]])
}

/// Write a big-endian u64 into the first eight bytes of `buf`.
pub fn put_be64(buf: &mut [u8], val: u64) {
    buf[..8].copy_from_slice(&val.to_be_bytes());
}

/// Read a big-endian u64 from the first eight bytes of `buf`.
pub fn get_be64(buf: &[u8]) -> u64 {
    u64::from_be_bytes([
        buf[0], buf[1], buf[2], buf[3], buf[4], buf[5], buf[6], buf[7],
    ])
}

/// Write `data` to `fd` in full.
///
/// Interrupted writes are retried. `EAGAIN` means the peer of the virtio
/// channel went away; the write is abandoned and reported as success, since
/// there is nobody left to read it. Anything else is fatal.
pub fn send_data(fd: RawFd, data: &[u8]) -> Result<()> {
    let mut offset = 0;

    while offset < data.len() {
        // SAFETY: fd is a valid open descriptor and the pointer/length pair
        // denotes an initialized region of `data`.
        let n = unsafe {
            libc::write(
                fd,
                data[offset..].as_ptr() as *const libc::c_void,
                data.len() - offset,
            )
        };

        if n < 0 {
            let err = io::Error::last_os_error();
            match err.raw_os_error() {
                Some(libc::EINTR) => continue,
                Some(libc::EAGAIN) => return Ok(()),
                _ => return Err(err.into()),
            }
        }

        offset += n as usize;
    }

    Ok(())
}

/// Send one framed message: type and total length header, then payload.
pub fn send_message(fd: RawFd, msg_type: u32, payload: &[u8]) -> Result<()> {
    let mut header = [0u8; 8];
    put_be32(&mut header, msg_type);
    put_be32(&mut header[4..], payload.len() as u32 + 8);

    send_data(fd, &header)?;
    if !payload.is_empty() {
        send_data(fd, payload)?;
    }
    Ok(())
}

/// Read one 8-byte frame header, returning (type, total length).
pub fn read_header(fd: RawFd) -> Result<(u32, u32)> {
    let mut buf = [0u8; 8];
    let mut offset = 0;

    while offset < buf.len() {
        // SAFETY: fd is a valid open descriptor and the pointer/length pair
        // denotes writable space in `buf`.
        let n = unsafe {
            libc::read(
                fd,
                buf[offset..].as_mut_ptr() as *mut libc::c_void,
                buf.len() - offset,
            )
        };

        if n < 0 {
            let err = io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EINTR) {
                continue;
            }
            return Err(err.into());
        }
        if n == 0 {
            return Err(Error::Truncated {
                expected: buf.len(),
                actual: offset,
            });
        }

        offset += n as usize;
    }

    Ok((get_be32(&buf), get_be32(&buf[4..])))
}
