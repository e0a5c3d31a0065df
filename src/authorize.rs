//! The authorization gates between a request and the session database.
//!
//! Everything here refuses by default: a caller may only touch the record
//! for a terminal device that resolution from its own stdin produced, that
//! its stdin holds open read-write, and that it owns on disk.

use core::ffi::c_int;
use std::os::fd::BorrowedFd;

use crate::{
    system::{self, interface::UserId},
    Error,
};

/// The only directory terminal devices legitimately live under.
pub const DEV_PREFIX: &str = "/dev/";

/// Run every device gate in order and produce the terminal line name,
/// the device path with the `/dev/` prefix stripped.
pub fn authorize_device<'a>(
    path: &'a str,
    stdin: BorrowedFd<'_>,
    caller: UserId,
) -> Result<&'a str, Error> {
    let line = terminal_line(path)?;
    check_descriptor_mode(system::descriptor_flags(stdin).map_err(Error::DescriptorFlags)?)?;
    let owner = system::file_owner(path).map_err(|source| Error::DeviceStat {
        device: path.to_owned(),
        source,
    })?;
    check_owner(path, owner, caller)?;
    Ok(line)
}

/// Gate 1: the resolved path must sit under [`DEV_PREFIX`]. Anything else
/// cannot have come from pty resolution and is rejected outright, before
/// the path is even touched.
pub(crate) fn terminal_line(path: &str) -> Result<&str, Error> {
    path.strip_prefix(DEV_PREFIX).ok_or(Error::DevicePath)
}

/// Gate 2: stdin must have been opened read-write. A descriptor that is
/// not read-write cannot be the live channel of a terminal session.
pub(crate) fn check_descriptor_mode(flags: c_int) -> Result<(), Error> {
    if flags & libc::O_RDWR == libc::O_RDWR {
        Ok(())
    } else {
        Err(Error::DescriptorMode)
    }
}

/// Gates 3 and 4: the device must exist on disk (checked by the caller's
/// stat) and belong to the invoking user. This is the central check; it is
/// what keeps one user from rewriting another user's session record.
pub(crate) fn check_owner(device: &str, owner: UserId, caller: UserId) -> Result<(), Error> {
    if owner == caller {
        Ok(())
    } else {
        Err(Error::DeviceOwner(device.to_owned()))
    }
}

/// A remote host may only contain ASCII graphic characters. Whitespace,
/// control bytes, and anything outside ASCII would let a caller smuggle
/// record-breaking or terminal-control content into the session database.
pub fn validate_host(host: &str) -> Result<(), Error> {
    if host.bytes().all(|byte| byte.is_ascii_graphic()) {
        Ok(())
    } else {
        Err(Error::HostName)
    }
}
