//! The session-database collaborator.
//!
//! The core hands a fully validated [`SessionEntry`] to a
//! [`SessionAccounting`] implementation and never touches the on-disk
//! record format itself. The platform adapter fills whatever fixed-width
//! fields the host's utmpx format defines, silently truncating over-long
//! values, which is the long-standing behavior of the record format.

use core::ffi::c_char;
use std::io;

use crate::system::interface::ProcessId;

/// The validated fields of one add/remove request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionEntry<'a> {
    /// Name of the invoking user.
    pub user: &'a str,
    /// Terminal line, the device path without its `/dev/` prefix.
    pub line: &'a str,
    /// Remote host, already sanitized. `None` for local sessions and for
    /// every `del` request.
    pub host: Option<&'a str>,
    /// The multiplexer's pid, recorded as the session's process.
    pub pid: ProcessId,
}

/// Mutation interface of the session database and its historical log.
pub trait SessionAccounting {
    /// Create or overwrite the active entry for the terminal and append
    /// to the historical log.
    fn begin_session(&mut self, entry: &SessionEntry<'_>) -> io::Result<()>;

    /// Mark the entry for the terminal as a dead process and append to
    /// the historical log.
    fn end_session(&mut self, entry: &SessionEntry<'_>) -> io::Result<()>;
}

/// The host platform's utmpx database.
#[derive(Debug, Default)]
pub struct Utmpx;

impl SessionAccounting for Utmpx {
    fn begin_session(&mut self, entry: &SessionEntry<'_>) -> io::Result<()> {
        platform::write_record(entry, RecordKind::Active)
    }

    fn end_session(&mut self, entry: &SessionEntry<'_>) -> io::Result<()> {
        platform::write_record(entry, RecordKind::Dead)
    }
}

#[derive(Debug, Clone, Copy)]
enum RecordKind {
    Active,
    Dead,
}

/// Copy `src` into a fixed-width C character field, truncating to the
/// field width. The destination is expected to be zeroed; bytes beyond
/// `src` are left as padding.
fn copy_truncated(dst: &mut [c_char], src: &[u8]) {
    for (dst, src) in dst.iter_mut().zip(src) {
        *dst = *src as c_char;
    }
}

/// The record id for a terminal line: the trailing bytes of the line that
/// fit the id field, so `pts/10` becomes `s/10` for a four-byte id.
fn line_id(line: &str, width: usize) -> &[u8] {
    let bytes = line.as_bytes();
    &bytes[bytes.len().saturating_sub(width)..]
}

#[cfg(target_os = "linux")]
mod platform {
    use core::mem;
    use std::{
        ffi::CStr,
        io,
        time::{SystemTime, UNIX_EPOCH},
    };

    use super::{copy_truncated, line_id, RecordKind, SessionEntry};

    const WTMP_PATH: &CStr = c"/var/log/wtmp";

    extern "C" {
        // glibc's wtmp append; not exposed through the libc crate.
        fn updwtmpx(wtmpx_file: *const core::ffi::c_char, ut: *const libc::utmpx);
    }

    pub(super) fn write_record(entry: &SessionEntry<'_>, kind: RecordKind) -> io::Result<()> {
        // SAFETY: utmpx is a plain C struct for which all-zeros is a valid value
        let mut ut: libc::utmpx = unsafe { mem::zeroed() };

        ut.ut_type = match kind {
            RecordKind::Active => libc::USER_PROCESS,
            RecordKind::Dead => libc::DEAD_PROCESS,
        };
        ut.ut_pid = entry.pid.inner();
        copy_truncated(&mut ut.ut_user, entry.user.as_bytes());
        copy_truncated(&mut ut.ut_line, entry.line.as_bytes());
        let id_width = ut.ut_id.len();
        copy_truncated(&mut ut.ut_id, line_id(entry.line, id_width));
        if let Some(host) = entry.host {
            copy_truncated(&mut ut.ut_host, host.as_bytes());
        }

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        ut.ut_tv.tv_sec = now.as_secs() as _;
        ut.ut_tv.tv_usec = now.subsec_micros() as _;

        // SAFETY: ut is a valid, fully initialized utmpx; the utmpx
        // accessors take a pointer to it and do not retain it.
        unsafe { libc::setutxent() };
        // SAFETY: as above
        let written = unsafe { libc::pututxline(&ut) };
        // SAFETY: endutxent takes no arguments and only closes the database
        unsafe { libc::endutxent() };
        if written.is_null() {
            return Err(io::Error::last_os_error());
        }

        // The historical log append is best-effort; updwtmpx reports no errors.
        // SAFETY: both pointers are valid for the duration of the call
        unsafe { updwtmpx(WTMP_PATH.as_ptr(), &ut) };

        Ok(())
    }
}

#[cfg(target_os = "freebsd")]
mod platform {
    use core::mem;
    use std::{
        io,
        time::{SystemTime, UNIX_EPOCH},
    };

    use super::{copy_truncated, line_id, RecordKind, SessionEntry};

    /// On FreeBSD `pututxline` maintains the active database and the log
    /// itself, so one call covers both.
    pub(super) fn write_record(entry: &SessionEntry<'_>, kind: RecordKind) -> io::Result<()> {
        // SAFETY: utmpx is a plain C struct for which all-zeros is a valid value
        let mut ut: libc::utmpx = unsafe { mem::zeroed() };

        ut.ut_type = match kind {
            RecordKind::Active => libc::USER_PROCESS,
            RecordKind::Dead => libc::DEAD_PROCESS,
        };
        ut.ut_pid = entry.pid.inner();
        copy_truncated(&mut ut.ut_user, entry.user.as_bytes());
        copy_truncated(&mut ut.ut_line, entry.line.as_bytes());
        let id_width = ut.ut_id.len();
        copy_truncated(&mut ut.ut_id, line_id(entry.line, id_width));
        if let Some(host) = entry.host {
            copy_truncated(&mut ut.ut_host, host.as_bytes());
        }

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        ut.ut_tv.tv_sec = now.as_secs() as _;
        ut.ut_tv.tv_usec = now.subsec_micros() as _;

        // SAFETY: ut is a valid, fully initialized utmpx; pututxline takes
        // a pointer to it and does not retain it.
        let written = unsafe { libc::pututxline(&ut) };
        if written.is_null() {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    }
}
