//! A privileged helper for utmp/wtmp updates.
//!
//! An unprivileged terminal multiplexer hands this helper the leader side
//! of a freshly allocated pty on stdin and asks it to register (`add
//! [host]`) or deregister (`del`) the matching session in the system's
//! login accounting. The helper runs with elevated privilege, so every
//! step before the actual record write is a refusal gate: any check that
//! does not pass aborts the invocation with zero mutation.

use std::{io, os::fd::BorrowedFd};

use thiserror::Error;
use tracing::debug;

pub mod authorize;
pub mod record;
pub mod request;
pub mod system;

use record::{SessionAccounting, SessionEntry};
use request::{Invocation, Verb};
use system::{
    interface::{ProcessId, UserId},
    User,
};

/// Everything that can go wrong, all of it fatal. The binary maps any of
/// these to a failure exit status; none performs a partial mutation.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Usage(String),
    #[error("parent process should not be init")]
    ParentIsInit,
    #[error("cannot find valid user with uid={0}")]
    UnknownUser(UserId),
    #[error("cannot find slave pty: {0}")]
    FindPty(io::Error),
    #[error("invalid device name")]
    DevicePath,
    #[error("fcntl: {0}")]
    DescriptorFlags(io::Error),
    #[error("invalid descriptor mode")]
    DescriptorMode,
    #[error("{device}: {source}")]
    DeviceStat { device: String, source: io::Error },
    #[error("{0} belongs to another user")]
    DeviceOwner(String),
    #[error("invalid host name")]
    HostName,
    #[error("failed to write utmp record: {0}")]
    WriteRecord(io::Error),
}

/// Run one validated add/remove request against the session database.
///
/// `stdin` must be the descriptor the multiplexer handed down, the leader
/// side of the pty being registered, and `parent` the parent pid as
/// captured once at startup. The sequence is strictly linear: caller
/// identity, device resolution, device authorization, host sanitization,
/// record write. The first failed gate wins and `recorder` is never
/// touched after a failure.
pub fn run(
    invocation: &Invocation,
    stdin: BorrowedFd<'_>,
    parent: ProcessId,
    recorder: &mut dyn SessionAccounting,
) -> Result<(), Error> {
    if parent == ProcessId::INIT {
        return Err(Error::ParentIsInit);
    }

    let caller = resolve_caller()?;

    let device = system::pts_follower_path(stdin).map_err(Error::FindPty)?;
    let line = authorize::authorize_device(&device, stdin, caller.uid)?;

    if let Some(host) = invocation.host() {
        authorize::validate_host(host)?;
    }

    let entry = SessionEntry {
        user: &caller.name,
        line,
        host: invocation.host(),
        pid: parent,
    };

    match invocation.verb {
        Verb::Add { .. } => {
            debug!(line, host = ?entry.host, "registering session");
            recorder.begin_session(&entry).map_err(Error::WriteRecord)
        }
        Verb::Del => {
            debug!(line, "deregistering session");
            recorder.end_session(&entry).map_err(Error::WriteRecord)
        }
    }
}

/// The invoking user, by real uid. A missing passwd entry or an empty
/// user name leaves nothing valid to put in the record.
fn resolve_caller() -> Result<User, Error> {
    let uid = User::real_uid();
    match User::from_uid(uid) {
        Ok(Some(user)) if !user.name.is_empty() => Ok(user),
        _ => Err(Error::UnknownUser(uid)),
    }
}
