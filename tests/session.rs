//! End-to-end scenarios over a real pseudo-terminal.
//!
//! The tests allocate a pty leader the same way a multiplexer would and
//! hand its descriptor to the helper's pipeline, with a recording stand-in
//! for the session database so that the zero-mutation-on-failure property
//! is observable.

use std::{
    fs::OpenOptions,
    io,
    os::fd::{AsFd, AsRawFd, FromRawFd, OwnedFd},
};

use utempter::{
    record::{SessionAccounting, SessionEntry},
    request::Invocation,
    system::{self, interface::ProcessId, User},
    Error,
};

#[derive(Debug, Clone, PartialEq, Eq)]
struct RecordedEntry {
    user: String,
    line: String,
    host: Option<String>,
    pid: ProcessId,
}

impl From<&SessionEntry<'_>> for RecordedEntry {
    fn from(entry: &SessionEntry<'_>) -> Self {
        Self {
            user: entry.user.to_owned(),
            line: entry.line.to_owned(),
            host: entry.host.map(str::to_owned),
            pid: entry.pid,
        }
    }
}

/// Records every mutation instead of touching the session database.
#[derive(Debug, Default)]
struct Recording {
    begun: Vec<RecordedEntry>,
    ended: Vec<RecordedEntry>,
}

impl Recording {
    fn is_empty(&self) -> bool {
        self.begun.is_empty() && self.ended.is_empty()
    }
}

impl SessionAccounting for Recording {
    fn begin_session(&mut self, entry: &SessionEntry<'_>) -> io::Result<()> {
        self.begun.push(entry.into());
        Ok(())
    }

    fn end_session(&mut self, entry: &SessionEntry<'_>) -> io::Result<()> {
        self.ended.push(entry.into());
        Ok(())
    }
}

/// Allocate a pty leader like a multiplexer would.
fn open_pty_leader() -> OwnedFd {
    // SAFETY: posix_openpt returns a fresh descriptor or -1
    let fd = unsafe { libc::posix_openpt(libc::O_RDWR | libc::O_NOCTTY) };
    assert!(fd >= 0, "posix_openpt: {}", io::Error::last_os_error());
    // SAFETY: fd is an open descriptor we own
    let fd = unsafe { OwnedFd::from_raw_fd(fd) };
    // SAFETY: grantpt/unlockpt on an owned pty leader descriptor
    assert_eq!(unsafe { libc::grantpt(fd.as_raw_fd()) }, 0);
    // SAFETY: as above
    assert_eq!(unsafe { libc::unlockpt(fd.as_raw_fd()) }, 0);
    fd
}

fn parse(args: &[&str]) -> Invocation {
    Invocation::parse_args(std::iter::once("utempter").chain(args.iter().copied())).unwrap()
}

fn current_user_name() -> String {
    User::real().unwrap().unwrap().name
}

#[test]
fn add_registers_one_session_for_the_callers_pty() {
    let leader = open_pty_leader();
    let expected_line = system::pts_follower_path(leader.as_fd())
        .unwrap()
        .strip_prefix("/dev/")
        .unwrap()
        .to_owned();

    let mut recorder = Recording::default();
    utempter::run(
        &parse(&["add", "office"]),
        leader.as_fd(),
        system::parent_pid(),
        &mut recorder,
    )
    .unwrap();

    assert_eq!(
        recorder.begun,
        vec![RecordedEntry {
            user: current_user_name(),
            line: expected_line,
            host: Some("office".to_owned()),
            pid: system::parent_pid(),
        }]
    );
    assert!(recorder.ended.is_empty());
}

#[test]
fn del_deregisters_one_session_with_no_host() {
    let leader = open_pty_leader();

    let mut recorder = Recording::default();
    utempter::run(
        &parse(&["del"]),
        leader.as_fd(),
        system::parent_pid(),
        &mut recorder,
    )
    .unwrap();

    assert!(recorder.begun.is_empty());
    assert_eq!(recorder.ended.len(), 1);
    let entry = &recorder.ended[0];
    assert_eq!(entry.host, None);
    assert!(entry.line.starts_with("pts/"), "line: {}", entry.line);
}

#[test]
fn orphaned_helper_is_refused_whatever_else_is_valid() {
    // A parent pid of init means the multiplexer already exited; the
    // helper refuses even with a perfectly good pty and request.
    let leader = open_pty_leader();

    let mut recorder = Recording::default();
    let result = utempter::run(
        &parse(&["add", "office"]),
        leader.as_fd(),
        ProcessId::INIT,
        &mut recorder,
    );

    assert!(matches!(result, Err(Error::ParentIsInit)));
    assert!(recorder.is_empty());
}

#[test]
fn stdin_that_is_not_a_pty_leader_is_refused() {
    let null = OpenOptions::new()
        .read(true)
        .write(true)
        .open("/dev/null")
        .unwrap();

    let mut recorder = Recording::default();
    let result = utempter::run(&parse(&["add"]), null.as_fd(), system::parent_pid(), &mut recorder);

    assert!(matches!(result, Err(Error::FindPty(_))));
    assert!(recorder.is_empty());
}

#[test]
fn read_only_pty_leader_fails_the_mode_gate() {
    // A leader that was not opened read-write cannot be the live control
    // channel of a session, however it was obtained.
    // SAFETY: posix_openpt returns a fresh descriptor or -1
    let fd = unsafe { libc::posix_openpt(libc::O_RDONLY | libc::O_NOCTTY) };
    assert!(fd >= 0, "posix_openpt: {}", io::Error::last_os_error());
    // SAFETY: fd is an open descriptor we own
    let leader = unsafe { OwnedFd::from_raw_fd(fd) };

    let mut recorder = Recording::default();
    let result = utempter::run(&parse(&["add"]), leader.as_fd(), system::parent_pid(), &mut recorder);

    assert!(matches!(result, Err(Error::DescriptorMode)));
    assert!(recorder.is_empty());
}

#[test]
fn unsanitary_host_is_refused_before_any_mutation() {
    let leader = open_pty_leader();

    let mut recorder = Recording::default();
    let result = utempter::run(
        &parse(&["add", "two words"]),
        leader.as_fd(),
        system::parent_pid(),
        &mut recorder,
    );

    assert!(matches!(result, Err(Error::HostName)));
    assert!(recorder.is_empty());
}

#[test]
fn failing_recorder_surfaces_as_a_write_error() {
    struct Failing;

    impl SessionAccounting for Failing {
        fn begin_session(&mut self, _: &SessionEntry<'_>) -> io::Result<()> {
            Err(io::Error::from(io::ErrorKind::PermissionDenied))
        }

        fn end_session(&mut self, _: &SessionEntry<'_>) -> io::Result<()> {
            Err(io::Error::from(io::ErrorKind::PermissionDenied))
        }
    }

    let leader = open_pty_leader();
    let result = utempter::run(&parse(&["add"]), leader.as_fd(), system::parent_pid(), &mut Failing);
    assert!(matches!(result, Err(Error::WriteRecord(_))));
}
