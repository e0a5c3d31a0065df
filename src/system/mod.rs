use core::{
    ffi::{c_int, CStr},
    mem::MaybeUninit,
};
use std::{
    ffi::CString,
    io::{self, Error},
    os::fd::{AsRawFd, BorrowedFd, RawFd},
};

use cutils::*;
use interface::{ProcessId, UserId};

pub(crate) mod cutils;

pub mod interface;

/// A passwd entry, reduced to the fields session accounting needs.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub uid: UserId,
    pub name: String,
}

impl User {
    /// # Safety
    /// This function expects `pwd` to be a result from a successful call to `getpwXXX_r`.
    /// (It can cause UB if any of `pwd`'s pointed-to strings does not have a null-terminator.)
    unsafe fn from_libc(pwd: &libc::passwd) -> Self {
        Self {
            uid: UserId::new(pwd.pw_uid),
            // SAFETY: pw_name was initialized by a successful call to `getpwXXX_r` as per the
            // safety invariant of this function.
            name: unsafe { string_from_ptr(pwd.pw_name) },
        }
    }

    pub fn from_uid(uid: UserId) -> Result<Option<Self>, Error> {
        let max_pw_size = sysconf(libc::_SC_GETPW_R_SIZE_MAX).unwrap_or(16_384);
        let mut buf = vec![0; max_pw_size as usize];
        let mut pwd = MaybeUninit::uninit();
        let mut pwd_ptr = core::ptr::null_mut();
        // SAFETY: getpwuid_r is passed valid (although partly uninitialized) pointers to memory,
        // in particular `buf` points to an array of `buf.len()` bytes, as required.
        // After this call, if `pwd_ptr` is not NULL, `*pwd_ptr` and `pwd` will be aliased;
        // but we never dereference `pwd_ptr`.
        cerr(unsafe {
            libc::getpwuid_r(
                uid.inner(),
                pwd.as_mut_ptr(),
                buf.as_mut_ptr(),
                buf.len(),
                &mut pwd_ptr,
            )
        })?;
        if pwd_ptr.is_null() {
            Ok(None)
        } else {
            // SAFETY: pwd_ptr was not null, and getpwuid_r succeeded, so we have assurances that
            // the `pwd` structure was written to by getpwuid_r
            let pwd = unsafe { pwd.assume_init() };
            // SAFETY: `pwd` was obtained by a call to getpwuid_r, as required.
            Ok(Some(unsafe { Self::from_libc(&pwd) }))
        }
    }

    pub fn real_uid() -> UserId {
        // SAFETY: this function cannot cause memory safety issues
        UserId::new(unsafe { libc::getuid() })
    }

    pub fn real() -> Result<Option<Self>, Error> {
        Self::from_uid(Self::real_uid())
    }
}

pub fn parent_pid() -> ProcessId {
    // SAFETY: this function cannot cause memory safety issues
    ProcessId::new(unsafe { libc::getppid() })
}

/// True if `fd` refers to an open file description.
pub fn descriptor_is_open(fd: RawFd) -> bool {
    let mut stat = MaybeUninit::<libc::stat>::uninit();
    // SAFETY: fstat is passed a valid pointer to (uninitialized) memory of the correct size;
    // it cannot cause safety issues even for an invalid fd.
    cerr(unsafe { libc::fstat(fd, stat.as_mut_ptr()) }).is_ok()
}

/// True only if all three standard descriptor slots are open. A setuid
/// helper launched with any of them closed must not run at all.
pub fn standard_descriptors_open() -> bool {
    [libc::STDIN_FILENO, libc::STDOUT_FILENO, libc::STDERR_FILENO]
        .into_iter()
        .all(descriptor_is_open)
}

/// The file status flags of `fd`, as set at open time.
pub fn descriptor_flags(fd: BorrowedFd<'_>) -> io::Result<c_int> {
    // SAFETY: F_GETFL takes no third argument and cannot cause safety issues
    cerr(unsafe { libc::fcntl(fd.as_raw_fd(), libc::F_GETFL, 0) })
}

/// The path of the pty follower device paired with the pty leader `fd`.
///
/// Fails with the kernel's error (usually `ENOTTY`) if `fd` is not a pty
/// leader.
#[cfg(target_os = "linux")]
pub fn pts_follower_path(fd: BorrowedFd<'_>) -> io::Result<String> {
    let mut buf = [0; libc::PATH_MAX as usize];
    // SAFETY: buf is a valid array of buf.len() bytes, as required by ptsname_r
    let res = unsafe { libc::ptsname_r(fd.as_raw_fd(), buf.as_mut_ptr(), buf.len()) };
    if res != 0 {
        return Err(io::Error::from_raw_os_error(res));
    }
    // SAFETY: a successful ptsname_r null-terminated the buffer
    Ok(unsafe { string_from_ptr(buf.as_ptr()) })
}

#[cfg(not(target_os = "linux"))]
pub fn pts_follower_path(fd: BorrowedFd<'_>) -> io::Result<String> {
    // SAFETY: ptsname returns NULL or a pointer to a static NUL-terminated
    // buffer; this process is single-threaded so the buffer cannot be
    // overwritten while we copy it.
    let ptr = unsafe { libc::ptsname(fd.as_raw_fd()) };
    if ptr.is_null() {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: ptr is non-null and points to a NUL-terminated C string
    Ok(unsafe { string_from_ptr(ptr) })
}

/// The owning uid of the filesystem object at `path`.
pub fn file_owner(path: &str) -> io::Result<UserId> {
    let path = CString::new(path)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "path contains a NUL byte"))?;
    stat_owner(&path)
}

fn stat_owner(path: &CStr) -> io::Result<UserId> {
    let mut stat = MaybeUninit::<libc::stat>::uninit();
    // SAFETY: path is a valid pointer to a null-terminated C string and stat is passed a
    // valid pointer to memory of the correct size
    cerr(unsafe { libc::stat(path.as_ptr(), stat.as_mut_ptr()) })?;
    // SAFETY: a successful stat initialized the buffer
    let stat = unsafe { stat.assume_init() };
    Ok(UserId::new(stat.st_uid))
}
