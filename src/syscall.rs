use std::cmp::max;
use std::ffi::{c_uint, CStr};
use std::os::unix::prelude::RawFd;

use nix::fcntl::{open, OFlag};
use nix::libc;
use nix::sys::resource::{setrlimit, Resource};
use nix::sys::stat::Mode;
use nix::unistd::{alarm, dup2, fork, setuid, ForkResult, Uid};

use crate::error::FoxError;

/// Standard stream slots a descriptor can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdStream {
  In,
  Out,
  Err,
}

impl StdStream {
  pub fn fd(&self) -> RawFd {
    match self {
      StdStream::In => libc::STDIN_FILENO,
      StdStream::Out => libc::STDOUT_FILENO,
      StdStream::Err => libc::STDERR_FILENO,
    }
  }
}

pub fn fork_proc() -> Result<ForkResult, FoxError> {
  unsafe { fork() }.map_err(|errno| FoxError::fork(errno.desc()))
}

/// Attach an open descriptor to a standard stream slot.
pub fn dup_to_stream(fd: RawFd, stream: StdStream) -> nix::Result<()> {
  dup2(fd, stream.fd())?;
  Ok(())
}

/// Open a file and attach it to a standard stream slot.  The descriptor is
/// opened close-on-exec, so the exec tears it down together with every
/// other preparation descriptor; only the stream slot itself survives.
pub fn redirect_stream(
  stream: StdStream,
  path: &CStr,
  oflag: OFlag,
  mode: Mode,
) -> nix::Result<RawFd> {
  let fd = open(path, oflag | OFlag::O_CLOEXEC, mode)?;
  dup2(fd, stream.fd())?;
  Ok(fd)
}

/// Install the per-process limits.  A zero value disables that limit.
///
/// The CPU rlimit is rounded up to whole seconds (at least one); the wall
/// clock is an alarm signal, also in whole seconds.
pub fn apply_limits(cpu_ms: u64, memory_kb: u64, wall_ms: u64, file_size: u64) -> nix::Result<()> {
  if cpu_ms > 0 {
    let seconds = max(1, (cpu_ms + 999) / 1000);
    setrlimit(Resource::RLIMIT_CPU, seconds, seconds)?;
  }

  if memory_kb > 0 {
    let bytes = memory_kb * 1024;
    setrlimit(Resource::RLIMIT_AS, bytes, bytes)?;
  }

  if wall_ms > 0 {
    alarm::set(((wall_ms + 999) / 1000) as c_uint);
  }

  if file_size > 0 {
    setrlimit(Resource::RLIMIT_FSIZE, file_size, file_size)?;
  }

  Ok(())
}

/// Switch the effective user, skipped for a negative uid.
pub fn switch_user(uid: i32) -> nix::Result<()> {
  if uid >= 0 {
    setuid(Uid::from_raw(uid as libc::uid_t))?;
  }
  Ok(())
}
