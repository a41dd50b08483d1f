use std::os::unix::prelude::RawFd;

use nix::{
  fcntl::OFlag,
  unistd::{close, pipe2},
};

use crate::error::FoxError;

/// Anonymous pipe pair, read end first.
///
/// Both ends are opened close-on-exec: a child attaches the end it needs
/// to a standard stream with dup2 before exec, and the exec closes the
/// originals on its side.  The parent closes both ends explicitly once
/// every fork that needs them has happened.
pub struct FoxPipe(RawFd, RawFd);

impl FoxPipe {
  pub fn new() -> Result<Self, FoxError> {
    let result = pipe2(OFlag::O_CLOEXEC)?;
    Ok(FoxPipe(result.0, result.1))
  }

  pub fn read_end(&self) -> RawFd {
    self.0
  }

  pub fn write_end(&self) -> RawFd {
    self.1
  }

  /// Close both ends in the calling process.
  pub fn close(self) -> Result<(), FoxError> {
    close(self.0)?;
    close(self.1)?;
    Ok(())
  }
}
