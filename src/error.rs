use std::{
  error::Error,
  fmt::{self, Display},
  process::{ExitCode, Termination},
};

use flexi_logger::FlexiLoggerError;
use nix::errno::Errno;

#[derive(Debug)]
pub enum FoxError {
  Fork(String),
  Exec(String),
  Wait(String),
  Nix(Errno),
  Fs(String),
  Config(String),
  Compile(String),
  Package(String),
  Cli(String),
  Logger(FlexiLoggerError),
}

#[allow(unused)]
pub enum FoxExit {
  Ok,
  Err(FoxError),
}

impl FoxError {
  pub fn fork<MS: Into<String>>(msg: MS) -> FoxError {
    FoxError::Fork(msg.into())
  }

  pub fn exec<MS: Into<String>>(msg: MS) -> FoxError {
    FoxError::Exec(msg.into())
  }

  pub fn wait<MS: Into<String>>(msg: MS) -> FoxError {
    FoxError::Wait(msg.into())
  }

  pub fn config<MS: Into<String>>(msg: MS) -> FoxError {
    FoxError::Config(msg.into())
  }

  pub fn compile<MS: Into<String>>(msg: MS) -> FoxError {
    FoxError::Compile(msg.into())
  }

  pub fn package<MS: Into<String>>(msg: MS) -> FoxError {
    FoxError::Package(msg.into())
  }

  pub fn cli<MS: Into<String>>(msg: MS) -> FoxError {
    FoxError::Cli(msg.into())
  }

  /// Short error category, used as the message prefix.
  pub fn kind(&self) -> &'static str {
    match self {
      FoxError::Fork(_) => "fork",
      FoxError::Exec(_) => "exec",
      FoxError::Wait(_) => "wait",
      FoxError::Nix(_) => "syscall",
      FoxError::Fs(_) => "io",
      FoxError::Config(_) => "config",
      FoxError::Compile(_) => "compile",
      FoxError::Package(_) => "package",
      FoxError::Cli(_) => "usage",
      FoxError::Logger(_) => "logger",
    }
  }

  /// Process exit code for the binary, following the sysexits convention
  /// so callers can tell configuration mistakes from OS failures.
  fn exit_code(&self) -> u8 {
    match self {
      FoxError::Cli(_) => 64,
      FoxError::Package(_) => 65,
      FoxError::Compile(_) => 69,
      FoxError::Logger(_) => 70,
      FoxError::Fork(_) | FoxError::Exec(_) | FoxError::Wait(_) | FoxError::Nix(_) => 71,
      FoxError::Fs(_) => 74,
      FoxError::Config(_) => 78,
    }
  }
}

impl Display for FoxError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} error: ", self.kind())?;
    match self {
      FoxError::Fork(msg)
      | FoxError::Exec(msg)
      | FoxError::Wait(msg)
      | FoxError::Fs(msg)
      | FoxError::Config(msg)
      | FoxError::Compile(msg)
      | FoxError::Package(msg)
      | FoxError::Cli(msg) => f.write_str(msg),
      FoxError::Nix(errno) => write!(f, "{}", errno),
      FoxError::Logger(err) => write!(f, "{}", err),
    }
  }
}

impl From<Errno> for FoxError {
  fn from(errno: Errno) -> Self {
    FoxError::Nix(errno)
  }
}

impl From<std::io::Error> for FoxError {
  fn from(err: std::io::Error) -> Self {
    FoxError::Fs(err.to_string())
  }
}

impl From<serde_json::Error> for FoxError {
  fn from(err: serde_json::Error) -> Self {
    FoxError::Config(err.to_string())
  }
}

impl From<FlexiLoggerError> for FoxError {
  fn from(err: FlexiLoggerError) -> Self {
    FoxError::Logger(err)
  }
}

impl Error for FoxError {}

impl Termination for FoxExit {
  fn report(self) -> ExitCode {
    match self {
      FoxExit::Ok => ExitCode::SUCCESS,
      FoxExit::Err(err) => {
        eprintln!("foxj: {}", err);
        ExitCode::from(err.exit_code())
      }
    }
  }
}
