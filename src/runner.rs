use std::mem::MaybeUninit;
use std::sync::mpsc::Sender;
use std::thread;

use log::{debug, error, info};
use nix::errno::Errno;
use nix::libc;
use nix::sys::wait::WaitStatus;
use nix::unistd::{ForkResult, Pid};

use crate::child::{setup_child, ChildPlan, ChildStdio, ProgramRole};
use crate::error::FoxError;
use crate::result::TestCaseResult;
use crate::session::JudgeSession;
use crate::syscall::fork_proc;

/// Captured outcome of one wait: produced once, consumed once.
#[derive(Debug, Clone, Copy)]
pub struct ProcessInfo {
  pub pid: Pid,
  pub status: WaitStatus,
  /// User plus system CPU time (ms).
  pub time_ms: u64,
  /// Maximum resident set (KB).
  pub memory_kb: u64,
}

fn milliseconds(val: libc::timeval) -> u64 {
  (val.tv_sec as u64) * 1000 + (val.tv_usec as u64) / 1000
}

/// The one wait that balances a fork.  Uses the stopped-children-reported
/// option and captures the child's resource usage alongside the status.
fn wait_process(pid: Pid) -> Result<ProcessInfo, FoxError> {
  let mut status: libc::c_int = 0;
  let mut rusage = MaybeUninit::<libc::rusage>::zeroed();

  let ret =
    unsafe { libc::wait4(pid.as_raw(), &mut status, libc::WUNTRACED, rusage.as_mut_ptr()) };
  if ret < 0 {
    return Err(FoxError::wait(Errno::last().desc()));
  }

  let rusage = unsafe { rusage.assume_init() };
  let status = WaitStatus::from_raw(pid, status).map_err(|errno| FoxError::wait(errno.desc()))?;
  debug!("Wait pid {} -> {:?}", pid, status);

  Ok(ProcessInfo {
    pid,
    status,
    time_ms: milliseconds(rusage.ru_utime) + milliseconds(rusage.ru_stime),
    memory_kb: rusage.ru_maxrss as u64,
  })
}

/// Fork, configure the child, wait for it and collect the process info.
pub fn run_sync(
  session: &JudgeSession,
  result: &TestCaseResult,
  role: ProgramRole,
  stdio: ChildStdio,
) -> Result<ProcessInfo, FoxError> {
  let plan = ChildPlan::new(session, result, role, stdio)?;

  match fork_proc()? {
    ForkResult::Parent { child, .. } => {
      info!("Forked {:?} process (pid = {})", role, child);
      wait_process(child)
    }
    ForkResult::Child => setup_child(&plan),
  }
}

/// Fork and configure the child like [`run_sync`], but hand the wait to a
/// background waiter that publishes the process info into `sink`.
/// Returns as soon as the fork has happened.
pub fn run_async(
  session: &JudgeSession,
  result: &TestCaseResult,
  role: ProgramRole,
  stdio: ChildStdio,
  sink: Sender<Result<ProcessInfo, FoxError>>,
) -> Result<(), FoxError> {
  let plan = ChildPlan::new(session, result, role, stdio)?;

  match fork_proc()? {
    ForkResult::Parent { child, .. } => {
      info!("Forked {:?} process (pid = {})", role, child);
      thread::spawn(move || {
        let info = wait_process(child);
        if sink.send(info).is_err() {
          error!("Process info sink for pid {} is gone", child);
        }
      });
      Ok(())
    }
    ForkResult::Child => setup_child(&plan),
  }
}
