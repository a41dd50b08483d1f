use std::convert::Infallible;
use std::ffi::CString;
use std::os::unix::prelude::RawFd;

use nix::fcntl::OFlag;
use nix::libc;
use nix::sys::stat::Mode;
use nix::unistd::execve;
use path_absolutize::Absolutize;

use crate::error::FoxError;
use crate::result::TestCaseResult;
use crate::session::JudgeSession;
use crate::syscall::{apply_limits, dup_to_stream, redirect_stream, switch_user, StdStream};
use crate::utils::{into_c_string, path_to_c_string};

/// Exit status reserved for a failure between fork and exec.  The parent
/// maps it to a system error before any other exit code rule.
pub const CHILD_SETUP_EXIT: i32 = 117;

/// Children only see the standard binary directories and the C locale.
const COMMON_ENVS: [&str; 3] = [
  "PATH=/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin",
  "LC_ALL=C",
  "LANG=C",
];

/// Which program a forked child is about to become.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramRole {
  Candidate,
  Checker,
}

/// Stream wiring requested for a child.
#[derive(Debug, Clone, Copy)]
pub enum ChildStdio {
  /// Redirect standard input/output to the per-case files.
  File,
  /// Attach the given pipe ends to standard input/output.
  Pipe { stdin_fd: RawFd, stdout_fd: RawFd },
}

enum PlannedStdio {
  File { stdin: CString, stdout: CString },
  Pipe { stdin_fd: RawFd, stdout_fd: RawFd },
}

/// Everything a child needs after fork.
///
/// The plan is prepared entirely in the parent, so the code between fork
/// and exec performs nothing but raw system calls on it.
pub struct ChildPlan {
  stdio: PlannedStdio,
  stderr: CString,
  uid: i32,
  cpu_ms: u64,
  memory_kb: u64,
  wall_ms: u64,
  file_size: u64,
  program: CString,
  argv: Vec<CString>,
  envp: Vec<CString>,
}

impl ChildPlan {
  pub fn new(
    session: &JudgeSession,
    result: &TestCaseResult,
    role: ProgramRole,
    stdio: ChildStdio,
  ) -> Result<ChildPlan, FoxError> {
    let stdio = match stdio {
      ChildStdio::Pipe { stdin_fd, stdout_fd } => PlannedStdio::Pipe { stdin_fd, stdout_fd },
      ChildStdio::File => match role {
        ProgramRole::Candidate => PlannedStdio::File {
          stdin: path_to_c_string(&result.test_case_in),
          stdout: path_to_c_string(&result.program_out),
        },
        ProgramRole::Checker => PlannedStdio::File {
          stdin: if session.special_judge.redirect_program_out {
            path_to_c_string(&result.program_out)
          } else {
            path_to_c_string(&result.test_case_in)
          },
          stdout: path_to_c_string(&result.checker_out),
        },
      },
    };

    let stderr = match role {
      ProgramRole::Candidate => path_to_c_string(&result.program_error),
      ProgramRole::Checker => path_to_c_string(&result.checker_error),
    };

    let (cpu_ms, memory_kb) = match role {
      ProgramRole::Candidate => (session.time_limit, session.memory_limit),
      ProgramRole::Checker => (
        session.special_judge.time_limit,
        session.special_judge.memory_limit,
      ),
    };

    let (program, argv) = match role {
      ProgramRole::Candidate => {
        let program = session
          .commands
          .first()
          .ok_or_else(|| FoxError::exec("Empty candidate command vector"))?;
        let program = into_c_string(program);
        let argv = session
          .commands
          .iter()
          .map(|arg| into_c_string(arg))
          .collect::<Vec<CString>>();
        (program, argv)
      }
      ProgramRole::Checker => {
        let checker = path_to_c_string(&session.special_judge.checker);
        // Testlib convention: input, expected output, candidate output,
        // report.  The first two are passed as absolute paths.
        let case_in = result.test_case_in.absolutize()?;
        let case_out = result.test_case_out.absolutize()?;
        let argv = vec![
          checker.clone(),
          path_to_c_string(&case_in),
          path_to_c_string(&case_out),
          path_to_c_string(&result.program_out),
          path_to_c_string(&result.checker_report),
        ];
        (checker, argv)
      }
    };

    Ok(ChildPlan {
      stdio,
      stderr,
      uid: session.uid,
      cpu_ms,
      memory_kb,
      wall_ms: session.real_time_limit,
      file_size: session.file_size_limit,
      program,
      argv,
      envp: COMMON_ENVS.iter().map(|env| into_c_string(*env)).collect(),
    })
  }
}

/// Configure the forked child and replace its image.  Never returns: any
/// failure before the new image starts kills the process with the
/// reserved setup status, which the parent observes through wait.
pub fn setup_child(plan: &ChildPlan) -> ! {
  let _ = configure_and_exec(plan);
  unsafe { libc::_exit(CHILD_SETUP_EXIT) }
}

fn configure_and_exec(plan: &ChildPlan) -> nix::Result<Infallible> {
  match &plan.stdio {
    PlannedStdio::Pipe { stdin_fd, stdout_fd } => {
      dup_to_stream(*stdin_fd, StdStream::In)?;
      dup_to_stream(*stdout_fd, StdStream::Out)?;
    }
    PlannedStdio::File { stdin, stdout } => {
      redirect_stream(StdStream::In, stdin, OFlag::O_RDONLY, Mode::empty())?;
      redirect_stream(
        StdStream::Out,
        stdout,
        OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC,
        Mode::from_bits_truncate(0o644),
      )?;
    }
  }

  redirect_stream(
    StdStream::Err,
    &plan.stderr,
    OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC,
    Mode::from_bits_truncate(0o644),
  )?;

  switch_user(plan.uid)?;

  apply_limits(plan.cpu_ms, plan.memory_kb, plan.wall_ms, plan.file_size)?;

  execve(&plan.program, &plan.argv, &plan.envp)
}
