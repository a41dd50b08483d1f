use std::fs;
use std::sync::mpsc::channel;

use log::{error, info};
use nix::sys::signal::Signal;
use nix::sys::wait::WaitStatus;

use crate::child::{ChildStdio, ProgramRole, CHILD_SETUP_EXIT};
use crate::diff::{self, TextDiff};
use crate::error::FoxError;
use crate::pipe::FoxPipe;
use crate::provider::CompileProvider;
use crate::result::{JudgeRollup, TestCaseResult};
use crate::runner::{run_async, run_sync, ProcessInfo};
use crate::session::{JudgeSession, SpecialJudgeMode, TestCase};
use crate::verdict::Verdict;

/// Map a terminating signal to the candidate verdict.  The time signals
/// win over everything the process may have reported otherwise.
fn signal_verdict(session: &JudgeSession, info: &ProcessInfo, signal: Signal) -> Verdict {
  match signal {
    Signal::SIGXCPU | Signal::SIGALRM => Verdict::TimeLimitExceeded,
    Signal::SIGXFSZ => Verdict::OutputLimitExceeded,
    Signal::SIGSEGV | Signal::SIGBUS | Signal::SIGILL | Signal::SIGABRT => {
      if session.memory_limit > 0 && info.memory_kb >= session.memory_limit {
        Verdict::MemoryLimitExceeded
      } else {
        Verdict::RuntimeError
      }
    }
    _ => Verdict::RuntimeError,
  }
}

/// Classify the candidate's wait outcome.  `None` means the run is clean
/// and the output still has to be checked.
fn classify_candidate(
  session: &JudgeSession,
  result: &mut TestCaseResult,
  info: &ProcessInfo,
) -> Option<Verdict> {
  result.time_used = info.time_ms;
  result.memory_used = info.memory_kb;

  match info.status {
    WaitStatus::Exited(_, code) => {
      if code == CHILD_SETUP_EXIT {
        result
          .se_info
          .push_str("candidate process failed between fork and exec\n");
        return Some(Verdict::SystemError);
      }
      if code != 0 {
        result
          .re_info
          .push_str(&format!("process exited with code {}\n", code));
        return Some(Verdict::RuntimeError);
      }
      if session.memory_limit > 0 && info.memory_kb >= session.memory_limit {
        return Some(Verdict::MemoryLimitExceeded);
      }
      if session.time_limit > 0 && info.time_ms >= session.time_limit {
        return Some(Verdict::TimeLimitExceeded);
      }
      None
    }
    WaitStatus::Signaled(_, signal, _) | WaitStatus::Stopped(_, signal) => {
      result.signal = Some(signal as i32);
      let verdict = signal_verdict(session, info, signal);
      if verdict == Verdict::RuntimeError {
        result
          .re_info
          .push_str(&format!("process was killed by signal {}\n", signal));
      }
      Some(verdict)
    }
    status => {
      result
        .se_info
        .push_str(&format!("unexpected wait status {:?}\n", status));
      Some(Verdict::SystemError)
    }
  }
}

/// Classify the checker's wait outcome by the checker-mode rules.  A
/// `SpecialJudgeRequireCheck` return asks the caller to fall through to
/// the standard diff.
fn classify_checker(result: &mut TestCaseResult, info: &ProcessInfo) -> Verdict {
  result.checker_time_used = info.time_ms;
  result.checker_memory_used = info.memory_kb;

  match info.status {
    WaitStatus::Signaled(_, signal, _) | WaitStatus::Stopped(_, signal) => {
      result.checker_signal = Some(signal as i32);
      match signal {
        Signal::SIGXCPU | Signal::SIGALRM => Verdict::SpecialJudgeTimeout,
        _ => Verdict::SpecialJudgeError,
      }
    }
    WaitStatus::Exited(_, code) => {
      result.checker_exit_code = code;
      if code == CHILD_SETUP_EXIT {
        result
          .se_info
          .push_str("checker process failed between fork and exec\n");
        return Verdict::SystemError;
      }
      match Verdict::from_checker_exit(code) {
        Some(verdict) => verdict,
        None => Verdict::SpecialJudgeError,
      }
    }
    _ => Verdict::SpecialJudgeError,
  }
}

/// Standard output check with line statistics.
fn run_diff(session: &JudgeSession, result: &mut TestCaseResult) -> Result<Verdict, FoxError> {
  let diff = diff::compare_files(&result.program_out, &result.test_case_out)?;
  result.same_lines = diff.same_lines;
  result.total_lines = diff.total_lines;

  let verdict = match diff.diff {
    TextDiff::Equal => Verdict::Accepted,
    TextDiff::EolOnly => {
      if session.strict_mode {
        Verdict::PresentationError
      } else {
        Verdict::Accepted
      }
    }
    TextDiff::TokenEqual => {
      if session.strict_mode {
        Verdict::WrongAnswer
      } else {
        Verdict::Accepted
      }
    }
    TextDiff::Different => Verdict::WrongAnswer,
  };
  Ok(verdict)
}

fn judge_normal(session: &JudgeSession, result: &mut TestCaseResult) -> Result<Verdict, FoxError> {
  let info = run_sync(session, result, ProgramRole::Candidate, ChildStdio::File)?;
  match classify_candidate(session, result, &info) {
    Some(verdict) => Ok(verdict),
    None => run_diff(session, result),
  }
}

fn judge_checker(session: &JudgeSession, result: &mut TestCaseResult) -> Result<Verdict, FoxError> {
  let info = run_sync(session, result, ProgramRole::Candidate, ChildStdio::File)?;
  if let Some(verdict) = classify_candidate(session, result, &info) {
    return Ok(verdict);
  }

  let info = run_sync(session, result, ProgramRole::Checker, ChildStdio::File)?;
  match classify_checker(result, &info) {
    Verdict::SpecialJudgeRequireCheck => run_diff(session, result),
    verdict => Ok(verdict),
  }
}

fn judge_interactive(
  session: &JudgeSession,
  result: &mut TestCaseResult,
) -> Result<Verdict, FoxError> {
  let to_checker = FoxPipe::new()?;
  let to_candidate = FoxPipe::new()?;

  let (candidate_tx, candidate_rx) = channel();
  let (checker_tx, checker_rx) = channel();

  let forked = run_async(
    session,
    result,
    ProgramRole::Candidate,
    ChildStdio::Pipe {
      stdin_fd: to_candidate.read_end(),
      stdout_fd: to_checker.write_end(),
    },
    candidate_tx,
  )
  .and_then(|_| {
    run_async(
      session,
      result,
      ProgramRole::Checker,
      ChildStdio::Pipe {
        stdin_fd: to_checker.read_end(),
        stdout_fd: to_candidate.write_end(),
      },
      checker_tx,
    )
  });

  // The parent uses neither pipe; drop all four ends now so the children
  // observe EOF as soon as the opposite side is gone.
  to_checker.close()?;
  to_candidate.close()?;
  forked?;

  // Join both waiters; there is no ordering between the two.
  let candidate_info = candidate_rx
    .recv()
    .map_err(|_| FoxError::wait("Candidate waiter disappeared"))??;
  let checker_info = checker_rx
    .recv()
    .map_err(|_| FoxError::wait("Checker waiter disappeared"))??;

  let candidate_verdict = classify_candidate(session, result, &candidate_info);
  let checker_verdict = match classify_checker(result, &checker_info) {
    // There is no captured candidate output to re-check in a dialogue.
    Verdict::SpecialJudgeRequireCheck => Verdict::SpecialJudgeError,
    verdict => verdict,
  };

  // A broken checker wins; otherwise a failed candidate wins; otherwise
  // the checker's adopted verdict stands.
  let verdict = match checker_verdict {
    Verdict::SpecialJudgeTimeout | Verdict::SpecialJudgeError | Verdict::SystemError => {
      checker_verdict
    }
    adopted => candidate_verdict.unwrap_or(adopted),
  };
  Ok(verdict)
}

/// Judge one test case.  The verdict field of the result is written here
/// exactly once.
pub fn judge_test_case(
  session: &JudgeSession,
  case: &TestCase,
  provider: Option<&dyn CompileProvider>,
) -> TestCaseResult {
  let mut result = match session.prepare_result(case) {
    Ok(result) => result,
    Err(err) => {
      let mut result = TestCaseResult {
        id: case.id.clone(),
        ..TestCaseResult::default()
      };
      result.se_info = format!("{}\n", err);
      result.verdict = Verdict::SystemError;
      return result;
    }
  };

  let mode = session.special_judge.mode;
  let outcome = match mode {
    SpecialJudgeMode::Disabled => judge_normal(session, &mut result),
    SpecialJudgeMode::Checker | SpecialJudgeMode::Interactive => {
      if cfg!(target_os = "linux") {
        if mode == SpecialJudgeMode::Checker {
          judge_checker(session, &mut result)
        } else {
          judge_interactive(session, &mut result)
        }
      } else {
        result
          .se_info
          .push_str("special judge can only be enabled on linux\n");
        Ok(Verdict::SystemError)
      }
    }
  };

  let verdict = match outcome {
    Ok(verdict) => verdict,
    Err(err) => {
      error!("Judge test case {} fails: {}", result.id, err);
      result.se_info.push_str(&format!("{}\n", err));
      Verdict::SystemError
    }
  };

  // Interpreted languages surface compile diagnostics at run time.
  let verdict = match (verdict, provider) {
    (Verdict::RuntimeError, Some(provider)) if provider.is_real_time() => {
      let stderr = fs::read_to_string(&result.program_error).unwrap_or_default();
      if provider.is_compile_error(&stderr) {
        result.ce_info = stderr;
        Verdict::CompileError
      } else {
        verdict
      }
    }
    _ => verdict,
  };

  let verdict = if !session.strict_mode && verdict == Verdict::PresentationError {
    Verdict::Accepted
  } else {
    verdict
  };

  result.verdict = verdict;
  info!("Test case {} -> {}", result.id, verdict);
  result
}

/// Compile the candidate and judge every test case of the session.
///
/// A compile-type failure short-circuits the test loop; a failing test
/// case does not, every case is always run.
pub fn judge_session(session: &mut JudgeSession) -> Result<JudgeRollup, FoxError> {
  let mut rollup = JudgeRollup::new(session.session_id.clone());

  let code = fs::read_to_string(&session.code_file).map_err(|err| {
    FoxError::config(format!(
      "read code file {}: {}",
      session.code_file.to_string_lossy(),
      err
    ))
  })?;

  let mut provider = crate::provider::match_language(&session.code_lang_name, &session.code_file)?;
  let bin_dir = session.session_dir().join("bin");
  fs::create_dir_all(&bin_dir)?;
  provider.init(&code, &bin_dir)?;

  let (compiled, message) = provider.compile();
  if !compiled {
    info!("Session {} compile fails", session.session_id);
    rollup.verdict = Verdict::CompileError;
    rollup.ce_info = message;
    provider.clean();
    return Ok(rollup);
  }

  if !provider.is_ready() {
    return Err(FoxError::compile("provider is not ready to run"));
  }
  session.commands = provider.run_args();

  let session = &*session;
  for case in session.test_cases.iter() {
    let result = judge_test_case(session, case, Some(provider.as_ref()));
    rollup.push(result);
  }

  provider.clean();

  info!(
    "Session {} -> {} (time {} ms, memory {} KB)",
    rollup.session_id, rollup.verdict, rollup.time_used, rollup.memory_used
  );

  Ok(rollup)
}
