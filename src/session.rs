use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::FoxError;
use crate::result::TestCaseResult;
use crate::utils::{MemoryLimitType, TimeLimitType};

/// Special judge flavour.  The numeric values are part of the
/// configuration document format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum SpecialJudgeMode {
  Disabled,
  Checker,
  Interactive,
}

impl From<SpecialJudgeMode> for i32 {
  fn from(mode: SpecialJudgeMode) -> i32 {
    match mode {
      SpecialJudgeMode::Disabled => 0,
      SpecialJudgeMode::Checker => 1,
      SpecialJudgeMode::Interactive => 2,
    }
  }
}

impl TryFrom<i32> for SpecialJudgeMode {
  type Error = String;

  fn try_from(value: i32) -> Result<SpecialJudgeMode, String> {
    match value {
      0 => Ok(SpecialJudgeMode::Disabled),
      1 => Ok(SpecialJudgeMode::Checker),
      2 => Ok(SpecialJudgeMode::Interactive),
      _ => Err(format!("unknown special judge mode {}", value)),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecialJudgeOptions {
  pub mode: SpecialJudgeMode,
  pub checker: PathBuf,
  /// Checker mode only: feed the candidate's stdout to the checker's
  /// stdin instead of the test case input.
  pub redirect_program_out: bool,
  pub time_limit: TimeLimitType,
  pub memory_limit: MemoryLimitType,
}

impl Default for SpecialJudgeOptions {
  fn default() -> Self {
    SpecialJudgeOptions {
      mode: SpecialJudgeMode::Disabled,
      checker: PathBuf::new(),
      redirect_program_out: true,
      time_limit: 1000,
      memory_limit: 65535,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestCase {
  pub id: String,
  pub test_case_in: PathBuf,
  pub test_case_out: PathBuf,
}

impl Default for TestCase {
  fn default() -> Self {
    TestCase {
      id: String::new(),
      test_case_in: PathBuf::new(),
      test_case_out: PathBuf::new(),
    }
  }
}

/// One problem attempt.  Read-only while the test loop is running.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JudgeSession {
  pub session_id: String,
  pub session_root: PathBuf,
  pub code_lang_name: String,
  pub code_file: PathBuf,
  pub test_cases: Vec<TestCase>,
  /// CPU time limit (ms).
  pub time_limit: TimeLimitType,
  /// Address space limit (KB).
  pub memory_limit: MemoryLimitType,
  /// Wall clock limit (ms), zero disables the alarm.
  pub real_time_limit: TimeLimitType,
  /// Output file size limit (bytes), zero disables the rlimit.
  pub file_size_limit: u64,
  /// Run the candidate under this user, negative keeps the current one.
  pub uid: i32,
  /// When off, presentation errors are reported as accepted.
  pub strict_mode: bool,
  pub special_judge: SpecialJudgeOptions,

  /// Command vector of the compiled candidate, filled by the provider.
  #[serde(skip)]
  pub commands: Vec<String>,
}

impl Default for JudgeSession {
  fn default() -> Self {
    JudgeSession {
      session_id: String::new(),
      session_root: PathBuf::from("/tmp"),
      code_lang_name: "auto".to_string(),
      code_file: PathBuf::new(),
      test_cases: vec![],
      time_limit: 1000,
      memory_limit: 65535,
      real_time_limit: 0,
      file_size_limit: 50 * 1024 * 1024,
      uid: -1,
      strict_mode: true,
      special_judge: SpecialJudgeOptions::default(),
      commands: vec![],
    }
  }
}

impl JudgeSession {
  /// Load a session from a problem configuration document.  Relative
  /// paths are resolved against the document's directory.
  pub fn from_config_file<P: AsRef<Path>>(config: P) -> Result<JudgeSession, FoxError> {
    let config = config.as_ref();
    let text = fs::read_to_string(config)
      .map_err(|err| FoxError::config(format!("read {}: {}", config.to_string_lossy(), err)))?;
    let mut session: JudgeSession = serde_json::from_str(&text)?;

    if let Some(base) = config.parent() {
      session.resolve_paths(base);
    }
    if session.session_id.is_empty() {
      session.session_id = Uuid::new_v4().to_string();
    }

    info!(
      "Load session {} with {} test case(s)",
      session.session_id,
      session.test_cases.len()
    );

    Ok(session)
  }

  fn resolve_paths(&mut self, base: &Path) {
    let rebase = |path: &mut PathBuf| {
      if !path.as_os_str().is_empty() && path.is_relative() {
        *path = base.join(&path);
      }
    };

    rebase(&mut self.code_file);
    rebase(&mut self.special_judge.checker);
    for case in self.test_cases.iter_mut() {
      rebase(&mut case.test_case_in);
      rebase(&mut case.test_case_out);
    }
  }

  /// Directory holding this session's per-test artefacts.
  pub fn session_dir(&self) -> PathBuf {
    self.session_root.join(&self.session_id)
  }

  /// Allocate the result record for one case and create its artefact
  /// directory.
  pub fn prepare_result(&self, case: &TestCase) -> Result<TestCaseResult, FoxError> {
    let dir = self.session_dir().join(&case.id);
    fs::create_dir_all(&dir)?;

    Ok(TestCaseResult {
      id: case.id.clone(),
      test_case_in: case.test_case_in.clone(),
      test_case_out: case.test_case_out.clone(),
      program_out: dir.join("program.out"),
      program_error: dir.join("program.err"),
      checker_out: dir.join("checker.out"),
      checker_error: dir.join("checker.err"),
      checker_report: dir.join("checker.report"),
      ..TestCaseResult::default()
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sample_session() -> JudgeSession {
    JudgeSession {
      session_id: "f3ac9d54-2f14-4b9e-8db3-7a1f5c9f2aaf".to_string(),
      code_lang_name: "cpp".to_string(),
      code_file: PathBuf::from("/work/codes/main.cpp"),
      test_cases: vec![
        TestCase {
          id: "1".to_string(),
          test_case_in: PathBuf::from("/work/cases/1.in"),
          test_case_out: PathBuf::from("/work/answers/1.out"),
        },
        TestCase {
          id: "2".to_string(),
          test_case_in: PathBuf::from("/work/cases/2.in"),
          test_case_out: PathBuf::from("/work/answers/2.out"),
        },
      ],
      time_limit: 2000,
      memory_limit: 131072,
      real_time_limit: 5000,
      uid: 1001,
      strict_mode: false,
      special_judge: SpecialJudgeOptions {
        mode: SpecialJudgeMode::Checker,
        checker: PathBuf::from("/work/bin/checker"),
        redirect_program_out: false,
        time_limit: 3000,
        memory_limit: 262144,
      },
      ..JudgeSession::default()
    }
  }

  #[test]
  fn test_config_round_trip() {
    let session = sample_session();
    let text = serde_json::to_string_pretty(&session).unwrap();
    let parsed: JudgeSession = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed, session);
  }

  #[test]
  fn test_config_defaults() {
    let session: JudgeSession = serde_json::from_str("{}").unwrap();
    assert_eq!(session.session_root, PathBuf::from("/tmp"));
    assert_eq!(session.code_lang_name, "auto");
    assert_eq!(session.time_limit, 1000);
    assert_eq!(session.memory_limit, 65535);
    assert_eq!(session.file_size_limit, 50 * 1024 * 1024);
    assert_eq!(session.uid, -1);
    assert!(session.strict_mode);
    assert_eq!(session.special_judge.mode, SpecialJudgeMode::Disabled);
    assert!(session.special_judge.redirect_program_out);
  }

  #[test]
  fn test_mode_flags() {
    let options: SpecialJudgeOptions = serde_json::from_str(r#"{ "mode": 2 }"#).unwrap();
    assert_eq!(options.mode, SpecialJudgeMode::Interactive);
    assert!(serde_json::from_str::<SpecialJudgeOptions>(r#"{ "mode": 7 }"#).is_err());
  }
}
