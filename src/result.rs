use std::cmp::max;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::verdict::Verdict;

/// Everything observed while judging one test case.
///
/// The runner's waiter fills the process fields, the orchestrator writes
/// the verdict exactly once at the end of the case.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TestCaseResult {
  pub id: String,

  #[serde(skip)]
  pub test_case_in: PathBuf,
  #[serde(skip)]
  pub test_case_out: PathBuf,

  pub program_out: PathBuf,
  pub program_error: PathBuf,

  pub checker_out: PathBuf,
  pub checker_error: PathBuf,
  pub checker_report: PathBuf,

  pub verdict: Verdict,
  pub time_used: u64,
  pub memory_used: u64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub signal: Option<i32>,

  pub same_lines: usize,
  pub total_lines: usize,

  #[serde(skip_serializing_if = "String::is_empty")]
  pub re_info: String,
  #[serde(skip_serializing_if = "String::is_empty")]
  pub se_info: String,
  #[serde(skip_serializing_if = "String::is_empty")]
  pub ce_info: String,

  pub checker_exit_code: i32,
  pub checker_time_used: u64,
  pub checker_memory_used: u64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub checker_signal: Option<i32>,
}

impl Default for TestCaseResult {
  fn default() -> Self {
    TestCaseResult {
      id: String::new(),
      test_case_in: PathBuf::new(),
      test_case_out: PathBuf::new(),
      program_out: PathBuf::new(),
      program_error: PathBuf::new(),
      checker_out: PathBuf::new(),
      checker_error: PathBuf::new(),
      checker_report: PathBuf::new(),
      verdict: Verdict::SystemError,
      time_used: 0,
      memory_used: 0,
      signal: None,
      same_lines: 0,
      total_lines: 0,
      re_info: String::new(),
      se_info: String::new(),
      ce_info: String::new(),
      checker_exit_code: 0,
      checker_time_used: 0,
      checker_memory_used: 0,
      checker_signal: None,
    }
  }
}

/// The roll-up over a whole session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeRollup {
  pub session_id: String,
  pub verdict: Verdict,
  pub time_used: u64,
  pub memory_used: u64,
  pub test_cases: Vec<TestCaseResult>,
  #[serde(skip_serializing_if = "String::is_empty", default)]
  pub re_info: String,
  #[serde(skip_serializing_if = "String::is_empty", default)]
  pub se_info: String,
  #[serde(skip_serializing_if = "String::is_empty", default)]
  pub ce_info: String,
}

impl JudgeRollup {
  pub fn new<IS: Into<String>>(session_id: IS) -> Self {
    JudgeRollup {
      session_id: session_id.into(),
      verdict: Verdict::Accepted,
      time_used: 0,
      memory_used: 0,
      test_cases: vec![],
      re_info: String::new(),
      se_info: String::new(),
      ce_info: String::new(),
    }
  }

  /// Fold one case into the roll-up.  The roll-up verdict is the first
  /// non-accepted case verdict; time and memory are maxima over cases.
  pub fn push(&mut self, result: TestCaseResult) {
    self.time_used = max(self.time_used, result.time_used);
    self.memory_used = max(self.memory_used, result.memory_used);

    if self.verdict.is_accepted() && !result.verdict.is_accepted() {
      self.verdict = result.verdict;
      if self.re_info.is_empty() {
        self.re_info = result.re_info.clone();
      }
      if self.se_info.is_empty() {
        self.se_info = result.se_info.clone();
      }
      if self.ce_info.is_empty() {
        self.ce_info = result.ce_info.clone();
      }
    }

    self.test_cases.push(result);
  }
}
