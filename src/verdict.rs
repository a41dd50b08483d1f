use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// Verdict flags keep the classic numeric values so that checker programs
/// and downstream consumers can rely on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum Verdict {
  Accepted,
  PresentationError,
  TimeLimitExceeded,
  MemoryLimitExceeded,
  WrongAnswer,
  RuntimeError,
  OutputLimitExceeded,
  CompileError,
  SystemError,
  SpecialJudgeTimeout,
  SpecialJudgeError,
  SpecialJudgeRequireCheck,
}

impl Verdict {
  pub fn flag(&self) -> i32 {
    match self {
      Verdict::Accepted => 0,
      Verdict::PresentationError => 1,
      Verdict::TimeLimitExceeded => 2,
      Verdict::MemoryLimitExceeded => 3,
      Verdict::WrongAnswer => 4,
      Verdict::RuntimeError => 5,
      Verdict::OutputLimitExceeded => 6,
      Verdict::CompileError => 7,
      Verdict::SystemError => 8,
      Verdict::SpecialJudgeTimeout => 10,
      Verdict::SpecialJudgeError => 11,
      Verdict::SpecialJudgeRequireCheck => 12,
    }
  }

  pub fn from_flag(flag: i32) -> Option<Verdict> {
    let verdict = match flag {
      0 => Verdict::Accepted,
      1 => Verdict::PresentationError,
      2 => Verdict::TimeLimitExceeded,
      3 => Verdict::MemoryLimitExceeded,
      4 => Verdict::WrongAnswer,
      5 => Verdict::RuntimeError,
      6 => Verdict::OutputLimitExceeded,
      7 => Verdict::CompileError,
      8 => Verdict::SystemError,
      10 => Verdict::SpecialJudgeTimeout,
      11 => Verdict::SpecialJudgeError,
      12 => Verdict::SpecialJudgeRequireCheck,
      _ => return None,
    };
    Some(verdict)
  }

  /// Exit codes a checker may answer with.  Anything outside this set is a
  /// checker malfunction.
  pub fn from_checker_exit(code: i32) -> Option<Verdict> {
    match Verdict::from_flag(code) {
      Some(
        verdict @ (Verdict::Accepted
        | Verdict::PresentationError
        | Verdict::WrongAnswer
        | Verdict::OutputLimitExceeded
        | Verdict::SpecialJudgeRequireCheck),
      ) => Some(verdict),
      _ => None,
    }
  }

  pub fn is_accepted(&self) -> bool {
    matches!(self, Verdict::Accepted)
  }
}

impl From<Verdict> for i32 {
  fn from(verdict: Verdict) -> i32 {
    verdict.flag()
  }
}

impl TryFrom<i32> for Verdict {
  type Error = String;

  fn try_from(flag: i32) -> Result<Verdict, String> {
    Verdict::from_flag(flag).ok_or_else(|| format!("unknown verdict flag {}", flag))
  }
}

impl Display for Verdict {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let text = match self {
      Verdict::Accepted => "Accepted",
      Verdict::PresentationError => "Presentation Error",
      Verdict::TimeLimitExceeded => "Time Limit Exceeded",
      Verdict::MemoryLimitExceeded => "Memory Limit Exceeded",
      Verdict::WrongAnswer => "Wrong Answer",
      Verdict::RuntimeError => "Runtime Error",
      Verdict::OutputLimitExceeded => "Output Limit Exceeded",
      Verdict::CompileError => "Compile Error",
      Verdict::SystemError => "System Error",
      Verdict::SpecialJudgeTimeout => "Special Judge Timeout",
      Verdict::SpecialJudgeError => "Special Judge Error",
      Verdict::SpecialJudgeRequireCheck => "Special Judge Require Check",
    };
    f.write_str(text)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_flag_round_trip() {
    for flag in 0..=12 {
      if let Some(verdict) = Verdict::from_flag(flag) {
        assert_eq!(verdict.flag(), flag);
      }
    }
    assert_eq!(Verdict::from_flag(9), None);
    assert_eq!(Verdict::from_flag(13), None);
  }

  #[test]
  fn test_checker_exit_adoption() {
    assert_eq!(Verdict::from_checker_exit(0), Some(Verdict::Accepted));
    assert_eq!(Verdict::from_checker_exit(1), Some(Verdict::PresentationError));
    assert_eq!(Verdict::from_checker_exit(4), Some(Verdict::WrongAnswer));
    assert_eq!(Verdict::from_checker_exit(6), Some(Verdict::OutputLimitExceeded));
    assert_eq!(
      Verdict::from_checker_exit(12),
      Some(Verdict::SpecialJudgeRequireCheck)
    );
    assert_eq!(Verdict::from_checker_exit(2), None);
    assert_eq!(Verdict::from_checker_exit(5), None);
    assert_eq!(Verdict::from_checker_exit(42), None);
  }

  #[test]
  fn test_serialize_as_flag() {
    let text = serde_json::to_string(&Verdict::WrongAnswer).unwrap();
    assert_eq!(text, "4");
    let verdict: Verdict = serde_json::from_str("10").unwrap();
    assert_eq!(verdict, Verdict::SpecialJudgeTimeout);
    assert!(serde_json::from_str::<Verdict>("9").is_err());
  }
}
