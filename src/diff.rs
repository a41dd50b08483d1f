use std::fs;
use std::io;
use std::path::Path;

/// Comparison tiers, strictest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextDiff {
  /// Byte-for-byte equal.
  Equal,
  /// Equal after dropping trailing whitespace and trailing blank lines.
  EolOnly,
  /// Equal as a whitespace-collapsed token stream.
  TokenEqual,
  Different,
}

#[derive(Debug, Clone, Copy)]
pub struct DiffResult {
  pub diff: TextDiff,
  /// Normalised lines equal at the same position.
  pub same_lines: usize,
  /// Normalised line count of the expected output.
  pub total_lines: usize,
}

/// Trailing-whitespace normalisation: per-line right trim, then drop
/// trailing blank lines.
fn normalize_lines(text: &str) -> Vec<&str> {
  let mut lines = text.lines().map(|line| line.trim_end()).collect::<Vec<&str>>();
  while lines.last().map_or(false, |line| line.is_empty()) {
    lines.pop();
  }
  lines
}

pub fn compare_text(out: &str, answer: &str) -> DiffResult {
  let out_lines = normalize_lines(out);
  let answer_lines = normalize_lines(answer);

  let same_lines = out_lines
    .iter()
    .zip(answer_lines.iter())
    .filter(|(lhs, rhs)| lhs == rhs)
    .count();
  let total_lines = answer_lines.len();

  let diff = if out == answer {
    TextDiff::Equal
  } else if out_lines == answer_lines {
    TextDiff::EolOnly
  } else if out.split_whitespace().eq(answer.split_whitespace()) {
    TextDiff::TokenEqual
  } else {
    TextDiff::Different
  };

  DiffResult {
    diff,
    same_lines,
    total_lines,
  }
}

/// Compare the candidate's output file against the expected output file.
pub fn compare_files(out: &Path, answer: &Path) -> io::Result<DiffResult> {
  let out = fs::read(out).unwrap_or_default();
  let answer = fs::read(answer)?;

  let out = String::from_utf8_lossy(&out);
  let answer = String::from_utf8_lossy(&answer);

  Ok(compare_text(&out, &answer))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_exact_match() {
    let result = compare_text("1 2 3\n", "1 2 3\n");
    assert_eq!(result.diff, TextDiff::Equal);
    assert_eq!(result.same_lines, 1);
    assert_eq!(result.total_lines, 1);
  }

  #[test]
  fn test_trailing_whitespace_is_presentation() {
    assert_eq!(compare_text("1 2 3 \n", "1 2 3\n").diff, TextDiff::EolOnly);
    assert_eq!(compare_text("1 2 3", "1 2 3\n").diff, TextDiff::EolOnly);
    assert_eq!(compare_text("1 2 3\n\n\n", "1 2 3\n").diff, TextDiff::EolOnly);
  }

  #[test]
  fn test_interior_whitespace_is_token_equal() {
    // "1  2 3" carries the same tokens but is not a presentation-level
    // match, strict mode reports it wrong.
    let result = compare_text("1  2 3\n", "1 2 3\n");
    assert_eq!(result.diff, TextDiff::TokenEqual);
    assert_eq!(result.same_lines, 0);
    assert_eq!(result.total_lines, 1);
  }

  #[test]
  fn test_different() {
    let result = compare_text("1 2 4\n", "1 2 3\nrest\n");
    assert_eq!(result.diff, TextDiff::Different);
    assert_eq!(result.same_lines, 0);
    assert_eq!(result.total_lines, 2);
  }

  #[test]
  fn test_line_statistics() {
    let result = compare_text("a\nwrong\nc\n", "a\nb\nc\n");
    assert_eq!(result.diff, TextDiff::Different);
    assert_eq!(result.same_lines, 2);
    assert_eq!(result.total_lines, 3);
  }

  #[test]
  fn test_empty_output() {
    let result = compare_text("", "1\n");
    assert_eq!(result.diff, TextDiff::Different);
    assert_eq!(result.same_lines, 0);
    assert_eq!(result.total_lines, 1);
  }
}
