use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use crate::error::FoxError;
use crate::package::{extract_package, WORKSPACE_DIRS};
use crate::session::{JudgeSession, TestCase};

/// Bundled example packages live next to the binary.
const EXAMPLE_LIBRARY: &str = "./lib/example";

/// A configuration skeleton with one empty test case slot.
pub fn make_problem_config() -> JudgeSession {
  JudgeSession {
    test_cases: vec![TestCase::default()],
    ..JudgeSession::default()
  }
}

/// Emit a default configuration document.
pub fn generate_config_file(output: &Path) -> Result<(), FoxError> {
  if output.exists() {
    return Err(FoxError::config(format!(
      "output file {} exists",
      output.to_string_lossy()
    )));
  }
  let config = make_problem_config();
  fs::write(output, serde_json::to_string_pretty(&config)?)?;
  info!("Generate configuration {}", output.to_string_lossy());
  Ok(())
}

/// Create a problem workspace: the standard subdirectories plus a default
/// `problem.json`, or the materialised example when a name is given.
pub fn init_problem_workdir(workdir: &Path, example: Option<&str>) -> Result<PathBuf, FoxError> {
  if workdir.exists() {
    return Err(FoxError::config(format!(
      "work directory {} exists",
      workdir.to_string_lossy()
    )));
  }
  fs::create_dir_all(workdir)?;

  let config_path = match example {
    Some(example) => {
      let package = Path::new(EXAMPLE_LIBRARY).join(example);
      if !package.is_file() {
        return Err(FoxError::config(format!("no example named {}", example)));
      }
      extract_package(&package, workdir)?
    }
    None => {
      for dir in WORKSPACE_DIRS.iter() {
        fs::create_dir_all(workdir.join(dir))?;
      }
      let config_path = workdir.join("problem.json");
      let config = make_problem_config();
      fs::write(&config_path, serde_json::to_string_pretty(&config)?)?;
      config_path
    }
  };

  info!("Initialise workspace {}", workdir.to_string_lossy());
  Ok(config_path)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_init_creates_layout() {
    let dir = tempfile::tempdir().unwrap();
    let workdir = dir.path().join("problem");

    let config = init_problem_workdir(&workdir, None).unwrap();
    for sub in WORKSPACE_DIRS.iter() {
      assert!(workdir.join(sub).is_dir());
    }
    let session = JudgeSession::from_config_file(&config).unwrap();
    assert_eq!(session.test_cases.len(), 1);
  }

  #[test]
  fn test_init_refuses_existing_dir() {
    let dir = tempfile::tempdir().unwrap();
    assert!(init_problem_workdir(dir.path(), None).is_err());
  }
}
