use std::fs;
use std::path::Path;

use uuid::Uuid;

use crate::error::FoxError;
use crate::provider::{CompileProvider, CompilerBase};

/// Java sources must be saved under their public class name, so the
/// provider gives every submission its own class directory and fixes the
/// class to `Main`.
pub struct JavaProvider {
  base: CompilerBase,
}

impl JavaProvider {
  pub fn new() -> Self {
    JavaProvider {
      base: CompilerBase::new(),
    }
  }
}

impl CompileProvider for JavaProvider {
  fn init(&mut self, code: &str, work_dir: &Path) -> Result<(), FoxError> {
    if !work_dir.is_dir() {
      return Err(FoxError::compile(format!(
        "work dir {} not exists",
        work_dir.to_string_lossy()
      )));
    }

    let class_dir = work_dir.join(Uuid::new_v4().to_string());
    fs::create_dir_all(&class_dir)?;

    self.base.work_dir = work_dir.to_path_buf();
    self.base.code_path = class_dir.join("Main.java");
    self.base.program_path = class_dir;
    fs::write(&self.base.code_path, code)?;
    Ok(())
  }

  fn compile(&mut self) -> (bool, String) {
    let args = vec![
      "/usr/bin/javac".to_string(),
      "-encoding".to_string(),
      "utf-8".to_string(),
      self.base.code_path.to_string_lossy().to_string(),
      "-d".to_string(),
      self.base.program_path.to_string_lossy().to_string(),
    ];
    let (success, message) = self.base.shell(&args);
    self.base.ready = success;
    (success, message)
  }

  fn is_compile_error(&self, _stderr: &str) -> bool {
    false
  }

  fn is_real_time(&self) -> bool {
    false
  }

  fn is_ready(&self) -> bool {
    self.base.ready
  }

  fn run_args(&self) -> Vec<String> {
    vec![
      "/usr/bin/java".to_string(),
      "-cp".to_string(),
      self.base.program_path.to_string_lossy().to_string(),
      "Main".to_string(),
    ]
  }

  fn clean(&mut self) {
    let _ = fs::remove_dir_all(&self.base.program_path);
    self.base.ready = false;
  }
}
