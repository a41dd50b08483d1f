use std::path::Path;

use crate::error::FoxError;
use crate::provider::{CompileProvider, CompilerBase};

pub struct GnucppProvider {
  base: CompilerBase,
}

impl GnucppProvider {
  pub fn new() -> Self {
    GnucppProvider {
      base: CompilerBase::new(),
    }
  }
}

impl CompileProvider for GnucppProvider {
  fn init(&mut self, code: &str, work_dir: &Path) -> Result<(), FoxError> {
    self.base.init(code, work_dir, ".cpp", ".out")
  }

  fn compile(&mut self) -> (bool, String) {
    let args = vec![
      "/usr/bin/g++".to_string(),
      self.base.code_path.to_string_lossy().to_string(),
      "-o".to_string(),
      self.base.program_path.to_string_lossy().to_string(),
      "-fno-asm".to_string(),
      "-Wall".to_string(),
      "-Wno-unused-result".to_string(),
      "-lm".to_string(),
      "-std=c++17".to_string(),
      "-O2".to_string(),
      "-DONLINE_JUDGE".to_string(),
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
    vec![self.base.program_path.to_string_lossy().to_string()]
  }

  fn clean(&mut self) {
    self.base.clean();
  }
}
