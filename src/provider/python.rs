use std::path::Path;

use crate::error::FoxError;
use crate::provider::{CompileProvider, CompilerBase};

const COMPILE_ERROR_MARKERS: [&str; 3] = ["SyntaxError", "IndentationError", "TabError"];

pub struct Python3Provider {
  base: CompilerBase,
}

impl Python3Provider {
  pub fn new() -> Self {
    Python3Provider {
      base: CompilerBase::new(),
    }
  }
}

impl CompileProvider for Python3Provider {
  fn init(&mut self, code: &str, work_dir: &Path) -> Result<(), FoxError> {
    self.base.init(code, work_dir, ".py", ".py")
  }

  /// A syntax pass only; the real interpretation happens at run time.
  fn compile(&mut self) -> (bool, String) {
    let args = vec![
      "/usr/bin/python3".to_string(),
      "-m".to_string(),
      "py_compile".to_string(),
      self.base.code_path.to_string_lossy().to_string(),
    ];
    let (success, message) = self.base.shell(&args);
    self.base.ready = success;
    (success, message)
  }

  fn is_compile_error(&self, stderr: &str) -> bool {
    COMPILE_ERROR_MARKERS
      .iter()
      .any(|marker| stderr.contains(marker))
  }

  fn is_real_time(&self) -> bool {
    true
  }

  fn is_ready(&self) -> bool {
    self.base.ready
  }

  fn run_args(&self) -> Vec<String> {
    vec![
      "/usr/bin/python3".to_string(),
      self.base.code_path.to_string_lossy().to_string(),
    ]
  }

  fn clean(&mut self) {
    self.base.clean();
  }
}
