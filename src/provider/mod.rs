use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use lazy_static::lazy_static;
use log::{debug, info};
use uuid::Uuid;

use crate::error::FoxError;

pub use gnuc::GnucProvider;
pub use gnucpp::GnucppProvider;
pub use java::JavaProvider;
pub use python::Python3Provider;

mod gnuc;
mod gnucpp;
mod java;
mod python;

/// Capability set of a per-language compile provider.
pub trait CompileProvider {
  /// Persist the source into the workspace and set up scratch names.
  fn init(&mut self, code: &str, work_dir: &Path) -> Result<(), FoxError>;

  /// Translate the source.  Returns the success flag and diagnostics.
  fn compile(&mut self) -> (bool, String);

  /// Whether a stderr blob carries a compile-type diagnostic.  Used to
  /// reclassify failed runs of interpreted languages.
  fn is_compile_error(&self, stderr: &str) -> bool;

  /// Interpret-at-runtime language.
  fn is_real_time(&self) -> bool;

  /// Ready to produce a run command.
  fn is_ready(&self) -> bool;

  /// Command vector that executes the candidate.
  fn run_args(&self) -> Vec<String>;

  /// Remove the provider's scratch files.
  fn clean(&mut self);
}

lazy_static! {
  static ref DETECT_LANGUAGE_MAP: HashMap<&'static str, &'static str> = {
    let mut map = HashMap::new();
    map.insert("c", "c");
    map.insert("gcc", "c");
    map.insert("gnu-c", "c");
    map.insert("cc", "cpp");
    map.insert("c++", "cpp");
    map.insert("cpp", "cpp");
    map.insert("g++", "cpp");
    map.insert("java", "java");
    map.insert("py", "python3");
    map.insert("python", "python3");
    map.insert("python3", "python3");
    map
  };
}

fn detect_language(keyword: &str, code_file: &Path) -> Option<&'static str> {
  let keyword = if keyword == "auto" {
    code_file.extension().and_then(|ext| ext.to_str())?
  } else {
    keyword
  };
  DETECT_LANGUAGE_MAP.get(keyword).copied()
}

/// Pick the provider for a language keyword, falling back to the code
/// file extension for `auto`.
pub fn match_language(
  keyword: &str,
  code_file: &Path,
) -> Result<Box<dyn CompileProvider>, FoxError> {
  let language = detect_language(keyword, code_file)
    .ok_or_else(|| FoxError::compile(format!("Unsupported language {}", keyword)))?;

  info!("Select language provider {}", language);

  let provider: Box<dyn CompileProvider> = match language {
    "c" => Box::new(GnucProvider::new()),
    "cpp" => Box::new(GnucppProvider::new()),
    "java" => Box::new(JavaProvider::new()),
    "python3" => Box::new(Python3Provider::new()),
    _ => return Err(FoxError::compile(format!("Unsupported language {}", language))),
  };
  Ok(provider)
}

/// State and helpers shared by the concrete providers.
pub(crate) struct CompilerBase {
  pub work_dir: PathBuf,
  pub code_path: PathBuf,
  pub program_path: PathBuf,
  pub ready: bool,
}

impl CompilerBase {
  pub fn new() -> Self {
    CompilerBase {
      work_dir: PathBuf::new(),
      code_path: PathBuf::new(),
      program_path: PathBuf::new(),
      ready: false,
    }
  }

  /// Save the source under a fresh scratch name and derive the program
  /// path from the same stem.
  pub fn init(
    &mut self,
    code: &str,
    work_dir: &Path,
    code_ext: &str,
    program_ext: &str,
  ) -> Result<(), FoxError> {
    if !work_dir.is_dir() {
      return Err(FoxError::compile(format!(
        "work dir {} not exists",
        work_dir.to_string_lossy()
      )));
    }

    let stem = Uuid::new_v4().to_string();
    self.work_dir = work_dir.to_path_buf();
    self.code_path = work_dir.join(format!("{}{}", stem, code_ext));
    self.program_path = work_dir.join(format!("{}{}", stem, program_ext));
    fs::write(&self.code_path, code)?;

    debug!("Save code to {}", self.code_path.to_string_lossy());
    Ok(())
  }

  /// Run a compiler command and capture its stderr.
  pub fn shell(&self, args: &[String]) -> (bool, String) {
    if args.len() < 2 {
      return (false, "Not enough arguments for compiler".to_string());
    }
    match Command::new(&args[0]).args(&args[1..]).output() {
      Ok(output) if output.status.success() => (true, String::new()),
      Ok(output) => (false, String::from_utf8_lossy(&output.stderr).to_string()),
      Err(err) => (false, err.to_string()),
    }
  }

  pub fn clean(&mut self) {
    let _ = fs::remove_file(&self.code_path);
    let _ = fs::remove_file(&self.program_path);
    self.ready = false;
  }
}
