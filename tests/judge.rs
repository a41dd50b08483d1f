use std::path::{Path, PathBuf};
use std::process::Command;

use log::info;
use nix::sys::signal::Signal;
use tempfile::tempdir;

use foxj::judge::judge_test_case;
use foxj::{JudgeSession, TestCase, Verdict};

mod common;

fn compile_fixture(dir: &Path, source: &str, name: &str) -> String {
  let executable = dir.join(name);
  let output = Command::new("gcc")
    .arg(source)
    .arg("-o")
    .arg(&executable)
    .arg("-lm")
    .output()
    .expect("Compile should be ok");
  assert!(
    output.status.success(),
    "compile {} failed: {}",
    source,
    String::from_utf8_lossy(&output.stderr)
  );
  executable.to_string_lossy().to_string()
}

fn make_session(root: &Path, executable: String) -> JudgeSession {
  JudgeSession {
    session_id: "tests".to_string(),
    session_root: root.to_path_buf(),
    commands: vec![executable],
    ..JudgeSession::default()
  }
}

fn aplusb_case(id: &str) -> TestCase {
  TestCase {
    id: id.to_string(),
    test_case_in: PathBuf::from(format!("./fixtures/aplusb/testcases/{}.in", id)),
    test_case_out: PathBuf::from(format!("./fixtures/aplusb/testcases/{}.ans", id)),
  }
}

#[test]
fn it_should_accept_aplusb() {
  common::setup();
  let dir = tempdir().unwrap();
  let executable = compile_fixture(dir.path(), "./fixtures/aplusb/source/ac.c", "ac.out");
  let session = make_session(dir.path(), executable);

  for id in ["1", "2", "3"] {
    let result = judge_test_case(&session, &aplusb_case(id), None);
    info!("Testcase #{}. verdict: {}", id, result.verdict);
    assert_eq!(result.verdict, Verdict::Accepted);
    assert!(result.time_used <= session.time_limit);
    assert!(result.memory_used <= session.memory_limit);
    assert_eq!(result.same_lines, 1);
    assert_eq!(result.total_lines, 1);
  }
}

#[test]
fn it_should_report_presentation_error() {
  common::setup();
  let dir = tempdir().unwrap();
  let executable = compile_fixture(dir.path(), "./fixtures/aplusb/source/pe.c", "pe.out");

  let session = make_session(dir.path(), executable.clone());
  let result = judge_test_case(&session, &aplusb_case("1"), None);
  assert_eq!(result.verdict, Verdict::PresentationError);

  let mut relaxed = make_session(dir.path(), executable);
  relaxed.strict_mode = false;
  let result = judge_test_case(&relaxed, &aplusb_case("1"), None);
  assert_eq!(result.verdict, Verdict::Accepted);
}

#[test]
fn it_should_report_wrong_answer() {
  common::setup();
  let dir = tempdir().unwrap();
  let executable = compile_fixture(dir.path(), "./fixtures/aplusb/source/wa.c", "wa.out");
  let session = make_session(dir.path(), executable);

  let result = judge_test_case(&session, &aplusb_case("1"), None);
  assert_eq!(result.verdict, Verdict::WrongAnswer);
  assert_eq!(result.same_lines, 0);
  assert_eq!(result.total_lines, 1);
}

#[test]
fn it_should_report_cpu_time_limit() {
  common::setup();
  let dir = tempdir().unwrap();
  let executable = compile_fixture(dir.path(), "./fixtures/aplusb/source/tle.c", "tle.out");
  let mut session = make_session(dir.path(), executable);
  session.time_limit = 500;

  let result = judge_test_case(&session, &aplusb_case("1"), None);
  assert_eq!(result.verdict, Verdict::TimeLimitExceeded);
  assert_eq!(result.signal, Some(Signal::SIGXCPU as i32));
}

#[test]
fn it_should_report_wall_clock_limit() {
  common::setup();
  let dir = tempdir().unwrap();
  let executable = compile_fixture(dir.path(), "./fixtures/aplusb/source/sleep.c", "sleep.out");
  let mut session = make_session(dir.path(), executable);
  session.real_time_limit = 1000;

  let result = judge_test_case(&session, &aplusb_case("1"), None);
  assert_eq!(result.verdict, Verdict::TimeLimitExceeded);
  assert_eq!(result.signal, Some(Signal::SIGALRM as i32));
}

#[test]
fn it_should_report_runtime_error_exit_code() {
  common::setup();
  let dir = tempdir().unwrap();
  let executable = compile_fixture(dir.path(), "./fixtures/aplusb/source/re.c", "re.out");
  let session = make_session(dir.path(), executable);

  let result = judge_test_case(&session, &aplusb_case("1"), None);
  assert_eq!(result.verdict, Verdict::RuntimeError);
  assert!(result.re_info.contains("42"));
}

#[test]
fn it_should_report_runtime_error_signal() {
  common::setup();
  let dir = tempdir().unwrap();
  let executable = compile_fixture(dir.path(), "./fixtures/aplusb/source/segv.c", "segv.out");
  let session = make_session(dir.path(), executable);

  let result = judge_test_case(&session, &aplusb_case("1"), None);
  assert_eq!(result.verdict, Verdict::RuntimeError);
  assert_eq!(result.signal, Some(Signal::SIGSEGV as i32));
}

#[test]
fn it_should_report_output_limit() {
  common::setup();
  let dir = tempdir().unwrap();
  let executable = compile_fixture(dir.path(), "./fixtures/aplusb/source/ole.c", "ole.out");
  let mut session = make_session(dir.path(), executable);
  session.time_limit = 5000;
  session.file_size_limit = 64 * 1024;

  let result = judge_test_case(&session, &aplusb_case("1"), None);
  assert_eq!(result.verdict, Verdict::OutputLimitExceeded);
  assert_eq!(result.signal, Some(Signal::SIGXFSZ as i32));
}

#[test]
fn it_should_limit_memory() {
  common::setup();
  let dir = tempdir().unwrap();
  let executable = compile_fixture(dir.path(), "./fixtures/aplusb/source/mle.c", "mle.out");
  let mut session = make_session(dir.path(), executable);
  session.memory_limit = 65536;

  let result = judge_test_case(&session, &aplusb_case("1"), None);
  assert!(
    matches!(
      result.verdict,
      Verdict::MemoryLimitExceeded | Verdict::RuntimeError
    ),
    "unexpected verdict {}",
    result.verdict
  );
}

#[test]
fn it_should_report_system_error_for_bad_command() {
  common::setup();
  let dir = tempdir().unwrap();
  let session = make_session(dir.path(), "/no/such/program".to_string());

  let result = judge_test_case(&session, &aplusb_case("1"), None);
  assert_eq!(result.verdict, Verdict::SystemError);
  assert!(!result.se_info.is_empty());
}
