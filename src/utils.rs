use std::ffi::CString;
use std::path::Path;

use flexi_logger::DeferredNow;
use log::Record;

pub type TimeLimitType = u64;

pub type MemoryLimitType = u64;

/// A logline-formatter that produces log lines like <br>
/// ```[datetime: INFO] Session 6128 test case 1 accepted```
#[allow(unused)]
pub fn default_format(
  w: &mut dyn std::io::Write,
  now: &mut DeferredNow,
  record: &Record,
) -> Result<(), std::io::Error> {
  write!(
    w,
    "[{}: {:5}] {}",
    now.format("%Y-%m-%d %H:%M:%S"),
    record.level(),
    record.args()
  )
}

pub(crate) fn into_c_string<S: AsRef<str>>(string: S) -> CString {
  CString::new(string.as_ref()).expect("Convert &str to CString should work")
}

pub(crate) fn path_to_c_string(path: &Path) -> CString {
  let path = path.to_str().expect("Convert Path to &str should work");
  into_c_string(path)
}
