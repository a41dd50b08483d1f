pub use error::{FoxError, FoxExit};
pub use result::{JudgeRollup, TestCaseResult};
pub use runner::ProcessInfo;
pub use session::{JudgeSession, SpecialJudgeMode, SpecialJudgeOptions, TestCase};
pub use utils::default_format;
pub use verdict::Verdict;

pub mod diff;
pub mod judge;
pub mod package;
pub mod provider;
pub mod scaffold;

mod child;
mod error;
mod pipe;
mod result;
mod runner;
mod session;
mod syscall;
mod utils;
mod verdict;
