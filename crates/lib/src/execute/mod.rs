//! External tool execution.
//!
//! Stages never spawn processes directly; they go through [`cmd::run_command`]
//! so that every child gets an explicitly constructed environment and a
//! uniform failure type.

pub mod cmd;
pub mod types;

pub use cmd::{OutputMode, run_command, run_spec};
pub use types::{CommandSpec, ExecuteError, StageOutcome, ToolEnv};

/// Number of jobs handed to parallel compile steps.
pub fn host_parallelism() -> usize {
  std::thread::available_parallelism().map(|p| p.get()).unwrap_or(4)
}
