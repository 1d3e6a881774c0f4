//! Child process execution.
//!
//! Every external tool the setup drives (generators, compilers, package
//! builds, freshly built artifacts) goes through [`run_command`]. Each call
//! builds its child environment from a [`ToolEnv`]; nothing here mutates the
//! environment of the current process.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::execute::types::{CommandSpec, ExecuteError, ToolEnv};
use crate::placeholder::{self, Resolver};

/// What to do with the child's stdout and stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
  /// Stream straight to this process's stdout/stderr, so tool diagnostics appear verbatim.
  Inherit,
  /// Collect stdout and return it.
  Capture,
}

/// Run `program` with `args` in `cwd` and wait for it to exit.
///
/// # Returns
///
/// The trimmed stdout in [`OutputMode::Capture`], an empty string otherwise.
/// A non-zero exit becomes [`ExecuteError::CmdFailed`] carrying the child's exit code.
pub async fn run_command(
  program: &str,
  args: &[String],
  cwd: &Path,
  env: &ToolEnv,
  mode: OutputMode,
) -> Result<String, ExecuteError> {
  let cmd_line = display_cmd(program, args);
  info!(program = %program, "running");
  debug!(cmd = %cmd_line, cwd = %cwd.display(), "spawning process");

  let mut command = Command::new(program);
  command.args(args).current_dir(cwd).stdin(Stdio::null());
  for (key, value) in env.iter() {
    command.env(key, value);
  }

  let spawn_err = |source| ExecuteError::Spawn {
    program: program.to_string(),
    source,
  };

  match mode {
    OutputMode::Inherit => {
      let status = command
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await
        .map_err(spawn_err)?;

      if !status.success() {
        return Err(ExecuteError::CmdFailed {
          cmd: cmd_line,
          code: status.code(),
        });
      }
      Ok(String::new())
    }
    OutputMode::Capture => {
      let output = command.output().await.map_err(spawn_err)?;
      let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();

      if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
          warn!(stderr = %stderr.trim(), "command stderr");
        }
        if !stdout.is_empty() {
          debug!(stdout = %stdout, "command stdout");
        }
        return Err(ExecuteError::CmdFailed {
          cmd: cmd_line,
          code: output.status.code(),
        });
      }

      if !stdout.is_empty() {
        debug!(stdout = %stdout, "command output");
      }
      Ok(stdout)
    }
  }
}

/// Resolve placeholders in `spec` and run it.
pub async fn run_spec(
  spec: &CommandSpec,
  vars: &impl Resolver,
  cwd: &Path,
  env: &ToolEnv,
  mode: OutputMode,
) -> Result<String, ExecuteError> {
  let program = placeholder::substitute(&spec.program, vars)?;
  let args = placeholder::substitute_all(&spec.args, vars)?;
  run_command(&program, &args, cwd, env, mode).await
}

fn display_cmd(program: &str, args: &[String]) -> String {
  if args.is_empty() {
    program.to_string()
  } else {
    format!("{} {}", program, args.join(" "))
  }
}
