//! Types for running external tools.
//!
//! This module defines the error type, the per-stage outcome, the command
//! specification used by configurable steps, and the call-local environment
//! handed to every child process.

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::placeholder::PlaceholderError;

/// Errors that can occur while running an external tool.
#[derive(Debug, Error)]
pub enum ExecuteError {
  /// A placeholder in a command argument could not be resolved.
  #[error("placeholder error: {0}")]
  Placeholder(#[from] PlaceholderError),

  /// The program could not be started at all.
  #[error("failed to start '{program}': {source}")]
  Spawn {
    program: String,
    #[source]
    source: std::io::Error,
  },

  /// Command ran and exited unsuccessfully.
  #[error("command failed with exit code {code:?}: {cmd}")]
  CmdFailed { cmd: String, code: Option<i32> },

  /// A build reported success but its output file is missing.
  #[error("build succeeded but produced no artifact at {0}")]
  ArtifactMissing(PathBuf),

  /// A freshly built artifact failed its post-build check.
  #[error("self-check of '{artifact}' failed: {reason}")]
  SelfCheckFailed {
    artifact: String,
    reason: String,
    code: Option<i32>,
  },

  /// The binaries directory could not be joined into a search path.
  #[error("invalid search path entry: {0}")]
  InvalidSearchPath(String),

  /// I/O error during execution.
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

impl ExecuteError {
  /// Exit code of the failed external command, if this error carries one.
  pub fn exit_code(&self) -> Option<i32> {
    match self {
      ExecuteError::CmdFailed { code, .. } | ExecuteError::SelfCheckFailed { code, .. } => *code,
      _ => None,
    }
  }
}

/// How a stage finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageOutcome {
  /// The stage did its work.
  Completed,
  /// The stage's artifact was already present on disk.
  Skipped,
  /// The stage failed, but policy says the run continues.
  Tolerated,
}

impl fmt::Display for StageOutcome {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      StageOutcome::Completed => write!(f, "completed"),
      StageOutcome::Skipped => write!(f, "skipped"),
      StageOutcome::Tolerated => write!(f, "tolerated"),
    }
  }
}

/// A program and its arguments, written in configuration as a string array.
///
/// Arguments may contain placeholders (see [`crate::placeholder`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct CommandSpec {
  pub program: String,
  pub args: Vec<String>,
}

impl CommandSpec {
  pub fn new(program: &str, args: &[&str]) -> Self {
    Self {
      program: program.to_string(),
      args: args.iter().map(|a| a.to_string()).collect(),
    }
  }

  /// Every string of the spec, program first.
  pub fn parts(&self) -> impl Iterator<Item = &str> {
    std::iter::once(self.program.as_str()).chain(self.args.iter().map(String::as_str))
  }
}

impl fmt::Display for CommandSpec {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.parts().collect::<Vec<_>>().join(" "))
  }
}

impl TryFrom<Vec<String>> for CommandSpec {
  type Error = String;

  fn try_from(mut parts: Vec<String>) -> Result<Self, Self::Error> {
    if parts.is_empty() || parts[0].trim().is_empty() {
      return Err("command must name a program".to_string());
    }
    let program = parts.remove(0);
    Ok(Self { program, args: parts })
  }
}

impl From<CommandSpec> for Vec<String> {
  fn from(spec: CommandSpec) -> Self {
    let mut parts = vec![spec.program];
    parts.extend(spec.args);
    parts
  }
}

/// Environment overrides for a single child process.
///
/// The overrides are applied to the child's `Command` only; the parent
/// process environment is read but never modified.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolEnv {
  vars: BTreeMap<String, OsString>,
}

impl ToolEnv {
  pub fn new() -> Self {
    Self::default()
  }

  /// An environment whose `PATH` resolves programs in `dir` before the inherited search path.
  pub fn with_search_prefix(dir: &Path) -> Result<Self, ExecuteError> {
    let inherited = std::env::var_os("PATH").unwrap_or_default();
    let mut entries = vec![dir.to_path_buf()];
    entries.extend(std::env::split_paths(&inherited));
    let joined = std::env::join_paths(entries).map_err(|e| ExecuteError::InvalidSearchPath(e.to_string()))?;
    Ok(Self::new().set("PATH", joined))
  }

  pub fn set(mut self, key: &str, value: impl Into<OsString>) -> Self {
    self.vars.insert(key.to_string(), value.into());
    self
  }

  pub fn get(&self, key: &str) -> Option<&OsStr> {
    self.vars.get(key).map(OsString::as_os_str)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &OsStr)> {
    self.vars.iter().map(|(k, v)| (k.as_str(), v.as_os_str()))
  }
}
