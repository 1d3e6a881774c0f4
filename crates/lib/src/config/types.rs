//! Configuration schema.
//!
//! Every section and field has a default, so an absent or empty
//! `itrace-setup.toml` yields the stock XED + dlfilter setup.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_INSTALL_PREFIX, SYSCTL_PATH};
use crate::deps::{self, Dependency};
use crate::execute::CommandSpec;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
  pub workspace: WorkspaceLayout,
  pub probe: ProbeConfig,
  pub project: ProjectConfig,
  pub install: InstallConfig,
  pub dependencies: DependencyConfig,
}

/// Names of the three workspace directories, relative to the project root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkspaceLayout {
  pub deps: PathBuf,
  pub bin: PathBuf,
  pub build: PathBuf,
}

impl Default for WorkspaceLayout {
  fn default() -> Self {
    Self {
      deps: PathBuf::from("deps"),
      bin: PathBuf::from("bin"),
      build: PathBuf::from("build"),
    }
  }
}

/// Command used to decide whether the host can record instruction traces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProbeConfig {
  pub program: String,
  pub args: Vec<String>,
  /// Substring that must appear in the command's stdout.
  pub pattern: String,
}

impl Default for ProbeConfig {
  fn default() -> Self {
    Self {
      program: "perf".to_string(),
      args: vec!["list".to_string()],
      pattern: "intel_pt".to_string(),
    }
  }
}

/// What to do when the freshly built local tool fails its smoke test.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmokePolicy {
  /// Log the failure and keep going.
  #[default]
  Warn,
  /// Abort the run.
  Enforce,
}

/// The companion tool built from this repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
  /// Executable name inside the build directory.
  pub executable: String,
  pub configure: CommandSpec,
  pub compile: CommandSpec,
  pub smoke_args: Vec<String>,
  pub smoke_policy: SmokePolicy,
}

impl Default for ProjectConfig {
  fn default() -> Self {
    Self {
      executable: "itrace".to_string(),
      configure: CommandSpec::new("cmake", &["$${root}"]),
      compile: CommandSpec::new("make", &["-j$${jobs}"]),
      smoke_args: vec!["--help".to_string()],
      smoke_policy: SmokePolicy::Warn,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InstallConfig {
  pub bin_dir: PathBuf,
  pub lib_dir: PathBuf,
  /// Also allow non-root users to record traces by relaxing `perf_event_paranoid`.
  pub unprivileged_tracing: bool,
  pub sysctl_path: PathBuf,
}

impl Default for InstallConfig {
  fn default() -> Self {
    let prefix = PathBuf::from(DEFAULT_INSTALL_PREFIX);
    Self {
      bin_dir: prefix.join("bin"),
      lib_dir: prefix.join("lib"),
      unprivileged_tracing: false,
      sysctl_path: PathBuf::from(SYSCTL_PATH),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DependencyConfig {
  /// Always fetched and built.
  pub mandatory: Dependency,
  /// Fetched and built only in export mode.
  pub export: Dependency,
}

impl Default for DependencyConfig {
  fn default() -> Self {
    Self {
      mandatory: deps::xed(),
      export: deps::fxt_dlfilter(),
    }
  }
}
