//! Loading and validating `itrace-setup.toml`.

pub mod types;

use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::consts::{CONFIG_FILENAME, INSTALL_PREFIX_ENV};
use crate::placeholder::{self, Placeholder, PlaceholderError};

pub use types::{Config, DependencyConfig, InstallConfig, ProbeConfig, ProjectConfig, SmokePolicy, WorkspaceLayout};

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("config file not found: {0}")]
  NotFound(PathBuf),

  #[error("failed to read config '{path}': {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("invalid config '{path}': {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: Box<toml::de::Error>,
  },

  #[error("invalid command in {context}: {source}")]
  Placeholder {
    context: String,
    #[source]
    source: PlaceholderError,
  },

  #[error("workspace directory '{0}' must be relative to the project root")]
  AbsoluteWorkspaceDir(PathBuf),

  #[error("workspace directory '{0}' must name a directory below the project root")]
  InvalidWorkspaceDir(PathBuf),

  #[error("workspace directories '{0}' and '{1}' overlap")]
  OverlappingWorkspaceDirs(PathBuf, PathBuf),
}

impl Config {
  /// Parse a config file.
  pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
    if !path.exists() {
      return Err(ConfigError::NotFound(path.to_path_buf()));
    }
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    toml::from_str(&text).map_err(|e| ConfigError::Parse {
      path: path.to_path_buf(),
      source: Box::new(e),
    })
  }

  /// Load the configuration for a project.
  ///
  /// An explicit path must exist. Otherwise `<root>/itrace-setup.toml` is used
  /// when present, and the built-in defaults when not. Environment overrides
  /// are applied last.
  pub fn load(root: &Path, explicit: Option<&Path>) -> Result<Self, ConfigError> {
    let mut config = match explicit {
      Some(path) => {
        info!(path = %path.display(), "loading config");
        Self::from_file(path)?
      }
      None => {
        let candidate = root.join(CONFIG_FILENAME);
        if candidate.is_file() {
          info!(path = %candidate.display(), "loading config");
          Self::from_file(&candidate)?
        } else {
          debug!("no config file, using defaults");
          Self::default()
        }
      }
    };

    config.apply_env();
    config.validate()?;
    Ok(config)
  }

  /// Apply `ITRACE_INSTALL_PREFIX`, if set.
  pub fn apply_env(&mut self) {
    if let Some(prefix) = std::env::var_os(INSTALL_PREFIX_ENV).filter(|p| !p.is_empty()) {
      let prefix = PathBuf::from(prefix);
      debug!(prefix = %prefix.display(), "install prefix overridden from environment");
      self.install.bin_dir = prefix.join("bin");
      self.install.lib_dir = prefix.join("lib");
    }
  }

  /// Check everything that can be checked before touching the filesystem.
  pub fn validate(&self) -> Result<(), ConfigError> {
    self.validate_workspace()?;

    // Project commands run outside any dependency, so `$${src}` has no value.
    let project = &self.project;
    for (context, spec) in [("project.configure", &project.configure), ("project.compile", &project.compile)] {
      spec
        .parts()
        .try_for_each(|part| placeholder::validate_without(part, &[Placeholder::Src]))
        .map_err(|source| ConfigError::Placeholder {
          context: context.to_string(),
          source,
        })?;
    }

    for dep in [&self.dependencies.mandatory, &self.dependencies.export] {
      dep.validate().map_err(|source| ConfigError::Placeholder {
        context: format!("dependency '{}'", dep.name),
        source,
      })?;
    }

    Ok(())
  }

  /// `clean` removes these recursively, so each must be a plain path strictly
  /// below the root and disjoint from the other two.
  fn validate_workspace(&self) -> Result<(), ConfigError> {
    let dirs = [&self.workspace.deps, &self.workspace.bin, &self.workspace.build];
    for dir in dirs {
      if dir.is_absolute() {
        return Err(ConfigError::AbsoluteWorkspaceDir(dir.clone()));
      }
      let plain = dir.components().all(|c| matches!(c, Component::Normal(_)));
      if dir.as_os_str().is_empty() || !plain {
        return Err(ConfigError::InvalidWorkspaceDir(dir.clone()));
      }
    }

    for (i, a) in dirs.iter().enumerate() {
      for b in &dirs[i + 1..] {
        if a.starts_with(b) || b.starts_with(a) {
          return Err(ConfigError::OverlappingWorkspaceDirs((*a).clone(), (*b).clone()));
        }
      }
    }
    Ok(())
  }
}
