//! The on-disk workspace and the artifact locator.
//!
//! Three directories persist state between runs:
//!
//! ```text
//! deps/<name>/       fetched sources
//! bin/<artifact>     built executables and shared libraries
//! build/             local project build output
//! ```
//!
//! There is no manifest. Whether a dependency still needs fetching or
//! building is re-derived from the filesystem on every query.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::config::WorkspaceLayout;
use crate::consts::PARTIAL_SUFFIX;
use crate::deps::Dependency;

#[derive(Debug, Error)]
pub enum WorkspaceError {
  #[error("failed to create directory '{path}': {source}")]
  Create {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to remove directory '{path}': {source}")]
  Remove {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
  root: PathBuf,
  deps_dir: PathBuf,
  bin_dir: PathBuf,
  build_dir: PathBuf,
}

impl Workspace {
  pub fn new(root: &Path, layout: &WorkspaceLayout) -> Self {
    Self {
      root: root.to_path_buf(),
      deps_dir: root.join(&layout.deps),
      bin_dir: root.join(&layout.bin),
      build_dir: root.join(&layout.build),
    }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn deps_dir(&self) -> &Path {
    &self.deps_dir
  }

  pub fn bin_dir(&self) -> &Path {
    &self.bin_dir
  }

  pub fn build_dir(&self) -> &Path {
    &self.build_dir
  }

  pub fn dirs(&self) -> [&Path; 3] {
    [&self.deps_dir, &self.bin_dir, &self.build_dir]
  }

  /// Where a source named `name` is fetched to.
  pub fn source_path(&self, name: &str) -> PathBuf {
    self.deps_dir.join(name)
  }

  /// Scratch location a clone is written to before being moved to [`Self::source_path`].
  pub fn partial_source_path(&self, name: &str) -> PathBuf {
    self.deps_dir.join(format!(".{name}{PARTIAL_SUFFIX}"))
  }

  pub fn artifact_path(&self, artifact: &str) -> PathBuf {
    self.bin_dir.join(artifact)
  }

  /// Create all three directories if they are missing.
  pub async fn ensure(&self) -> Result<(), WorkspaceError> {
    for dir in self.dirs() {
      tokio::fs::create_dir_all(dir).await.map_err(|source| WorkspaceError::Create {
        path: dir.to_path_buf(),
        source,
      })?;
    }
    debug!(root = %self.root.display(), "workspace ready");
    Ok(())
  }

  /// Recursively remove all three directories.
  ///
  /// A directory that is already gone counts as removed. Returns the
  /// directories that actually existed.
  pub async fn clean(&self) -> Result<Vec<PathBuf>, WorkspaceError> {
    let mut removed = Vec::new();
    for dir in self.dirs() {
      match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => {
          info!(path = %dir.display(), "removed");
          removed.push(dir.to_path_buf());
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
          debug!(path = %dir.display(), "already absent");
        }
        Err(source) => {
          return Err(WorkspaceError::Remove {
            path: dir.to_path_buf(),
            source,
          });
        }
      }
    }
    Ok(removed)
  }

  /// Query the filesystem for a dependency's fetch and build state. Never cached.
  pub fn locate(&self, dep: &Dependency) -> Presence {
    let fetched = dep.sources().iter().all(|s| self.source_path(&s.name).is_dir());
    let built = self.artifact_path(&dep.artifact).is_file();
    Presence { fetched, built }
  }

  /// The single state lookup every stage consults.
  pub fn state_of(&self, dep: &Dependency) -> DepState {
    DepState::of(self.locate(dep))
  }
}

/// Two independent presence checks for one dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Presence {
  /// All source directories exist.
  pub fetched: bool,
  /// The artifact exists in the binaries area.
  pub built: bool,
}

/// Where a dependency stands, as derived from [`Presence`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepState {
  NotFetched,
  FetchedOnly,
  /// The artifact is in place; no fetch or build work remains.
  Built,
}

impl DepState {
  pub fn of(presence: Presence) -> Self {
    match presence {
      Presence { built: true, .. } => DepState::Built,
      Presence { fetched: true, .. } => DepState::FetchedOnly,
      _ => DepState::NotFetched,
    }
  }
}

impl fmt::Display for DepState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      DepState::NotFetched => write!(f, "not-fetched"),
      DepState::FetchedOnly => write!(f, "fetched-only"),
      DepState::Built => write!(f, "built"),
    }
  }
}
