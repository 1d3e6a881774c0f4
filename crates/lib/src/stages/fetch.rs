//! Fetch stage: clone dependency sources into the workspace.
//!
//! A clone is written to `deps/.<name>.partial` and renamed to `deps/<name>`
//! only once it has completed. A directory at the final path therefore always
//! holds a finished checkout, and a clone interrupted on a previous run is
//! discarded and retried rather than mistaken for a completed fetch.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::deps::{Dependency, Source};
use crate::execute::StageOutcome;
use crate::workspace::{DepState, Workspace};

/// Errors that can occur during fetch operations.
#[derive(Debug, Error)]
pub enum FetchError {
  /// Failed to clone a git repository.
  #[error("failed to clone repository '{url}': {source}")]
  Clone {
    url: String,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },

  /// Failed to check out the default branch after cloning.
  #[error("failed to check out '{url}': {source}")]
  Checkout {
    url: String,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },

  /// Failed to prepare or move a source directory.
  #[error("failed to prepare '{path}': {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// The clone task stopped before reporting a result.
  #[error("clone of '{url}' did not complete: {reason}")]
  Aborted { url: String, reason: String },
}

/// Something that can materialise a repository at a path.
pub trait SourceFetcher: Send + Sync {
  /// Clone `url` into `dest`, which does not exist yet.
  fn fetch_into(&self, url: &str, dest: &Path) -> Result<(), FetchError>;
}

/// Clones over the network with gitoxide.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitFetcher;

impl SourceFetcher for GitFetcher {
  fn fetch_into(&self, url: &str, dest: &Path) -> Result<(), FetchError> {
    let mut prepared = gix::prepare_clone(url, dest).map_err(|e| FetchError::Clone {
      url: url.to_string(),
      source: Box::new(e),
    })?;

    let (mut checkout, _outcome) = prepared
      .fetch_then_checkout(gix::progress::Discard, &gix::interrupt::IS_INTERRUPTED)
      .map_err(|e| FetchError::Clone {
        url: url.to_string(),
        source: Box::new(e),
      })?;

    let (_repo, _outcome) = checkout
      .main_worktree(gix::progress::Discard, &gix::interrupt::IS_INTERRUPTED)
      .map_err(|e| FetchError::Checkout {
        url: url.to_string(),
        source: Box::new(e),
      })?;

    Ok(())
  }
}

/// Fetch one source unless it is already present.
pub async fn fetch_source(
  ws: &Workspace,
  source: &Source,
  fetcher: &Arc<dyn SourceFetcher>,
) -> Result<StageOutcome, FetchError> {
  let dest = ws.source_path(&source.name);
  if dest.exists() {
    debug!(source = %source.name, path = %dest.display(), "already fetched");
    return Ok(StageOutcome::Skipped);
  }

  let partial = ws.partial_source_path(&source.name);
  if partial.exists() {
    warn!(path = %partial.display(), "discarding interrupted clone");
    remove_dir(&partial).await?;
  }

  info!(source = %source.name, url = %source.url, "cloning");

  let fetcher = Arc::clone(fetcher);
  let url = source.url.clone();
  let target = partial.clone();
  let result = tokio::task::spawn_blocking(move || fetcher.fetch_into(&url, &target))
    .await
    .map_err(|e| FetchError::Aborted {
      url: source.url.clone(),
      reason: e.to_string(),
    })?;

  if let Err(e) = result {
    // Best effort; the next run discards it anyway.
    if partial.exists() {
      let _ = remove_dir(&partial).await;
    }
    return Err(e);
  }

  tokio::fs::rename(&partial, &dest).await.map_err(|source| FetchError::Io {
    path: dest.clone(),
    source,
  })?;
  debug!(path = %dest.display(), "fetched");
  Ok(StageOutcome::Completed)
}

/// Fetch a dependency's primary source and every companion.
///
/// Skipped entirely once the dependency's artifact is built.
pub async fn fetch_dependency(
  ws: &Workspace,
  dep: &Dependency,
  fetcher: &Arc<dyn SourceFetcher>,
) -> Result<StageOutcome, FetchError> {
  if ws.state_of(dep) == DepState::Built {
    info!(dep = %dep.name, "artifact present, skipping fetch");
    return Ok(StageOutcome::Skipped);
  }

  let mut outcome = StageOutcome::Skipped;
  for source in dep.sources() {
    if fetch_source(ws, &source, fetcher).await? == StageOutcome::Completed {
      outcome = StageOutcome::Completed;
    }
  }

  if outcome == StageOutcome::Skipped {
    info!(dep = %dep.name, "sources present, skipping fetch");
  }
  Ok(outcome)
}

async fn remove_dir(path: &Path) -> Result<(), FetchError> {
  tokio::fs::remove_dir_all(path).await.map_err(|source| FetchError::Io {
    path: path.to_path_buf(),
    source,
  })
}
