//! Install stage: copy finished artifacts to system locations.
//!
//! Privileges are assumed, not acquired. A failed copy aborts the stage and
//! leaves earlier copies in place.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::config::{Config, InstallConfig};
use crate::consts::PERF_PARANOID_LINE;
use crate::deps::{Dependency, InstallKind};
use crate::platform;
use crate::workspace::Workspace;

#[derive(Debug, Error)]
pub enum InstallError {
  #[error("nothing to install at '{0}'; was the build skipped?")]
  MissingArtifact(PathBuf),

  #[error("failed to create '{path}': {source}")]
  CreateDir {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to copy '{from}' to '{to}': {source}")]
  Copy {
    from: PathBuf,
    to: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to update '{path}': {source}")]
  Sysctl {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// What the install stage changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallSummary {
  pub installed: Vec<PathBuf>,
  pub sysctl_updated: bool,
}

/// Install the local tool, the mandatory artifact and, in export mode, the export artifact if present.
pub async fn install(ws: &Workspace, config: &Config, export: bool) -> Result<InstallSummary, InstallError> {
  if !platform::is_elevated() {
    warn!("not running as root; installing to system directories may fail");
  }

  let target = &config.install;
  let mut summary = InstallSummary::default();

  let exe = ws.build_dir().join(&config.project.executable);
  summary.installed.push(copy_into(&exe, &target.bin_dir).await?);

  let mandatory = &config.dependencies.mandatory;
  summary
    .installed
    .push(copy_into(&ws.artifact_path(&mandatory.artifact), destination(target, mandatory)).await?);

  if export {
    let optional = &config.dependencies.export;
    let artifact = ws.artifact_path(&optional.artifact);
    if artifact.is_file() {
      summary.installed.push(copy_into(&artifact, destination(target, optional)).await?);
    } else {
      debug!(artifact = %artifact.display(), "export artifact absent, not installed");
    }
  }

  if target.unprivileged_tracing {
    summary.sysctl_updated = allow_unprivileged_tracing(&target.sysctl_path).await?;
  }

  Ok(summary)
}

fn destination<'a>(target: &'a InstallConfig, dep: &Dependency) -> &'a Path {
  match dep.install {
    InstallKind::Executable => &target.bin_dir,
    InstallKind::Library => &target.lib_dir,
  }
}

async fn copy_into(from: &Path, dir: &Path) -> Result<PathBuf, InstallError> {
  if !from.is_file() {
    return Err(InstallError::MissingArtifact(from.to_path_buf()));
  }
  tokio::fs::create_dir_all(dir).await.map_err(|source| InstallError::CreateDir {
    path: dir.to_path_buf(),
    source,
  })?;

  let name = from.file_name().unwrap_or(from.as_os_str());
  let to = dir.join(name);
  tokio::fs::copy(from, &to).await.map_err(|source| InstallError::Copy {
    from: from.to_path_buf(),
    to: to.clone(),
    source,
  })?;
  info!(from = %from.display(), to = %to.display(), "installed");
  Ok(to)
}

/// Append the `perf_event_paranoid` relaxation to `path` unless it is already there.
///
/// Returns whether the file was changed.
pub async fn allow_unprivileged_tracing(path: &Path) -> Result<bool, InstallError> {
  let sysctl_err = |source| InstallError::Sysctl {
    path: path.to_path_buf(),
    source,
  };

  let existing = match tokio::fs::read_to_string(path).await {
    Ok(text) => text,
    Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
    Err(e) => return Err(sysctl_err(e)),
  };

  if existing.lines().any(|l| l.trim() == PERF_PARANOID_LINE) {
    debug!(path = %path.display(), "perf_event_paranoid already relaxed");
    return Ok(false);
  }

  let mut line = String::new();
  if !existing.is_empty() && !existing.ends_with('\n') {
    line.push('\n');
  }
  line.push_str(PERF_PARANOID_LINE);
  line.push('\n');

  let mut file = tokio::fs::OpenOptions::new()
    .create(true)
    .append(true)
    .open(path)
    .await
    .map_err(sysctl_err)?;
  file.write_all(line.as_bytes()).await.map_err(sysctl_err)?;
  file.flush().await.map_err(sysctl_err)?;

  info!(path = %path.display(), "enabled unprivileged tracing; takes effect after `sysctl -p` or a reboot");
  Ok(true)
}
