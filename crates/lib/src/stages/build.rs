//! Native build stage: turn fetched sources into an artifact in `bin/`.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::deps::{Dependency, SelfCheck};
use crate::execute::{ExecuteError, OutputMode, StageOutcome, ToolEnv, run_command};
use crate::placeholder::StageVars;
use crate::workspace::{DepState, Workspace};

/// Build `dep`, place its artifact and verify it.
///
/// Skipped when the artifact is already in place. A placed artifact that
/// fails its self-check is removed again before the error is returned, so the
/// next run rebuilds it.
pub async fn build_dependency(
  ws: &Workspace,
  dep: &Dependency,
  vars: &StageVars,
) -> Result<StageOutcome, ExecuteError> {
  let state = ws.state_of(dep);
  if state == DepState::Built {
    info!(dep = %dep.name, "artifact present, skipping build");
    return Ok(StageOutcome::Skipped);
  }
  debug!(dep = %dep.name, %state, backend = dep.backend.kind(), "building");

  let src = ws.source_path(&dep.name);
  let produced = dep.backend.produce(&src, vars, &ToolEnv::new()).await?;

  let placed = ws.artifact_path(&dep.artifact);
  tokio::fs::copy(&produced, &placed).await?;
  info!(dep = %dep.name, artifact = %placed.display(), "artifact placed");

  if let Err(e) = self_check(ws, dep, &placed).await {
    warn!(artifact = %placed.display(), "removing artifact that failed its self-check");
    if let Err(remove) = tokio::fs::remove_file(&placed).await {
      warn!(artifact = %placed.display(), error = %remove, "could not remove artifact");
    }
    return Err(e);
  }

  Ok(StageOutcome::Completed)
}

async fn self_check(ws: &Workspace, dep: &Dependency, placed: &Path) -> Result<(), ExecuteError> {
  let failed = |reason: String, code: Option<i32>| ExecuteError::SelfCheckFailed {
    artifact: dep.artifact.clone(),
    reason,
    code,
  };

  match &dep.self_check {
    SelfCheck::Invoke { args } => {
      // Resolved by name through the call-local PATH.
      let env = ToolEnv::with_search_prefix(ws.bin_dir())?;
      run_command(&dep.artifact, args, ws.root(), &env, OutputMode::Capture)
        .await
        .map_err(|e| {
          let code = e.exit_code();
          failed(e.to_string(), code)
        })?;
    }
    SelfCheck::Present => {
      let meta = tokio::fs::metadata(placed).await?;
      if !meta.is_file() || meta.len() == 0 {
        return Err(failed("artifact is empty".to_string(), None));
      }
    }
  }

  debug!(artifact = %dep.artifact, "self-check passed");
  Ok(())
}
