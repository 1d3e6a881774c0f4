//! Local project build stage: configure, compile and smoke-test the companion tool.
//!
//! This stage never skips. The native build tool decides what is stale.

use tracing::{info, warn};

use crate::config::{ProjectConfig, SmokePolicy};
use crate::execute::{ExecuteError, OutputMode, StageOutcome, ToolEnv, run_command, run_spec};
use crate::placeholder::StageVars;
use crate::workspace::Workspace;

/// Configure and compile in the build directory.
pub async fn build_project(ws: &Workspace, project: &ProjectConfig, vars: &StageVars) -> Result<(), ExecuteError> {
  let build_dir = ws.build_dir();
  tokio::fs::create_dir_all(build_dir).await?;

  info!(dir = %build_dir.display(), "configuring");
  run_spec(&project.configure, vars, build_dir, &ToolEnv::new(), OutputMode::Inherit).await?;

  info!(dir = %build_dir.display(), "compiling");
  run_spec(&project.compile, vars, build_dir, &ToolEnv::new(), OutputMode::Inherit).await?;

  Ok(())
}

/// Run the freshly built tool once with the binaries area on its `PATH`.
///
/// Under [`SmokePolicy::Warn`] a failure is logged and reported as
/// [`StageOutcome::Tolerated`]; under [`SmokePolicy::Enforce`] it is returned.
pub async fn smoke_test(ws: &Workspace, project: &ProjectConfig) -> Result<StageOutcome, ExecuteError> {
  let exe = ws.build_dir().join(&project.executable);
  let env = ToolEnv::with_search_prefix(ws.bin_dir())?;
  let program = exe.to_string_lossy();

  match run_command(&program, &project.smoke_args, ws.root(), &env, OutputMode::Capture).await {
    Ok(_) => {
      info!(exe = %exe.display(), "smoke test passed");
      Ok(StageOutcome::Completed)
    }
    Err(e) => match project.smoke_policy {
      SmokePolicy::Warn => {
        warn!(exe = %exe.display(), error = %e, "smoke test failed, continuing");
        Ok(StageOutcome::Tolerated)
      }
      SmokePolicy::Enforce => Err(e),
    },
  }
}
