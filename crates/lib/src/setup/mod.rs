//! The setup orchestrator.
//!
//! A run moves through a fixed, linear sequence of phases:
//!
//! ```text
//! probing -> [cleaning] -> preparing_workspace -> building_mandatory_dependency
//!   -> building_local_project -> [building_optional_dependency] -> [installing] -> done
//! ```
//!
//! The first hard failure ends the run. Nothing is retried.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{Config, ConfigError};
use crate::deps::Dependency;
use crate::execute::{self, ExecuteError, StageOutcome};
use crate::placeholder::StageVars;
use crate::platform::CapabilityProbe;
use crate::stages::{self, FetchError, InstallError, SourceFetcher};
use crate::workspace::{Workspace, WorkspaceError};

#[derive(Debug, Error)]
pub enum SetupError {
  #[error("this machine cannot record Intel PT instruction traces")]
  Unsupported,

  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error(transparent)]
  Workspace(#[from] WorkspaceError),

  #[error(transparent)]
  Fetch(#[from] FetchError),

  #[error(transparent)]
  Execute(#[from] ExecuteError),

  #[error(transparent)]
  Install(#[from] InstallError),
}

impl SetupError {
  /// Process exit status for this failure.
  ///
  /// A failed external command's own non-zero status passes through unchanged;
  /// everything else is 1.
  pub fn exit_code(&self) -> u8 {
    match self {
      SetupError::Execute(e) => e
        .exit_code()
        .filter(|code| *code != 0)
        .and_then(|code| u8::try_from(code).ok())
        .unwrap_or(1),
      _ => 1,
    }
  }
}

/// Independent run flags. Clean always happens first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildMode {
  pub clean: bool,
  pub export: bool,
  pub install: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
  Probing,
  Cleaning,
  PreparingWorkspace,
  BuildingMandatoryDependency,
  BuildingLocalProject,
  BuildingOptionalDependency,
  Installing,
  Done,
}

impl fmt::Display for Phase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Phase::Probing => "probing",
      Phase::Cleaning => "cleaning",
      Phase::PreparingWorkspace => "preparing_workspace",
      Phase::BuildingMandatoryDependency => "building_mandatory_dependency",
      Phase::BuildingLocalProject => "building_local_project",
      Phase::BuildingOptionalDependency => "building_optional_dependency",
      Phase::Installing => "installing",
      Phase::Done => "done",
    };
    write!(f, "{name}")
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
  Clean,
  Fetch,
  Build,
  Compile,
  SmokeTest,
  Install,
  Sysctl,
}

impl fmt::Display for Stage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Stage::Clean => "clean",
      Stage::Fetch => "fetch",
      Stage::Build => "build",
      Stage::Compile => "compile",
      Stage::SmokeTest => "smoke-test",
      Stage::Install => "install",
      Stage::Sysctl => "sysctl",
    };
    write!(f, "{name}")
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageRecord {
  pub stage: Stage,
  pub subject: String,
  pub outcome: StageOutcome,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub detail: Option<String>,
}

/// What a successful run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SetupReport {
  pub phases: Vec<Phase>,
  pub stages: Vec<StageRecord>,
  /// The export dependency's artifact, set after an export build.
  pub dlfilter_path: Option<PathBuf>,
}

impl SetupReport {
  fn enter(&mut self, phase: Phase) {
    info!(%phase, "phase");
    self.phases.push(phase);
  }

  fn record(&mut self, stage: Stage, subject: &str, outcome: StageOutcome, detail: Option<String>) {
    self.stages.push(StageRecord {
      stage,
      subject: subject.to_string(),
      outcome,
      detail,
    });
  }

  /// Records for one stage kind, in run order.
  pub fn stage(&self, stage: Stage) -> impl Iterator<Item = &StageRecord> {
    self.stages.iter().filter(move |r| r.stage == stage)
  }
}

pub struct Orchestrator {
  config: Config,
  workspace: Workspace,
  probe: Arc<dyn CapabilityProbe>,
  fetcher: Arc<dyn SourceFetcher>,
  jobs: usize,
}

impl Orchestrator {
  pub fn new(config: Config, root: &Path, probe: Arc<dyn CapabilityProbe>, fetcher: Arc<dyn SourceFetcher>) -> Self {
    let workspace = Workspace::new(root, &config.workspace);
    Self {
      config,
      workspace,
      probe,
      fetcher,
      jobs: execute::host_parallelism(),
    }
  }

  pub fn workspace(&self) -> &Workspace {
    &self.workspace
  }

  pub async fn run(&self, mode: BuildMode) -> Result<SetupReport, SetupError> {
    let ws = &self.workspace;
    let mut report = SetupReport::default();
    info!(root = %ws.root().display(), ?mode, "starting setup");

    self.config.validate()?;

    report.enter(Phase::Probing);
    let probe = Arc::clone(&self.probe);
    let supported = tokio::task::spawn_blocking(move || probe.is_supported())
      .await
      .unwrap_or_else(|e| {
        warn!(error = %e, "capability probe did not finish");
        false
      });
    if !supported {
      return Err(SetupError::Unsupported);
    }

    if mode.clean {
      report.enter(Phase::Cleaning);
      let removed = ws.clean().await?;
      let outcome = if removed.is_empty() {
        StageOutcome::Skipped
      } else {
        StageOutcome::Completed
      };
      report.record(
        Stage::Clean,
        "workspace",
        outcome,
        Some(format!("removed {} of 3 directories", removed.len())),
      );
    }

    report.enter(Phase::PreparingWorkspace);
    ws.ensure().await?;
    let vars = StageVars::new(ws.root(), ws.build_dir(), ws.bin_dir(), self.jobs);

    report.enter(Phase::BuildingMandatoryDependency);
    self.provision(&self.config.dependencies.mandatory, &vars, &mut report).await?;

    report.enter(Phase::BuildingLocalProject);
    let project = &self.config.project;
    stages::build_project(ws, project, &vars).await?;
    report.record(
      Stage::Compile,
      &project.executable,
      StageOutcome::Completed,
      Some(format!("{} jobs", self.jobs)),
    );
    let smoke = stages::smoke_test(ws, project).await?;
    report.record(Stage::SmokeTest, &project.executable, smoke, None);

    if mode.export {
      report.enter(Phase::BuildingOptionalDependency);
      let export = &self.config.dependencies.export;
      self.provision(export, &vars, &mut report).await?;
      report.dlfilter_path = Some(ws.artifact_path(&export.artifact));
    }

    if mode.install {
      report.enter(Phase::Installing);
      let summary = stages::install(ws, &self.config, mode.export).await?;
      for path in &summary.installed {
        report.record(
          Stage::Install,
          &path.display().to_string(),
          StageOutcome::Completed,
          None,
        );
      }
      if self.config.install.unprivileged_tracing {
        let outcome = if summary.sysctl_updated {
          StageOutcome::Completed
        } else {
          StageOutcome::Skipped
        };
        report.record(
          Stage::Sysctl,
          &self.config.install.sysctl_path.display().to_string(),
          outcome,
          None,
        );
      }
    }

    report.enter(Phase::Done);
    Ok(report)
  }

  async fn provision(&self, dep: &Dependency, vars: &StageVars, report: &mut SetupReport) -> Result<(), SetupError> {
    let ws = &self.workspace;
    let state = ws.state_of(dep);
    info!(dep = %dep.name, %state, "provisioning");

    let fetched = stages::fetch_dependency(ws, dep, &self.fetcher).await?;
    report.record(Stage::Fetch, &dep.name, fetched, None);

    let built = stages::build_dependency(ws, dep, vars).await?;
    let detail = (built == StageOutcome::Completed).then(|| ws.artifact_path(&dep.artifact).display().to_string());
    report.record(Stage::Build, &dep.name, built, detail);
    Ok(())
  }
}
