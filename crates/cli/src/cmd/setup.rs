//! Implementation of the setup run.
//!
//! Resolves the project root, loads the configuration, runs the orchestrator
//! and prints the result. Library failures are reported here and turned into
//! the process exit status.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result, ensure};
use tracing::debug;

use itrace_setup_lib::config::Config;
use itrace_setup_lib::consts::{DLFILTER_ENV, PT_SUPPORT_URL};
use itrace_setup_lib::platform::{CommandProbe, paths};
use itrace_setup_lib::setup::{BuildMode, Orchestrator, SetupError, SetupReport};
use itrace_setup_lib::stages::GitFetcher;

use crate::output::{
  OutputFormat, format_duration, print_error, print_info, print_json, print_outcome, print_stat, print_success,
};

pub struct SetupArgs {
  pub mode: BuildMode,
  pub config: Option<PathBuf>,
  pub root: Option<PathBuf>,
  pub output: OutputFormat,
}

/// Run the setup and return the exit status to report.
pub fn cmd_setup(args: SetupArgs) -> Result<ExitCode> {
  let start = Instant::now();

  let root = match args.root {
    Some(root) => dunce::canonicalize(&root).unwrap_or(root),
    None => paths::project_root().context("Failed to determine project root")?,
  };
  ensure!(root.is_dir(), "project root '{}' is not a directory", root.display());
  debug!(root = %root.display(), "project root");

  let config = match Config::load(&root, args.config.as_deref()) {
    Ok(config) => config,
    Err(e) => return Ok(report_failure(SetupError::from(e))),
  };

  let probe = Arc::new(CommandProbe::new(&config.probe));
  let orchestrator = Orchestrator::new(config, &root, probe, Arc::new(GitFetcher));

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  match rt.block_on(orchestrator.run(args.mode)) {
    Ok(report) => {
      if args.output.is_json() {
        print_json(&report)?;
      } else {
        print_summary(&report, start.elapsed());
      }
      Ok(ExitCode::SUCCESS)
    }
    Err(e) => Ok(report_failure(e)),
  }
}

fn report_failure(err: SetupError) -> ExitCode {
  if let SetupError::Unsupported = err {
    println!("Intel PT unavailable");
    println!("Check list of processors that support Intel PT: {PT_SUPPORT_URL}");
  } else {
    print_error(&format!("Setup failed: {err}"));
  }
  ExitCode::from(err.exit_code())
}

fn print_summary(report: &SetupReport, elapsed: std::time::Duration) {
  println!();
  for record in &report.stages {
    let line = match &record.detail {
      Some(detail) => format!("{} {} ({})", record.stage, record.subject, detail),
      None => format!("{} {}", record.stage, record.subject),
    };
    print_outcome(record.outcome, &line);
  }

  println!();
  print_success("Setup complete!");
  print_stat("Duration", &format_duration(elapsed));

  if let Some(path) = &report.dlfilter_path {
    println!();
    print_info(&format!("To convert traces for Perfetto, export {DLFILTER_ENV}={}", path.display()));
  }
}
