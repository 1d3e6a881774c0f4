mod cmd;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use itrace_setup_lib::setup::BuildMode;

use crate::cmd::{SetupArgs, cmd_setup};
use crate::output::{OutputFormat, print_error};

/// Fetch, build and install the tools needed to record and decode Intel PT traces
#[derive(Parser)]
#[command(name = "itrace-setup")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Remove deps/, bin/ and build/ before building
  #[arg(long)]
  clean: bool,

  /// Also build the dlfilter that converts traces for Perfetto
  #[arg(long)]
  export: bool,

  /// Copy the built tools into the system install directories
  #[arg(long)]
  install: bool,

  /// Configuration file (default: <root>/itrace-setup.toml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Project root (default: $ITRACE_ROOT, then the current directory)
  #[arg(long)]
  root: Option<PathBuf>,

  /// Enable verbose output
  #[arg(short, long)]
  verbose: bool,

  /// Output format
  #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
  output: OutputFormat,
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "info" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let args = SetupArgs {
    mode: BuildMode {
      clean: cli.clean,
      export: cli.export,
      install: cli.install,
    },
    config: cli.config,
    root: cli.root,
    output: cli.output,
  };

  match cmd_setup(args) {
    Ok(code) => code,
    Err(e) => {
      print_error(&format!("{e:#}"));
      ExitCode::FAILURE
    }
  }
}
