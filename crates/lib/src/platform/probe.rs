//! Hardware instruction-trace capability probe.
//!
//! The setup consults the probe exactly once, before touching the
//! filesystem. The default implementation asks `perf` whether it knows the
//! `intel_pt` event, which is only listed when the CPU supports Intel PT and
//! the kernel driver is loaded.

use std::process::{Command, Stdio};

use tracing::{debug, info, warn};

use crate::config::ProbeConfig;

/// Answers whether the host can record hardware instruction traces.
pub trait CapabilityProbe: Send + Sync {
  fn is_supported(&self) -> bool;
}

/// Runs a command and looks for a pattern in its stdout.
#[derive(Debug, Clone)]
pub struct CommandProbe {
  program: String,
  args: Vec<String>,
  pattern: String,
}

impl CommandProbe {
  pub fn new(config: &ProbeConfig) -> Self {
    Self {
      program: config.program.clone(),
      args: config.args.clone(),
      pattern: config.pattern.clone(),
    }
  }
}

impl CapabilityProbe for CommandProbe {
  fn is_supported(&self) -> bool {
    info!(program = %self.program, pattern = %self.pattern, "probing for instruction tracing support");

    let output = match Command::new(&self.program)
      .args(&self.args)
      .stdin(Stdio::null())
      .output()
    {
      Ok(output) => output,
      Err(e) => {
        warn!(program = %self.program, error = %e, "probe command could not be started");
        return false;
      }
    };

    if !output.status.success() {
      debug!(code = ?output.status.code(), "probe command failed");
      return false;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let supported = stdout.contains(&self.pattern);
    debug!(supported, "probe finished");
    supported
  }
}
