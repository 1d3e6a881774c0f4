//! Dependency records and their build backends.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::execute::{CommandSpec, ExecuteError, OutputMode, ToolEnv, run_command, run_spec};
use crate::placeholder::{self, PlaceholderError, StageVars};

/// One repository to clone into the dependency-sources area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Source {
  /// Directory name under the sources area.
  pub name: String,
  /// Upstream clone URL.
  pub url: String,
}

/// A named external package that is fetched, built, and placed in the binaries area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Dependency {
  pub name: String,
  pub url: String,

  /// Extra repositories the build expects next to the primary checkout.
  #[serde(default)]
  pub companions: Vec<Source>,

  pub backend: BuildBackend,

  /// File name of the built artifact inside the binaries area.
  pub artifact: String,

  #[serde(default)]
  pub self_check: SelfCheck,

  #[serde(default)]
  pub install: InstallKind,
}

impl Dependency {
  /// The primary repository followed by all companions.
  pub fn sources(&self) -> Vec<Source> {
    let mut sources = vec![Source {
      name: self.name.clone(),
      url: self.url.clone(),
    }];
    sources.extend(self.companions.iter().cloned());
    sources
  }

  /// Reject placeholders that could never resolve, before anything runs.
  pub fn validate(&self) -> Result<(), PlaceholderError> {
    match &self.backend {
      BuildBackend::GeneratorScript { args, .. } => args.iter().try_for_each(|a| placeholder::validate(a)),
      BuildBackend::Package { command, .. } => command.parts().try_for_each(placeholder::validate),
    }
  }
}

/// How a dependency turns its fetched sources into an artifact.
///
/// Every variant honours the same contract: given the source directory, run
/// the dependency's native build and return the path of the produced file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum BuildBackend {
  /// The dependency ships its own build generator script.
  GeneratorScript {
    /// Interpreter to run the script with; the script is executed directly when absent.
    #[serde(default)]
    interpreter: Option<String>,
    /// Script path relative to the source directory.
    script: String,
    /// Target selector and other arguments for the script.
    #[serde(default)]
    args: Vec<String>,
    /// Produced file, relative to the source directory.
    output: PathBuf,
  },

  /// The dependency is built by its ecosystem's package manager.
  Package {
    command: CommandSpec,
    /// Produced file, relative to the source directory.
    output: PathBuf,
  },
}

impl BuildBackend {
  /// Run the build inside `src` and return the path of the produced artifact.
  pub async fn produce(&self, src: &Path, vars: &StageVars, env: &ToolEnv) -> Result<PathBuf, ExecuteError> {
    let vars = vars.with_src(src);

    let output = match self {
      BuildBackend::GeneratorScript {
        interpreter,
        script,
        args,
        output,
      } => {
        let script_path = src.join(script).to_string_lossy().to_string();
        let mut resolved = placeholder::substitute_all(args, &vars)?;
        let program = match interpreter {
          Some(interpreter) => {
            resolved.insert(0, script_path);
            interpreter.clone()
          }
          None => script_path,
        };
        run_command(&program, &resolved, src, env, OutputMode::Inherit).await?;
        output
      }
      BuildBackend::Package { command, output } => {
        run_spec(command, &vars, src, env, OutputMode::Inherit).await?;
        output
      }
    };

    let produced = src.join(output);
    debug!(path = %produced.display(), "expected build output");
    if !produced.is_file() {
      return Err(ExecuteError::ArtifactMissing(produced));
    }
    Ok(produced)
  }

  pub fn kind(&self) -> &'static str {
    match self {
      BuildBackend::GeneratorScript { .. } => "generator-script",
      BuildBackend::Package { .. } => "package",
    }
  }
}

/// Post-build verification of a placed artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SelfCheck {
  /// Run the artifact with these arguments and require a zero exit.
  Invoke { args: Vec<String> },
  /// Require a regular, non-empty file (shared libraries cannot be run).
  #[default]
  Present,
}

/// Where the install stage puts an artifact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallKind {
  #[default]
  Executable,
  Library,
}
