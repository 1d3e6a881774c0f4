//! Test doubles and fixtures shared by the unit tests.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::config::{Config, InstallConfig};
use crate::deps::{BuildBackend, Dependency, InstallKind, SelfCheck};
use crate::execute::CommandSpec;
use crate::platform::CapabilityProbe;
use crate::stages::fetch::{FetchError, SourceFetcher};

/// Body of a script that prints nothing and succeeds, used as a stand-in artifact.
pub const NOOP_TOOL: &str = "#!/bin/sh\nexit 0\n";

/// Shell command and args to run a script.
pub fn sh(script: &str) -> (&'static str, Vec<String>) {
  ("/bin/sh", vec!["-c".to_string(), script.to_string()])
}

/// Write an executable `/bin/sh` script.
#[cfg(unix)]
pub fn write_script(path: &Path, body: &str) {
  use std::os::unix::fs::PermissionsExt;

  std::fs::write(path, format!("#!/bin/sh\n{body}\n")).unwrap();
  std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

/// Create a git repository at `dir` with one commit holding `README`.
///
/// Returns `false` when no `git` binary is available.
pub fn git_repo(dir: &Path) -> bool {
  let git = |args: &[&str]| {
    std::process::Command::new("git")
      .args(args)
      .current_dir(dir)
      .env("GIT_AUTHOR_NAME", "test")
      .env("GIT_AUTHOR_EMAIL", "test@example.com")
      .env("GIT_COMMITTER_NAME", "test")
      .env("GIT_COMMITTER_EMAIL", "test@example.com")
      .output()
  };

  std::fs::create_dir_all(dir).unwrap();
  match git(&["init", "-q", "-b", "main"]) {
    Ok(out) if out.status.success() => {}
    _ => return false,
  }
  std::fs::write(dir.join("README"), "xed sources\n").unwrap();
  for args in [&["add", "README"][..], &["commit", "-q", "-m", "initial"][..]] {
    let out = git(args).unwrap();
    assert!(out.status.success(), "git {args:?}: {}", String::from_utf8_lossy(&out.stderr));
  }
  true
}

/// A fetcher that writes a tiny source tree instead of cloning.
///
/// The tree contains `gen.sh`, which writes an executable `out/tool`, so a
/// dependency built with [`fake_dependency`] succeeds end to end.
#[derive(Debug, Default)]
pub struct FakeFetcher {
  cloned: Mutex<Vec<String>>,
  fail_on: Option<String>,
}

impl FakeFetcher {
  pub fn new() -> Self {
    Self::default()
  }

  /// Leave a half-written tree behind and fail when asked for `url`.
  pub fn failing_on(url: &str) -> Self {
    Self {
      fail_on: Some(url.to_string()),
      ..Self::default()
    }
  }

  pub fn cloned(&self) -> Vec<String> {
    self.cloned.lock().unwrap().clone()
  }

  pub fn clone_count(&self) -> usize {
    self.cloned.lock().unwrap().len()
  }
}

impl SourceFetcher for FakeFetcher {
  fn fetch_into(&self, url: &str, dest: &Path) -> Result<(), FetchError> {
    std::fs::create_dir_all(dest).unwrap();

    if self.fail_on.as_deref() == Some(url) {
      std::fs::write(dest.join("HALF"), "interrupted").unwrap();
      return Err(FetchError::Clone {
        url: url.to_string(),
        source: "connection reset".into(),
      });
    }

    write_script(
      &dest.join("gen.sh"),
      &format!("mkdir -p out && printf '{}' > out/tool && chmod +x out/tool", NOOP_TOOL.escape_default()),
    );
    self.cloned.lock().unwrap().push(url.to_string());
    Ok(())
  }
}

/// Probe with a fixed answer that counts how often it was consulted.
#[derive(Debug)]
pub struct FixedProbe {
  answer: bool,
  calls: AtomicUsize,
}

impl FixedProbe {
  pub fn new(answer: bool) -> Self {
    Self {
      answer,
      calls: AtomicUsize::new(0),
    }
  }

  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

impl CapabilityProbe for FixedProbe {
  fn is_supported(&self) -> bool {
    self.calls.fetch_add(1, Ordering::SeqCst);
    self.answer
  }
}

/// A dependency built from the tree [`FakeFetcher`] writes.
pub fn fake_dependency(name: &str, install: InstallKind) -> Dependency {
  let self_check = match install {
    InstallKind::Executable => SelfCheck::Invoke {
      args: vec!["-version".to_string()],
    },
    InstallKind::Library => SelfCheck::Present,
  };
  Dependency {
    name: name.to_string(),
    url: format!("fake://{name}"),
    companions: Vec::new(),
    backend: BuildBackend::GeneratorScript {
      interpreter: None,
      script: "gen.sh".to_string(),
      args: Vec::new(),
      output: PathBuf::from("out/tool"),
    },
    artifact: format!("{name}-artifact"),
    self_check,
    install,
  }
}

/// A configuration that builds everything with `/bin/sh` and installs under `install_prefix`.
pub fn fake_config(install_prefix: &Path) -> Config {
  let mut config = Config::default();
  config.project.configure = CommandSpec::new("/bin/sh", &["-c", "echo configured > configured.txt"]);
  config.project.compile = CommandSpec::new(
    "/bin/sh",
    &[
      "-c",
      "printf '#!/bin/sh\\nexit 0\\n' > itrace && chmod +x itrace && echo $${jobs} > jobs.txt",
    ],
  );
  config.install = InstallConfig {
    bin_dir: install_prefix.join("bin"),
    lib_dir: install_prefix.join("lib"),
    unprivileged_tracing: false,
    sysctl_path: install_prefix.join("sysctl.conf"),
  };
  config.dependencies.mandatory = fake_dependency("xed", InstallKind::Executable);
  config.dependencies.export = fake_dependency("fxt-dlfilter", InstallKind::Library);
  config
}
