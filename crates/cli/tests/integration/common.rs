//! Shared test helpers for CLI integration tests.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Config template. `@ROOT@` is replaced with the project root.
///
/// The probe always succeeds, the local project is a shell script, and the
/// dependency URLs point at paths that do not exist, so any attempt to fetch
/// fails fast without network access.
const CONFIG_TEMPLATE: &str = r##"
[probe]
program = "/bin/sh"
args = ["-c", "echo 'intel_pt//   [Kernel PMU event]'"]
pattern = "intel_pt"

[project]
executable = "itrace"
configure = ["/bin/sh", "-c", "echo configured > configured.txt"]
compile = ["/bin/sh", "-c", "printf '#!/bin/sh\\nexit 0\\n' > itrace && chmod +x itrace"]

[dependencies.mandatory]
name = "xed"
url = "@ROOT@/upstream/xed"
artifact = "xed"
backend = { kind = "generator-script", script = "gen.sh", output = "out/xed" }
self_check = { kind = "invoke", args = ["-version"] }

[dependencies.export]
name = "fxt-dlfilter"
url = "@ROOT@/upstream/fxt-dlfilter"
artifact = "libfxt_dlfilter.so"
backend = { kind = "package", command = ["/bin/sh", "-c", "true"], output = "lib.so" }
install = "library"
"##;

/// Isolated project root plus install prefix.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  /// A project with the test config and nothing built yet.
  pub fn new() -> Self {
    let env = Self {
      temp: TempDir::new().unwrap(),
    };
    std::fs::create_dir_all(env.root()).unwrap();
    env.write_config(&CONFIG_TEMPLATE.replace("@ROOT@", &env.root().display().to_string()));
    env
  }

  /// A project whose dependencies are already built, so no fetch is needed.
  pub fn prebuilt() -> Self {
    let env = Self::new();
    env.write_executable("bin/xed", "exit 0");
    env
  }

  pub fn root(&self) -> PathBuf {
    self.temp.path().join("project")
  }

  pub fn prefix(&self) -> PathBuf {
    self.temp.path().join("prefix")
  }

  pub fn config_path(&self) -> PathBuf {
    self.root().join("itrace-setup.toml")
  }

  pub fn write_config(&self, content: &str) {
    std::fs::write(self.config_path(), content).unwrap();
  }

  /// Append to the config file.
  pub fn extend_config(&self, extra: &str) {
    let mut content = std::fs::read_to_string(self.config_path()).unwrap();
    content.push_str(extra);
    self.write_config(&content);
  }

  /// Write a file relative to the project root.
  pub fn write_file(&self, relative_path: &str, content: &str) -> PathBuf {
    let path = self.root().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
  }

  /// Write an executable `/bin/sh` script relative to the project root.
  pub fn write_executable(&self, relative_path: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = self.write_file(relative_path, &format!("#!/bin/sh\n{body}\n"));
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
  }

  pub fn exists(&self, relative_path: impl AsRef<Path>) -> bool {
    self.root().join(relative_path).exists()
  }

  /// A Command for the binary, rooted in this project and installing into the scratch prefix.
  pub fn setup_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("itrace-setup");
    cmd.env("ITRACE_ROOT", self.root());
    cmd.env("ITRACE_INSTALL_PREFIX", self.prefix());
    cmd.env("RUST_LOG", "warn");
    cmd
  }
}
