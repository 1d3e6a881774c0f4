//! Runs with `--install`, into a scratch prefix.

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn install_copies_tool_and_decoder() {
  let env = TestEnv::prebuilt();

  env
    .setup_cmd()
    .arg("--install")
    .assert()
    .success()
    .stdout(predicate::str::contains("install"));

  assert!(env.prefix().join("bin/itrace").is_file());
  assert!(env.prefix().join("bin/xed").is_file());
  assert!(!env.prefix().join("lib").exists());
}

#[test]
fn install_with_export_copies_library() {
  let env = TestEnv::prebuilt();
  env.write_file("bin/libfxt_dlfilter.so", "\x7fELF");

  env.setup_cmd().args(["--install", "--export"]).assert().success();

  assert!(env.prefix().join("lib/libfxt_dlfilter.so").is_file());
  assert!(!env.prefix().join("bin/libfxt_dlfilter.so").exists());
}

#[test]
fn install_prefix_from_config_file() {
  let env = TestEnv::prebuilt();
  let dest = env.temp.path().join("configured");
  env.extend_config(&format!(
    "\n[install]\nbin_dir = \"{}\"\nlib_dir = \"{}\"\n",
    dest.join("bin").display(),
    dest.join("lib").display()
  ));

  env
    .setup_cmd()
    .env_remove("ITRACE_INSTALL_PREFIX")
    .arg("--install")
    .assert()
    .success();

  assert!(dest.join("bin/itrace").is_file());
  assert!(!env.prefix().exists());
}

#[test]
fn unprivileged_tracing_appends_sysctl_once() {
  let env = TestEnv::prebuilt();
  let sysctl = env.temp.path().join("sysctl.conf");
  env.extend_config(&format!(
    "\n[install]\nunprivileged_tracing = true\nsysctl_path = \"{}\"\n",
    sysctl.display()
  ));

  env.setup_cmd().arg("--install").assert().success();
  env.setup_cmd().arg("--install").assert().success();

  let content = std::fs::read_to_string(&sysctl).unwrap();
  assert_eq!(content.matches("kernel.perf_event_paranoid=-1").count(), 1);
}

#[test]
fn install_into_unwritable_prefix_fails() {
  let env = TestEnv::prebuilt();
  // A regular file where the bin directory should be.
  std::fs::write(env.temp.path().join("blocked"), "").unwrap();

  env
    .setup_cmd()
    .env("ITRACE_INSTALL_PREFIX", env.temp.path().join("blocked"))
    .arg("--install")
    .assert()
    .code(1)
    .stderr(predicate::str::contains("Setup failed"));
}
