//! Build runs without install.

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn prebuilt_run_builds_local_project() {
  let env = TestEnv::prebuilt();

  env
    .setup_cmd()
    .assert()
    .success()
    .stdout(predicate::str::contains("Setup complete!"))
    .stdout(predicate::str::contains("build xed (already present)"))
    .stdout(predicate::str::contains("smoke-test itrace"));

  for dir in ["deps", "bin", "build"] {
    assert!(env.exists(dir));
  }
  assert!(env.exists("build/itrace"));
  assert!(env.exists("build/configured.txt"));
  assert!(!env.prefix().exists());
}

#[test]
fn rerun_is_idempotent() {
  let env = TestEnv::prebuilt();

  env.setup_cmd().assert().success();
  env
    .setup_cmd()
    .assert()
    .success()
    .stdout(predicate::str::contains("fetch xed (already present)"))
    .stdout(predicate::str::contains("build xed (already present)"));
}

#[test]
fn json_report() {
  let env = TestEnv::prebuilt();

  let output = env.setup_cmd().args(["--output", "json"]).output().unwrap();
  assert!(output.status.success());

  let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(report["phases"][0], "probing");
  assert_eq!(report["phases"].as_array().unwrap().last().unwrap(), "done");
  assert_eq!(report["stages"][0]["stage"], "fetch");
  assert_eq!(report["stages"][0]["outcome"], "skipped");
}

#[test]
fn failing_compile_exit_code_is_propagated() {
  let env = TestEnv::prebuilt();
  let config = std::fs::read_to_string(env.config_path())
    .unwrap()
    .replace("printf '#!/bin/sh\\\\nexit 0\\\\n' > itrace && chmod +x itrace", "exit 7");
  env.write_config(&config);

  env
    .setup_cmd()
    .assert()
    .code(7)
    .stderr(predicate::str::contains("Setup failed"));
}

#[test]
fn broken_smoke_test_is_tolerated_by_default() {
  let env = TestEnv::prebuilt();
  let config = std::fs::read_to_string(env.config_path())
    .unwrap()
    .replace("exit 0\\\\n' > itrace", "exit 4\\\\n' > itrace");
  env.write_config(&config);

  env
    .setup_cmd()
    .assert()
    .success()
    .stdout(predicate::str::contains("smoke-test itrace (failed, continuing)"));
}

#[test]
fn broken_smoke_test_fails_when_enforced() {
  let env = TestEnv::prebuilt();
  let config = std::fs::read_to_string(env.config_path())
    .unwrap()
    .replace("exit 0\\\\n' > itrace", "exit 4\\\\n' > itrace")
    .replace("executable = \"itrace\"", "executable = \"itrace\"\nsmoke_policy = \"enforce\"");
  env.write_config(&config);

  env.setup_cmd().assert().code(4);
}

#[test]
fn unreachable_source_fails_without_leaving_a_checkout() {
  let env = TestEnv::new();

  env.setup_cmd().assert().code(1).stderr(predicate::str::contains("xed"));

  assert!(env.exists("deps"));
  assert!(!env.exists("deps/xed"));
  assert!(!env.exists("deps/.xed.partial"));
  assert!(!env.exists("build/itrace"));
}

#[test]
fn clean_removes_previous_artifacts() {
  let env = TestEnv::prebuilt();
  env.setup_cmd().assert().success();
  env.write_file("deps/xed/stale", "old");

  // The artifact is gone after cleaning, so the fetch runs and fails offline.
  env.setup_cmd().arg("--clean").assert().code(1);

  assert!(!env.exists("bin/xed"));
  assert!(!env.exists("deps/xed"));
  assert!(!env.exists("build/itrace"));
}

#[test]
fn export_with_prebuilt_dlfilter_prints_hint() {
  let env = TestEnv::prebuilt();
  env.write_file("bin/libfxt_dlfilter.so", "\x7fELF");

  env
    .setup_cmd()
    .arg("--export")
    .assert()
    .success()
    .stdout(predicate::str::contains("build fxt-dlfilter (already present)"))
    .stdout(predicate::str::contains("DLFILTER_PATH="));
}

#[test]
fn export_flag_absent_never_touches_dlfilter() {
  let env = TestEnv::prebuilt();

  env
    .setup_cmd()
    .assert()
    .success()
    .stdout(predicate::str::contains("fxt-dlfilter").not())
    .stdout(predicate::str::contains("DLFILTER_PATH").not());
}
