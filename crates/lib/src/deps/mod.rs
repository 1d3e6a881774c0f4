//! Statically declared native dependencies.
//!
//! Two packages are needed around the tracer:
//! - `xed`, Intel's x86 encoder/decoder, which `perf script --xed` uses to
//!   disassemble instruction traces. Mandatory.
//! - `fxt-dlfilter`, a `perf` dlfilter that converts traces to the Fuchsia
//!   trace format for viewing in Perfetto. Only built in export mode.
//!
//! Both can be overridden from the configuration file.

pub mod types;

use std::path::PathBuf;

use crate::execute::CommandSpec;

pub use types::{BuildBackend, Dependency, InstallKind, SelfCheck, Source};

pub fn xed() -> Dependency {
  Dependency {
    name: "xed".to_string(),
    url: "https://github.com/intelxed/xed.git".to_string(),
    companions: vec![Source {
      name: "mbuild".to_string(),
      url: "https://github.com/intelxed/mbuild.git".to_string(),
    }],
    backend: BuildBackend::GeneratorScript {
      interpreter: Some("python3".to_string()),
      script: "mfile.py".to_string(),
      args: vec!["examples".to_string()],
      output: PathBuf::from("obj/wkit/examples/obj/xed"),
    },
    artifact: "xed".to_string(),
    self_check: SelfCheck::Invoke {
      args: vec!["-version".to_string()],
    },
    install: InstallKind::Executable,
  }
}

pub fn fxt_dlfilter() -> Dependency {
  Dependency {
    name: "fxt-dlfilter".to_string(),
    url: "https://github.com/itrace-dev/fxt-dlfilter.git".to_string(),
    companions: Vec::new(),
    backend: BuildBackend::Package {
      command: CommandSpec::new("cargo", &["build", "--release"]),
      output: PathBuf::from("target/release/libfxt_dlfilter.so"),
    },
    artifact: "libfxt_dlfilter.so".to_string(),
    self_check: SelfCheck::Present,
    install: InstallKind::Library,
  }
}
