//! itrace-setup-lib: bootstrap the Intel PT tracing toolchain.
//!
//! The crate prepares everything the tracer needs before a trace is recorded:
//! - `workspace`: the `deps/`, `bin/` and `build/` directories and the
//!   filesystem-derived state of each dependency
//! - `stages`: fetch, native build, local project build and install
//! - `setup`: the orchestrator that sequences the stages under a [`setup::BuildMode`]

pub mod config;
pub mod consts;
pub mod deps;
pub mod execute;
pub mod placeholder;
pub mod platform;
pub mod setup;
pub mod stages;
pub mod util;
pub mod workspace;
