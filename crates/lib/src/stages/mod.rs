//! The four stages the setup sequences.
//!
//! Fetch and build take their skip decision from
//! [`crate::workspace::DepState`]. No stage keeps state between calls.

pub mod build;
pub mod fetch;
pub mod install;
pub mod local;

pub use build::build_dependency;
pub use fetch::{FetchError, GitFetcher, SourceFetcher, fetch_dependency, fetch_source};
pub use install::{InstallError, InstallSummary, install};
pub use local::{build_project, smoke_test};
