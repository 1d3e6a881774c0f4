//! End-to-end runs of itrace-setup against scratch projects.

mod common;
mod install_tests;
mod setup_tests;
