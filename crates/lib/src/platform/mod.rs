pub mod paths;
pub mod probe;

pub use probe::{CapabilityProbe, CommandProbe};

/// Returns true when the process runs with root privileges.
#[cfg(unix)]
pub fn is_elevated() -> bool {
  rustix::process::geteuid().is_root()
}

#[cfg(not(unix))]
pub fn is_elevated() -> bool {
  false
}
