use std::path::PathBuf;

use crate::consts::ROOT_ENV;

/// Returns the project root: `ITRACE_ROOT` if set, else the current directory.
///
/// The result is canonicalized when the directory exists.
pub fn project_root() -> std::io::Result<PathBuf> {
  let root = match std::env::var_os(ROOT_ENV).filter(|v| !v.is_empty()) {
    Some(dir) => PathBuf::from(dir),
    None => std::env::current_dir()?,
  };
  Ok(dunce::canonicalize(&root).unwrap_or(root))
}
