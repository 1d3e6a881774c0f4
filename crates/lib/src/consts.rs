//! Application-wide constants.

/// Configuration file looked up in the project root when `--config` is not given.
pub const CONFIG_FILENAME: &str = "itrace-setup.toml";

/// Environment variable overriding the project root.
pub const ROOT_ENV: &str = "ITRACE_ROOT";

/// Environment variable overriding both install directories with `<prefix>/bin` and `<prefix>/lib`.
pub const INSTALL_PREFIX_ENV: &str = "ITRACE_INSTALL_PREFIX";

pub const DEFAULT_INSTALL_PREFIX: &str = "/usr/local";

pub const SYSCTL_PATH: &str = "/etc/sysctl.conf";

/// Lets users other than root record Intel PT traces.
pub const PERF_PARANOID_LINE: &str = "kernel.perf_event_paranoid=-1";

/// Environment variable the trace exporter reads to locate the dlfilter library.
pub const DLFILTER_ENV: &str = "DLFILTER_PATH";

pub const PT_SUPPORT_URL: &str =
  "https://www.intel.com/content/www/us/en/support/articles/000056730/processors.html";

/// Suffix of the temporary directory a clone is written to before being renamed into place.
pub const PARTIAL_SUFFIX: &str = ".partial";
