//! Placeholder parsing and substitution for configurable command arguments.
//!
//! Build commands in the configuration can reference paths that are only
//! known once the project root and workspace layout are resolved.
//!
//! # Placeholder Formats
//!
//! - `$${root}` - the project root
//! - `$${src}` - the fetched source directory of the dependency being built
//! - `$${build}` - the local-build-output directory
//! - `$${bin}` - the shared binaries directory
//! - `$${jobs}` - the host's available parallelism
//!
//! # Shell Variables
//!
//! Single `$` characters pass through unchanged, so `$HOME` or `$PATH` inside a
//! `sh -c` argument work without escaping.
//!
//! # Escaping
//!
//! Use `$$$` before `{` to produce a literal `$${` sequence.
//!
//! # Example
//!
//! ```
//! use itrace_setup_lib::placeholder::{parse, Segment, Placeholder};
//!
//! let segments = parse("-j$${jobs}").unwrap();
//! assert_eq!(segments, vec![
//!     Segment::Literal("-j".to_string()),
//!     Segment::Placeholder(Placeholder::Jobs),
//! ]);
//! ```

use std::path::Path;

use thiserror::Error;

/// A parsed placeholder reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
  Root,
  Src,
  Build,
  Bin,
  Jobs,
}

impl Placeholder {
  fn from_name(name: &str) -> Option<Self> {
    match name {
      "root" => Some(Placeholder::Root),
      "src" => Some(Placeholder::Src),
      "build" => Some(Placeholder::Build),
      "bin" => Some(Placeholder::Bin),
      "jobs" => Some(Placeholder::Jobs),
      _ => None,
    }
  }

  pub fn name(self) -> &'static str {
    match self {
      Placeholder::Root => "root",
      Placeholder::Src => "src",
      Placeholder::Build => "build",
      Placeholder::Bin => "bin",
      Placeholder::Jobs => "jobs",
    }
  }
}

/// A segment of parsed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
  /// Literal text (no placeholders)
  Literal(String),

  /// A placeholder to be resolved
  Placeholder(Placeholder),
}

/// Errors that can occur during placeholder parsing or resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaceholderError {
  #[error("unclosed placeholder at position {0}")]
  Unclosed(usize),

  #[error("unknown placeholder: {0}")]
  Unknown(String),

  #[error("placeholder '{0}' is not available in this context")]
  Unavailable(&'static str),
}

/// Trait for resolving placeholder values at execution time.
pub trait Resolver {
  fn resolve(&self, placeholder: Placeholder) -> Result<&str, PlaceholderError>;
}

/// Values available to the commands of one stage.
#[derive(Debug, Clone)]
pub struct StageVars {
  root: String,
  build: String,
  bin: String,
  jobs: String,
  src: Option<String>,
}

impl StageVars {
  pub fn new(root: &Path, build: &Path, bin: &Path, jobs: usize) -> Self {
    Self {
      root: root.to_string_lossy().to_string(),
      build: build.to_string_lossy().to_string(),
      bin: bin.to_string_lossy().to_string(),
      jobs: jobs.to_string(),
      src: None,
    }
  }

  /// Returns a copy with `$${src}` bound to a dependency's source directory.
  pub fn with_src(&self, src: &Path) -> Self {
    Self {
      src: Some(src.to_string_lossy().to_string()),
      ..self.clone()
    }
  }
}

impl Resolver for StageVars {
  fn resolve(&self, placeholder: Placeholder) -> Result<&str, PlaceholderError> {
    match placeholder {
      Placeholder::Root => Ok(&self.root),
      Placeholder::Build => Ok(&self.build),
      Placeholder::Bin => Ok(&self.bin),
      Placeholder::Jobs => Ok(&self.jobs),
      Placeholder::Src => self.src.as_deref().ok_or(PlaceholderError::Unavailable("src")),
    }
  }
}

/// Parse a string containing placeholders into segments.
///
/// # Errors
///
/// Returns an error if a placeholder is unclosed or names an unknown value.
pub fn parse(input: &str) -> Result<Vec<Segment>, PlaceholderError> {
  let mut segments = Vec::new();
  let mut literal = String::new();
  let mut chars = input.char_indices().peekable();

  while let Some((pos, ch)) = chars.next() {
    if ch != '$' {
      literal.push(ch);
      continue;
    }

    if !matches!(chars.peek(), Some((_, '$'))) {
      // Lone $, shell variables pass through
      literal.push('$');
      continue;
    }
    chars.next();

    match chars.peek() {
      Some((_, '$')) => {
        chars.next();
        if matches!(chars.peek(), Some((_, '{'))) {
          // Escaped: $$${ -> $${
          chars.next();
          literal.push_str("$${");
        } else {
          literal.push_str("$$$");
        }
      }
      Some((_, '{')) => {
        chars.next();

        if !literal.is_empty() {
          segments.push(Segment::Literal(std::mem::take(&mut literal)));
        }

        let mut name = String::new();
        let mut found_close = false;
        for (_, c) in chars.by_ref() {
          if c == '}' {
            found_close = true;
            break;
          }
          name.push(c);
        }

        if !found_close {
          return Err(PlaceholderError::Unclosed(pos));
        }

        let placeholder = Placeholder::from_name(name.trim()).ok_or(PlaceholderError::Unknown(name))?;
        segments.push(Segment::Placeholder(placeholder));
      }
      _ => literal.push_str("$$"),
    }
  }

  if !literal.is_empty() {
    segments.push(Segment::Literal(literal));
  }

  Ok(segments)
}

/// Substitute every placeholder in `input` using `resolver`.
pub fn substitute(input: &str, resolver: &impl Resolver) -> Result<String, PlaceholderError> {
  let mut out = String::with_capacity(input.len());
  for segment in parse(input)? {
    match segment {
      Segment::Literal(text) => out.push_str(&text),
      Segment::Placeholder(p) => out.push_str(resolver.resolve(p)?),
    }
  }
  Ok(out)
}

/// Substitute placeholders in every element of an argument list.
pub fn substitute_all(args: &[String], resolver: &impl Resolver) -> Result<Vec<String>, PlaceholderError> {
  args.iter().map(|arg| substitute(arg, resolver)).collect()
}

/// Check that `input` only references known placeholders, without resolving them.
pub fn validate(input: &str) -> Result<(), PlaceholderError> {
  parse(input).map(|_| ())
}

/// Like [`validate`], but also rejects placeholders with no value in the
/// calling context.
pub fn validate_without(input: &str, unavailable: &[Placeholder]) -> Result<(), PlaceholderError> {
  match parse(input)?.into_iter().find_map(|segment| match segment {
    Segment::Placeholder(p) if unavailable.contains(&p) => Some(p),
    _ => None,
  }) {
    Some(p) => Err(PlaceholderError::Unavailable(p.name())),
    None => Ok(()),
  }
}
