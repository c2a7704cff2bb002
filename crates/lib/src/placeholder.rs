//! Variable substitution for toolchain flag templates.
//!
//! Flag templates reference build variables with `%name%` tokens, e.g.
//! `-c %src% -o %obj%`. Substitution is a single left-to-right pass:
//!
//! - A `%name%` token whose name resolves is replaced by its value.
//! - A token whose name does not resolve is kept verbatim, and its closing
//!   `%` may open the next token (`%foo%src%` keeps `%foo` and substitutes
//!   `%src%`).
//! - Substituted values are never rescanned, so a value containing
//!   `%other%` is emitted as-is and expansion cannot recurse.
//!
//! Because every token is looked up independently, the result does not
//! depend on the iteration order of the variable map.
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use skbuild_lib::placeholder::substitute;
//!
//! let mut vars = BTreeMap::new();
//! vars.insert("src".to_string(), "src/main.c".to_string());
//! assert_eq!(substitute("-c %src% %unknown%", &vars), "-c src/main.c %unknown%");
//! ```

use std::collections::{BTreeMap, HashMap};

use crate::arch::Arch;

/// Build variables accumulated across pipeline phases.
pub type Variables = BTreeMap<String, String>;

/// Trait for resolving variable names to values.
pub trait Resolver {
  fn resolve(&self, name: &str) -> Option<&str>;
}

impl Resolver for BTreeMap<String, String> {
  fn resolve(&self, name: &str) -> Option<&str> {
    self.get(name).map(String::as_str)
  }
}

impl Resolver for HashMap<String, String> {
  fn resolve(&self, name: &str) -> Option<&str> {
    self.get(name).map(String::as_str)
  }
}

/// Replace every resolvable `%name%` token in `input`.
pub fn substitute(input: &str, resolver: &impl Resolver) -> String {
  let mut result = String::with_capacity(input.len());
  let mut rest = input;

  while let Some(start) = rest.find('%') {
    result.push_str(&rest[..start]);
    let after = &rest[start + 1..];

    let Some(end) = after.find('%') else {
      // No closing delimiter: the remainder is literal
      result.push_str(&rest[start..]);
      return result;
    };

    let name = &after[..end];
    match resolver.resolve(name) {
      Some(value) if !name.is_empty() => {
        result.push_str(value);
        rest = &after[end + 1..];
      }
      _ => {
        result.push('%');
        rest = after;
      }
    }
  }

  result.push_str(rest);
  result
}

/// Replace `%arch%` with the canonical architecture name.
///
/// Output binary paths go through this before any other substitution.
pub fn substitute_arch(input: &str, arch: Arch) -> String {
  input.replace("%arch%", arch.as_str())
}
