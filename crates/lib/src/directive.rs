//! Architecture gating through a directive on a source file's first line.
//!
//! ```c
//! // SKB_X86_64_ONLY SKB_NO_i686
//! ```
//!
//! Tokens are case-sensitive and may appear anywhere on the line, in any
//! combination. `SKB_ARCH_INDEPENDANT` overrides every other token. Otherwise
//! each `*_ONLY` token rejects every other architecture and each `SKB_NO_*`
//! token rejects its own; a single rejecting token is enough.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use crate::arch::Arch;

/// Marks a file as buildable for every architecture.
pub const ARCH_INDEPENDENT: &str = "SKB_ARCH_INDEPENDANT";

/// `(token, architecture)` pairs restricting a file to one architecture.
pub const ONLY_TOKENS: [(&str, Arch); 4] = [
  ("SKB_X86_64_ONLY", Arch::X86_64),
  ("SKB_AARCH64_ONLY", Arch::AArch64),
  ("SKB_RISCV64_ONLY", Arch::RiscV64),
  ("SKB_i686_ONLY", Arch::I686),
];

/// `(token, architecture)` pairs excluding a file from one architecture.
pub const EXCLUDE_TOKENS: [(&str, Arch); 4] = [
  ("SKB_NO_X86_64", Arch::X86_64),
  ("SKB_NO_AARCH64", Arch::AArch64),
  ("SKB_NO_RISCV64", Arch::RiscV64),
  ("SKB_NO_i686", Arch::I686),
];

/// Decide whether a file whose first line is `line` compiles for `arch`.
///
/// `comment_prefix` is the comment leader of the file's language (`// `,
/// `;`). It is carried for diagnostics only and does not affect the result.
pub fn is_eligible(line: &str, _comment_prefix: &str, arch: Arch) -> bool {
  if line.contains(ARCH_INDEPENDENT) {
    return true;
  }

  let only_ok = ONLY_TOKENS
    .iter()
    .all(|(token, only)| !line.contains(token) || *only == arch);
  let exclude_ok = EXCLUDE_TOKENS
    .iter()
    .all(|(token, excluded)| !line.contains(token) || *excluded != arch);

  only_ok && exclude_ok
}

/// Read the first line of a file without its line terminator.
///
/// Bytes that are not valid UTF-8 are replaced; every token is ASCII so
/// matching is unaffected. Returns `None` for an empty file.
pub fn first_line(path: &Path) -> io::Result<Option<String>> {
  let mut reader = BufReader::new(File::open(path)?);
  let mut bytes = Vec::new();
  if reader.read_until(b'\n', &mut bytes)? == 0 {
    return Ok(None);
  }
  let line = String::from_utf8_lossy(&bytes);
  Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

/// Eligibility of the file at `path`; an empty file has no directive and is
/// eligible everywhere.
pub fn file_is_eligible(path: &Path, comment_prefix: &str, arch: Arch) -> io::Result<bool> {
  Ok(match first_line(path)? {
    Some(line) => is_eligible(&line, comment_prefix, arch),
    None => true,
  })
}
