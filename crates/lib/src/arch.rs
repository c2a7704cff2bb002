use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// CPU architecture a target can be built for.
///
/// The canonical name doubles as a filesystem suffix (`obj-<arch>`,
/// `srctree-<arch>`) and as the value of the `%arch%` placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Arch {
  #[serde(rename = "x86_64")]
  X86_64,
  AArch64,
  RiscV64,
  #[serde(rename = "i686")]
  I686,
  PowerPC,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown architecture: {0}")]
pub struct UnknownArch(pub String);

impl Arch {
  pub const ALL: [Arch; 5] = [Arch::X86_64, Arch::AArch64, Arch::RiscV64, Arch::I686, Arch::PowerPC];

  /// Returns the canonical name for this architecture
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::X86_64 => "x86_64",
      Self::AArch64 => "AArch64",
      Self::RiscV64 => "RiscV64",
      Self::I686 => "i686",
      Self::PowerPC => "PowerPC",
    }
  }
}

impl fmt::Display for Arch {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for Arch {
  type Err = UnknownArch;

  /// Accepts the canonical name in any case.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Arch::ALL
      .into_iter()
      .find(|arch| arch.as_str().eq_ignore_ascii_case(s))
      .ok_or_else(|| UnknownArch(s.to_string()))
  }
}
