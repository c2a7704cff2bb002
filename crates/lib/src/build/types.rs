//! Pipeline stages and the summary returned by a build.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::arch::Arch;

/// Pipeline state. Stages only move forward; `Failed` is absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
  Resolving,
  PreBuild,
  Preparing,
  Compiling,
  PreLink,
  Linking,
  PostLink,
  Snapshotting,
  PostBuild,
  Done,
  Failed,
}

impl fmt::Display for Stage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Stage::Resolving => "resolving",
      Stage::PreBuild => "pre-build",
      Stage::Preparing => "preparing",
      Stage::Compiling => "compiling",
      Stage::PreLink => "pre-link",
      Stage::Linking => "linking",
      Stage::PostLink => "post-link",
      Stage::Snapshotting => "snapshotting",
      Stage::PostBuild => "post-build",
      Stage::Done => "done",
      Stage::Failed => "failed",
    };
    f.write_str(name)
  }
}

/// Outcome of a successful build.
///
/// Paths are relative to the project root.
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
  pub target: String,
  pub arch: Arch,
  /// Sources handed to a compiler.
  pub compiled: Vec<PathBuf>,
  /// Changed sources rejected by their architecture directive.
  pub skipped: Vec<PathBuf>,
  /// Sources identical to their snapshot.
  pub up_to_date: Vec<PathBuf>,
  pub binary: PathBuf,
}

impl BuildReport {
  pub fn new(target: impl Into<String>, arch: Arch) -> Self {
    Self {
      target: target.into(),
      arch,
      compiled: Vec::new(),
      skipped: Vec::new(),
      up_to_date: Vec::new(),
      binary: PathBuf::new(),
    }
  }
}
