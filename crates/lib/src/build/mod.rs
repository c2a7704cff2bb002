//! The build pipeline.
//!
//! A build of one target runs through fixed stages:
//!
//! ```text
//! Resolving → PreBuild → Preparing → Compiling → PreLink → Linking
//!           → PostLink → Snapshotting → PostBuild → Done
//! ```
//!
//! Any stage that fails moves the pipeline to [`Stage::Failed`] and the
//! build returns a [`BuildError`]. Objects produced before the failure are
//! left on disk.
//!
//! # Modules
//!
//! - [`execute`]: the [`Builder`] state machine
//! - [`sources`]: source classification and object naming
//! - [`types`]: stages and the build report

pub mod execute;
pub mod sources;
pub mod types;

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::exec::ExecError;
use crate::model::{ModelError, Project};

pub use execute::Builder;
pub use sources::SourceKind;
pub use types::{BuildReport, Stage};

#[derive(Debug, Error)]
pub enum BuildError {
  #[error("no project.json found in {0}")]
  NoProject(PathBuf),

  #[error("unknown target '{0}'")]
  UnknownTarget(String),

  /// A pre-build handler vetoed the build.
  #[error("build aborted: {reason}")]
  Aborted { reason: String },

  #[error("failed to compile {source_file}: {source}")]
  Compile {
    source_file: PathBuf,
    #[source]
    source: ExecError,
  },

  #[error("link failed: {source}")]
  Link {
    #[source]
    source: ExecError,
  },

  #[error("{path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to walk source tree: {0}")]
  Walk(#[from] walkdir::Error),

  #[error(transparent)]
  Model(#[from] ModelError),
}

impl BuildError {
  /// Process exit code for this failure.
  pub fn exit_code(&self) -> i32 {
    1
  }
}

/// Load the project in `dir`, failing when there is none.
pub fn find_project(dir: &Path) -> Result<Project, BuildError> {
  Project::find_in(dir)?.ok_or_else(|| BuildError::NoProject(dir.to_path_buf()))
}
