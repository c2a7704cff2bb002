//! Change detection against a per-architecture snapshot of the source tree.
//!
//! After every successful build each compiled-source file is copied into the
//! snapshot tree. On the next build a file needs rebuilding when its snapshot
//! counterpart is missing or differs in any byte, whitespace included.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

/// A source tree paired with its snapshot tree.
#[derive(Debug, Clone)]
pub struct SnapshotTree {
  source_root: PathBuf,
  snapshot_root: PathBuf,
}

impl SnapshotTree {
  pub fn new(source_root: impl Into<PathBuf>, snapshot_root: impl Into<PathBuf>) -> Self {
    Self {
      source_root: source_root.into(),
      snapshot_root: snapshot_root.into(),
    }
  }

  pub fn snapshot_root(&self) -> &Path {
    &self.snapshot_root
  }

  /// Snapshot path for a file under the source root.
  pub fn counterpart(&self, source: &Path) -> PathBuf {
    match source.strip_prefix(&self.source_root) {
      Ok(relative) => self.snapshot_root.join(relative),
      Err(_) => self.snapshot_root.join(source.file_name().unwrap_or(source.as_os_str())),
    }
  }

  /// Whether `source` differs from its last snapshot.
  pub fn needs_rebuild(&self, source: &Path) -> io::Result<bool> {
    let snapshot = self.counterpart(source);

    let snapshot_meta = match fs::metadata(&snapshot) {
      Ok(meta) => meta,
      Err(e) if e.kind() == io::ErrorKind::NotFound => {
        debug!(src = %source.display(), "no snapshot");
        return Ok(true);
      }
      Err(e) => return Err(e),
    };

    if fs::metadata(source)?.len() != snapshot_meta.len() {
      return Ok(true);
    }

    Ok(fs::read(source)? != fs::read(&snapshot)?)
  }

  /// Copy `files` into the snapshot tree, overwriting prior snapshots.
  pub fn refresh<'a>(&self, files: impl IntoIterator<Item = &'a Path>) -> io::Result<usize> {
    let mut copied = 0;
    for source in files {
      let target = self.counterpart(source);
      if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
      }
      fs::copy(source, &target)?;
      copied += 1;
    }
    Ok(copied)
  }
}
