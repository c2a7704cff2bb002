//! On-disk layout of a project and source discovery.
//!
//! ```text
//! <root>/
//! ├── project.json
//! ├── src/                  # sources, walked recursively
//! ├── obj-<arch>/           # objects, mirrors src/ subdirectories
//! ├── output/               # shared output directory
//! └── .skb/                 # shared temp directory
//!     └── srctree-<arch>/   # snapshot of the last successful build
//! ```

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::arch::Arch;

pub const SOURCE_DIR: &str = "src";
pub const OUTPUT_DIR: &str = "output";
pub const TEMP_DIR: &str = ".skb";
pub const OBJECT_DIR_PREFIX: &str = "obj-";
pub const SNAPSHOT_DIR_PREFIX: &str = "srctree-";

/// File extensions picked up from the source tree.
///
/// `rs` and `s` are reserved for future front-ends: they are listed and
/// snapshotted but never handed to a tool.
pub const SOURCE_EXTENSIONS: [&str; 5] = ["c", "cpp", "rs", "s", "asm"];

/// Resolves every directory the pipeline reads or writes for one project.
#[derive(Debug, Clone)]
pub struct ProjectLayout {
  root: PathBuf,
}

impl ProjectLayout {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn source_dir(&self) -> PathBuf {
    self.root.join(SOURCE_DIR)
  }

  pub fn output_dir(&self) -> PathBuf {
    self.root.join(OUTPUT_DIR)
  }

  pub fn temp_dir(&self) -> PathBuf {
    self.root.join(TEMP_DIR)
  }

  pub fn object_dir(&self, arch: Arch) -> PathBuf {
    self.root.join(format!("{OBJECT_DIR_PREFIX}{arch}"))
  }

  pub fn snapshot_dir(&self, arch: Arch) -> PathBuf {
    self.temp_dir().join(format!("{SNAPSHOT_DIR_PREFIX}{arch}"))
  }

  /// Map a path under `src/` onto the same relative path under `base`.
  ///
  /// Paths outside the source tree are returned unchanged.
  pub fn rebase(&self, path: &Path, base: &Path) -> PathBuf {
    match path.strip_prefix(self.source_dir()) {
      Ok(relative) => base.join(relative),
      Err(_) => path.to_path_buf(),
    }
  }

  /// Every directory below `src/` (excluding `src/` itself).
  pub fn source_subdirs(&self) -> Result<Vec<PathBuf>, walkdir::Error> {
    let mut dirs = Vec::new();
    for entry in WalkDir::new(self.source_dir()).min_depth(1) {
      let entry = entry?;
      if entry.file_type().is_dir() {
        dirs.push(entry.into_path());
      }
    }
    Ok(dirs)
  }

  /// Every source file with a recognized extension, in walk order.
  pub fn source_files(&self) -> Result<Vec<PathBuf>, walkdir::Error> {
    files_with_extensions(&self.source_dir(), &SOURCE_EXTENSIONS)
  }

  /// Every directory `clean` removes that currently exists.
  pub fn clean_targets(&self) -> Vec<PathBuf> {
    let mut targets = vec![self.temp_dir()];
    targets.extend(Arch::ALL.iter().map(|arch| self.object_dir(*arch)));
    targets.push(self.output_dir());
    targets.into_iter().filter(|p| p.exists()).collect()
  }
}

/// Recursively list regular files under `dir` whose extension is one of
/// `extensions`.
pub fn files_with_extensions(dir: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>, walkdir::Error> {
  let mut files = Vec::new();
  for entry in WalkDir::new(dir) {
    let entry = entry?;
    if !entry.file_type().is_file() {
      continue;
    }
    let matches = entry
      .path()
      .extension()
      .and_then(|ext| ext.to_str())
      .is_some_and(|ext| extensions.contains(&ext));
    if matches {
      files.push(entry.into_path());
    }
  }
  Ok(files)
}
