//! Source classification and object naming.

use std::path::{Path, PathBuf};

use crate::model::Tool;

/// Recognized kinds of source file, keyed by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
  C,
  Cpp,
  /// NASM-style assembly (`.asm`).
  Asm,
  /// Reserved, never compiled.
  Rust,
  /// Reserved, never compiled.
  GnuAsm,
}

impl SourceKind {
  pub fn from_path(path: &Path) -> Option<Self> {
    match path.extension()?.to_str()? {
      "c" => Some(SourceKind::C),
      "cpp" => Some(SourceKind::Cpp),
      "asm" => Some(SourceKind::Asm),
      "rs" => Some(SourceKind::Rust),
      "s" => Some(SourceKind::GnuAsm),
      _ => None,
    }
  }

  /// Tool that compiles this kind, `None` for reserved kinds.
  pub fn tool(self) -> Option<Tool> {
    match self {
      SourceKind::C => Some(Tool::Cc),
      SourceKind::Cpp => Some(Tool::Cxx),
      SourceKind::Asm => Some(Tool::Asm),
      SourceKind::Rust | SourceKind::GnuAsm => None,
    }
  }

  pub fn comment_prefix(self) -> &'static str {
    match self {
      SourceKind::C | SourceKind::Cpp | SourceKind::Rust => "// ",
      SourceKind::Asm => ";",
      SourceKind::GnuAsm => "#",
    }
  }

  /// Whether the compiler writes a dependency file next to the object.
  pub fn emits_deps(self) -> bool {
    matches!(self, SourceKind::C | SourceKind::Cpp)
  }

  fn object_suffix(self) -> &'static str {
    match self {
      SourceKind::Asm => "-asm.o",
      _ => ".o",
    }
  }
}

/// Object path for `rebased`, a source path already mapped into the object
/// directory: `x/a.c` becomes `x/a.o`, `x/boot.asm` becomes `x/boot-asm.o`.
pub fn object_path(rebased: &Path, kind: SourceKind) -> PathBuf {
  with_stem_suffix(rebased, kind.object_suffix())
}

/// Dependency file path for `rebased`: `x/a.c` becomes `x/a.d`.
pub fn dep_path(rebased: &Path) -> PathBuf {
  with_stem_suffix(rebased, ".d")
}

fn with_stem_suffix(path: &Path, suffix: &str) -> PathBuf {
  let stem = path.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
  path.with_file_name(format!("{stem}{suffix}"))
}
