use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::arch::Arch;

/// A named, independently buildable configuration of the project.
///
/// Flag lists are templates: each list is joined with single spaces and then
/// passed through the placeholder engine before the tool is invoked.
///
/// # Example
///
/// ```json
/// {
///   "name": "pc",
///   "architecture": "x86_64",
///   "cc": "x86_64-elf-gcc",
///   "cc_flags": ["-c", "%src%", "-o", "%obj%", "-MD", "-MF", "%dep%"],
///   "ld": "x86_64-elf-ld",
///   "ld_flags": ["-T", "%lds%", "%objs%", "-o", "%bin%"],
///   "ld_script": "kernel.ld",
///   "output_binary": "output/kernel-%arch%.elf"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
  pub name: String,
  #[serde(default)]
  pub description: String,
  pub architecture: Arch,
  #[serde(default)]
  pub cc: String,
  #[serde(default)]
  pub cc_flags: Vec<String>,
  #[serde(default)]
  pub cxx: String,
  #[serde(default)]
  pub cxx_flags: Vec<String>,
  #[serde(default)]
  pub asm: String,
  #[serde(default)]
  pub asm_flags: Vec<String>,
  #[serde(default)]
  pub ld: String,
  #[serde(default)]
  pub ld_flags: Vec<String>,
  #[serde(default)]
  pub ld_script: String,
  /// Output path; may contain `%arch%`.
  pub output_binary: String,
  /// Free-form values owned by plugins (e.g. a secondary output path).
  #[serde(default)]
  pub custom_properties: BTreeMap<String, serde_json::Value>,
}

/// The tool a source file is handed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
  Cc,
  Cxx,
  Asm,
}

impl Tool {
  /// Short tag used in operator output, e.g. `[CC]`.
  pub fn tag(self) -> &'static str {
    match self {
      Tool::Cc => "CC",
      Tool::Cxx => "CXX",
      Tool::Asm => "ASM",
    }
  }
}

impl Target {
  /// Executable configured for `tool`.
  pub fn program(&self, tool: Tool) -> &str {
    match tool {
      Tool::Cc => &self.cc,
      Tool::Cxx => &self.cxx,
      Tool::Asm => &self.asm,
    }
  }

  /// Joined flag template configured for `tool`.
  pub fn flags(&self, tool: Tool) -> String {
    match tool {
      Tool::Cc => self.cc_flags.join(" "),
      Tool::Cxx => self.cxx_flags.join(" "),
      Tool::Asm => self.asm_flags.join(" "),
    }
  }

  pub fn link_flags(&self) -> String {
    self.ld_flags.join(" ")
  }

  /// Output binary path with `%arch%` resolved to this target's architecture.
  pub fn binary_path(&self) -> PathBuf {
    PathBuf::from(crate::placeholder::substitute_arch(&self.output_binary, self.architecture))
  }

  /// String-valued custom property, if present.
  pub fn custom_str(&self, key: &str) -> Option<&str> {
    self.custom_properties.get(key).and_then(|v| v.as_str())
  }
}
