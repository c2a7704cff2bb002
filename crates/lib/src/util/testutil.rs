//! Test utilities for skbuild-lib.
//!
//! Cross-platform helpers for tests that spawn real processes, plus a
//! recording runner that stands in for a toolchain.

use std::path::{Path, PathBuf};

use crate::exec::{CommandRunner, ExecError, split_args};

/// Returns the shell program and an argument string that runs `script`.
#[cfg(unix)]
pub fn shell(script: &str) -> (&'static str, String) {
  ("/bin/sh", shell_words::join(["-c", script]))
}

#[cfg(windows)]
pub fn shell(script: &str) -> (&'static str, String) {
  ("cmd.exe", shell_words::join(["/C", script]))
}

/// A recorded tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
  pub program: String,
  pub args: Vec<String>,
}

/// Fake toolchain.
///
/// Records every call and, like a real compiler or linker, creates the file
/// named after `-o` (relative paths resolve against `dir`). Calls to a
/// program listed in `failing` exit with code 1.
#[derive(Debug, Default)]
pub struct RecordingRunner {
  pub calls: Vec<Invocation>,
  pub failing: Vec<String>,
  pub dir: PathBuf,
}

impl RecordingRunner {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn in_dir(dir: &Path) -> Self {
    Self {
      dir: dir.to_path_buf(),
      ..Self::default()
    }
  }

  pub fn fail_on(mut self, program: &str) -> Self {
    self.failing.push(program.to_string());
    self
  }

  pub fn clear(&mut self) {
    self.calls.clear();
  }

  pub fn calls_to(&self, program: &str) -> Vec<&Invocation> {
    self.calls.iter().filter(|c| c.program == program).collect()
  }

  /// Paths passed after `-o` to `program`.
  pub fn outputs_of(&self, program: &str) -> Vec<PathBuf> {
    self.calls_to(program).iter().filter_map(|c| output_arg(&c.args)).collect()
  }
}

fn output_arg(args: &[String]) -> Option<PathBuf> {
  let pos = args.iter().position(|a| a == "-o")?;
  args.get(pos + 1).map(PathBuf::from)
}

impl CommandRunner for RecordingRunner {
  fn run(&mut self, program: &str, args: &str) -> Result<(), ExecError> {
    let args = split_args(program, args)?;
    let output = output_arg(&args);
    self.calls.push(Invocation {
      program: program.to_string(),
      args,
    });

    if self.failing.iter().any(|p| p == program) {
      return Err(ExecError::Failed {
        program: program.to_string(),
        code: Some(1),
      });
    }

    if let Some(output) = output {
      write_artifact(&self.dir.join(output), program);
    }
    Ok(())
  }
}

fn write_artifact(path: &Path, program: &str) {
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent).unwrap();
  }
  std::fs::write(path, format!("built by {program}")).unwrap();
}
