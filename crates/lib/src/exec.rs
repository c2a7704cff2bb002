//! Invocation of external toolchain programs.
//!
//! Compilers, assemblers and linkers run one at a time. The caller blocks
//! until the process exits; its stdout/stderr are inherited so diagnostics
//! stream straight to the operator.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ExecError {
  /// The argument string could not be split (e.g. an unclosed quote).
  #[error("invalid arguments for {program}: {message}")]
  Arguments { program: String, message: String },

  #[error("failed to start {program}: {source}")]
  Spawn {
    program: String,
    #[source]
    source: std::io::Error,
  },

  /// The program ran and exited unsuccessfully. `code` is `None` when it
  /// was terminated by a signal.
  #[error("{program} exited with status {}", describe_exit(.code))]
  Failed { program: String, code: Option<i32> },
}

fn describe_exit(code: &Option<i32>) -> String {
  match code {
    Some(code) => code.to_string(),
    None => "signal".to_string(),
  }
}

/// Runs one external program to completion.
pub trait CommandRunner {
  /// Run `program` with the already-substituted argument string `args`.
  fn run(&mut self, program: &str, args: &str) -> Result<(), ExecError>;
}

/// Runs programs on the host with inherited stdio.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
  working_dir: Option<PathBuf>,
}

impl SystemRunner {
  pub fn new() -> Self {
    Self::default()
  }

  /// Spawn programs from `dir` instead of the current directory.
  pub fn in_dir(dir: impl AsRef<Path>) -> Self {
    Self {
      working_dir: Some(dir.as_ref().to_path_buf()),
    }
  }
}

/// Split an argument string using POSIX shell quoting rules.
pub fn split_args(program: &str, args: &str) -> Result<Vec<String>, ExecError> {
  shell_words::split(args).map_err(|e| ExecError::Arguments {
    program: program.to_string(),
    message: e.to_string(),
  })
}

impl CommandRunner for SystemRunner {
  fn run(&mut self, program: &str, args: &str) -> Result<(), ExecError> {
    let argv = split_args(program, args)?;
    info!(program = %program, args = %args, "running");

    let mut command = Command::new(program);
    command
      .args(&argv)
      .stdin(Stdio::inherit())
      .stdout(Stdio::inherit())
      .stderr(Stdio::inherit());
    if let Some(dir) = &self.working_dir {
      command.current_dir(dir);
    }

    let status = command
      .status()
      .map_err(|source| ExecError::Spawn {
        program: program.to_string(),
        source,
      })?;

    debug!(program = %program, status = %status, "process exited");

    if !status.success() {
      return Err(ExecError::Failed {
        program: program.to_string(),
        code: status.code(),
      });
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::util::testutil::shell;
  use tempfile::TempDir;

  #[test]
  fn split_handles_quotes() {
    assert_eq!(
      split_args("cc", "-c 'my file.c' -o \"out dir/a.o\"").unwrap(),
      vec!["-c", "my file.c", "-o", "out dir/a.o"]
    );
    assert!(split_args("cc", "").unwrap().is_empty());
  }

  #[test]
  fn split_rejects_unbalanced_quotes() {
    assert!(matches!(split_args("cc", "-c 'oops"), Err(ExecError::Arguments { .. })));
  }

  #[test]
  #[cfg(unix)]
  fn successful_command() {
    let temp = TempDir::new().unwrap();
    let (program, args) = shell("touch built.o");
    SystemRunner::in_dir(temp.path()).run(program, &args).unwrap();
    assert!(temp.path().join("built.o").exists());
  }

  #[test]
  fn non_zero_exit_is_failure() {
    let (program, args) = shell("exit 3");
    let err = SystemRunner::new().run(program, &args).unwrap_err();
    assert!(matches!(err, ExecError::Failed { code: Some(3), .. }));
  }

  #[test]
  fn missing_program_is_spawn_error() {
    let err = SystemRunner::new()
      .run("skb-definitely-not-a-real-tool", "--version")
      .unwrap_err();
    assert!(matches!(err, ExecError::Spawn { .. }));
  }
}
