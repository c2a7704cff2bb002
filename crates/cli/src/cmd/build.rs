//! Implementation of the `skb build` command.

use std::time::Instant;

use anyhow::Result;

use skbuild_lib::build::{Builder, find_project};
use skbuild_lib::exec::SystemRunner;
use skbuild_lib::layout::ProjectLayout;

use super::{load_plugins, project_root};
use crate::output::{OutputFormat, format_duration, print_json, print_stat, print_success};

/// Build `target` of the project in the current directory.
///
/// Tools run from the project root, so every path in a flag template is
/// relative to it.
pub fn cmd_build(target: &str, output: OutputFormat) -> Result<()> {
  let start = Instant::now();
  let root = project_root()?;
  let project = find_project(&root)?;
  let plugins = load_plugins(&root);

  let mut builder = Builder::new(ProjectLayout::new(&root), plugins.events, SystemRunner::in_dir(&root));
  let report = builder.build(&project, target)?;

  if output.is_json() {
    print_json(&report)?;
  } else {
    println!();
    print_success(&format!("Built {} ({})", report.target, report.arch));
    print_stat("Binary", &report.binary.display().to_string());
    print_stat("Compiled", &report.compiled.len().to_string());
    print_stat("Up to date", &report.up_to_date.len().to_string());
    if !report.skipped.is_empty() {
      print_stat("Skipped", &report.skipped.len().to_string());
    }
    print_stat("Duration", &format_duration(start.elapsed()));
  }

  Ok(())
}
