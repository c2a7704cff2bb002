use std::fs;

use anyhow::{Context, Result};
use tracing::debug;

use skbuild_lib::layout::ProjectLayout;

use super::project_root;
use crate::output::{print_info, print_success};

pub fn cmd_clean() -> Result<()> {
  let layout = ProjectLayout::new(project_root()?);
  let targets = layout.clean_targets();

  if targets.is_empty() {
    print_info("Nothing to clean");
    return Ok(());
  }

  for dir in &targets {
    debug!(dir = %dir.display(), "removing");
    fs::remove_dir_all(dir).with_context(|| format!("Failed to remove {}", dir.display()))?;
  }

  print_success(&format!("Removed {} director{}", targets.len(), if targets.len() == 1 { "y" } else { "ies" }));
  Ok(())
}
