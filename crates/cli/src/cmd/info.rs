use anyhow::Result;

use skbuild_lib::build::find_project;

use super::project_root;
use crate::output::{OutputFormat, print_json, print_stat, print_success, symbols};

pub fn cmd_info(output: OutputFormat) -> Result<()> {
  let project = find_project(&project_root()?)?;

  if output.is_json() {
    return print_json(&project);
  }

  print_success(&format!("Project: {}", project.name));
  if !project.description.is_empty() {
    print_stat("Description", &project.description);
  }
  if !project.copyright.is_empty() {
    print_stat("Copyright", &project.copyright);
  }
  if !project.license.is_empty() {
    print_stat("License", &project.license);
  }

  println!();
  println!("Targets:");
  for target in &project.targets {
    println!(
      "  {} {} ({}) -> {}",
      symbols::INFO,
      target.name,
      target.architecture,
      target.binary_path().display()
    );
  }
  Ok(())
}
