//! Implementation of the `skb config` commands.
//!
//! Keys are `<plugin>.<field>`; values are exchanged as strings.

use anyhow::{Result, bail};

use super::{load_plugins, project_root};
use crate::output::{OutputFormat, print_json, print_success};

pub fn cmd_config_get(key: &str) -> Result<()> {
  let plugins = load_plugins(&project_root()?);
  match plugins.configs.get(key)? {
    Some(value) => {
      println!("{value}");
      Ok(())
    }
    None => bail!("no such config field: {key}"),
  }
}

pub fn cmd_config_set(key: &str, value: &str) -> Result<()> {
  let plugins = load_plugins(&project_root()?);
  plugins.configs.set(key, value)?;
  print_success(&format!("{key} = {value}"));
  Ok(())
}

pub fn cmd_config_list(output: OutputFormat) -> Result<()> {
  let plugins = load_plugins(&project_root()?);
  let configs = &plugins.configs;

  let mut entries = Vec::new();
  for plugin in configs.plugins() {
    for field in configs.fields(plugin)? {
      let key = format!("{plugin}.{field}");
      let value = configs.get(&key)?.unwrap_or_default();
      entries.push((key, value));
    }
  }

  if output.is_json() {
    let map: serde_json::Map<String, serde_json::Value> = entries
      .into_iter()
      .map(|(key, value)| (key, serde_json::Value::String(value)))
      .collect();
    print_json(&map)?;
  } else {
    for (key, value) in entries {
      println!("{key} = {value}");
    }
  }
  Ok(())
}
