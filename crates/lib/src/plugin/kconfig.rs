//! Kernel configuration (`skconfig.json` in the project root).
//!
//! Every enabled boolean option becomes a `-DSKC_<NAME>` define and the
//! free-form extra options are appended. The result is published on
//! pre-build as the `defines` variable, so compile templates can use
//! `%defines%`.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Plugin, PluginHost};
use crate::config::{ConfigError, PluginConfig, load_json_or_default, parse_bool, save_json};
use crate::events::Phase;

pub const PLUGIN_NAME: &str = "kconfig";
pub const CONFIG_FILENAME: &str = "skconfig.json";
pub const DEFINES_VAR: &str = "defines";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
  pub enable_pcic: bool,
  pub logs_con_io: bool,
  pub additional_compile_options: String,
}

impl KernelConfig {
  /// Compiler defines for this configuration, space separated.
  pub fn defines(&self) -> String {
    let flags = [
      (self.enable_pcic, "-DSKC_ENABLEPCIC"),
      (self.logs_con_io, "-DSKC_LOGSCONIO"),
    ];

    let mut parts: Vec<&str> = flags.iter().filter(|(on, _)| *on).map(|(_, d)| *d).collect();
    let extra = self.additional_compile_options.trim();
    if !extra.is_empty() {
      parts.push(extra);
    }
    parts.join(" ")
  }
}

impl PluginConfig for KernelConfig {
  fn field_names(&self) -> &'static [&'static str] {
    &["enable_pcic", "logs_con_io", "additional_compile_options"]
  }

  fn get_field(&self, field: &str) -> Option<String> {
    match field {
      "enable_pcic" => Some(self.enable_pcic.to_string()),
      "logs_con_io" => Some(self.logs_con_io.to_string()),
      "additional_compile_options" => Some(self.additional_compile_options.clone()),
      _ => None,
    }
  }

  fn set_field(&mut self, field: &str, value: &str) -> Result<(), ConfigError> {
    match field {
      "enable_pcic" => self.enable_pcic = parse_bool(field, value)?,
      "logs_con_io" => self.logs_con_io = parse_bool(field, value)?,
      "additional_compile_options" => self.additional_compile_options = value.to_string(),
      _ => {}
    }
    Ok(())
  }
}

pub struct KconfigPlugin;

impl Plugin for KconfigPlugin {
  fn name(&self) -> &'static str {
    PLUGIN_NAME
  }

  fn init(&self, host: &mut PluginHost<'_>) -> Result<(), ConfigError> {
    let path: PathBuf = host.project_root.join(CONFIG_FILENAME);
    let config = Arc::new(Mutex::new(load_json_or_default::<KernelConfig>(&path)?));

    let saved = Arc::clone(&config);
    host.configs.register(
      PLUGIN_NAME,
      config.clone(),
      Box::new(move || {
        let current = saved.lock().unwrap_or_else(PoisonError::into_inner).clone();
        save_json(&path, &current)
      }),
    );

    host.events.subscribe(Phase::PreBuild, move |ctx| {
      let defines = config.lock().unwrap_or_else(PoisonError::into_inner).defines();
      debug!(defines = %defines, "kernel config defines");
      ctx.set_var(DEFINES_VAR, defines);
    });

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::ConfigRegistry;
  use crate::events::{BuildContext, EventBus};
  use crate::model::{Project, Target};
  use crate::placeholder::Variables;
  use tempfile::TempDir;

  #[test]
  fn defines_from_enabled_options() {
    let config = KernelConfig {
      enable_pcic: true,
      logs_con_io: false,
      additional_compile_options: " -DDEBUG ".to_string(),
    };
    assert_eq!(config.defines(), "-DSKC_ENABLEPCIC -DDEBUG");
    assert_eq!(KernelConfig::default().defines(), "");
  }

  #[test]
  fn config_fields_round_trip_as_strings() {
    let mut config = KernelConfig::default();
    config.set_field("logs_con_io", "true").unwrap();
    assert_eq!(config.get_field("logs_con_io").as_deref(), Some("true"));
    assert!(config.set_field("enable_pcic", "sure").is_err());
  }

  #[test]
  fn init_publishes_defines_and_saves_config() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join(CONFIG_FILENAME), r#"{ "enable_pcic": true }"#).unwrap();

    let mut events = EventBus::new();
    let mut configs = ConfigRegistry::new();
    let mut host = PluginHost {
      events: &mut events,
      configs: &mut configs,
      project_root: temp.path(),
      config_dir: temp.path().join("conf"),
    };
    KconfigPlugin.init(&mut host).unwrap();

    configs.set("kconfig.logs_con_io", "on").unwrap();
    let saved: KernelConfig = load_json_or_default(&temp.path().join(CONFIG_FILENAME)).unwrap();
    assert!(saved.enable_pcic && saved.logs_con_io);

    let target: Target = serde_json::from_value(serde_json::json!({
      "name": "pc", "architecture": "x86_64", "output_binary": "kernel.elf"
    }))
    .unwrap();
    let project = Project::default();
    let mut vars = Variables::new();
    events.emit(Phase::PreBuild, &mut BuildContext::new(&target, &project, &mut vars));

    assert_eq!(vars[DEFINES_VAR], "-DSKC_ENABLEPCIC -DSKC_LOGSCONIO");
  }
}
