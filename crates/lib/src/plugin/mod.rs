//! Plugin descriptors and the static registry of built-in plugins.
//!
//! A plugin is initialized once at process start. Inside [`Plugin::init`] it
//! may subscribe to lifecycle events and register a config entry; it has no
//! other way to reach the pipeline.
//!
//! # Built-in plugins
//!
//! - [`kconfig`]: kernel configuration exposed as `%defines%`
//! - [`nintendev`]: DevKitPro Wii U integration (ELF to RPX conversion)

pub mod kconfig;
pub mod nintendev;

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{ConfigError, ConfigRegistry};
use crate::events::EventBus;

#[derive(Debug, Error)]
#[error("plugin '{plugin}' failed to initialize: {source}")]
pub struct PluginError {
  pub plugin: String,
  #[source]
  pub source: ConfigError,
}

/// What a plugin may touch during initialization.
pub struct PluginHost<'a> {
  pub events: &'a mut EventBus,
  pub configs: &'a mut ConfigRegistry,
  /// Directory holding `project.json`; tools run from here.
  pub project_root: &'a Path,
  /// Directory for per-plugin `<name>.json` config files.
  pub config_dir: PathBuf,
}

pub trait Plugin {
  fn name(&self) -> &'static str;

  fn init(&self, host: &mut PluginHost<'_>) -> Result<(), ConfigError>;
}

/// Every plugin compiled into the binary, in initialization order.
pub fn builtin_plugins() -> Vec<Box<dyn Plugin>> {
  vec![Box::new(kconfig::KconfigPlugin), Box::new(nintendev::NintendevPlugin)]
}

/// Initialize `plugins` in order.
///
/// A plugin that fails is skipped; the failures are returned so the caller
/// can report them. Handlers it registered before failing stay registered.
pub fn init_plugins(plugins: &[Box<dyn Plugin>], host: &mut PluginHost<'_>) -> Vec<PluginError> {
  let mut failures = Vec::new();
  for plugin in plugins {
    match plugin.init(host) {
      Ok(()) => debug!(plugin = plugin.name(), "plugin initialized"),
      Err(source) => {
        warn!(plugin = plugin.name(), error = %source, "plugin failed to initialize");
        failures.push(PluginError {
          plugin: plugin.name().to_string(),
          source,
        });
      }
    }
  }
  failures
}
