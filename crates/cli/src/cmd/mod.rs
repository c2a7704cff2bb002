mod build;
mod clean;
mod config;
mod info;

pub use build::cmd_build;
pub use clean::cmd_clean;
pub use config::{cmd_config_get, cmd_config_list, cmd_config_set};
pub use info::cmd_info;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use skbuild_lib::config::ConfigRegistry;
use skbuild_lib::events::EventBus;
use skbuild_lib::paths;
use skbuild_lib::plugin::{PluginHost, builtin_plugins, init_plugins};

use crate::output::print_warning;

/// Hooks and configs contributed by the built-in plugins.
pub struct Plugins {
  pub events: EventBus,
  pub configs: ConfigRegistry,
}

/// Initialize every built-in plugin for the project rooted at `root`.
///
/// A plugin that fails to initialize is reported and left out.
pub fn load_plugins(root: &Path) -> Plugins {
  let mut events = EventBus::new();
  let mut configs = ConfigRegistry::new();
  let mut host = PluginHost {
    events: &mut events,
    configs: &mut configs,
    project_root: root,
    config_dir: paths::plugin_config_dir(),
  };

  for failure in init_plugins(&builtin_plugins(), &mut host) {
    print_warning(&failure.to_string());
  }

  Plugins { events, configs }
}

pub fn project_root() -> Result<PathBuf> {
  std::env::current_dir().context("Failed to determine current directory")
}
