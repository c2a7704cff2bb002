//! DevKitPro integration for homebrew on Nintendo consoles.
//!
//! Supported platforms:
//! - Nintendo Wii U (target named `wiiu`): the linked ELF is converted to an
//!   RPX with `elf2rpl`. The RPX path comes from the target's
//!   `WUT_WiiUOutRpxBin` custom property.

use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{Plugin, PluginHost};
use crate::config::{ConfigError, PluginConfig, load_json_or_default, save_json};
use crate::events::{BuildContext, Phase};
use crate::exec::{CommandRunner, SystemRunner};

pub const PLUGIN_NAME: &str = "nintendev";
pub const WIIU_TARGET: &str = "wiiu";
pub const RPX_PROPERTY: &str = "WUT_WiiUOutRpxBin";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NintendevConfig {
  pub devkitpro_path: String,
}

impl Default for NintendevConfig {
  fn default() -> Self {
    let devkitpro_path = if cfg!(windows) { "C:\\DevKitPro" } else { "/opt/devkitpro" };
    Self {
      devkitpro_path: devkitpro_path.to_string(),
    }
  }
}

impl NintendevConfig {
  pub fn elf2rpl(&self) -> PathBuf {
    Path::new(&self.devkitpro_path).join("tools").join("bin").join("elf2rpl")
  }
}

impl PluginConfig for NintendevConfig {
  fn field_names(&self) -> &'static [&'static str] {
    &["devkitpro_path"]
  }

  fn get_field(&self, field: &str) -> Option<String> {
    match field {
      "devkitpro_path" => Some(self.devkitpro_path.clone()),
      _ => None,
    }
  }

  fn set_field(&mut self, field: &str, value: &str) -> Result<(), ConfigError> {
    if field == "devkitpro_path" {
      self.devkitpro_path = value.to_string();
    }
    Ok(())
  }
}

pub struct NintendevPlugin;

impl NintendevPlugin {
  /// Load the plugin config, writing the defaults on first use.
  fn load_config(path: &Path) -> Result<NintendevConfig, ConfigError> {
    if !path.exists() {
      let defaults = NintendevConfig::default();
      save_json(path, &defaults)?;
      return Ok(defaults);
    }
    load_json_or_default(path)
  }
}

impl Plugin for NintendevPlugin {
  fn name(&self) -> &'static str {
    PLUGIN_NAME
  }

  fn init(&self, host: &mut PluginHost<'_>) -> Result<(), ConfigError> {
    let path = host.config_dir.join(format!("{PLUGIN_NAME}.json"));
    let config = Arc::new(Mutex::new(Self::load_config(&path)?));

    let saved = Arc::clone(&config);
    host.configs.register(
      PLUGIN_NAME,
      config.clone(),
      Box::new(move || {
        let current = saved.lock().unwrap_or_else(PoisonError::into_inner).clone();
        save_json(&path, &current)
      }),
    );

    // Set on pre-build, read on post-link
    let convert_to_rpx = Rc::new(Cell::new(true));

    let pre_config = Arc::clone(&config);
    let pre_convert = Rc::clone(&convert_to_rpx);
    host.events.subscribe(Phase::PreBuild, move |ctx| {
      if ctx.target.name != WIIU_TARGET {
        return;
      }
      let config = pre_config.lock().unwrap_or_else(PoisonError::into_inner).clone();
      check_devkitpro(ctx, &config, &pre_convert);
    });

    let root = host.project_root.to_path_buf();
    host.events.subscribe(Phase::PostLink, move |ctx| {
      if ctx.target.name != WIIU_TARGET || !convert_to_rpx.get() {
        return;
      }
      let config = config.lock().unwrap_or_else(PoisonError::into_inner).clone();
      convert_elf(ctx, &config, &mut SystemRunner::in_dir(&root));
    });

    Ok(())
  }
}

fn check_devkitpro(ctx: &mut BuildContext<'_>, config: &NintendevConfig, convert_to_rpx: &Cell<bool>) {
  if !Path::new(&config.devkitpro_path).is_dir() {
    ctx.abort(format!(
      "DevKitPro hasn't been installed to {}. Please reinstall DKP to this location, create a symlink, or run `skb config set nintendev.devkitpro_path <path>`.",
      config.devkitpro_path
    ));
  }

  let elf2rpl = config.elf2rpl();
  if elf2rpl.is_file() {
    convert_to_rpx.set(true);
  } else {
    warn!(path = %elf2rpl.display(), "elf2rpl isn't present, ELF won't be converted to RPX");
    convert_to_rpx.set(false);
  }
}

fn convert_elf(ctx: &BuildContext<'_>, config: &NintendevConfig, runner: &mut dyn CommandRunner) {
  let Some(rpx) = ctx.target.custom_str(RPX_PROPERTY) else {
    warn!(property = RPX_PROPERTY, "target has no RPX output path, skipping conversion");
    return;
  };
  let elf = ctx.target.binary_path().to_string_lossy().into_owned();

  info!(elf = %elf, rpx = %rpx, "converting ELF to RPX with elf2rpl");
  let args = shell_words::join([elf.as_str(), rpx]);
  if let Err(e) = runner.run(&config.elf2rpl().to_string_lossy(), &args) {
    warn!(error = %e, "elf2rpl failed");
  }
}
