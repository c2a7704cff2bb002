//! Registry of plugin-owned configuration.
//!
//! Plugins register a config object under their name. The `config` command
//! addresses fields with dotted keys (`nintendev.devkitpro_path`) and only
//! ever exchanges strings; each config type converts its own fields through
//! the [`PluginConfig`] capability.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("invalid config key '{0}', expected <plugin>.<field>")]
  InvalidKey(String),

  #[error("unknown plugin: {0}")]
  UnknownPlugin(String),

  #[error("plugin '{plugin}' has no field '{field}'")]
  UnknownField { plugin: String, field: String },

  #[error("invalid value '{value}' for field '{field}': {message}")]
  InvalidValue {
    field: String,
    value: String,
    message: String,
  },

  #[error("failed to read {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("failed to save {path}: {message}")]
  Save { path: PathBuf, message: String },
}

/// Field access by name, implemented by every plugin config type.
pub trait PluginConfig {
  fn field_names(&self) -> &'static [&'static str];

  /// Current value of `field` rendered as a string, `None` if no such field.
  fn get_field(&self, field: &str) -> Option<String>;

  /// Parse `value` into `field`.
  fn set_field(&mut self, field: &str, value: &str) -> Result<(), ConfigError>;
}

/// Parse a boolean config value (`true`/`false`/`1`/`0`/`yes`/`no`/`on`/`off`).
pub fn parse_bool(field: &str, value: &str) -> Result<bool, ConfigError> {
  match value.to_ascii_lowercase().as_str() {
    "true" | "1" | "yes" | "on" => Ok(true),
    "false" | "0" | "no" | "off" => Ok(false),
    _ => Err(ConfigError::InvalidValue {
      field: field.to_string(),
      value: value.to_string(),
      message: "expected a boolean".to_string(),
    }),
  }
}

pub type SharedConfig = Arc<Mutex<dyn PluginConfig + Send>>;
pub type SaveFn = Box<dyn Fn() -> Result<(), ConfigError> + Send + Sync>;

struct ConfigEntry {
  config: SharedConfig,
  save: SaveFn,
}

fn lock(config: &SharedConfig) -> MutexGuard<'_, dyn PluginConfig + Send + 'static> {
  config.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Name-keyed store of plugin configs.
#[derive(Default)]
pub struct ConfigRegistry {
  entries: BTreeMap<String, ConfigEntry>,
}

impl ConfigRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register `config` for `plugin`; a later registration replaces an earlier one.
  ///
  /// `save` is invoked after every successful `set` and is expected to
  /// persist the same object it shares with the registry.
  pub fn register(&mut self, plugin: impl Into<String>, config: SharedConfig, save: SaveFn) {
    let plugin = plugin.into();
    debug!(plugin = %plugin, "registered plugin config");
    self.entries.insert(plugin, ConfigEntry { config, save });
  }

  pub fn plugins(&self) -> impl Iterator<Item = &str> {
    self.entries.keys().map(String::as_str)
  }

  pub fn fields(&self, plugin: &str) -> Result<&'static [&'static str], ConfigError> {
    let entry = self.entry(plugin)?;
    Ok(lock(&entry.config).field_names())
  }

  /// Read `plugin.field`. A missing field yields `Ok(None)`.
  pub fn get(&self, key: &str) -> Result<Option<String>, ConfigError> {
    let (plugin, field) = split_key(key)?;
    let entry = self.entry(plugin)?;
    Ok(lock(&entry.config).get_field(field))
  }

  /// Write `plugin.field` and save the plugin's config.
  pub fn set(&self, key: &str, value: &str) -> Result<(), ConfigError> {
    let (plugin, field) = split_key(key)?;
    let entry = self.entry(plugin)?;

    {
      let mut config = lock(&entry.config);
      if !config.field_names().iter().any(|name| *name == field) {
        return Err(ConfigError::UnknownField {
          plugin: plugin.to_string(),
          field: field.to_string(),
        });
      }
      config.set_field(field, value)?;
    }

    (entry.save)()
  }

  fn entry(&self, plugin: &str) -> Result<&ConfigEntry, ConfigError> {
    self
      .entries
      .get(plugin)
      .ok_or_else(|| ConfigError::UnknownPlugin(plugin.to_string()))
  }
}

impl std::fmt::Debug for ConfigRegistry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_list().entries(self.entries.keys()).finish()
  }
}

fn split_key(key: &str) -> Result<(&str, &str), ConfigError> {
  match key.split_once('.') {
    Some((plugin, field)) if !plugin.is_empty() && !field.is_empty() => Ok((plugin, field)),
    _ => Err(ConfigError::InvalidKey(key.to_string())),
  }
}

/// Load a JSON config file, or `T::default()` if it does not exist.
pub fn load_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T, ConfigError> {
  let content = match fs::read_to_string(path) {
    Ok(content) => content,
    Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(T::default()),
    Err(source) => {
      return Err(ConfigError::Read {
        path: path.to_path_buf(),
        source,
      });
    }
  };
  serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
    path: path.to_path_buf(),
    source,
  })
}

/// Write `value` as pretty JSON, creating parent directories.
pub fn save_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), ConfigError> {
  let save_err = |message: String| ConfigError::Save {
    path: path.to_path_buf(),
    message,
  };
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).map_err(|e| save_err(e.to_string()))?;
  }
  let content = serde_json::to_string_pretty(value).map_err(|e| save_err(e.to_string()))?;
  fs::write(path, content).map_err(|e| save_err(e.to_string()))
}
