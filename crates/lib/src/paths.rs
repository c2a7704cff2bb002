use std::path::PathBuf;

pub const APP_NAME: &str = "skb";

/// Returns the user's home directory, falling back to the current directory
/// when none can be determined.
pub fn home_dir() -> PathBuf {
  dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// Returns the directory for configuration files for the application
#[cfg(windows)]
pub fn config_dir() -> PathBuf {
  match std::env::var("APPDATA") {
    Ok(appdata) => PathBuf::from(appdata).join(APP_NAME),
    Err(_) => home_dir().join(format!(".{APP_NAME}")),
  }
}

/// Returns the directory for configuration files for the application
#[cfg(not(windows))]
pub fn config_dir() -> PathBuf {
  let config_home = std::env::var("XDG_CONFIG_HOME")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir().join(".config"));
  config_home.join(APP_NAME)
}

/// Directory holding one `<plugin>.json` file per plugin
pub fn plugin_config_dir() -> PathBuf {
  config_dir().join("conf")
}
