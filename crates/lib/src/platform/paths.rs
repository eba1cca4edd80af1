use crate::consts::APP_NAME;
use std::path::PathBuf;

/// Reads a path from the environment, treating an empty value as unset.
fn env_path(key: &str) -> Option<PathBuf> {
  std::env::var_os(key).filter(|v| !v.is_empty()).map(PathBuf::from)
}

/// Returns the user's home directory, if the environment names one
#[cfg(windows)]
pub fn home_dir() -> Option<PathBuf> {
  env_path("USERPROFILE")
}

/// Returns the user's home directory, if the environment names one
#[cfg(not(windows))]
pub fn home_dir() -> Option<PathBuf> {
  env_path("HOME")
}

/// Returns the directory for configuration files for the application
#[cfg(windows)]
pub fn config_dir() -> Option<PathBuf> {
  Some(env_path("APPDATA")?.join(APP_NAME))
}

/// Returns the directory for configuration files for the application
#[cfg(not(windows))]
pub fn config_dir() -> Option<PathBuf> {
  let config_home = env_path("XDG_CONFIG_HOME").or_else(|| Some(home_dir()?.join(".config")))?;
  Some(config_home.join(APP_NAME))
}

/// Returns the directory for data files for the application
#[cfg(windows)]
pub fn data_dir() -> Option<PathBuf> {
  Some(env_path("APPDATA")?.join(APP_NAME))
}

/// Returns the directory for data files for the application
#[cfg(not(windows))]
pub fn data_dir() -> Option<PathBuf> {
  let data_home = env_path("XDG_DATA_HOME").or_else(|| Some(home_dir()?.join(".local").join("share")))?;
  Some(data_home.join(APP_NAME))
}

/// Per-instance state files and their locks
pub fn state_dir() -> Option<PathBuf> {
  Some(data_dir()?.join("state"))
}

/// Per-instance event logs
pub fn events_dir() -> Option<PathBuf> {
  Some(data_dir()?.join("events"))
}

/// Config file read when `--config` is not given
pub fn default_config_path() -> Option<PathBuf> {
  Some(config_dir()?.join("agent.json"))
}
