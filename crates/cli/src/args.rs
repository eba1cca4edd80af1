//! Configuration flags shared by every instance command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;
use tracing::debug;

use vercheck_lib::config::{AgentConfig, AgentOptions};
use vercheck_lib::platform::paths::default_config_path;

#[derive(Debug, Clone, Default, Args)]
pub struct ConfigArgs {
  /// Path to a JSON config file (default: <config dir>/vercheck/agent.json if present)
  #[arg(short, long)]
  pub config: Option<PathBuf>,

  /// Software type to watch: server or client
  #[arg(long = "type", value_name = "TYPE")]
  pub kind: Option<String>,

  /// Operating system to watch: windows, linux or macos
  #[arg(long)]
  pub os: Option<String>,

  /// Architecture to watch: x86 or x86_64
  #[arg(long)]
  pub arch: Option<String>,

  /// Report only changed releases (true) or the full manifest on every check (false)
  #[arg(long, value_name = "BOOL")]
  pub changes_only: Option<String>,

  /// Deliver events to the event log
  #[arg(long, value_name = "BOOL")]
  pub emit_events: Option<String>,

  /// Log response bodies and per-entry match decisions
  #[arg(long, value_name = "BOOL")]
  pub debug: Option<String>,

  /// Host serving /versions/<type>.json
  #[arg(long)]
  pub base_url: Option<String>,

  /// Instance name used for state, events and lock files
  #[arg(long)]
  pub name: Option<String>,
}

impl ConfigArgs {
  /// Options given as flags, before merging with a config file.
  fn overrides(&self) -> AgentOptions {
    AgentOptions {
      kind: self.kind.clone(),
      os: self.os.clone(),
      arch: self.arch.clone(),
      debug: self.debug.clone().map(Value::String),
      emit_events: self.emit_events.clone().map(Value::String),
      changes_only: self.changes_only.clone().map(Value::String),
      base_url: self.base_url.clone(),
      name: self.name.clone(),
      ..Default::default()
    }
  }

  /// The config file to read, if any.
  ///
  /// An explicit `--config` must exist; the default location is optional.
  pub fn config_path(&self) -> Option<PathBuf> {
    match &self.config {
      Some(path) => Some(path.clone()),
      None => default_config_path().filter(|path| path.exists()),
    }
  }

  /// Merge file and flags, then validate.
  pub fn load(&self) -> Result<AgentConfig> {
    let base = match self.config_path() {
      Some(path) => {
        debug!(path = %path.display(), "reading config file");
        AgentOptions::from_file(&path)?
      }
      None => AgentOptions::default(),
    };

    let config = base
      .merge(self.overrides())
      .validate()
      .context("Invalid configuration")?;
    Ok(config)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::fs;
  use tempfile::TempDir;
  use vercheck_lib::diff::DiffMode;

  fn args_with_file(content: &str) -> (TempDir, ConfigArgs) {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("agent.json");
    fs::write(&path, content).unwrap();
    let args = ConfigArgs {
      config: Some(path),
      ..Default::default()
    };
    (temp, args)
  }

  #[test]
  fn flags_override_file() {
    let (_temp, mut args) = args_with_file(r#"{"type":"server","os":"linux","arch":"x86","changes_only":true}"#);
    args.arch = Some("x86_64".to_string());
    args.changes_only = Some("FALSE".to_string());

    let config = args.load().unwrap();

    assert_eq!(config.name, "server-linux-x86_64");
    assert_eq!(config.mode, DiffMode::Always);
  }

  #[test]
  fn explicit_config_file_must_exist() {
    let args = ConfigArgs {
      config: Some(PathBuf::from("/nonexistent/agent.json")),
      ..Default::default()
    };
    let err = args.load().unwrap_err();
    assert!(format!("{:#}", err).contains("failed to read config file"));
  }

  #[test]
  fn flags_alone_are_enough() {
    let args = ConfigArgs {
      kind: Some("client".to_string()),
      os: Some("macos".to_string()),
      arch: Some("x86_64".to_string()),
      debug: Some("true".to_string()),
      ..Default::default()
    };
    let overrides = args.overrides();
    let config = overrides.validate().unwrap();
    assert!(config.debug);
    assert!(config.emit_events);
  }

  #[test]
  fn debug_flag_can_turn_file_setting_off() {
    let (_temp, mut args) = args_with_file(r#"{"type":"client","os":"linux","arch":"x86","debug":"true"}"#);
    assert!(args.load().unwrap().debug);

    args.debug = Some("false".to_string());
    assert!(!args.load().unwrap().debug);
  }

  #[test]
  fn bad_boolean_flag_is_rejected() {
    let (_temp, mut args) = args_with_file(r#"{"type":"client","os":"windows","arch":"x86"}"#);
    args.emit_events = Some("yes".to_string());

    let err = args.load().unwrap_err();
    assert!(format!("{:#}", err).contains("emit_events must be true or false"));
  }
}
