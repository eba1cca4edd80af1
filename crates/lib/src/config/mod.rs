//! Agent configuration.
//!
//! Options arrive as a loose JSON object where flags may be written either as
//! JSON booleans or as the strings `"true"`/`"false"`. [`AgentOptions::validate`]
//! turns that bag into a typed [`AgentConfig`] once, before any check runs.
//! Nothing is silently defaulted: an option that is present but malformed is a
//! [`ConfigError`].

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::consts::{DEFAULT_BASE_URL, DEFAULT_RECEIVE_PERIOD_DAYS, DEFAULT_REQUEST_TIMEOUT_SECS};
use crate::diff::DiffMode;
use crate::platform::UnknownVariant;
use crate::platform::arch::Arch;
use crate::platform::kind::SoftwareType;
use crate::platform::os::Os;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config file '{path}': {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse config file '{path}': {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("{0} is required")]
  Missing(&'static str),

  #[error(transparent)]
  InvalidChoice(#[from] UnknownVariant),

  #[error("if provided, {option} must be true or false (got {value})")]
  NotBoolean { option: &'static str, value: String },

  #[error(
    "expected_receive_period_in_days must be a positive integer (got {0}): it sets how many days can pass \
     without an event before the agent is considered not working"
  )]
  InvalidReceivePeriod(String),

  #[error("request_timeout_secs must be a positive integer (got {0})")]
  InvalidTimeout(String),

  #[error("base_url must be an http:// or https:// URL without query or fragment (got '{0}')")]
  InvalidBaseUrl(String),

  #[error("name may only contain ASCII letters, digits, '.', '_' and '-' (got '{0}')")]
  InvalidName(String),
}

/// Raw options as written in a config file or given on the command line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentOptions {
  #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
  pub kind: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub os: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub arch: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub debug: Option<Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub emit_events: Option<Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub changes_only: Option<Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub expected_receive_period_in_days: Option<Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub base_url: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub request_timeout_secs: Option<Value>,
}

/// The single `(type, os, arch)` leaf an agent instance reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selector {
  #[serde(rename = "type")]
  pub kind: SoftwareType,
  pub os: Os,
  pub arch: Arch,
}

impl Selector {
  pub fn new(kind: SoftwareType, os: Os, arch: Arch) -> Self {
    Self { kind, os, arch }
  }

  /// Whether a manifest entry listed under `(os, arch)` is the one selected.
  pub fn matches(&self, os: &str, arch: &str) -> bool {
    os == self.os.as_str() && arch == self.arch.as_str()
  }
}

impl std::fmt::Display for Selector {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{} {}/{}", self.kind, self.os, self.arch)
  }
}

/// Validated configuration for one agent instance.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
  /// Instance key for the state file, event log and lock.
  pub name: String,
  pub selector: Selector,
  pub mode: DiffMode,
  /// Log response bodies and per-entry match decisions.
  pub debug: bool,
  /// When false, events are computed but never handed to the sink.
  pub emit_events: bool,
  pub expected_receive_period_in_days: u64,
  pub base_url: String,
  pub request_timeout: Duration,
}

impl AgentConfig {
  /// Endpoint serving the manifest for the selected software type.
  pub fn manifest_url(&self) -> String {
    format!("{}/versions/{}.json", self.base_url, self.selector.kind)
  }
}

impl AgentOptions {
  /// Read options from a JSON config file.
  pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })
  }

  /// Layer `overrides` on top of `self`; options set in `overrides` win.
  pub fn merge(self, overrides: AgentOptions) -> AgentOptions {
    AgentOptions {
      kind: overrides.kind.or(self.kind),
      os: overrides.os.or(self.os),
      arch: overrides.arch.or(self.arch),
      debug: overrides.debug.or(self.debug),
      emit_events: overrides.emit_events.or(self.emit_events),
      changes_only: overrides.changes_only.or(self.changes_only),
      expected_receive_period_in_days: overrides
        .expected_receive_period_in_days
        .or(self.expected_receive_period_in_days),
      base_url: overrides.base_url.or(self.base_url),
      name: overrides.name.or(self.name),
      request_timeout_secs: overrides.request_timeout_secs.or(self.request_timeout_secs),
    }
  }

  /// Check every option and build the typed configuration.
  ///
  /// # Errors
  ///
  /// Returns the first problem found, in option order.
  pub fn validate(&self) -> Result<AgentConfig, ConfigError> {
    let kind: SoftwareType = required(&self.kind, "type")?.parse()?;
    let os: Os = required(&self.os, "os")?.parse()?;
    let arch: Arch = required(&self.arch, "arch")?.parse()?;
    let selector = Selector::new(kind, os, arch);

    let debug = boolify("debug", self.debug.as_ref(), false)?;
    let emit_events = boolify("emit_events", self.emit_events.as_ref(), true)?;
    let changes_only = boolify("changes_only", self.changes_only.as_ref(), true)?;

    let expected_receive_period_in_days = match &self.expected_receive_period_in_days {
      None => DEFAULT_RECEIVE_PERIOD_DAYS,
      Some(value) => positive_integer(value).ok_or_else(|| ConfigError::InvalidReceivePeriod(value.to_string()))?,
    };

    let request_timeout_secs = match &self.request_timeout_secs {
      None => DEFAULT_REQUEST_TIMEOUT_SECS,
      Some(value) => positive_integer(value).ok_or_else(|| ConfigError::InvalidTimeout(value.to_string()))?,
    };

    let base_url = match &self.base_url {
      None => DEFAULT_BASE_URL.to_string(),
      Some(url) if is_valid_base_url(url) => url.trim_end_matches('/').to_string(),
      Some(url) => return Err(ConfigError::InvalidBaseUrl(url.clone())),
    };

    let name = match &self.name {
      None => format!("{}-{}-{}", kind, os, arch),
      Some(name) if is_valid_name(name) => name.clone(),
      Some(name) => return Err(ConfigError::InvalidName(name.clone())),
    };

    let mode = if changes_only {
      DiffMode::ChangesOnly
    } else {
      DiffMode::Always
    };

    Ok(AgentConfig {
      name,
      selector,
      mode,
      debug,
      emit_events,
      expected_receive_period_in_days,
      base_url,
      request_timeout: Duration::from_secs(request_timeout_secs),
    })
  }
}

fn required<'a>(value: &'a Option<String>, option: &'static str) -> Result<&'a str, ConfigError> {
  match value.as_deref().map(str::trim) {
    Some(value) if !value.is_empty() => Ok(value),
    _ => Err(ConfigError::Missing(option)),
  }
}

/// Interpret a flag written as a JSON bool or as `"true"`/`"false"` in any case.
fn boolify(option: &'static str, value: Option<&Value>, default: bool) -> Result<bool, ConfigError> {
  let Some(value) = value else {
    return Ok(default);
  };

  let parsed = match value {
    Value::Bool(b) => Some(*b),
    Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
      "true" => Some(true),
      "false" => Some(false),
      _ => None,
    },
    _ => None,
  };

  parsed.ok_or_else(|| ConfigError::NotBoolean {
    option,
    value: value.to_string(),
  })
}

fn positive_integer(value: &Value) -> Option<u64> {
  let n = match value {
    Value::Number(n) => n.as_u64()?,
    Value::String(s) => s.trim().parse::<u64>().ok()?,
    _ => return None,
  };
  (n > 0).then_some(n)
}

fn is_valid_base_url(url: &str) -> bool {
  match reqwest::Url::parse(url) {
    Ok(parsed) => {
      matches!(parsed.scheme(), "http" | "https")
        && parsed.host_str().is_some_and(|host| !host.is_empty())
        && parsed.query().is_none()
        && parsed.fragment().is_none()
    }
    Err(_) => false,
  }
}

fn is_valid_name(name: &str) -> bool {
  !name.is_empty()
    && name != "."
    && name != ".."
    && name
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}
