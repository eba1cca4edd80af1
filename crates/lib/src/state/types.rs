use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::STATE_VERSION;
use crate::diff::StateUpdate;
use crate::manifest::Manifest;

/// Everything persisted between checks of one agent instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
  pub version: u32,
  /// Manifest seen by the last successful check. Replaced wholesale, never edited.
  #[serde(default)]
  pub last_manifest: Option<Manifest>,
  #[serde(default)]
  pub last_check_at: Option<u64>,
  /// When an event was last delivered to the sink.
  #[serde(default)]
  pub last_event_at: Option<u64>,
  #[serde(default)]
  pub last_error_at: Option<u64>,
  #[serde(default)]
  pub last_error: Option<String>,
}

impl Default for AgentState {
  fn default() -> Self {
    Self {
      version: STATE_VERSION,
      last_manifest: None,
      last_check_at: None,
      last_event_at: None,
      last_error_at: None,
      last_error: None,
    }
  }
}

impl AgentState {
  /// Whether a non-empty manifest has been recorded.
  pub fn has_prior_state(&self) -> bool {
    self.last_manifest.as_ref().is_some_and(|m| !m.is_empty())
  }

  /// Apply the manifest decision of a diff.
  pub fn apply(&mut self, update: StateUpdate) {
    if let StateUpdate::Replace(manifest) = update {
      self.last_manifest = Some(manifest);
    }
  }

  pub fn record_error(&mut self, message: impl Into<String>, at: u64) {
    self.last_error = Some(message.into());
    self.last_error_at = Some(at);
  }
}

#[derive(Debug, Error)]
pub enum StateError {
  #[error("cannot locate the state directory: set XDG_DATA_HOME or HOME")]
  NoDataDir,

  #[error("failed to create state directory: {0}")]
  CreateDir(#[source] io::Error),

  #[error("failed to read state file: {0}")]
  Read(#[source] io::Error),

  #[error("failed to write state file: {0}")]
  Write(#[source] io::Error),

  #[error("failed to parse state file: {0}")]
  Parse(#[source] serde_json::Error),

  #[error("failed to serialize state: {0}")]
  Serialize(#[source] serde_json::Error),

  #[error("unsupported state file version {0}")]
  UnsupportedVersion(u32),
}
