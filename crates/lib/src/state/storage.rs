//! State storage for vercheck.
//!
//! Handles reading and writing the per-instance state file.
//!
//! # Storage Layout
//!
//! ```text
//! {data_dir}/state/
//! ├── <name>.json         # AgentState
//! └── <name>.lock         # InstanceLock for the same instance
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::consts::STATE_VERSION;
use crate::platform::paths::state_dir;
use crate::util::unix_now;

use super::types::{AgentState, StateError};

/// Reads and writes the state slot of one agent instance.
///
/// Writes go to a temp file that is renamed over the old one, so a reader
/// never sees a half-written state.
#[derive(Debug, Clone)]
pub struct StateStore {
  path: PathBuf,
}

impl StateStore {
  pub fn new(path: PathBuf) -> Self {
    Self { path }
  }

  /// The store for instance `name` at the default location.
  pub fn for_instance(name: &str) -> Result<Self, StateError> {
    let dir = state_dir().ok_or(StateError::NoDataDir)?;
    Ok(Self::new(dir.join(format!("{}.json", name))))
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Load the state.
  ///
  /// Returns a fresh state if the file doesn't exist.
  pub fn load(&self) -> Result<AgentState, StateError> {
    let content = match fs::read_to_string(&self.path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(AgentState::default()),
      Err(e) => return Err(StateError::Read(e)),
    };

    let state: AgentState = serde_json::from_str(&content).map_err(StateError::Parse)?;

    if state.version != STATE_VERSION {
      return Err(StateError::UnsupportedVersion(state.version));
    }

    Ok(state)
  }

  /// Save the state atomically.
  pub fn save(&self, state: &AgentState) -> Result<(), StateError> {
    if let Some(parent) = self.path.parent() {
      fs::create_dir_all(parent).map_err(StateError::CreateDir)?;
    }

    let temp_path = self.path.with_extension("json.tmp");
    let content = serde_json::to_string_pretty(state).map_err(StateError::Serialize)?;
    fs::write(&temp_path, &content).map_err(StateError::Write)?;
    fs::rename(&temp_path, &self.path).map_err(StateError::Write)?;

    Ok(())
  }

  /// Record a failed check without touching the persisted manifest.
  pub fn record_error(&self, message: &str) -> Result<(), StateError> {
    let mut state = self.load()?;
    state.record_error(message, unix_now());
    self.save(&state)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::diff::StateUpdate;
  use crate::manifest::{Manifest, VersionRecord};
  use serial_test::serial;
  use tempfile::TempDir;

  fn temp_store() -> (TempDir, StateStore) {
    let temp_dir = TempDir::new().unwrap();
    let store = StateStore::new(temp_dir.path().join("state").join("test.json"));
    (temp_dir, store)
  }

  fn sample_manifest() -> Manifest {
    let mut manifest = Manifest::default();
    manifest.insert(
      "windows",
      "x86_64",
      VersionRecord::from_iter([("version", "3.5.6"), ("checksum", "abc")]),
    );
    manifest
  }

  #[test]
  #[serial]
  #[cfg(not(windows))]
  fn for_instance_uses_data_dir() {
    temp_env::with_vars([("XDG_DATA_HOME", Some("/srv/data"))], || {
      let store = StateStore::for_instance("client-linux-x86").unwrap();
      assert_eq!(store.path(), Path::new("/srv/data/vercheck/state/client-linux-x86.json"));
    });
  }

  #[test]
  #[serial]
  #[cfg(not(windows))]
  fn for_instance_without_data_dir_is_an_error() {
    temp_env::with_vars([("XDG_DATA_HOME", None::<&str>), ("HOME", None)], || {
      assert!(matches!(StateStore::for_instance("a"), Err(StateError::NoDataDir)));
    });
  }

  #[test]
  fn load_fresh_state_when_missing() {
    let (_temp, store) = temp_store();
    let state = store.load().unwrap();
    assert_eq!(state, AgentState::default());
    assert!(!state.has_prior_state());
  }

  #[test]
  fn save_and_load_roundtrip() {
    let (_temp, store) = temp_store();
    let mut state = AgentState::default();
    state.apply(StateUpdate::Replace(sample_manifest()));
    state.last_check_at = Some(1000);
    state.last_event_at = Some(1000);

    store.save(&state).unwrap();
    let loaded = store.load().unwrap();

    assert_eq!(loaded, state);
    assert!(loaded.has_prior_state());
  }

  #[test]
  fn save_leaves_no_temp_file() {
    let (_temp, store) = temp_store();
    store.save(&AgentState::default()).unwrap();

    let entries: Vec<_> = fs::read_dir(store.path().parent().unwrap())
      .unwrap()
      .map(|e| e.unwrap().file_name().into_string().unwrap())
      .collect();
    assert_eq!(entries, vec!["test.json".to_string()]);
  }

  #[test]
  fn record_error_keeps_manifest() {
    let (_temp, store) = temp_store();
    let mut state = AgentState::default();
    state.apply(StateUpdate::Replace(sample_manifest()));
    store.save(&state).unwrap();

    store.record_error("connection refused").unwrap();

    let loaded = store.load().unwrap();
    assert_eq!(loaded.last_manifest, Some(sample_manifest()));
    assert_eq!(loaded.last_error.as_deref(), Some("connection refused"));
    assert!(loaded.last_error_at.is_some());
  }

  #[test]
  fn load_handles_corrupted_json() {
    let (_temp, store) = temp_store();
    fs::create_dir_all(store.path().parent().unwrap()).unwrap();
    fs::write(store.path(), "not valid json {{{").unwrap();

    match store.load() {
      Err(StateError::Parse(_)) => {}
      Err(other) => panic!("expected Parse error, got: {}", other),
      Ok(_) => panic!("expected error, got Ok"),
    }
  }

  #[test]
  fn load_handles_unsupported_version() {
    let (_temp, store) = temp_store();
    fs::create_dir_all(store.path().parent().unwrap()).unwrap();
    fs::write(store.path(), r#"{"version": 99999}"#).unwrap();

    let result = store.load();
    assert!(matches!(result, Err(StateError::UnsupportedVersion(99999))));
  }

  #[test]
  fn load_accepts_minimal_state() {
    let (_temp, store) = temp_store();
    fs::create_dir_all(store.path().parent().unwrap()).unwrap();
    fs::write(store.path(), r#"{"version": 1}"#).unwrap();

    assert_eq!(store.load().unwrap(), AgentState::default());
  }
}
