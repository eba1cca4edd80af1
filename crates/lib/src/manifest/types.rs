//! Manifest types for vercheck.
//!
//! A version manifest lists, per operating system and architecture, the
//! latest release of one product:
//!
//! ```json
//! {
//!   "windows": {
//!     "x86_64": {
//!       "version": "3.5.6",
//!       "checksum": "86381879a3e7dc7a2e90e4da1cccfbd2e5359b7ce6dd8bc11196d18dfc9e2abc",
//!       "mirrors": { "teamspeak.com": "https://files.teamspeak-services.com/..." }
//!     }
//!   }
//! }
//! ```
//!
//! # Ordering
//!
//! Both levels use [`BTreeMap`] so equality is independent of the order keys
//! arrived in and serialization is deterministic.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// The leaf of a manifest: every field listed for one `(os, arch)` pair.
///
/// Only compared for equality; field values are kept as raw JSON.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionRecord(pub BTreeMap<String, Value>);

impl VersionRecord {
  pub fn get(&self, field: &str) -> Option<&Value> {
    self.0.get(field)
  }

  /// The `version` field, if it is a string.
  pub fn version(&self) -> Option<&str> {
    self.get("version").and_then(Value::as_str)
  }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for VersionRecord {
  fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
    Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
  }
}

/// A full version listing: `os -> arch -> VersionRecord`.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest(pub BTreeMap<String, BTreeMap<String, VersionRecord>>);

/// The response body is not a manifest.
#[derive(Debug, Error)]
#[error("manifest is not a mapping of os -> arch -> fields: {0}")]
pub struct ParseError(#[from] pub serde_json::Error);

impl Manifest {
  /// Decode a response body.
  ///
  /// Fails unless the body is a JSON object whose values are objects whose
  /// values are objects. `{}` is a valid, empty manifest.
  pub fn parse(bytes: &[u8]) -> Result<Self, ParseError> {
    Ok(serde_json::from_slice(bytes)?)
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  /// Number of `(os, arch)` entries.
  pub fn len(&self) -> usize {
    self.0.values().map(BTreeMap::len).sum()
  }

  /// Look up the record listed for `(os, arch)`.
  pub fn get(&self, os: &str, arch: &str) -> Option<&VersionRecord> {
    self.0.get(os).and_then(|archs| archs.get(arch))
  }

  /// Insert or replace the record for `(os, arch)`.
  pub fn insert(&mut self, os: impl Into<String>, arch: impl Into<String>, record: VersionRecord) {
    self.0.entry(os.into()).or_default().insert(arch.into(), record);
  }

  /// Iterate every `(os, arch, record)` entry.
  pub fn entries(&self) -> impl Iterator<Item = (&str, &str, &VersionRecord)> {
    self.0.iter().flat_map(|(os, archs)| {
      archs
        .iter()
        .map(move |(arch, record)| (os.as_str(), arch.as_str(), record))
    })
  }

  /// Whether this manifest lists exactly `record` under `(os, arch)`.
  pub fn contains_entry(&self, os: &str, arch: &str, record: &VersionRecord) -> bool {
    self.get(os, arch) == Some(record)
  }
}
