use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::manifest::{Manifest, VersionRecord};
use crate::platform::kind::SoftwareType;

/// A notification produced by a check.
///
/// Serializes as the bare payload, without a variant tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EmittedEvent {
  /// The selected record, annotated with `type`, `os` and `arch`.
  Release(ReleaseEvent),
  /// The whole fetched manifest, unannotated (reported on every check when
  /// `changes_only` is off).
  Manifest(Manifest),
}

impl EmittedEvent {
  /// The event as a JSON value, exactly as it is delivered.
  pub fn payload(&self) -> Value {
    match self {
      Self::Release(release) => Value::Object(release.0.clone().into_iter().collect()),
      Self::Manifest(manifest) => serde_json::to_value(manifest).unwrap_or(Value::Null),
    }
  }
}

/// Fields of a [`VersionRecord`] plus the `type`, `os` and `arch` it was selected by.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ReleaseEvent(BTreeMap<String, Value>);

impl ReleaseEvent {
  /// Copy `record` and stamp it with where it came from.
  ///
  /// The three annotations replace any record fields of the same name.
  pub fn annotate(record: &VersionRecord, kind: SoftwareType, os: &str, arch: &str) -> Self {
    let mut fields = record.0.clone();
    fields.insert("type".to_string(), Value::from(kind.as_str()));
    fields.insert("os".to_string(), Value::from(os));
    fields.insert("arch".to_string(), Value::from(arch));
    Self(fields)
  }

  pub fn fields(&self) -> &BTreeMap<String, Value> {
    &self.0
  }

  pub fn version(&self) -> Option<&str> {
    self.0.get("version").and_then(Value::as_str)
  }
}

/// One line of an event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
  /// Unix timestamp (seconds) when the event was delivered.
  pub created_at: u64,
  pub payload: Value,
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn release_event_adds_annotations() {
    let record = VersionRecord::from_iter([("version", "3.5.6"), ("checksum", "abc")]);

    let event = ReleaseEvent::annotate(&record, SoftwareType::Client, "windows", "x86_64");

    assert_eq!(
      serde_json::to_value(&event).unwrap(),
      json!({
        "version": "3.5.6",
        "checksum": "abc",
        "type": "client",
        "os": "windows",
        "arch": "x86_64"
      })
    );
    assert_eq!(event.version(), Some("3.5.6"));
  }

  #[test]
  fn annotations_override_record_fields() {
    let record = VersionRecord::from_iter([("version", "1"), ("type", "beta")]);

    let event = ReleaseEvent::annotate(&record, SoftwareType::Server, "linux", "x86");

    assert_eq!(event.fields()["type"], json!("server"));
    assert_eq!(event.fields().len(), 4);
  }

  #[test]
  fn payload_is_untagged() {
    let mut manifest = Manifest::default();
    manifest.insert("linux", "x86", VersionRecord::from_iter([("version", "1")]));

    let event = EmittedEvent::Manifest(manifest);

    assert_eq!(event.payload(), json!({ "linux": { "x86": { "version": "1" } } }));
    assert_eq!(serde_json::to_value(&event).unwrap(), event.payload());
  }
}
