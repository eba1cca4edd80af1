//! Event delivery.
//!
//! A check hands its events to an [`EventSink`]. The CLI writes them to a
//! per-instance [`EventLog`]; tests and dry runs collect them in a [`MemorySink`].
//!
//! # Storage Layout
//!
//! ```text
//! {data_dir}/events/
//! └── <name>.jsonl        # One EventRecord per line, oldest first
//! ```

mod types;

pub use types::*;

use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::platform::paths::events_dir;
use crate::util::unix_now;

/// Bytes read per step when scanning a log backwards for its last line.
const TAIL_CHUNK: u64 = 4096;

#[derive(Debug, Error)]
pub enum EventError {
  #[error("cannot locate the events directory: set XDG_DATA_HOME or HOME")]
  NoDataDir,

  #[error("failed to create events directory: {0}")]
  CreateDir(#[source] io::Error),

  #[error("failed to write event log '{path}': {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to read event log '{path}': {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to encode event: {0}")]
  Serialize(#[source] serde_json::Error),

  #[error("corrupt event log '{path}' at line {line}: {source}")]
  Parse {
    path: PathBuf,
    line: usize,
    #[source]
    source: serde_json::Error,
  },

  #[error("corrupt last entry in event log '{path}': {source}")]
  ParseLast {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },
}

/// Receives the events a check decided to emit.
pub trait EventSink {
  fn emit(&mut self, event: &EmittedEvent) -> Result<(), EventError>;
}

/// Collects events in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
  pub events: Vec<EmittedEvent>,
}

impl EventSink for MemorySink {
  fn emit(&mut self, event: &EmittedEvent) -> Result<(), EventError> {
    self.events.push(event.clone());
    Ok(())
  }
}

/// Append-only JSON-lines log of delivered events.
#[derive(Debug, Clone)]
pub struct EventLog {
  path: PathBuf,
}

impl EventLog {
  pub fn new(path: PathBuf) -> Self {
    Self { path }
  }

  /// The log for instance `name` at the default location.
  pub fn for_instance(name: &str) -> Result<Self, EventError> {
    let dir = events_dir().ok_or(EventError::NoDataDir)?;
    Ok(Self::new(dir.join(format!("{}.jsonl", name))))
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Read every record in the log.
  ///
  /// Returns an empty list if the log doesn't exist yet.
  pub fn read_all(&self) -> Result<Vec<EventRecord>, EventError> {
    let file = match fs::File::open(&self.path) {
      Ok(file) => file,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
      Err(source) => {
        return Err(EventError::Read {
          path: self.path.clone(),
          source,
        });
      }
    };

    let mut records = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
      let line = line.map_err(|source| EventError::Read {
        path: self.path.clone(),
        source,
      })?;
      if line.trim().is_empty() {
        continue;
      }
      let record = serde_json::from_str(&line).map_err(|source| EventError::Parse {
        path: self.path.clone(),
        line: index + 1,
        source,
      })?;
      records.push(record);
    }

    Ok(records)
  }

  /// The most recently delivered record, if any.
  ///
  /// Reads backwards from the end of the file until the last non-empty line
  /// is complete; earlier lines are never read.
  pub fn last(&self) -> Result<Option<EventRecord>, EventError> {
    let read_err = |source: io::Error| EventError::Read {
      path: self.path.clone(),
      source,
    };

    let mut file = match fs::File::open(&self.path) {
      Ok(file) => file,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
      Err(source) => return Err(read_err(source)),
    };

    let mut pos = file.metadata().map_err(read_err)?.len();
    let mut tail: Vec<u8> = Vec::new();
    loop {
      if let Some(end) = tail.iter().rposition(|b| !b.is_ascii_whitespace()) {
        let start = tail[..end].iter().rposition(|&b| b == b'\n').map(|i| i + 1);
        if let Some(start) = start.or((pos == 0).then_some(0)) {
          let record = serde_json::from_slice(&tail[start..=end]).map_err(|source| EventError::ParseLast {
            path: self.path.clone(),
            source,
          })?;
          return Ok(Some(record));
        }
      } else if pos == 0 {
        return Ok(None);
      }

      let step = pos.min(TAIL_CHUNK);
      pos -= step;
      file.seek(SeekFrom::Start(pos)).map_err(read_err)?;
      let mut chunk = vec![0; step as usize];
      file.read_exact(&mut chunk).map_err(read_err)?;
      chunk.extend_from_slice(&tail);
      tail = chunk;
    }
  }
}

impl EventSink for EventLog {
  fn emit(&mut self, event: &EmittedEvent) -> Result<(), EventError> {
    if let Some(parent) = self.path.parent() {
      fs::create_dir_all(parent).map_err(EventError::CreateDir)?;
    }

    let record = EventRecord {
      created_at: unix_now(),
      payload: event.payload(),
    };
    let mut line = serde_json::to_string(&record).map_err(EventError::Serialize)?;
    line.push('\n');

    let mut file = OpenOptions::new()
      .create(true)
      .append(true)
      .open(&self.path)
      .map_err(|source| EventError::Write {
        path: self.path.clone(),
        source,
      })?;
    file.write_all(line.as_bytes()).map_err(|source| EventError::Write {
      path: self.path.clone(),
      source,
    })?;

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::manifest::{Manifest, VersionRecord};
  use crate::platform::kind::SoftwareType;
  use serde_json::json;
  use tempfile::TempDir;

  fn temp_log() -> (TempDir, EventLog) {
    let temp = TempDir::new().unwrap();
    let log = EventLog::new(temp.path().join("events").join("test.jsonl"));
    (temp, log)
  }

  fn release(version: &str) -> EmittedEvent {
    let record = VersionRecord::from_iter([("version", version)]);
    EmittedEvent::Release(ReleaseEvent::annotate(&record, SoftwareType::Client, "linux", "x86_64"))
  }

  #[test]
  fn read_all_empty_when_log_missing() {
    let (_temp, log) = temp_log();
    assert!(log.read_all().unwrap().is_empty());
    assert!(log.last().unwrap().is_none());
  }

  #[test]
  fn emit_appends_one_line_per_event() {
    let (_temp, mut log) = temp_log();

    log.emit(&release("1.0.0")).unwrap();
    log.emit(&release("1.0.1")).unwrap();

    let records = log.read_all().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].payload["version"], json!("1.0.0"));
    assert_eq!(records[1].payload["version"], json!("1.0.1"));
    assert!(records[1].created_at > 0);

    let content = fs::read_to_string(log.path()).unwrap();
    assert_eq!(content.lines().count(), 2);
  }

  #[test]
  fn manifest_events_are_logged_unannotated() {
    let (_temp, mut log) = temp_log();
    let mut manifest = Manifest::default();
    manifest.insert("macos", "x86_64", VersionRecord::from_iter([("version", "5.0.0")]));

    log.emit(&EmittedEvent::Manifest(manifest)).unwrap();

    let last = log.last().unwrap().unwrap();
    assert_eq!(last.payload, json!({ "macos": { "x86_64": { "version": "5.0.0" } } }));
  }

  #[test]
  fn corrupt_line_is_reported_with_its_number() {
    let (_temp, mut log) = temp_log();
    log.emit(&release("1.0.0")).unwrap();

    let mut file = OpenOptions::new().append(true).open(log.path()).unwrap();
    writeln!(file, "garbage").unwrap();

    match log.read_all() {
      Err(EventError::Parse { line, .. }) => assert_eq!(line, 2),
      other => panic!("expected Parse error, got: {:?}", other),
    }
  }

  #[test]
  fn last_finds_final_record_across_chunks() {
    let (_temp, mut log) = temp_log();
    for i in 0..200 {
      log.emit(&release(&format!("1.0.{}", i))).unwrap();
    }
    assert!(fs::metadata(log.path()).unwrap().len() > TAIL_CHUNK * 2);

    let last = log.last().unwrap().unwrap();
    assert_eq!(last.payload["version"], json!("1.0.199"));
  }

  #[test]
  fn last_skips_trailing_blank_lines() {
    let (_temp, mut log) = temp_log();
    log.emit(&release("1.0.0")).unwrap();
    log.emit(&release("1.0.1")).unwrap();

    let mut file = OpenOptions::new().append(true).open(log.path()).unwrap();
    write!(file, "\n  \n\n").unwrap();

    let last = log.last().unwrap().unwrap();
    assert_eq!(last.payload["version"], json!("1.0.1"));
  }

  #[test]
  fn last_does_not_read_earlier_lines() {
    let (_temp, mut log) = temp_log();
    fs::create_dir_all(log.path().parent().unwrap()).unwrap();
    fs::write(log.path(), "garbage\n").unwrap();
    log.emit(&release("2.0.0")).unwrap();

    assert!(log.read_all().is_err());
    let last = log.last().unwrap().unwrap();
    assert_eq!(last.payload["version"], json!("2.0.0"));
  }

  #[test]
  fn last_of_single_line_without_newline() {
    let (_temp, log) = temp_log();
    fs::create_dir_all(log.path().parent().unwrap()).unwrap();
    fs::write(log.path(), r#"{"created_at":5,"payload":{"version":"1"}}"#).unwrap();

    let last = log.last().unwrap().unwrap();
    assert_eq!(last.created_at, 5);
  }

  #[test]
  fn last_reports_corrupt_final_line() {
    let (_temp, mut log) = temp_log();
    log.emit(&release("1.0.0")).unwrap();
    let mut file = OpenOptions::new().append(true).open(log.path()).unwrap();
    writeln!(file, "garbage").unwrap();

    assert!(matches!(log.last(), Err(EventError::ParseLast { .. })));
  }

  #[test]
  fn last_of_blank_file_is_none() {
    let (_temp, log) = temp_log();
    fs::create_dir_all(log.path().parent().unwrap()).unwrap();
    fs::write(log.path(), "\n\n").unwrap();

    assert!(log.last().unwrap().is_none());
  }

  #[test]
  #[serial_test::serial]
  #[cfg(not(windows))]
  fn for_instance_without_data_dir_is_an_error() {
    temp_env::with_vars([("XDG_DATA_HOME", None::<&str>), ("HOME", None)], || {
      assert!(matches!(EventLog::for_instance("a"), Err(EventError::NoDataDir)));
    });
  }

  #[test]
  fn memory_sink_keeps_events_in_order() {
    let mut sink = MemorySink::default();
    sink.emit(&release("1")).unwrap();
    sink.emit(&release("2")).unwrap();
    assert_eq!(sink.events, vec![release("1"), release("2")]);
  }
}
