//! File-based instance locking for mutual exclusion.
//!
//! Two checks of the same agent instance must not overlap: each reads and
//! then replaces the same state slot. Checks of different instances use
//! different lock files and never contend.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::platform::paths::state_dir;
use crate::util::unix_now;

#[derive(Debug, Serialize, Deserialize)]
pub struct LockMetadata {
  pub version: u32,
  pub pid: u32,
  pub started_at_unix: u64,
  pub command: String,
  pub instance: String,
}

#[derive(Debug, Error)]
pub enum LockError {
  #[error(
    "Instance is locked by another process: {command} (PID {pid}, started {started_at})\n\
             If you're sure no vercheck process is running, remove the lock file:\n  {lock_path}"
  )]
  Contention {
    command: String,
    pid: u32,
    started_at: String,
    lock_path: PathBuf,
  },

  #[error(
    "Instance is locked (could not read lock metadata)\n\
             If you're sure no vercheck process is running, remove the lock file:\n  {lock_path}"
  )]
  ContentionUnknown { lock_path: PathBuf },

  #[error("Cannot locate the lock directory: set XDG_DATA_HOME or HOME")]
  NoDataDir,

  #[error("Failed to create lock directory: {0}")]
  CreateDir(#[source] io::Error),

  #[error("Failed to open lock file: {0}")]
  OpenFile(#[source] io::Error),

  #[error("Failed to write lock metadata: {0}")]
  WriteMetadata(#[source] io::Error),

  #[error("Failed to acquire lock: {0}")]
  LockFailed(#[source] io::Error),
}

/// An exclusive lock on one agent instance, released on drop.
pub struct InstanceLock {
  file: File,
  lock_path: PathBuf,
}

impl InstanceLock {
  /// Lock instance `name` at the default location.
  pub fn acquire(name: &str, command: &str) -> Result<Self, LockError> {
    let dir = state_dir().ok_or(LockError::NoDataDir)?;
    Self::acquire_at(&dir.join(format!("{}.lock", name)), name, command)
  }

  /// Lock using an explicit lock file path.
  ///
  /// Never blocks: if another process holds the lock this fails with
  /// [`LockError::Contention`].
  pub fn acquire_at(lock_path: &Path, instance: &str, command: &str) -> Result<Self, LockError> {
    if let Some(parent) = lock_path.parent()
      && !parent.exists()
    {
      std::fs::create_dir_all(parent).map_err(LockError::CreateDir)?;
    }

    let file = OpenOptions::new()
      .read(true)
      .write(true)
      .create(true)
      .truncate(false)
      .open(lock_path)
      .map_err(LockError::OpenFile)?;

    if let Err(err) = try_lock(&file) {
      if err.kind() == io::ErrorKind::WouldBlock {
        return Err(Self::read_contention_error(lock_path));
      }
      return Err(LockError::LockFailed(err));
    }

    Self::write_metadata(&file, command, instance)?;

    Ok(InstanceLock {
      file,
      lock_path: lock_path.to_path_buf(),
    })
  }

  /// Reads the lock metadata from the held file handle.
  ///
  /// Opening a second handle would fail on Windows, where locks are mandatory.
  pub fn read_metadata(&self) -> io::Result<LockMetadata> {
    use std::io::{Seek, SeekFrom};

    let mut file = &self.file;
    file.seek(SeekFrom::Start(0))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    serde_json::from_str(&contents).map_err(io::Error::other)
  }

  fn write_metadata(file: &File, command: &str, instance: &str) -> Result<(), LockError> {
    let metadata = LockMetadata {
      version: 1,
      pid: std::process::id(),
      started_at_unix: unix_now(),
      command: command.to_string(),
      instance: instance.to_string(),
    };

    file.set_len(0).map_err(LockError::WriteMetadata)?;
    let mut writer = io::BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &metadata).map_err(|e| LockError::WriteMetadata(io::Error::other(e)))?;
    writer.flush().map_err(LockError::WriteMetadata)?;

    Ok(())
  }

  fn read_contention_error(lock_path: &Path) -> LockError {
    if let Ok(mut file) = File::open(lock_path) {
      let mut contents = String::new();
      if file.read_to_string(&mut contents).is_ok()
        && let Ok(metadata) = serde_json::from_str::<LockMetadata>(&contents)
      {
        let started_at = format!("Unix timestamp {}", metadata.started_at_unix);

        return LockError::Contention {
          command: metadata.command,
          pid: metadata.pid,
          started_at,
          lock_path: lock_path.to_path_buf(),
        };
      }
    }

    LockError::ContentionUnknown {
      lock_path: lock_path.to_path_buf(),
    }
  }

  pub fn lock_path(&self) -> &Path {
    &self.lock_path
  }
}

#[cfg(unix)]
fn try_lock(file: &File) -> io::Result<()> {
  use rustix::fs::{FlockOperation, flock};
  use std::os::unix::io::AsFd;

  flock(file.as_fd(), FlockOperation::NonBlockingLockExclusive)
    .map_err(|e| io::Error::from_raw_os_error(e.raw_os_error()))
}

#[cfg(windows)]
fn try_lock(file: &File) -> io::Result<()> {
  use std::os::windows::io::AsRawHandle;
  use windows_sys::Win32::Foundation::HANDLE;
  use windows_sys::Win32::Storage::FileSystem::{LOCKFILE_EXCLUSIVE_LOCK, LOCKFILE_FAIL_IMMEDIATELY, LockFileEx};

  let handle = file.as_raw_handle() as HANDLE;

  // SAFETY: OVERLAPPED is a plain data struct that is valid when zero-initialized.
  // LockFileEx is safe to call with a valid file handle and zeroed OVERLAPPED.
  let result = unsafe {
    let mut overlapped = std::mem::zeroed();
    LockFileEx(
      handle,
      LOCKFILE_FAIL_IMMEDIATELY | LOCKFILE_EXCLUSIVE_LOCK,
      0,
      1,
      0,
      &mut overlapped,
    )
  };

  if result == 0 {
    let err = io::Error::last_os_error();
    // ERROR_LOCK_VIOLATION
    if err.raw_os_error() == Some(33) {
      return Err(io::Error::from(io::ErrorKind::WouldBlock));
    }
    Err(err)
  } else {
    Ok(())
  }
}
