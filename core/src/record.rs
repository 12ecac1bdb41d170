//! Process records: one PID file per identity key with atomic replacement
//!
//! A record is `<dir>/<key>.pid` holding the decimal PID of the most recently
//! launched worker followed by a newline. Writes are crash-safe via
//! write-to-temp + fsync + rename, so a reader never observes a partial PID.
//! The same directory holds the worker's append-only `<key>.log` and the
//! `<key>.lock` file used to serialise launches.

use crate::{CoreError, Result};
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// The persisted association between an identity key and a worker PID
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRecord {
    pub identity_key: String,
    pub pid: u32,
    pub log_path: PathBuf,
    pub pid_file_path: PathBuf,
}

/// What a record currently says about its key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum RecordStatus {
    /// No PID file exists
    Absent,
    /// The recorded PID is alive
    Running { pid: u32 },
    /// A PID file exists but its PID is dead, empty or unparseable
    Stale {
        #[serde(skip_serializing_if = "Option::is_none")]
        pid: Option<u32>,
    },
}

/// Check that `key` can name a worker and its files.
///
/// The key must be non-empty and usable as a single file name component.
/// Whitespace is not trimmed: a key of spaces is accepted as given.
pub fn validate_identity_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CoreError::InvalidArgument(
            "identity key cannot be empty".to_string(),
        ));
    }
    if key == "." || key == ".." || key.contains('/') || key.contains('\0') {
        return Err(CoreError::InvalidArgument(format!(
            "identity key '{}' cannot be used as a file name",
            key.escape_default()
        )));
    }
    Ok(())
}

/// Parse the contents of a PID file. Blank, non-numeric and zero values yield `None`.
pub fn parse_pid(contents: &str) -> Option<u32> {
    match contents.trim().parse::<u32>() {
        Ok(0) | Err(_) => None,
        Ok(pid) => Some(pid),
    }
}

/// Directory-backed store of process records
#[derive(Debug, Clone)]
pub struct RecordStore {
    dir: PathBuf,
}

impl RecordStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the record directory (and parents) if missing
    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            CoreError::io_context(
                e,
                format!("Failed to create sessions dir {}", self.dir.display()),
            )
        })
    }

    pub fn pid_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.pid"))
    }

    pub fn log_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.log"))
    }

    pub fn lock_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.lock"))
    }

    fn tmp_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.pid.tmp"))
    }

    /// Whether a PID file exists for `key`, regardless of its contents
    pub fn exists(&self, key: &str) -> bool {
        self.pid_path(key).is_file()
    }

    /// Read the recorded PID.
    ///
    /// Returns `Ok(None)` when there is no record or its contents are not a PID.
    pub fn read_pid(&self, key: &str) -> Result<Option<u32>> {
        let path = self.pid_path(key);
        match fs::read_to_string(&path) {
            Ok(contents) => {
                let pid = parse_pid(&contents);
                if pid.is_none() {
                    debug!("PID file {} holds no usable pid", path.display());
                }
                Ok(pid)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CoreError::io_context(
                e,
                format!("Failed to read pid file {}", path.display()),
            )),
        }
    }

    /// Atomically write `pid` as the record for `key`.
    ///
    /// Steps:
    /// - Write the PID to a temp file in the same directory
    /// - `flush` + `sync_all` on the temp file
    /// - `rename` temp file over the destination
    /// - Best-effort fsync of the directory to persist rename
    pub fn write_pid_atomic(&self, key: &str, pid: u32) -> Result<ProcessRecord> {
        let path = self.pid_path(key);
        let tmp_path = self.tmp_path(key);

        {
            let mut f = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp_path)
                .map_err(|e| {
                    CoreError::io_context(
                        e,
                        format!("Failed to open temp pid file {}", tmp_path.display()),
                    )
                })?;
            writeln!(f, "{pid}").map_err(|e| {
                CoreError::io_context(
                    e,
                    format!("Failed to write temp pid file {}", tmp_path.display()),
                )
            })?;
            f.flush().ok();
            let _ = f.sync_all();
        }

        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            CoreError::io_context(
                e,
                format!(
                    "Failed to replace pid file {} with {}",
                    path.display(),
                    tmp_path.display()
                ),
            )
        })?;

        if let Ok(dir) = File::open(&self.dir) {
            let _ = dir.sync_all();
        }

        debug!("Recorded pid {} in {}", pid, path.display());
        Ok(self.record(key, pid))
    }

    /// Delete the record for `key`. Returns whether a file was removed.
    pub fn remove(&self, key: &str) -> Result<bool> {
        let path = self.pid_path(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CoreError::io_context(
                e,
                format!("Failed to remove pid file {}", path.display()),
            )),
        }
    }

    /// Build the in-memory record for `key` and `pid` without touching disk
    pub fn record(&self, key: &str, pid: u32) -> ProcessRecord {
        ProcessRecord {
            identity_key: key.to_string(),
            pid,
            log_path: self.log_path(key),
            pid_file_path: self.pid_path(key),
        }
    }
}
