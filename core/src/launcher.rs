//! Process guard and launcher
//!
//! Ensures at most one live worker per identity key. A launch validates its
//! input, takes the per-key lock, probes the recorded PID, clears a stale
//! record, starts the worker detached in the project directory and only then
//! records the new PID. The lock is held from the probe until the PID is
//! written, so concurrent launches for one key start exactly one worker.
//!
//! PID reuse is not detected: if the recorded PID now belongs to an unrelated
//! process we are allowed to signal, the key reads as running.

use crate::config::LauncherConfig;
use crate::lock::LaunchLock;
use crate::process::{self, SpawnSpec};
use crate::record::{validate_identity_key, ProcessRecord, RecordStatus, RecordStore};
use crate::{CoreError, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use tracing::{debug, error, info};

/// Parameters of one launch. Everything but the key is passed through to the worker untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    pub identity_key: String,
    pub session_path: String,
    pub api_id: String,
    pub api_hash: String,
}

/// Result of a successful `launch`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchOutcome {
    /// A new worker was spawned and recorded
    Started {
        record: ProcessRecord,
        /// PID of the stale record removed on the way, if it held one
        replaced_stale: Option<u32>,
    },
    /// The recorded worker is alive; nothing was spawned
    AlreadyRunning { record: ProcessRecord },
}

impl LaunchOutcome {
    pub fn record(&self) -> &ProcessRecord {
        match self {
            LaunchOutcome::Started { record, .. } | LaunchOutcome::AlreadyRunning { record } => {
                record
            }
        }
    }

    pub fn pid(&self) -> u32 {
        self.record().pid
    }
}

/// Result of a successful `stop`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    NotRunning,
    RemovedStale { pid: Option<u32> },
    Stopped { pid: u32 },
}

#[derive(Debug, Clone)]
pub struct Launcher {
    config: LauncherConfig,
    store: RecordStore,
}

impl Launcher {
    /// Create a launcher after validating `config`
    pub fn new(config: LauncherConfig) -> Result<Self> {
        config.validate()?;
        let store = RecordStore::new(config.sessions_dir());
        Ok(Self { config, store })
    }

    pub fn config(&self) -> &LauncherConfig {
        &self.config
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Start the worker for `request.identity_key` unless one is already live.
    ///
    /// ## Errors
    ///
    /// - `InvalidArgument` for an unusable key, before any filesystem change
    /// - `LockContention` when another launcher keeps the key locked past `lockWaitMs`
    /// - `EnvironmentError` when the project directory is unusable; no PID is written
    /// - `SpawnFailure` when the runner cannot be started; no PID is written
    pub fn launch(&self, request: &LaunchRequest) -> Result<LaunchOutcome> {
        let key = request.identity_key.as_str();
        validate_identity_key(key)?;

        self.store.ensure_dir()?;
        let _lock = LaunchLock::acquire(self.store.lock_path(key), self.config.lock_wait())?;

        let mut replaced_stale = None;
        if self.store.exists(key) {
            match self.store.read_pid(key)? {
                Some(pid) if process::is_alive(pid) => {
                    info!("Worker for {} already running with pid {}", key, pid);
                    return Ok(LaunchOutcome::AlreadyRunning {
                        record: self.store.record(key, pid),
                    });
                }
                stale => {
                    info!(
                        "Removing stale pid file for {} (pid {:?})",
                        key, stale
                    );
                    self.store.remove(key)?;
                    replaced_stale = stale;
                }
            }
        }

        let project_dir = self.config.project_dir();
        check_project_dir(&project_dir)?;

        let spec = self.spawn_spec(request);
        append_banner(&spec)?;
        let pid = process::spawn_detached(&spec)?;

        let record = self.store.write_pid_atomic(key, pid).map_err(|e| {
            error!(
                "Worker for {} started with pid {} but its record could not be written: {}",
                key, pid, e
            );
            e
        })?;
        info!(
            "Started worker for {} with pid {} (log {})",
            key,
            pid,
            record.log_path.display()
        );

        Ok(LaunchOutcome::Started {
            record,
            replaced_stale,
        })
    }

    /// Report what the record for `key` says. Never modifies anything.
    pub fn status(&self, key: &str) -> Result<RecordStatus> {
        validate_identity_key(key)?;
        if !self.store.exists(key) {
            return Ok(RecordStatus::Absent);
        }
        let status = match self.store.read_pid(key)? {
            Some(pid) if process::is_alive(pid) => RecordStatus::Running { pid },
            pid => RecordStatus::Stale { pid },
        };
        debug!("Status for {}: {:?}", key, status);
        Ok(status)
    }

    /// Terminate the recorded worker for `key` and delete its record.
    ///
    /// SIGTERM goes to the worker's process group first; SIGKILL follows after
    /// `stopTimeoutSecs`. A stale record is just removed.
    pub fn stop(&self, key: &str) -> Result<StopOutcome> {
        validate_identity_key(key)?;
        if !self.store.dir().is_dir() {
            return Ok(StopOutcome::NotRunning);
        }
        let _lock = LaunchLock::acquire(self.store.lock_path(key), self.config.lock_wait())?;

        if !self.store.exists(key) {
            return Ok(StopOutcome::NotRunning);
        }

        match self.store.read_pid(key)? {
            Some(pid) if process::is_alive(pid) => {
                info!("Stopping worker for {} (pid {})", key, pid);
                process::terminate_with_timeout(pid, self.config.stop_timeout())?;
                self.store.remove(key)?;
                Ok(StopOutcome::Stopped { pid })
            }
            pid => {
                info!("Removing stale pid file for {} (pid {:?})", key, pid);
                self.store.remove(key)?;
                Ok(StopOutcome::RemovedStale { pid })
            }
        }
    }

    fn spawn_spec(&self, request: &LaunchRequest) -> SpawnSpec {
        let mut args = self.config.runner_args.clone();
        args.extend([
            request.session_path.clone(),
            request.api_id.clone(),
            request.api_hash.clone(),
        ]);
        SpawnSpec {
            program: self.config.runner.clone(),
            args,
            working_dir: self.config.project_dir(),
            log_path: self.store.log_path(&request.identity_key),
            env_remove: self.config.unset_env.clone(),
        }
    }
}

fn check_project_dir(dir: &Path) -> Result<()> {
    let meta = fs::metadata(dir).map_err(|e| {
        error!("Cannot enter project dir {}: {}", dir.display(), e);
        CoreError::EnvironmentError(format!(
            "cannot enter project dir {}: {}",
            dir.display(),
            e
        ))
    })?;
    if !meta.is_dir() {
        error!("Project dir {} is not a directory", dir.display());
        return Err(CoreError::EnvironmentError(format!(
            "project dir {} is not a directory",
            dir.display()
        )));
    }
    fs::read_dir(dir).map_err(|e| {
        error!("Cannot read project dir {}: {}", dir.display(), e);
        CoreError::EnvironmentError(format!(
            "cannot read project dir {}: {}",
            dir.display(),
            e
        ))
    })?;
    Ok(())
}

/// Mark the start of a new run in the append-only log. The session path, api id
/// and api hash are omitted since they are credentials.
fn append_banner(spec: &SpawnSpec) -> Result<()> {
    let mut log = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&spec.log_path)
        .map_err(|e| {
            CoreError::io_context(e, format!("Failed to open log {}", spec.log_path.display()))
        })?;
    writeln!(
        log,
        "=== {} launching {} in {} ===",
        crate::current_timestamp(),
        spec.program,
        spec.working_dir.display()
    )
    .map_err(|e| {
        CoreError::io_context(e, format!("Failed to write log {}", spec.log_path.display()))
    })
}
