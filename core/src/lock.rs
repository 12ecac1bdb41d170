//! Per-key advisory launch lock
//!
//! `launch` and `stop` hold an exclusive `flock` on `<key>.lock` while they
//! read, probe and rewrite the PID file, so two launchers for the same key
//! cannot both observe "not running" and spawn. The lock file itself is never
//! deleted; removing it while another process waits on it would let a third
//! process lock a fresh inode and break exclusion.

use crate::{CoreError, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::debug;

const RETRY_SLEEP: Duration = Duration::from_millis(25);

/// Exclusive lock on a key's lock file, released on drop
#[derive(Debug)]
pub struct LaunchLock {
    file: File,
    path: PathBuf,
}

impl LaunchLock {
    /// Acquire the lock at `path`, retrying until `wait` has elapsed.
    pub fn acquire(path: impl AsRef<Path>, wait: Duration) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)
            .map_err(|e| {
                CoreError::io_context(e, format!("Failed to open lock file {}", path.display()))
            })?;

        let start = Instant::now();
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => {
                    debug!("Acquired launch lock {}", path.display());
                    return Ok(Self {
                        file,
                        path: path.to_path_buf(),
                    });
                }
                Err(e) if is_contended(&e) => {
                    if start.elapsed() >= wait {
                        return Err(CoreError::LockContention(format!(
                            "another launcher holds {} (waited {:?})",
                            path.display(),
                            wait
                        )));
                    }
                    std::thread::sleep(RETRY_SLEEP);
                }
                Err(e) => {
                    return Err(CoreError::io_context(
                        e,
                        format!("Failed to lock {}", path.display()),
                    ))
                }
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LaunchLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            debug!("Failed to unlock {}: {}", self.path.display(), e);
        } else {
            debug!("Released launch lock {}", self.path.display());
        }
    }
}

fn is_contended(err: &std::io::Error) -> bool {
    err.kind() == ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}
