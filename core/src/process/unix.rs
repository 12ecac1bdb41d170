//! Unix detached spawn, liveness probing and process-group signalling
//!
//! ## Detaching
//!
//! Every worker calls `setsid()` between fork and exec, which:
//! - Creates a new session and makes the worker its leader
//! - Creates a new process group whose id equals the worker's PID
//! - Drops the controlling terminal, so hangups of the launching shell do not reach it
//!
//! The launcher never waits on the child. Once the launcher exits the worker is
//! re-parented and keeps running.
//!
//! ## Liveness
//!
//! A PID is live when `kill(pid, 0)` succeeds. `EPERM` counts as not live:
//! the process exists but cannot be signalled by us, so it cannot be the worker
//! we started. Zombies are not live either.

// Allow unsafe code for this module since detaching requires libc::setsid() calls
#![allow(unsafe_code)]

use crate::{CoreError, Result};
use nix::errno::Errno;
use nix::sys::signal::{kill, killpg, Signal};
use nix::unistd::Pid;
use std::fs::OpenOptions;
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const KILL_GRACE: Duration = Duration::from_secs(5);

/// Everything needed to start one detached worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnSpec {
    /// The command to execute (must be in PATH or an absolute path)
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    /// Receives both stdout and stderr, opened in append mode
    pub log_path: PathBuf,
    /// Inherited variables removed from the child's environment
    pub env_remove: Vec<String>,
}

/// Spawn a worker in its own session and return its PID without waiting on it.
///
/// stdin is `/dev/null`; stdout and stderr are appended to `spec.log_path`.
///
/// ## Safety
///
/// This function uses `unsafe` code to call `libc::setsid()` in the `pre_exec`
/// closure. The safety is ensured because:
/// - `setsid()` is called in the child process before `exec()`
/// - `setsid()` is async-signal-safe and appropriate for use in `pre_exec`
/// - Error handling properly converts C errors to Rust errors
pub fn spawn_detached(spec: &SpawnSpec) -> Result<u32> {
    debug!(
        "Spawning detached process: {} {:?} in {}",
        spec.program,
        spec.args,
        spec.working_dir.display()
    );

    let log = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&spec.log_path)
        .map_err(|e| {
            CoreError::io_context(e, format!("Failed to open log {}", spec.log_path.display()))
        })?;
    let log_err = log.try_clone().map_err(|e| {
        CoreError::io_context(e, format!("Failed to clone log {}", spec.log_path.display()))
    })?;

    let mut command = Command::new(&spec.program);
    command
        .args(&spec.args)
        .current_dir(&spec.working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::from(log))
        .stderr(Stdio::from(log_err));
    for name in &spec.env_remove {
        command.env_remove(name);
    }

    // Safety: setsid() is async-signal-safe and appropriate for use in pre_exec
    unsafe {
        command.pre_exec(|| {
            if libc::setsid() == -1 {
                return Err(std::io::Error::last_os_error());
            }
            Ok(())
        });
    }

    let child = command.spawn().map_err(|e| {
        error!("Failed to spawn process '{}': {}", spec.program, e);
        CoreError::SpawnFailure(format!("Failed to spawn '{}': {}", spec.program, e))
    })?;

    let pid = child.id();
    // Dropping a std Child neither kills nor waits on it.
    drop(child);
    debug!("Spawned detached process {} in new session", pid);
    Ok(pid)
}

fn to_pid(pid: u32) -> Option<Pid> {
    match i32::try_from(pid) {
        Ok(raw) if raw > 0 => Some(Pid::from_raw(raw)),
        _ => None,
    }
}

/// Probe whether `pid` names a live process we can signal
pub fn is_alive(pid: u32) -> bool {
    let Some(target) = to_pid(pid) else {
        return false;
    };

    match kill(target, None) {
        Ok(()) => {
            if is_zombie(pid) {
                debug!("Process {} is a zombie", pid);
                return false;
            }
            true
        }
        Err(Errno::ESRCH) => false,
        Err(Errno::EPERM) => {
            debug!("Process {} exists but is not signalable", pid);
            false
        }
        Err(e) => {
            warn!("Liveness probe for {} failed: {}", pid, e);
            false
        }
    }
}

#[cfg(target_os = "linux")]
fn is_zombie(pid: u32) -> bool {
    std::fs::read_to_string(format!("/proc/{pid}/stat"))
        .ok()
        .and_then(|stat| proc_stat_state(&stat))
        .is_some_and(|state| state == 'Z' || state == 'X')
}

#[cfg(not(target_os = "linux"))]
fn is_zombie(_pid: u32) -> bool {
    false
}

/// Extract the state letter from a `/proc/<pid>/stat` line.
/// The command name may contain spaces and parentheses, so parse after the last `)`.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn proc_stat_state(stat: &str) -> Option<char> {
    let close = stat.rfind(')')?;
    stat[close + 1..].trim_start().chars().next()
}

/// Send `signal` to the process group led by `pid`, falling back to the pid alone.
///
/// Workers lead their own group, but a PID recorded by an older launcher may
/// not, so `ESRCH` from the group is retried against the pid.
/// `ESRCH` and `EPERM` on the pid are treated as already exited.
pub fn signal_group(pid: u32, signal: Signal) -> Result<()> {
    let Some(target) = to_pid(pid) else {
        return Ok(());
    };

    debug!("Sending {} to process group {}", signal, pid);
    match killpg(target, signal) {
        Ok(()) => return Ok(()),
        Err(Errno::ESRCH) => {}
        Err(Errno::EPERM) => {
            debug!(
                "Permission denied signaling process group {} (likely already exited)",
                pid
            );
            return Ok(());
        }
        Err(e) => {
            error!("Failed to send {} to process group {}: {}", signal, pid, e);
            return Err(CoreError::ProcessSignal(format!(
                "Failed to send {} to process group {}: {}",
                signal, pid, e
            )));
        }
    }

    match kill(target, signal) {
        Ok(()) => Ok(()),
        Err(Errno::ESRCH) | Err(Errno::EPERM) => {
            debug!("Process {} already exited", pid);
            Ok(())
        }
        Err(e) => Err(CoreError::ProcessSignal(format!(
            "Failed to send {} to process {}: {}",
            signal, pid, e
        ))),
    }
}

/// Send SIGTERM to the worker's process group for graceful termination
pub fn signal_term_group(pid: u32) -> Result<()> {
    signal_group(pid, Signal::SIGTERM)
}

/// Send SIGKILL to the worker's process group for forceful termination
pub fn signal_kill_group(pid: u32) -> Result<()> {
    signal_group(pid, Signal::SIGKILL)
}

fn wait_until_dead(pid: u32, timeout: Duration) -> bool {
    let start = Instant::now();
    loop {
        if !is_alive(pid) {
            return true;
        }
        if start.elapsed() >= timeout {
            return false;
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

/// Perform graceful termination with timeout fallback to forceful termination
///
/// The worker is not our child once the launcher that started it has exited,
/// so completion is observed through the liveness probe rather than `wait`.
pub fn terminate_with_timeout(pid: u32, timeout: Duration) -> Result<()> {
    signal_term_group(pid)?;
    if wait_until_dead(pid, timeout) {
        debug!("Process {} exited after SIGTERM", pid);
        return Ok(());
    }

    warn!(
        "Process {} did not exit gracefully within {:?}, using SIGKILL",
        pid, timeout
    );
    signal_kill_group(pid)?;
    if wait_until_dead(pid, KILL_GRACE) {
        debug!("Process {} exited after SIGKILL", pid);
        return Ok(());
    }

    Err(CoreError::ProcessSignal(format!(
        "Process {} did not exit even after SIGKILL within {:?}",
        pid, KILL_GRACE
    )))
}
