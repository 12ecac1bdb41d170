//! Core functionality for launchguard
//!
//! This crate keeps at most one live worker process per identity key. It
//! contains the error taxonomy, configuration, the on-disk process records,
//! the per-key launch lock and the launcher that ties them together; the
//! `launchguard` binary is a thin front end over [`Launcher`].

pub mod config;
pub mod error;
#[cfg(unix)]
pub mod launcher;
pub mod lock;
#[cfg(unix)]
pub mod process;
pub mod record;
pub mod utilities;


pub use config::LauncherConfig;
pub use error::{CoreError, Result};
#[cfg(unix)]
pub use launcher::{LaunchOutcome, LaunchRequest, Launcher, StopOutcome};
pub use lock::LaunchLock;
pub use record::{ProcessRecord, RecordStatus, RecordStore};
pub use utilities::*;
