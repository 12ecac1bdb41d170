//! Launcher configuration loading and validation
//!
//! The launcher only needs a handful of constants: where per-key records and
//! logs live, which directory the worker runs in, and how the worker is
//! started. They default to the layout of a single manager root and may be
//! overridden from a TOML file with camelCase keys.

use crate::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory name under the manager root that holds `.pid`, `.log` and `.lock` files
pub const SESSIONS_DIR_NAME: &str = "sessions";

/// Directory name under the manager root that holds the worker project
pub const PROJECT_DIR_NAME: &str = "bot";

/// Launcher settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LauncherConfig {
    /// Root directory the other paths are derived from
    pub manager_root: PathBuf,
    /// Overrides `<managerRoot>/sessions`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sessions_dir: Option<PathBuf>,
    /// Overrides `<managerRoot>/bot`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_dir: Option<PathBuf>,
    /// Program that starts the worker
    pub runner: String,
    /// Arguments placed before the session path, api id and api hash
    pub runner_args: Vec<String>,
    /// Inherited environment variables removed before the worker starts
    pub unset_env: Vec<String>,
    /// How long a launch waits for another launcher holding the same key
    pub lock_wait_ms: u64,
    /// Grace period between SIGTERM and SIGKILL when stopping a worker
    pub stop_timeout_secs: u64,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            manager_root: default_manager_root(),
            sessions_dir: None,
            project_dir: None,
            runner: "uv".to_string(),
            runner_args: vec![
                "run".to_string(),
                "python".to_string(),
                "-m".to_string(),
                "bot".to_string(),
            ],
            unset_env: vec!["VIRTUAL_ENV".to_string()],
            lock_wait_ms: 2_000,
            stop_timeout_secs: 10,
        }
    }
}

impl LauncherConfig {
    /// Directory holding the per-key records, logs and locks
    pub fn sessions_dir(&self) -> PathBuf {
        self.sessions_dir
            .clone()
            .unwrap_or_else(|| self.manager_root.join(SESSIONS_DIR_NAME))
    }

    /// Working directory of the spawned worker
    pub fn project_dir(&self) -> PathBuf {
        self.project_dir
            .clone()
            .unwrap_or_else(|| self.manager_root.join(PROJECT_DIR_NAME))
    }

    pub fn lock_wait(&self) -> Duration {
        Duration::from_millis(self.lock_wait_ms)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }

    /// Validate the configuration and return `Result<()>` with field-path errors
    pub fn validate(&self) -> Result<()> {
        if self.manager_root.as_os_str().is_empty() {
            return Err(CoreError::ValidationError(
                "managerRoot: cannot be empty".to_string(),
            ));
        }
        if self.runner.trim().is_empty() {
            return Err(CoreError::ValidationError(
                "runner: cannot be empty".to_string(),
            ));
        }
        for (i, name) in self.unset_env.iter().enumerate() {
            if name.trim().is_empty() || name.contains('=') {
                return Err(CoreError::ValidationError(format!(
                    "unsetEnv[{}]: '{}' is not a valid variable name",
                    i, name
                )));
            }
        }
        if self.lock_wait_ms == 0 {
            return Err(CoreError::ValidationError(
                "lockWaitMs: must be > 0".to_string(),
            ));
        }
        if self.stop_timeout_secs == 0 {
            return Err(CoreError::ValidationError(
                "stopTimeoutSecs: must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Return the default manager root.
///
/// Order:
/// - `$HOME/.launchguard` if HOME exists
/// - `./.launchguard` otherwise
pub fn default_manager_root() -> PathBuf {
    if let Some(home) = dirs_next::home_dir() {
        return home.join(".launchguard");
    }
    PathBuf::from(".launchguard")
}

/// Load launcher config from a TOML file path
pub fn load_config_from_toml_path(path: impl AsRef<Path>) -> Result<LauncherConfig> {
    let data = fs::read_to_string(&path).map_err(|e| {
        CoreError::ConfigurationError(format!("Failed to read config {:?}: {}", path.as_ref(), e))
    })?;
    load_config_from_toml_str(&data)
}

/// Load launcher config from a TOML string; missing keys take their defaults
pub fn load_config_from_toml_str(input: &str) -> Result<LauncherConfig> {
    let cfg: LauncherConfig = toml::from_str(input)
        .map_err(|e| CoreError::ConfigurationError(format!("TOML parse error: {}", e)))?;
    cfg.validate()?;
    Ok(cfg)
}
