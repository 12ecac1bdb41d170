#![allow(unused_crate_dependencies)]
//! Test utilities for CLI crate integration tests.
#![allow(dead_code)]

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A manager root with a project directory and a config file pointing at a
/// `/bin/sh` worker that sleeps.
pub struct Sandbox {
    pub dir: TempDir,
    pub config_path: PathBuf,
}

impl Sandbox {
    pub fn new() -> Self {
        Self::with_script("echo \"worker $*\"; exec sleep 30")
    }

    pub fn with_script(script: &str) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(dir.path().join("bot")).expect("project dir");
        let config_path = dir.path().join("launchguard.toml");
        let config = format!(
            "managerRoot = '{root}'\n\
             runner = '/bin/sh'\n\
             runnerArgs = ['-c', '''{script}''', 'worker']\n\
             stopTimeoutSecs = 2\n",
            root = dir.path().display(),
        );
        std::fs::write(&config_path, config).expect("write config");
        Self { dir, config_path }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn sessions(&self) -> PathBuf {
        self.root().join("sessions")
    }

    /// `launchguard --config <sandbox config>` with launcher env vars cleared
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("launchguard").expect("binary built");
        cmd.env_remove("LAUNCHGUARD_CONFIG")
            .env_remove("LAUNCHGUARD_ROOT")
            .env_remove("LAUNCHGUARD_PROJECT_DIR")
            .env_remove("RUST_LOG")
            .arg("--config")
            .arg(&self.config_path);
        cmd
    }
}

/// Pull the PID out of a "... PID <n>..." status line
pub fn pid_from(output: &str) -> u32 {
    let after = output
        .split("PID ")
        .nth(1)
        .expect("output mentions a PID");
    after
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect::<String>()
        .parse()
        .expect("numeric PID")
}
