//! Command-line front end for launchguard
//!
//! Parses arguments, resolves the launcher configuration and turns launcher
//! outcomes into one human-readable status line per branch on stdout.

pub mod error;

pub use error::{CliError, Result};

use clap::{Parser, Subcommand};
use launchguard_core::config::load_config_from_toml_path;
use launchguard_core::{
    LaunchOutcome, LaunchRequest, Launcher, LauncherConfig, RecordStatus, StopOutcome,
};
use serde_json::json;
use std::io::Write;
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Parser)]
#[command(name = "launchguard")]
#[command(about = "Start at most one detached worker per phone number")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// TOML config file
    #[arg(long, global = true, env = "LAUNCHGUARD_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Manager root holding the sessions directory
    #[arg(long, global = true, env = "LAUNCHGUARD_ROOT", value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Working directory of the worker
    #[arg(long, global = true, env = "LAUNCHGUARD_PROJECT_DIR", value_name = "DIR")]
    pub project_dir: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the worker for PHONE unless one is already running
    ///
    /// Arguments are optional at the parser level so that a missing one is
    /// reported with exit code 1 like every other launch failure.
    Launch {
        session_path: Option<String>,
        api_id: Option<String>,
        api_hash: Option<String>,
        phone: Option<String>,
    },
    /// Show whether the recorded worker for PHONE is alive
    Status {
        phone: String,
        /// Print a JSON object instead of a status line
        #[arg(long)]
        json: bool,
    },
    /// Terminate the recorded worker for PHONE and delete its record
    Stop { phone: String },
}

impl Cli {
    /// Build the launcher configuration: defaults, then the config file, then flags/env
    pub fn resolve_config(&self) -> Result<LauncherConfig> {
        let mut config = match &self.config {
            Some(path) => load_config_from_toml_path(path)?,
            None => LauncherConfig::default(),
        };
        if let Some(root) = &self.root {
            config.manager_root = root.clone();
        }
        if let Some(dir) = &self.project_dir {
            config.project_dir = Some(dir.clone());
        }
        debug!("Resolved config: {:?}", config);
        Ok(config)
    }
}

fn required(value: &Option<String>, name: &str) -> Result<String> {
    value
        .clone()
        .ok_or_else(|| CliError::InvalidArgument(format!("missing required argument <{name}>")))
}

/// Execute the parsed command, writing status lines to `out`
pub fn run(cli: &Cli, out: &mut impl Write) -> Result<()> {
    match &cli.command {
        Commands::Launch {
            session_path,
            api_id,
            api_hash,
            phone,
        } => {
            // The phone is checked first: without it nothing else matters.
            let identity_key = required(phone, "PHONE")?;
            let request = LaunchRequest {
                session_path: required(session_path, "SESSION_PATH")?,
                api_id: required(api_id, "API_ID")?,
                api_hash: required(api_hash, "API_HASH")?,
                identity_key,
            };
            launchguard_core::record::validate_identity_key(&request.identity_key)?;
            let launcher = Launcher::new(cli.resolve_config()?)?;
            let outcome = launcher.launch(&request)?;
            write_launch_outcome(out, &outcome)
        }
        Commands::Status { phone, json } => {
            let launcher = Launcher::new(cli.resolve_config()?)?;
            let status = launcher.status(phone)?;
            if *json {
                let store = launcher.store();
                let report = json!({
                    "identityKey": phone,
                    "status": status,
                    "pidFilePath": store.pid_path(phone),
                    "logPath": store.log_path(phone),
                });
                writeln!(out, "{}", serde_json::to_string(&report)?).map_err(io_err)?;
            } else {
                write_status(out, phone, &status)?;
            }
            Ok(())
        }
        Commands::Stop { phone } => {
            let launcher = Launcher::new(cli.resolve_config()?)?;
            let outcome = launcher.stop(phone)?;
            write_stop_outcome(out, phone, &outcome)
        }
    }
}

fn io_err(e: std::io::Error) -> CliError {
    CliError::Core(e.into())
}

/// Print the status lines for a launch
pub fn write_launch_outcome(out: &mut impl Write, outcome: &LaunchOutcome) -> Result<()> {
    let written = match outcome {
        LaunchOutcome::AlreadyRunning { record } => writeln!(
            out,
            "Bot for {} is already running (PID {})",
            record.identity_key, record.pid
        ),
        LaunchOutcome::Started {
            record,
            replaced_stale,
        } => {
            if let Some(stale) = replaced_stale {
                writeln!(
                    out,
                    "Removed stale PID file for {} (PID {} is not running)",
                    record.identity_key, stale
                )
                .map_err(io_err)?;
            }
            writeln!(
                out,
                "Started bot for {} with PID {}, logging to {}",
                record.identity_key,
                record.pid,
                record.log_path.display()
            )
        }
    };
    written.map_err(io_err)
}

fn write_status(out: &mut impl Write, phone: &str, status: &RecordStatus) -> Result<()> {
    let written = match status {
        RecordStatus::Absent => writeln!(out, "{phone}: not running"),
        RecordStatus::Running { pid } => writeln!(out, "{phone}: running (PID {pid})"),
        RecordStatus::Stale { pid: Some(pid) } => {
            writeln!(out, "{phone}: stale (PID {pid} is not running)")
        }
        RecordStatus::Stale { pid: None } => writeln!(out, "{phone}: stale (unreadable PID file)"),
    };
    written.map_err(io_err)
}

fn write_stop_outcome(out: &mut impl Write, phone: &str, outcome: &StopOutcome) -> Result<()> {
    let written = match outcome {
        StopOutcome::NotRunning => writeln!(out, "Bot for {phone} is not running"),
        StopOutcome::RemovedStale { .. } => {
            writeln!(out, "Removed stale PID file for {phone}")
        }
        StopOutcome::Stopped { pid } => writeln!(out, "Stopped bot for {phone} (PID {pid})"),
    };
    written.map_err(io_err)
}
