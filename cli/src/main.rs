//! launchguard binary
//!
//! `launchguard launch <session_path> <api_id> <api_hash> <phone>` starts the
//! worker for a phone number unless it is already running. Exit code 0 means
//! started or already running; 1 means the launch did not happen, including
//! any usage error reported by the argument parser.

#![allow(unused_crate_dependencies)]

use clap::error::ErrorKind;
use clap::Parser;
use cli::Cli;
use tracing::error;

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
            _ => {
                let _ = e.print();
                std::process::exit(1);
            }
        },
    };

    if let Err(e) = launchguard_core::init_tracing(&cli.log_level) {
        eprintln!("warning: {e}");
    }

    let stdout = std::io::stdout();
    if let Err(e) = cli::run(&cli, &mut stdout.lock()) {
        error!(code = e.code(), "Command failed: {}", e);
        eprintln!("Error: {e}");
        std::process::exit(e.exit_code());
    }
}
