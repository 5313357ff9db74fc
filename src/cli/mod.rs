//! cli
//!
//! Command-line interface layer for Branchwise.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Install the log subscriber
//! - Delegate to command handlers
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap and dispatches to the
//! [`crate::engine`] for execution. Repository mutations only happen inside
//! the engine, after a prompt was answered.

pub mod args;
pub mod commands;

pub use args::Cli;

use crate::engine;
use anyhow::Result;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a log filter (`debug`, `branchwise=trace`, ...).
pub const LOG_ENV: &str = "BRANCHWISE_LOG";

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    init_logging(cli.debug);

    let ctx = engine::Context {
        cwd: cli.cwd.clone(),
        quiet: cli.quiet,
        interactive: cli.interactive(),
        assume_yes: cli.yes,
    };

    commands::dispatch(cli.command, &ctx)
}

/// Diagnostics go to stderr; `BRANCHWISE_LOG` wins over `--debug`.
fn init_logging(debug: bool) {
    let default = if debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    let filter = EnvFilter::builder()
        .with_default_directive(default.into())
        .with_env_var(LOG_ENV)
        .from_env_lossy();
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
    if installed.is_err() {
        tracing::debug!("log subscriber already installed");
    }
}
