//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--cwd <path>`: Run as if in that directory
//! - `--debug`: Enable debug logging
//! - `--no-interactive`: Never read answers from the terminal
//! - `--yes` / `-y`: Answer `y` wherever a prompt offers it
//! - `--quiet` / `-q`: Minimal output

use clap::{Parser, Subcommand};
use std::io::IsTerminal;
use std::path::PathBuf;

/// Branchwise - keeps a declared tree of git branches in sync
#[derive(Parser, Debug)]
#[command(name = "bw")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run as if bw was started in this directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output; implies --no-interactive
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Answer yes to every prompt that offers it
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,

    /// Disable interactive prompts
    #[arg(long, global = true)]
    pub no_interactive: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }

    /// Interactive unless `--no-interactive` or `--quiet` was given or stdin
    /// is not a terminal.
    pub fn interactive(&self) -> bool {
        !(self.no_interactive || self.quiet) && std::io::stdin().is_terminal()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show every branch of the layout with its parent and remote status
    #[command(after_help = "\
EXAMPLES:
    bw status
    bw status --json | jq '.[] | select(.parent_status == \"OutOfSync\")'")]
    Status {
        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Show where a branch's own history starts relative to its parent
    #[command(name = "fork-point")]
    ForkPoint {
        /// Branch to inspect (defaults to the current branch)
        branch: Option<String>,
    },

    /// List the commits a branch owns, newest first
    #[command(after_help = "\
EXAMPLES:
    bw log
    bw log refs/heads/feature")]
    Log {
        /// Branch to list (defaults to the current branch)
        branch: Option<String>,
    },

    /// Walk the layout, proposing rebases, pushes and slide-outs
    #[command(long_about = "Walk the layout in pre-order, proposing rebases, pushes and slide-outs.\n\n\
        Every action needs confirmation: y applies it, N skips it, q stops the walk \
        and yq applies it and then stops. Branches that were slid out are removed from \
        the definition file.")]
    Traverse {
        /// Fetch every remote before the walk
        #[arg(long)]
        fetch: bool,
    },

    /// Resolve the remote a branch should be pushed to
    Remote {
        /// Branch to resolve (defaults to the current branch)
        branch: Option<String>,
    },

    /// Get a branch ready for a pull request against its parent
    #[command(name = "pr-prep")]
    PrPrep {
        /// Head branch (defaults to the current branch)
        branch: Option<String>,
    },

    /// Print the effective configuration and where it came from
    Config,
}
