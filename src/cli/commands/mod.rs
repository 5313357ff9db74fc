//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Opens the [`Workspace`] (repository, configuration, layout)
//! 2. Calls the engine
//! 3. Formats and displays output
//!
//! Handlers do NOT perform repository mutations directly.

mod config_cmd;
mod fork_point;
mod log_cmd;
mod pr_prep;
mod remote;
mod status;
mod traverse;

pub use config_cmd::config;
pub use fork_point::fork_point;
pub use log_cmd::log;
pub use pr_prep::pr_prep;
pub use remote::remote;
pub use status::status;
pub use traverse::traverse;

use std::fs;
use std::io::{ErrorKind, StdinLock, Stderr, Stdout};
use std::path::PathBuf;

use crate::cli::args::Command;
use crate::core::config::Config;
use crate::core::layout::Layout;
use crate::core::types::{BranchName, RefName};
use crate::engine::Context;
use crate::git::{Git, RepoInfo};
use crate::ui::output::Console;
use crate::ui::prompts::TerminalPrompt;
use anyhow::{anyhow, bail, Context as _, Result};

/// Indent unit used when the layout is written back.
const DEFINITION_INDENT: &str = "    ";

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Status { json } => status::status(ctx, json),
        Command::ForkPoint { branch } => fork_point::fork_point(ctx, branch.as_deref()),
        Command::Log { branch } => log_cmd::log(ctx, branch.as_deref()),
        Command::Traverse { fetch } => traverse::traverse(ctx, fetch),
        Command::Remote { branch } => remote::remote(ctx, branch.as_deref()),
        Command::PrPrep { branch } => pr_prep::pr_prep(ctx, branch.as_deref()),
        Command::Config => config_cmd::config(ctx),
    }
}

/// Everything a handler needs from the repository it runs in.
pub(crate) struct Workspace {
    pub git: Git,
    pub info: RepoInfo,
    pub config: Config,
    /// Location of the layout definition
    pub definition: PathBuf,
}

impl Workspace {
    pub fn open(ctx: &Context) -> Result<Self> {
        let cwd = match &ctx.cwd {
            Some(path) => path.clone(),
            None => std::env::current_dir().context("Failed to determine current directory")?,
        };
        let git = Git::open(&cwd).context("Failed to open repository")?;
        let info = git.info();
        let config = Config::load(Some(&info.git_dir)).context("Failed to load configuration")?;
        let definition = config.definition_path(&info.git_dir, &info.work_dir);
        Ok(Self {
            git,
            info,
            config,
            definition,
        })
    }

    /// Read and parse the layout definition.
    pub fn layout(&self) -> Result<Layout> {
        let text = match fs::read_to_string(&self.definition) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => bail!(
                "No branch layout found at {}. List your branches there, one per line, \
                 children indented under their parent.",
                self.definition.display()
            ),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read branch layout {}", self.definition.display())
                })
            }
        };
        Layout::parse(&text)
            .with_context(|| format!("Invalid branch layout {}", self.definition.display()))
    }

    /// Write the layout back to the definition file.
    pub fn save_layout(&self, layout: &Layout) -> Result<()> {
        if let Some(dir) = self.definition.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        fs::write(&self.definition, layout.render(DEFINITION_INDENT))
            .with_context(|| format!("Failed to write branch layout {}", self.definition.display()))
    }

    /// The named branch (`refs/heads/` optional), or the checked-out one.
    pub fn branch_or_current(&self, name: Option<&str>) -> Result<BranchName> {
        match name {
            Some(name) => match RefName::new(name).ok().and_then(|r| r.local_branch()) {
                Some(branch) => Ok(branch),
                None => BranchName::new(name).context("Invalid branch name"),
            },
            None => self
                .git
                .current_branch()
                .context("Failed to read HEAD")?
                .ok_or_else(|| anyhow!("Not on any branch; name one explicitly")),
        }
    }

    /// Terminal prompts, honoring flags and the `interactive` setting.
    pub fn prompt(&self, ctx: &Context) -> TerminalPrompt<StdinLock<'static>, Stderr> {
        TerminalPrompt::stdio(ctx.interactive && self.config.interactive(), ctx.assume_yes)
    }
}

pub(crate) fn console(ctx: &Context) -> Console<Stdout, Stderr> {
    Console::stdio(ctx.quiet)
}
