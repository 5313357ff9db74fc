//! core::config
//!
//! Configuration loading.
//!
//! # Precedence
//!
//! Later sources override earlier ones:
//! 1. Built-in defaults
//! 2. Global config file
//! 3. Repo config file
//! 4. CLI flags (applied by the caller)
//!
//! # Global Config Locations
//!
//! Searched in order, first hit wins:
//! 1. `$BRANCHWISE_CONFIG`
//! 2. `$XDG_CONFIG_HOME/branchwise/config.toml`
//! 3. `~/.branchwise/config.toml`
//!
//! # Repo Config Location
//!
//! `<git dir>/branchwise/config.toml`
//!
//! # Example
//!
//! ```no_run
//! use branchwise::core::config::Config;
//! use std::path::Path;
//!
//! let config = Config::load(Some(Path::new("/path/to/repo/.git"))).unwrap();
//! println!("fetch before traverse: {}", config.fetch());
//! ```

pub mod schema;

pub use schema::{ConfigFile, OriginPolicy};

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Default location of the layout definition, relative to the git dir.
pub const DEFAULT_DEFINITION: &str = "branchwise/layout";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Merged configuration from all files.
#[derive(Debug, Clone, Default)]
pub struct Config {
    merged: ConfigFile,
    /// Files that contributed, in precedence order
    sources: Vec<PathBuf>,
}

impl Config {
    /// Load global config from the standard locations plus the repo config
    /// under `git_dir`, if given.
    ///
    /// Missing files are not an error; malformed ones are.
    pub fn load(git_dir: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_from(Self::global_config_path().as_deref(), git_dir)
    }

    /// Load from an explicit global path (used directly by tests).
    pub fn load_from(global: Option<&Path>, git_dir: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(path) = global.filter(|p| p.exists()) {
            config.overlay(path)?;
        }
        if let Some(path) = git_dir
            .map(Self::repo_config_path)
            .filter(|p| p.exists())
        {
            config.overlay(&path)?;
        }

        tracing::debug!(sources = ?config.sources, "configuration loaded");
        Ok(config)
    }

    fn overlay(&mut self, path: &Path) -> Result<(), ConfigError> {
        let file = Self::read_file(path)?;
        file.validate()?;
        self.merged = self.merged.merged_with(&file);
        self.sources.push(path.to_path_buf());
        Ok(())
    }

    fn read_file(path: &Path) -> Result<ConfigFile, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// First existing global config location, or the canonical one.
    fn global_config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("BRANCHWISE_CONFIG") {
            return Some(PathBuf::from(path));
        }
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("branchwise/config.toml");
            if path.exists() {
                return Some(path);
            }
        }
        dirs::home_dir().map(|home| home.join(".branchwise/config.toml"))
    }

    /// `<git dir>/branchwise/config.toml`
    pub fn repo_config_path(git_dir: &Path) -> PathBuf {
        git_dir.join("branchwise/config.toml")
    }

    /// Files that were read, lowest precedence first.
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    // =========================================================================
    // Accessors with defaults applied
    // =========================================================================

    /// Defaults to `true`.
    pub fn interactive(&self) -> bool {
        self.merged.interactive.unwrap_or(true)
    }

    /// Defaults to [`OriginPolicy::Assume`].
    pub fn origin_policy(&self) -> OriginPolicy {
        self.merged.origin_policy.unwrap_or_default()
    }

    /// Defaults to `false`.
    pub fn fetch(&self) -> bool {
        self.merged.fetch.unwrap_or(false)
    }

    /// Absolute path of the layout definition.
    ///
    /// A configured relative path is resolved against the work tree; the
    /// default lives inside the git dir.
    pub fn definition_path(&self, git_dir: &Path, work_dir: &Path) -> PathBuf {
        match &self.merged.definition {
            Some(path) => work_dir.join(path),
            None => git_dir.join(DEFAULT_DEFINITION),
        }
    }
}
