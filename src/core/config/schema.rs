//! core::config::schema
//!
//! Configuration file schema.
//!
//! Both scopes (global and repo) share one schema; every key is optional so
//! a repo file only needs to mention what it overrides.
//!
//! ```toml
//! interactive = true
//! origin_policy = "confirm"
//! fetch = true
//! definition = ".git/branchwise/layout"
//! ```

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// How the remote resolver treats a remote literally named `origin` when a
/// branch has no tracking counterpart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OriginPolicy {
    /// Use `origin` without asking.
    #[default]
    Assume,
    /// Ask before using `origin`; a "no" falls through to the other rules.
    Confirm,
}

/// One configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    /// Prompt interactively (otherwise prompts fail unless `--yes` is given)
    pub interactive: Option<bool>,

    /// Treatment of the `origin` remote during remote resolution
    pub origin_policy: Option<OriginPolicy>,

    /// Fetch every remote before a traversal
    pub fetch: Option<bool>,

    /// Location of the branch layout definition, relative to the repo root
    pub definition: Option<String>,
}

impl ConfigFile {
    /// Validate the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(definition) = &self.definition {
            if definition.trim().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "definition path cannot be empty".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Overlay `other` on top of `self`; keys set in `other` win.
    pub fn merged_with(&self, other: &ConfigFile) -> ConfigFile {
        ConfigFile {
            interactive: other.interactive.or(self.interactive),
            origin_policy: other.origin_policy.or(self.origin_policy),
            fetch: other.fetch.or(self.fetch),
            definition: other.definition.clone().or_else(|| self.definition.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_file() {
        let parsed: ConfigFile = toml::from_str(
            r#"
            interactive = false
            origin_policy = "confirm"
            fetch = true
            definition = "layout.txt"
            "#,
        )
        .unwrap();
        assert_eq!(parsed.interactive, Some(false));
        assert_eq!(parsed.origin_policy, Some(OriginPolicy::Confirm));
        assert_eq!(parsed.fetch, Some(true));
        assert_eq!(parsed.definition.as_deref(), Some("layout.txt"));
    }

    #[test]
    fn unknown_keys_rejected() {
        let parsed: Result<ConfigFile, _> = toml::from_str("trunk = \"main\"");
        assert!(parsed.is_err());
    }

    #[test]
    fn unknown_origin_policy_rejected() {
        let parsed: Result<ConfigFile, _> = toml::from_str("origin_policy = \"sometimes\"");
        assert!(parsed.is_err());
    }

    #[test]
    fn empty_definition_is_invalid() {
        let file = ConfigFile {
            definition: Some("  ".into()),
            ..Default::default()
        };
        assert!(file.validate().is_err());
    }

    #[test]
    fn overlay_prefers_later_file() {
        let global = ConfigFile {
            interactive: Some(true),
            fetch: Some(true),
            ..Default::default()
        };
        let repo = ConfigFile {
            fetch: Some(false),
            origin_policy: Some(OriginPolicy::Confirm),
            ..Default::default()
        };
        let merged = global.merged_with(&repo);
        assert_eq!(merged.interactive, Some(true));
        assert_eq!(merged.fetch, Some(false));
        assert_eq!(merged.origin_policy, Some(OriginPolicy::Confirm));
    }
}
