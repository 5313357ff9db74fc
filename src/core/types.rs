//! core::types
//!
//! Strong types for the values the engine passes around.
//!
//! # Types
//!
//! - [`BranchName`] - Validated local branch name
//! - [`Oid`] - Commit identifier (the engine's opaque `CommitRef`)
//! - [`RefName`] - Fully qualified reference name
//! - [`RemoteBranch`] - A branch on a named remote
//!
//! # Validation
//!
//! Names are checked against git's refname rules at construction time, so a
//! `BranchName` that exists is always safe to splice into `refs/heads/...`.
//!
//! # Examples
//!
//! ```
//! use branchwise::core::types::{BranchName, Oid, RefName};
//!
//! let branch = BranchName::new("feature/login").unwrap();
//! let oid = Oid::new("abc123def4567890abc123def4567890abc12345").unwrap();
//! assert_eq!(RefName::for_branch(&branch).as_str(), "refs/heads/feature/login");
//! assert_eq!(oid.short(7), "abc123d");
//!
//! assert!(BranchName::new("bad..name").is_err());
//! assert!(Oid::new("not-a-sha").is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("invalid object id: {0}")]
    InvalidOid(String),

    #[error("invalid ref name: {0}")]
    InvalidRefName(String),
}

/// Characters git refuses anywhere in a refname.
const FORBIDDEN_CHARS: [char; 8] = [' ', '~', '^', ':', '\\', '?', '*', '['];

/// Check the refname rules shared by branch names and full ref names.
///
/// Returns a human-readable reason on failure; callers wrap it in the
/// matching [`TypeError`] variant.
fn refname_violation(name: &str) -> Option<String> {
    if name.is_empty() {
        return Some("name cannot be empty".into());
    }
    if name.starts_with('/') || name.ends_with('/') {
        return Some("name cannot start or end with '/'".into());
    }
    for bad in ["..", "@{", "//"] {
        if name.contains(bad) {
            return Some(format!("name cannot contain '{bad}'"));
        }
    }
    if let Some(c) = name.chars().find(|c| FORBIDDEN_CHARS.contains(c)) {
        return Some(format!("name cannot contain '{c}'"));
    }
    if name.chars().any(|c| c.is_ascii_control()) {
        return Some("name cannot contain control characters".into());
    }
    name.split('/')
        .find(|component| component.starts_with('.') || component.ends_with(".lock"))
        .map(|component| format!("path component '{component}' is not allowed"))
}

/// A validated local branch name.
///
/// Besides git's refname rules, a branch name may not start with `-` and may
/// not be the bare `@`.
///
/// ```
/// use branchwise::core::types::BranchName;
///
/// assert!(BranchName::new("hotfix/add-trigger").is_ok());
/// assert!(BranchName::new("user@feature").is_ok());
/// assert!(BranchName::new("").is_err());
/// assert!(BranchName::new("-flag").is_err());
/// assert!(BranchName::new("@").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Create a new validated branch name.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        if name == "@" {
            return Err(TypeError::InvalidBranchName("'@' is reserved".into()));
        }
        if name.starts_with('-') {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot start with '-'".into(),
            ));
        }
        if let Some(reason) = refname_violation(&name) {
            return Err(TypeError::InvalidBranchName(reason));
        }
        Ok(Self(name))
    }

    /// Get the branch name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BranchName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A commit identifier (SHA-1 or SHA-256 hex), normalized to lowercase.
///
/// The engine treats it as opaque: it is compared for equality and handed
/// back to the commit graph for ancestry questions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(String);

impl Oid {
    /// Create a new validated object id.
    pub fn new(oid: impl Into<String>) -> Result<Self, TypeError> {
        let oid = oid.into().to_ascii_lowercase();
        if oid.len() != 40 && oid.len() != 64 {
            return Err(TypeError::InvalidOid(format!(
                "expected 40 or 64 hex characters, got {}",
                oid.len()
            )));
        }
        if !oid.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidOid(
                "object id must be hexadecimal".into(),
            ));
        }
        Ok(Self(oid))
    }

    /// Deterministic 40-character id for the `n`th commit of an in-memory graph.
    pub fn synthetic(n: u64) -> Self {
        Self(format!("{n:040x}"))
    }

    /// First `len` characters of the id (the whole id if shorter).
    pub fn short(&self, len: usize) -> &str {
        &self.0[..len.min(self.0.len())]
    }

    /// Get the object id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Oid {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        oid.0
    }
}

impl AsRef<str> for Oid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated, fully qualified reference name.
///
/// ```
/// use branchwise::core::types::{BranchName, RefName};
///
/// let branch = BranchName::new("feature").unwrap();
/// assert_eq!(RefName::for_branch(&branch).as_str(), "refs/heads/feature");
/// assert_eq!(
///     RefName::for_remote_branch("origin", &branch).as_str(),
///     "refs/remotes/origin/feature"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RefName(String);

impl RefName {
    /// Create a new validated ref name.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        if let Some(reason) = refname_violation(&name) {
            return Err(TypeError::InvalidRefName(reason));
        }
        Ok(Self(name))
    }

    /// `refs/heads/<branch>`
    pub fn for_branch(branch: &BranchName) -> Self {
        Self(format!("refs/heads/{}", branch.as_str()))
    }

    /// `refs/remotes/<remote>/<branch>`
    ///
    /// Remote names come from git's own config, so they are not re-validated.
    pub fn for_remote_branch(remote: &str, branch: &BranchName) -> Self {
        Self(format!("refs/remotes/{}/{}", remote, branch.as_str()))
    }

    /// The local branch behind a `refs/heads/` ref.
    pub fn local_branch(&self) -> Option<BranchName> {
        self.0
            .strip_prefix("refs/heads/")
            .and_then(|name| BranchName::new(name).ok())
    }

    /// Get the ref name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RefName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RefName> for String {
    fn from(name: RefName) -> Self {
        name.0
    }
}

impl AsRef<str> for RefName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RefName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A branch on a named remote, e.g. `origin/feature`.
///
/// Used both for configured tracking counterparts and for same-named
/// candidates discovered on a remote.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteBranch {
    /// Remote name as configured in git (`origin`, `upstream`, ...)
    pub remote: String,
    /// Branch name on that remote
    pub branch: BranchName,
}

impl RemoteBranch {
    pub fn new(remote: impl Into<String>, branch: BranchName) -> Self {
        Self {
            remote: remote.into(),
            branch,
        }
    }

    /// The local remote-tracking ref for this branch.
    pub fn ref_name(&self) -> RefName {
        RefName::for_remote_branch(&self.remote, &self.branch)
    }
}

impl std::fmt::Display for RemoteBranch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.remote, self.branch)
    }
}
