//! core::layout
//!
//! The declared branch forest.
//!
//! # Architecture
//!
//! The layout is an arena of nodes keyed by branch name:
//! - `children` is the owned, ordered edge (declaration order matters for
//!   traversal and display)
//! - `parent` is only a lookup key back into the arena
//!
//! Roots are kept in their own ordered list.
//!
//! # Invariants
//!
//! - A branch name appears at most once
//! - Every non-root node has exactly one parent, which is in the arena
//! - The forest is acyclic (nodes are only ever attached under existing ones)
//!
//! # Definition format
//!
//! ```text
//! master
//!     hotfix/add-trigger
//!         ignore-trailing push=no
//! develop
//!     call-ws rebase=no
//! ```
//!
//! Indentation (spaces or tabs) nests a branch under the closest less-indented
//! line above it. A line that dedents must line up exactly with one of the
//! enclosing branches. Qualifiers after the name toggle per-branch actions.

use std::collections::HashMap;

use thiserror::Error;

use super::types::{BranchName, TypeError};

/// Errors from building or editing the layout.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("branch {0} appears more than once in the layout")]
    DuplicateBranch(BranchName),

    #[error("branch {0} is not in the layout")]
    UnknownBranch(BranchName),

    #[error("branch {0} is a root and has no parent")]
    IsRoot(BranchName),

    #[error("line {line}: {source}")]
    InvalidName {
        line: usize,
        #[source]
        source: TypeError,
    },

    #[error("line {line}: unknown qualifier '{qualifier}'")]
    UnknownQualifier { line: usize, qualifier: String },

    #[error("line {line}: indentation does not match any enclosing branch")]
    BadIndentation { line: usize },
}

/// Per-branch switches read from definition qualifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BranchAttributes {
    /// `push=no` turns off push proposals
    pub push: bool,
    /// `rebase=no` turns off rebase proposals
    pub rebase: bool,
    /// `slide-out=no` turns off slide-out proposals
    pub slide_out: bool,
}

impl Default for BranchAttributes {
    fn default() -> Self {
        Self {
            push: true,
            rebase: true,
            slide_out: true,
        }
    }
}

impl BranchAttributes {
    fn apply(&mut self, qualifier: &str) -> bool {
        match qualifier {
            "push=no" => self.push = false,
            "push=yes" => self.push = true,
            "rebase=no" => self.rebase = false,
            "rebase=yes" => self.rebase = true,
            "slide-out=no" => self.slide_out = false,
            "slide-out=yes" => self.slide_out = true,
            _ => return false,
        }
        true
    }

    fn qualifiers(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if !self.push {
            out.push("push=no");
        }
        if !self.rebase {
            out.push("rebase=no");
        }
        if !self.slide_out {
            out.push("slide-out=no");
        }
        out
    }
}

/// A single branch in the forest; the arena key is its name.
#[derive(Debug, Clone, PartialEq, Eq)]
struct BranchNode {
    parent: Option<BranchName>,
    children: Vec<BranchName>,
    attributes: BranchAttributes,
}

/// The declared forest of branches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layout {
    roots: Vec<BranchName>,
    nodes: HashMap<BranchName, BranchNode>,
}

impl Layout {
    /// Create an empty layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new root.
    pub fn add_root(&mut self, name: BranchName) -> Result<(), LayoutError> {
        self.insert_node(name.clone(), None)?;
        self.roots.push(name);
        Ok(())
    }

    /// Append `child` as the last child of `parent`.
    pub fn add_child(&mut self, parent: &BranchName, child: BranchName) -> Result<(), LayoutError> {
        if !self.nodes.contains_key(parent) {
            return Err(LayoutError::UnknownBranch(parent.clone()));
        }
        self.insert_node(child.clone(), Some(parent.clone()))?;
        if let Some(node) = self.nodes.get_mut(parent) {
            node.children.push(child);
        }
        Ok(())
    }

    fn insert_node(
        &mut self,
        name: BranchName,
        parent: Option<BranchName>,
    ) -> Result<(), LayoutError> {
        if self.nodes.contains_key(&name) {
            return Err(LayoutError::DuplicateBranch(name));
        }
        self.nodes.insert(
            name,
            BranchNode {
                parent,
                children: Vec::new(),
                attributes: BranchAttributes::default(),
            },
        );
        Ok(())
    }

    /// Replace the attributes of a branch.
    pub fn set_attributes(
        &mut self,
        branch: &BranchName,
        attributes: BranchAttributes,
    ) -> Result<(), LayoutError> {
        let node = self
            .nodes
            .get_mut(branch)
            .ok_or_else(|| LayoutError::UnknownBranch(branch.clone()))?;
        node.attributes = attributes;
        Ok(())
    }

    pub fn contains(&self, branch: &BranchName) -> bool {
        self.nodes.contains_key(branch)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Declared parent, `None` for roots and unknown branches.
    pub fn parent(&self, branch: &BranchName) -> Option<&BranchName> {
        self.nodes.get(branch).and_then(|n| n.parent.as_ref())
    }

    /// Children in declaration order.
    pub fn children(&self, branch: &BranchName) -> &[BranchName] {
        self.nodes
            .get(branch)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    /// Attributes of a branch; defaults for unknown branches.
    pub fn attributes(&self, branch: &BranchName) -> BranchAttributes {
        self.nodes
            .get(branch)
            .map(|n| n.attributes)
            .unwrap_or_default()
    }

    /// All branches, parents before children, siblings in declaration order.
    ///
    /// ```
    /// use branchwise::core::layout::Layout;
    ///
    /// let layout = Layout::parse("master\n  hotfix\n    fix-2\n  docs\ndevelop\n").unwrap();
    /// let order: Vec<_> = layout.pre_order().iter().map(|b| b.to_string()).collect();
    /// assert_eq!(order, ["master", "hotfix", "fix-2", "docs", "develop"]);
    /// ```
    pub fn pre_order(&self) -> Vec<BranchName> {
        let mut result = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<&BranchName> = self.roots.iter().rev().collect();
        while let Some(branch) = stack.pop() {
            result.push(branch.clone());
            stack.extend(self.children(branch).iter().rev());
        }
        result
    }

    /// Ancestors from the immediate parent up to the root.
    pub fn ancestors(&self, branch: &BranchName) -> Vec<BranchName> {
        let mut result = Vec::new();
        let mut current = self.parent(branch);
        while let Some(parent) = current {
            result.push(parent.clone());
            current = self.parent(parent);
        }
        result
    }

    /// Every branch below `branch`, in pre-order.
    pub fn descendants(&self, branch: &BranchName) -> Vec<BranchName> {
        let mut result = Vec::new();
        let mut stack: Vec<&BranchName> = self.children(branch).iter().rev().collect();
        while let Some(current) = stack.pop() {
            result.push(current.clone());
            stack.extend(self.children(current).iter().rev());
        }
        result
    }

    /// Remove a non-root branch and splice its children into its place under
    /// its former parent, keeping their relative order.
    pub fn slide_out(&mut self, branch: &BranchName) -> Result<(), LayoutError> {
        let node = self
            .nodes
            .get(branch)
            .ok_or_else(|| LayoutError::UnknownBranch(branch.clone()))?;
        let parent = node
            .parent
            .clone()
            .ok_or_else(|| LayoutError::IsRoot(branch.clone()))?;
        let orphans = node.children.clone();

        for child in &orphans {
            if let Some(child_node) = self.nodes.get_mut(child) {
                child_node.parent = Some(parent.clone());
            }
        }
        if let Some(parent_node) = self.nodes.get_mut(&parent) {
            if let Some(pos) = parent_node.children.iter().position(|c| c == branch) {
                parent_node.children.splice(pos..=pos, orphans);
            }
        }
        self.nodes.remove(branch);
        Ok(())
    }

    /// Parse the indented definition format.
    pub fn parse(text: &str) -> Result<Self, LayoutError> {
        let mut layout = Layout::new();
        // (indent width, branch) for the current chain of open parents
        let mut open: Vec<(usize, BranchName)> = Vec::new();

        for (idx, raw) in text.lines().enumerate() {
            let line = idx + 1;
            if raw.trim().is_empty() {
                continue;
            }
            let indent = raw.len() - raw.trim_start().len();
            let mut words = raw.split_whitespace();
            let Some(name) = words.next() else { continue };
            let name =
                BranchName::new(name).map_err(|source| LayoutError::InvalidName { line, source })?;

            let mut attributes = BranchAttributes::default();
            for qualifier in words {
                if !attributes.apply(qualifier) {
                    return Err(LayoutError::UnknownQualifier {
                        line,
                        qualifier: qualifier.to_string(),
                    });
                }
            }

            let mut dedented = false;
            while open.last().is_some_and(|(width, _)| *width > indent) {
                open.pop();
                dedented = true;
            }
            if open.last().is_some_and(|(width, _)| *width == indent) {
                open.pop();
            } else if dedented {
                return Err(LayoutError::BadIndentation { line });
            }
            match open.last() {
                Some((_, parent)) => layout.add_child(parent, name.clone())?,
                None if indent == 0 => layout.add_root(name.clone())?,
                None => return Err(LayoutError::BadIndentation { line }),
            }
            layout.set_attributes(&name, attributes)?;
            open.push((indent, name));
        }

        Ok(layout)
    }

    /// Render back to the definition format with `indent` per level.
    pub fn render(&self, indent: &str) -> String {
        let mut out = String::new();
        for branch in self.pre_order() {
            let depth = self.ancestors(&branch).len();
            out.push_str(&indent.repeat(depth));
            out.push_str(branch.as_str());
            for qualifier in self.attributes(&branch).qualifiers() {
                out.push(' ');
                out.push_str(qualifier);
            }
            out.push('\n');
        }
        out
    }
}
