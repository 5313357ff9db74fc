//! ui::output
//!
//! What the operator reads on the terminal besides prompts.
//!
//! A [`Console`] sends results to one stream and notices to another. Under
//! `--quiet` only failures get through. Developer diagnostics go through
//! `tracing`; `status --json` writes its document directly.

use std::fmt::Display;
use std::io::{self, Stderr, Stdout, Write};

/// Indent unit for one level of the branch tree.
const TREE_INDENT: &str = "  ";

pub struct Console<O, E> {
    out: O,
    err: E,
    quiet: bool,
}

impl Console<Stdout, Stderr> {
    pub fn stdio(quiet: bool) -> Self {
        Self::new(io::stdout(), io::stderr(), quiet)
    }
}

impl<O: Write, E: Write> Console<O, E> {
    pub fn new(out: O, err: E, quiet: bool) -> Self {
        Self { out, err, quiet }
    }

    /// A line of results, e.g. what a traversal did.
    pub fn note(&mut self, message: impl Display) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        writeln!(self.out, "{message}")
    }

    /// One branch of the tree, indented by its depth in the layout.
    pub fn tree_line(&mut self, depth: usize, line: impl Display) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        writeln!(self.out, "{}{line}", TREE_INDENT.repeat(depth))
    }

    pub fn warn(&mut self, message: impl Display) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        writeln!(self.err, "Warn: {message}")
    }

    /// A branch that could not be handled. Shown even when quiet.
    pub fn branch_failed(&mut self, branch: impl Display, reason: impl Display) -> io::Result<()> {
        writeln!(self.err, "error: {branch}: {reason}")
    }

    #[cfg(test)]
    fn into_parts(self) -> (O, E) {
        (self.out, self.err)
    }
}

/// Report the error that ends the process.
pub fn fatal(message: impl Display) {
    eprintln!("error: {message}");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(bytes: Vec<u8>) -> String {
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn notices_and_results_go_to_separate_streams() {
        let mut console = Console::new(Vec::new(), Vec::new(), false);
        console.note("Slid out: develop").unwrap();
        console.warn("feature skipped because develop failed").unwrap();
        let (out, err) = console.into_parts();
        assert_eq!(text(out), "Slid out: develop\n");
        assert_eq!(text(err), "Warn: feature skipped because develop failed\n");
    }

    #[test]
    fn quiet_keeps_only_failures() {
        let mut console = Console::new(Vec::new(), Vec::new(), true);
        console.note("Fetched origin").unwrap();
        console.tree_line(0, "master").unwrap();
        console.warn("base is not on origin").unwrap();
        console.branch_failed("feature", "rebase conflict").unwrap();
        let (out, err) = console.into_parts();
        assert!(out.is_empty());
        assert_eq!(text(err), "error: feature: rebase conflict\n");
    }

    #[test]
    fn tree_lines_are_indented_by_depth() {
        let mut console = Console::new(Vec::new(), Vec::new(), false);
        console.tree_line(0, "master").unwrap();
        console.tree_line(2, "feature").unwrap();
        let (out, _) = console.into_parts();
        assert_eq!(text(out), "master\n    feature\n");
    }
}
