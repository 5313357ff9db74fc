//! Branchwise - keeps a declared tree of git branches in sync
//!
//! Every branch in the layout has a parent (except roots) and, usually, a
//! counterpart on some remote. Branchwise answers three questions per branch:
//! has it drifted from its parent, has it drifted from its remote, and where
//! should a rebase, push or pull request target it.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to engine)
//! - [`engine`] - Fork points, classification, remote resolution, traversal
//! - [`core`] - Domain types, the branch layout and configuration
//! - [`git`] - Single interface for all Git operations
//! - [`ui`] - Prompts and human-facing output
//!
//! # Correctness Invariants
//!
//! 1. Classification never mutates the repository
//! 2. Every mutation follows an explicit confirmation
//! 3. When history is ambiguous the engine reports it instead of guessing

pub mod cli;
pub mod core;
pub mod engine;
pub mod git;
pub mod ui;
