//! core
//!
//! Core domain types, the branch layout and configuration.
//!
//! # Modules
//!
//! - [`types`] - Strong types: BranchName, Oid, RefName, RemoteBranch
//! - [`layout`] - The declared branch forest and its definition file
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Schemas are strict and self-describing

pub mod config;
pub mod layout;
pub mod types;
