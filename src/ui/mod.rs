//! ui
//!
//! User interaction utilities.
//!
//! # Modules
//!
//! - [`prompts`] - The interaction port and its terminal/scripted implementations
//! - [`output`] - Human-facing messages
//!
//! # Design
//!
//! The engine never touches the terminal. It asks questions through
//! [`prompts::Interaction`] and reports everything else as data; the CLI
//! decides how to print it.

pub mod output;
pub mod prompts;
