//! CLI module for the solution reconciler.
//!
//! This module provides the command-line interface: argument parsing,
//! terminal prompts and output formatting.

mod commands;
mod output;
mod prompt;

pub use commands::{Cli, Commands, OutputFormat};
pub use output::OutputFormatter;
pub use prompt::TerminalPrompter;
