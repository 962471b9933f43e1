//! Interactive confirmation on the terminal.
//!
//! Prompts are written to stderr; command reports are printed on stdout.

use colored::Colorize;
use std::io::{BufRead, Write};

use crate::error::Result;
use crate::model::ResourceKind;
use crate::reconciler::{DiffResolution, Prompter};

/// Asks the operator through stdin and stderr.
#[derive(Debug, Default)]
pub struct TerminalPrompter;

impl TerminalPrompter {
    /// Creates a terminal prompter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn ask(question: &str) -> Result<String> {
        eprint!("{question} ");
        std::io::stderr().flush()?;

        let mut input = String::new();
        std::io::stdin().lock().read_line(&mut input)?;
        Ok(input.trim().to_lowercase())
    }
}

impl Prompter for TerminalPrompter {
    fn show(&self, message: &str) {
        eprintln!("{message}");
    }

    fn confirm(&self, question: &str) -> Result<bool> {
        let answer = Self::ask(&format!("{question} [y/N]:"))?;
        Ok(parse_yes(&answer))
    }

    fn resolve_diff(&self, kind: ResourceKind, name: &str) -> Result<DiffResolution> {
        loop {
            let answer = Self::ask(&format!(
                "{kind} '{name}' differs from the engine. [a]ccept remote, [o]verwrite remote, [s]kip:"
            ))?;

            if let Some(resolution) = parse_resolution(&answer) {
                return Ok(resolution);
            }
            eprintln!("{} Please answer a, o or s.", "⚠".yellow());
        }
    }
}

fn parse_yes(answer: &str) -> bool {
    matches!(answer, "y" | "yes")
}

fn parse_resolution(answer: &str) -> Option<DiffResolution> {
    match answer {
        "a" | "accept" => Some(DiffResolution::AcceptRemote),
        "o" | "overwrite" => Some(DiffResolution::OverwriteRemote),
        "s" | "skip" | "" => Some(DiffResolution::Skip),
        _ => None,
    }
}
