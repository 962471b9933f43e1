//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::model::ResourceKind;

/// Solution - Declarative reconciler for engine resources.
#[derive(Parser, Debug)]
#[command(name = "solution")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show what an apply would change, without changing anything.
    Plan {
        /// Path to the plan document.
        spec: PathBuf,

        /// State location (a path or `s3://bucket/prefix`).
        #[arg(long)]
        state: Option<String>,
    },

    /// Converge the engine to the plan.
    Apply {
        /// Path to the plan document.
        spec: PathBuf,

        /// State location (a path or `s3://bucket/prefix`).
        #[arg(long)]
        state: Option<String>,

        /// Skip confirmation prompts.
        #[arg(short, long)]
        yes: bool,
    },

    /// Delete every resource the plan created.
    Destroy {
        /// State location (a path or `s3://bucket/prefix`).
        #[arg(long)]
        state: Option<String>,

        /// Skip confirmation prompts.
        #[arg(short, long)]
        yes: bool,
    },

    /// Adopt an existing engine resource.
    Import {
        /// Resource kind (asset, secret, file, component, function, alert).
        kind: ResourceKind,

        /// Remote id of the resource.
        id: String,

        /// Path to the plan document that records the import.
        spec: PathBuf,

        /// State location (a path or `s3://bucket/prefix`).
        #[arg(long)]
        state: Option<String>,
    },
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_apply() {
        let cli = Cli::try_parse_from(["solution", "apply", "plan.yaml", "--yes", "--state", "s3://b/p"])
            .expect("parse");

        let Commands::Apply { spec, state, yes } = cli.command else {
            panic!("expected apply");
        };
        assert_eq!(spec, PathBuf::from("plan.yaml"));
        assert_eq!(state.as_deref(), Some("s3://b/p"));
        assert!(yes);
    }

    #[test]
    fn test_parse_import_kind() {
        let cli = Cli::try_parse_from(["solution", "import", "component", "C1", "plan.yaml"]).expect("parse");

        let Commands::Import { kind, id, .. } = cli.command else {
            panic!("expected import");
        };
        assert_eq!(kind, ResourceKind::Component);
        assert_eq!(id, "C1");
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        assert!(Cli::try_parse_from(["solution", "import", "widget", "X", "plan.yaml"]).is_err());
    }
}
