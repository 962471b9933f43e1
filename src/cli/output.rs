//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use serde::Serialize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::error::{Result, SolutionError};
use crate::model::ResourceKind;
use crate::reconciler::{ApplySummary, PlanEntry, PlanReport, PlannedChange};

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Plan entry row for table display.
#[derive(Tabled)]
struct PlanEntryRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Change")]
    change: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Resource")]
    resource: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a plan report for display.
    ///
    /// # Errors
    ///
    /// Returns an error if the report cannot be encoded as JSON.
    pub fn format_plan(&self, report: &PlanReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => Self::json(report),
            OutputFormat::Text => Ok(Self::format_plan_text(report)),
        }
    }

    fn json(value: &impl Serialize) -> Result<String> {
        serde_json::to_string_pretty(value)
            .map_err(|e| SolutionError::internal(format!("Failed to encode JSON output: {e}")))
    }

    fn format_plan_text(report: &PlanReport) -> String {
        if !report.has_changes() {
            return format!("{} No changes required - the engine matches the plan.\n", "✓".green());
        }

        let mut output = String::new();
        let _ = write!(output, "\nPlan\n   Fingerprint: {}\n\n", Self::short(&report.fingerprint));

        let rows: Vec<PlanEntryRow> = report
            .entries
            .iter()
            .filter(|e| e.change != PlannedChange::NoChange)
            .enumerate()
            .map(|(i, e)| PlanEntryRow {
                index: i + 1,
                change: Self::format_change(&e.change),
                kind: e.kind.to_string(),
                resource: Self::resource_label(e),
            })
            .collect();

        output.push_str(&Table::new(rows).to_string());
        output.push('\n');

        for entry in &report.entries {
            if let PlannedChange::Update(diff) = &entry.change {
                let _ = write!(output, "\n{diff}");
                if !diff.to_string().ends_with('\n') {
                    output.push('\n');
                }
            }
        }

        let _ = write!(
            output,
            "\nPlan: {} to create, {} to update, {} to destroy, {} unchanged\n",
            report.creates().to_string().green(),
            report.updates().to_string().yellow(),
            report.deletes().to_string().red(),
            report.unchanged()
        );

        output
    }

    /// Formats the counts of an apply or destroy.
    ///
    /// # Errors
    ///
    /// Returns an error if the summary cannot be encoded as JSON.
    pub fn format_summary(&self, operation: &str, summary: &ApplySummary) -> Result<String> {
        match self.format {
            OutputFormat::Json => Self::json(&serde_json::json!({ "operation": operation, "summary": summary })),
            OutputFormat::Text => {
                let mut output = format!("{} {operation} complete\n\n", "✓".green());
                let _ = writeln!(output, "   Created: {}", summary.created);
                let _ = writeln!(output, "   Updated: {}", summary.updated);
                let _ = writeln!(output, "   Accepted from remote: {}", summary.accepted);
                let _ = writeln!(output, "   Deleted: {}", summary.deleted);
                let _ = writeln!(output, "   Unchanged: {}", summary.unchanged);
                if summary.skipped > 0 {
                    let _ = writeln!(output, "   Skipped: {}", summary.skipped.to_string().yellow());
                }
                Ok(output)
            }
        }
    }

    /// Formats the result of an import.
    ///
    /// # Errors
    ///
    /// Returns an error if the result cannot be encoded as JSON.
    pub fn format_import(&self, kind: ResourceKind, id: &str, imported: bool) -> Result<String> {
        match self.format {
            OutputFormat::Json => Self::json(&serde_json::json!({ "kind": kind, "id": id, "imported": imported })),
            OutputFormat::Text if imported => Ok(format!("{} Imported {kind} {id}\n", "✓".green())),
            OutputFormat::Text => Ok(format!("{} {kind} {id} is already tracked\n", "⚠".yellow())),
        }
    }

    fn format_change(change: &PlannedChange) -> String {
        match change {
            PlannedChange::Create => "+create".green().to_string(),
            PlannedChange::MissingRemotely => "+recreate".green().to_string(),
            PlannedChange::Update(_) => "~update".yellow().to_string(),
            PlannedChange::Delete => "-delete".red().to_string(),
            PlannedChange::NoChange => "noop".dimmed().to_string(),
        }
    }

    fn resource_label(entry: &PlanEntry) -> String {
        let mut label = entry
            .component
            .as_ref()
            .map_or_else(|| entry.name.clone(), |c| format!("{c}/{}", entry.name));
        if entry.imported {
            label.push_str(" (imported)");
        }
        label
    }

    fn short(fingerprint: &str) -> &str {
        fingerprint.get(..12).unwrap_or(fingerprint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, change: PlannedChange) -> PlanEntry {
        PlanEntry {
            kind: ResourceKind::Asset,
            name: name.to_string(),
            component: None,
            imported: false,
            change,
            body: None,
        }
    }

    #[test]
    fn test_empty_plan_text() {
        let report = PlanReport {
            fingerprint: String::from("abc"),
            entries: vec![entry("Tank1", PlannedChange::NoChange)],
        };

        let output = OutputFormatter::new(OutputFormat::Text).format_plan(&report).expect("format");
        assert!(output.contains("No changes required"));
    }

    #[test]
    fn test_plan_json_carries_changes() {
        let report = PlanReport {
            fingerprint: String::from("abc"),
            entries: vec![entry("Tank1", PlannedChange::Create)],
        };

        let output = OutputFormatter::new(OutputFormat::Json).format_plan(&report).expect("format");
        let json: serde_json::Value = serde_json::from_str(&output).expect("json");
        assert_eq!(json["entries"][0]["change"]["change"], "create");
        assert_eq!(json["entries"][0]["kind"], "asset");
    }

    #[test]
    fn test_summary_json() {
        let summary = ApplySummary {
            created: 2,
            ..ApplySummary::default()
        };

        let output = OutputFormatter::new(OutputFormat::Json)
            .format_summary("apply", &summary)
            .expect("format");
        let json: serde_json::Value = serde_json::from_str(&output).expect("json");
        assert_eq!(json["summary"]["created"], 2);
    }

    #[test]
    fn test_import_json() {
        let output = OutputFormatter::new(OutputFormat::Json)
            .format_import(ResourceKind::Alert, "L1", true)
            .expect("format");
        let json: serde_json::Value = serde_json::from_str(&output).expect("json");
        assert_eq!(json["kind"], "alert");
        assert_eq!(json["imported"], true);
    }
}
