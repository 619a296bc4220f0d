//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use serde::Serialize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::config::ValidationResult;
use crate::diff::Summary;
use crate::error::{ManifestDiffError, Result};
use crate::manifest::{Fingerprinter, ParseReport, Resource};
use crate::workflow::{SnapshotReport, WorkflowReport};

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Change row for table display.
#[derive(Tabled)]
struct ChangeRow {
    #[tabled(rename = "Change")]
    change: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Namespace")]
    namespace: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Fingerprint")]
    fingerprint: String,
}

/// Resource row for table display.
#[derive(Tabled)]
struct ResourceRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "API Version")]
    api_version: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Namespace")]
    namespace: String,
    #[tabled(rename = "Name")]
    name: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats the outcome of a full diff run.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn format_report(&self, report: &WorkflowReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(report),
            OutputFormat::Text => {
                let mut output = String::new();
                let _ = writeln!(
                    output,
                    "\n📋 Resource diff ({})",
                    report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
                );
                Self::write_snapshot(&mut output, &report.base);
                Self::write_snapshot(&mut output, &report.head);
                output.push('\n');
                output.push_str(&Self::format_summary_text(&report.summary));
                Ok(output)
            }
        }
    }

    /// Formats a summary for display.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn format_summary(&self, summary: &Summary) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(summary),
            OutputFormat::Text => Ok(Self::format_summary_text(summary)),
        }
    }

    /// Formats a summary as text.
    fn format_summary_text(summary: &Summary) -> String {
        let mut output = String::new();

        if summary.is_empty() {
            let _ = writeln!(
                output,
                "{} No resource changes ({} unchanged).",
                "✓".green(),
                summary.unchanged
            );
        } else {
            let fingerprinter = Fingerprinter::new();
            let mut rows: Vec<ChangeRow> = Vec::with_capacity(summary.total_changes());

            rows.extend(summary.added.iter().map(|r| {
                Self::change_row("+added".green().to_string(), r, String::new())
            }));
            rows.extend(summary.modified.iter().map(|m| {
                let fingerprint = format!(
                    "{} -> {}",
                    fingerprinter.short(&m.before_fingerprint),
                    fingerprinter.short(&m.after_fingerprint)
                );
                Self::change_row("~modified".yellow().to_string(), &m.after, fingerprint)
            }));
            rows.extend(summary.removed.iter().map(|r| {
                Self::change_row("-removed".red().to_string(), r, String::new())
            }));

            output.push_str(&Table::new(rows).to_string());
            output.push('\n');

            let _ = write!(
                output,
                "\nSummary: {} added, {} modified, {} removed ({} unchanged)\n",
                summary.added.len().to_string().green(),
                summary.modified.len().to_string().yellow(),
                summary.removed.len().to_string().red(),
                summary.unchanged
            );
        }

        if !summary.duplicates.is_empty() {
            let _ = write!(
                output,
                "\n{} Duplicate identities (matched against the first occurrence):\n",
                "⚠".yellow()
            );
            for duplicate in &summary.duplicates {
                let _ = writeln!(output, "   - {}: {}", duplicate.side, duplicate.resource);
            }
        }

        output
    }

    /// Formats the resources decoded from one stream.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn format_resources(&self, report: &ParseReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(&ResourcesJson::from(report)),
            OutputFormat::Text => {
                let mut output = String::new();

                if report.resources.is_empty() {
                    output.push_str("   No resources decoded.\n");
                } else {
                    let rows: Vec<ResourceRow> = report
                        .resources
                        .iter()
                        .enumerate()
                        .map(|(i, r)| ResourceRow {
                            index: i + 1,
                            api_version: r.gvk().api_version(),
                            kind: r.kind().to_string(),
                            namespace: r.namespace().unwrap_or("-").to_string(),
                            name: r.name().to_string(),
                        })
                        .collect();
                    output.push_str(&Table::new(rows).to_string());
                    output.push('\n');
                }

                let _ = writeln!(
                    output,
                    "\n{} resource(s) from {} document(s), {} skipped",
                    report.resources.len(),
                    report.documents,
                    report.skipped
                );
                Ok(output)
            }
        }
    }

    /// Formats a validation result.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn format_validation(
        &self,
        result: &ValidationResult,
        show_warnings: bool,
    ) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(&ValidationJson::from(result)),
            OutputFormat::Text => {
                let mut output = if result.is_valid() {
                    format!("{} Configuration is valid.\n", "✓".green())
                } else {
                    let mut output = format!("{} Configuration is invalid:\n", "✗".red());
                    for error in &result.errors {
                        let _ = writeln!(output, "   - {error}");
                    }
                    output
                };

                if show_warnings && !result.warnings.is_empty() {
                    let _ = write!(output, "\n{} Warnings:\n", "⚠".yellow());
                    for warning in &result.warnings {
                        let _ = writeln!(output, "   - {warning}");
                    }
                }

                Ok(output)
            }
        }
    }

    fn write_snapshot(output: &mut String, snapshot: &SnapshotReport) {
        let _ = writeln!(
            output,
            "   {:<5} {} @ {} ({} documents, {} skipped)",
            snapshot.side.to_string(),
            snapshot.reference,
            Self::truncate(&snapshot.revision, 12),
            snapshot.documents,
            snapshot.skipped
        );
    }

    fn change_row(change: String, resource: &Resource, fingerprint: String) -> ChangeRow {
        ChangeRow {
            change,
            kind: resource.kind().to_string(),
            namespace: resource.namespace().unwrap_or("-").to_string(),
            name: resource.name().to_string(),
            fingerprint,
        }
    }

    /// Truncates a string to a maximum number of characters.
    fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else {
            s.chars().take(max_len).collect()
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ManifestDiffError::internal(format!("cannot serialize output: {e}")))
}

// JSON serialization helpers

#[derive(Serialize)]
struct ResourcesJson<'a> {
    documents: usize,
    skipped: usize,
    resources: Vec<ResourceJson<'a>>,
}

#[derive(Serialize)]
struct ResourceJson<'a> {
    api_version: String,
    kind: &'a str,
    namespace: Option<&'a str>,
    name: &'a str,
}

#[derive(Serialize)]
struct ValidationJson<'a> {
    valid: bool,
    errors: Vec<ValidationErrorJson<'a>>,
    warnings: &'a [String],
}

#[derive(Serialize)]
struct ValidationErrorJson<'a> {
    field: &'a str,
    message: &'a str,
}

impl<'a> From<&'a ParseReport> for ResourcesJson<'a> {
    fn from(report: &'a ParseReport) -> Self {
        Self {
            documents: report.documents,
            skipped: report.skipped,
            resources: report
                .resources
                .iter()
                .map(|r| ResourceJson {
                    api_version: r.gvk().api_version(),
                    kind: r.kind(),
                    namespace: r.namespace(),
                    name: r.name(),
                })
                .collect(),
        }
    }
}

impl<'a> From<&'a ValidationResult> for ValidationJson<'a> {
    fn from(result: &'a ValidationResult) -> Self {
        Self {
            valid: result.is_valid(),
            errors: result
                .errors
                .iter()
                .map(|e| ValidationErrorJson {
                    field: &e.field,
                    message: &e.message,
                })
                .collect(),
            warnings: &result.warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::DiffEngine;
    use crate::error::Side;
    use crate::manifest::ManifestParser;

    const BASE: &str = r"
apiVersion: v1
kind: ConfigMap
metadata: {name: settings, namespace: shop}
data: {mode: slow}
---
apiVersion: v1
kind: Service
metadata: {name: legacy, namespace: shop}
";

    const HEAD: &str = r"
apiVersion: v1
kind: ConfigMap
metadata: {name: settings, namespace: shop}
data: {mode: fast}
---
apiVersion: v1
kind: Namespace
metadata: {name: shop}
";

    fn summary() -> Summary {
        let parser = ManifestParser::default();
        DiffEngine::new()
            .compute(&parser.parse(BASE).unwrap(), &parser.parse(HEAD).unwrap())
            .unwrap()
    }

    #[test]
    fn test_text_summary_lists_changes() {
        let output = OutputFormatter::new(OutputFormat::Text)
            .format_summary(&summary())
            .unwrap();

        assert!(output.contains("settings"));
        assert!(output.contains("legacy"));
        assert!(output.contains("Namespace"));
        assert!(output.contains("->"));
    }

    #[test]
    fn test_text_summary_without_changes() {
        let output = OutputFormatter::new(OutputFormat::Text)
            .format_summary(&Summary::default())
            .unwrap();
        assert!(output.contains("No resource changes"));
    }

    #[test]
    fn test_json_summary() {
        let output = OutputFormatter::new(OutputFormat::Json)
            .format_summary(&summary())
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(json["added"].as_array().unwrap().len(), 1);
        assert_eq!(json["removed"][0]["name"], "legacy");
        assert_eq!(json["modified"][0]["after"]["payload"]["data"]["mode"], "fast");
        assert_eq!(json["unchanged"], 0);
    }

    #[test]
    fn test_json_resources() {
        let report = ManifestParser::default().parse_report(HEAD).unwrap();
        let output = OutputFormatter::new(OutputFormat::Json)
            .format_resources(&report)
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(json["documents"], 2);
        assert_eq!(json["resources"][1]["kind"], "Namespace");
        assert!(json["resources"][1]["namespace"].is_null());
    }

    #[test]
    fn test_report_shows_both_snapshots() {
        let snapshot = |side, reference: &str, revision: &str| SnapshotReport {
            side,
            reference: reference.to_string(),
            revision: revision.to_string(),
            documents: 2,
            skipped: 0,
        };
        let report = WorkflowReport {
            base: snapshot(Side::Base, "origin/main", "0123456789abcdef0123"),
            head: snapshot(Side::Head, "feature", "fedcba9876543210fedc"),
            summary: summary(),
            generated_at: chrono::Utc::now(),
        };

        let text = OutputFormatter::new(OutputFormat::Text)
            .format_report(&report)
            .unwrap();
        assert!(text.contains("origin/main @ 0123456789ab"));
        assert!(text.contains("feature @ fedcba987654"));
        assert!(text.contains("legacy"));

        let json = OutputFormatter::new(OutputFormat::Json)
            .format_report(&report)
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(json["base"]["side"], "base");
        assert_eq!(json["head"]["revision"], "fedcba9876543210fedc");
        assert_eq!(json["summary"]["removed"][0]["name"], "legacy");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(OutputFormatter::truncate("0123456789abcdef", 12), "0123456789ab");
        assert_eq!(OutputFormatter::truncate("short", 12), "short");
    }
}
