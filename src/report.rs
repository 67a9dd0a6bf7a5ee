// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Rendering of validation results and CI step outputs

use crate::publish::PublishOutcome;
use crate::types::ValidationIssue;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::Path;

/// Machine-readable validation report
#[derive(Debug, Serialize)]
pub struct ValidationReport<'a> {
    /// Whether the document passed
    pub valid: bool,
    /// Every issue found, in discovery order
    pub issues: &'a [ValidationIssue],
}

/// Human-readable issue list, one issue per line
#[must_use]
pub fn render_issues(source: &str, issues: &[ValidationIssue], color: bool) -> String {
    let mut out = String::new();
    if issues.is_empty() {
        let line = format!("{source} is valid");
        let _ = writeln!(out, "{}", if color { line.green().to_string() } else { line });
        return out;
    }

    let heading = format!("{source}: {} issue(s)", issues.len());
    let _ = writeln!(out, "{}", if color { heading.red().bold().to_string() } else { heading });
    for issue in issues {
        let field = if issue.path.is_empty() { "root" } else { issue.path.as_str() };
        if color {
            let _ = writeln!(out, "  {} {}", field.yellow(), issue.message);
        } else {
            let _ = writeln!(out, "  {field}: {}", issue.message);
        }
    }
    out
}

/// JSON form of a validation run
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn issues_json(issues: &[ValidationIssue]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&ValidationReport { valid: issues.is_empty(), issues })
}

/// `key=value` lines describing a publish outcome
#[must_use]
pub fn step_outputs(outcome: &PublishOutcome) -> String {
    match outcome {
        PublishOutcome::Proposed { url } => format!("updated=true\npr_url={url}\n"),
        PublishOutcome::Committed { commit_sha, .. } => {
            format!("updated=true\ncommit_sha={commit_sha}\n")
        }
    }
}

/// JSON form of a publish outcome
#[must_use]
pub fn outcome_json(outcome: &PublishOutcome) -> Value {
    match outcome {
        PublishOutcome::Proposed { url } => json!({ "updated": true, "pr_url": url }),
        PublishOutcome::Committed { commit_sha, branch } => {
            json!({ "updated": true, "commit_sha": commit_sha, "branch": branch })
        }
    }
}

/// Append outcome lines to the CI step output file
///
/// # Errors
///
/// Returns an error if the file cannot be opened or written.
pub fn write_step_outputs(path: &Path, outcome: &PublishOutcome) -> Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open step output file {}", path.display()))?;
    file.write_all(step_outputs(outcome).as_bytes())
        .with_context(|| format!("Failed to write step output file {}", path.display()))
}
