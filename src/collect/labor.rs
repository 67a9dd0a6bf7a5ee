// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Line counting and labor-hour estimation
//!
//! The counter produces a [`LineCountReport`]; a [`LaborEstimator`] turns
//! it into hours. Estimators are selected by configuration.

use crate::error::CollectError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Hours in an average month of continuous work
pub const HOURS_PER_MONTH: f64 = 730.001;

/// Summary produced by a line counter
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LineCountReport {
    /// COCOMO schedule estimate in months
    pub schedule_months: f64,
    /// COCOMO staffing estimate
    pub people: f64,
    /// Total lines of code across all languages
    pub code_lines: u64,
}

/// Something that can count the code under a directory
#[async_trait]
pub trait LineCounter: Send + Sync {
    /// Count the code under `path`
    async fn count(&self, path: &Path) -> Result<LineCountReport, CollectError>;
}

/// Runs `scc --format json2`
#[derive(Debug, Clone)]
pub struct SccCounter {
    program: PathBuf,
}

impl SccCounter {
    /// Counter invoking `program`
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into() }
    }
}

impl Default for SccCounter {
    fn default() -> Self {
        Self::new("scc")
    }
}

#[derive(Debug, Deserialize)]
struct SccReport {
    #[serde(rename = "languageSummary", default)]
    language_summary: Vec<SccLanguage>,
    #[serde(rename = "estimatedScheduleMonths")]
    estimated_schedule_months: f64,
    #[serde(rename = "estimatedPeople", default)]
    estimated_people: f64,
}

#[derive(Debug, Deserialize)]
struct SccLanguage {
    #[serde(rename = "Code", default)]
    code: u64,
}

/// Parse `scc --format json2` output
///
/// # Errors
///
/// Returns [`CollectError::Report`] when the output is not a json2 report.
pub fn parse_scc_report(stdout: &str) -> Result<LineCountReport, CollectError> {
    let report: SccReport =
        serde_json::from_str(stdout).map_err(|err| CollectError::Report(err.to_string()))?;
    Ok(LineCountReport {
        schedule_months: report.estimated_schedule_months,
        people: report.estimated_people,
        code_lines: report.language_summary.iter().map(|lang| lang.code).sum(),
    })
}

#[async_trait]
impl LineCounter for SccCounter {
    async fn count(&self, path: &Path) -> Result<LineCountReport, CollectError> {
        let program = self.program.display().to_string();
        debug!("Running {} on {}", program, path.display());

        let output = Command::new(&self.program)
            .arg(path)
            .args(["--format", "json2"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|err| CollectError::Spawn { program, message: err.to_string() })?;

        if !output.status.success() {
            return Err(CollectError::Exit {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8(output.stdout)
            .map_err(|err| CollectError::Report(format!("stdout is not UTF-8: {err}")))?;
        parse_scc_report(&stdout)
    }
}

/// Formula turning a line-count report into labor hours
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LaborEstimator {
    /// `ceil(schedule_months * hours_per_month)`
    ScheduleMonths {
        /// Hours per month
        #[serde(default = "default_hours_per_month")]
        hours_per_month: f64,
    },
    /// `ceil(coefficient * KLOC^exponent * hours_per_month)`
    Cocomo {
        /// Effort coefficient
        #[serde(default = "default_coefficient")]
        coefficient: f64,
        /// Scale exponent
        #[serde(default = "default_exponent")]
        exponent: f64,
        /// Hours per month
        #[serde(default = "default_hours_per_month")]
        hours_per_month: f64,
    },
    /// `ceil(hours_per_root_line * sqrt(lines))`
    SquareRoot {
        /// Scale factor
        hours_per_root_line: f64,
    },
}

fn default_hours_per_month() -> f64 {
    HOURS_PER_MONTH
}

fn default_coefficient() -> f64 {
    2.4
}

fn default_exponent() -> f64 {
    1.05
}

impl Default for LaborEstimator {
    fn default() -> Self {
        Self::ScheduleMonths { hours_per_month: HOURS_PER_MONTH }
    }
}

impl LaborEstimator {
    /// Estimated hours, a non-negative whole number
    #[must_use]
    pub fn estimate(&self, report: &LineCountReport) -> f64 {
        let raw = match *self {
            Self::ScheduleMonths { hours_per_month } => report.schedule_months * hours_per_month,
            Self::Cocomo { coefficient, exponent, hours_per_month } => {
                let kloc = report.code_lines as f64 / 1000.0;
                coefficient * kloc.powf(exponent) * hours_per_month
            }
            Self::SquareRoot { hours_per_root_line } => {
                hours_per_root_line * (report.code_lines as f64).sqrt()
            }
        };
        let hours = raw.ceil();
        if hours.is_finite() && hours > 0.0 {
            hours
        } else {
            0.0
        }
    }
}
