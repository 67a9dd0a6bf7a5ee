// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Validation-only mode

use crate::report;
use crate::store;
use crate::validate::validate;
use anyhow::{bail, Result};
use std::path::Path;

/// Validate a manifest on disk; fails when any issue is found
pub async fn run(path: &Path, json: bool, color: bool) -> Result<()> {
    let value = store::read_value(path).await?;
    let issues = validate(&value);

    if json {
        println!("{}", report::issues_json(&issues)?);
    } else {
        print!("{}", report::render_issues(&path.display().to_string(), &issues, color));
    }

    if !issues.is_empty() {
        bail!("{} failed validation with {} issue(s)", path.display(), issues.len());
    }
    Ok(())
}
