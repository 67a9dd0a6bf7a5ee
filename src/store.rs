// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Reading and writing the persisted manifest

use crate::legacy::{normalize, ExistingDocument};
use crate::types::MetadataDocument;
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, warn};

/// A manifest read from disk
#[derive(Debug, Clone, PartialEq)]
pub struct ExistingFile {
    /// File contents exactly as read
    pub raw: String,
    /// Parsed JSON, before normalization
    pub value: Value,
}

impl ExistingFile {
    /// Normalized, leniently typed view of the file
    #[must_use]
    pub fn document(&self) -> ExistingDocument {
        ExistingDocument::from_value(normalize(self.value.clone()))
    }
}

/// Read the persisted manifest.
///
/// A missing, unreadable or malformed file is treated as absent: the
/// reason is logged and `None` is returned.
pub async fn read_existing(path: &Path) -> Option<ExistingFile> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!("No existing manifest at {}", path.display());
            return None;
        }
        Err(err) => {
            warn!("Could not read {}: {}; starting from defaults", path.display(), err);
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Some(ExistingFile { raw, value }),
        Err(err) => {
            warn!("{} is not valid JSON ({}); starting from defaults", path.display(), err);
            None
        }
    }
}

/// Read a manifest as untyped JSON, failing loudly on any problem
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not JSON.
pub async fn read_value(path: &Path) -> Result<Value> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Persisted form: two-space indentation and one trailing newline
///
/// # Errors
///
/// Returns an error if the document cannot be serialized.
pub fn render(doc: &MetadataDocument) -> serde_json::Result<String> {
    let mut out = serde_json::to_string_pretty(doc)?;
    out.push('\n');
    Ok(out)
}

/// Write already rendered manifest content
///
/// # Errors
///
/// Returns an error if the parent directory or file cannot be written.
pub async fn write_rendered(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    tokio::fs::write(path, content)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}
