// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Full refresh: collect, reconcile, validate and publish

use crate::collect::{FieldCollector, SccCounter};
use crate::config::{Settings, ValidationPolicy};
use crate::host::{GitHubClient, RepositoryHost};
use crate::publish::{PublishMode, Publisher};
use crate::reconcile::{reconcile, SystemClock};
use crate::store::{self, ExistingFile};
use crate::types::MetadataDocument;
use crate::validate::validate_document;
use crate::{commands, report};
use anyhow::{anyhow, bail, Context, Result};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Whether `doc` only differs from the file on disk by its refresh timestamp
fn unchanged(existing: &ExistingFile, doc: &MetadataDocument) -> bool {
    if existing.raw == store::render(doc).unwrap_or_default() {
        return true;
    }
    match serde_json::from_value::<MetadataDocument>(existing.value.clone()) {
        Ok(mut previous) => {
            previous.date.metadata_last_updated = doc.date.metadata_last_updated.clone();
            &previous == doc
        }
        Err(_) => false,
    }
}

/// Run the refresh pipeline
pub async fn run(settings: &Settings, json: bool, color: bool) -> Result<()> {
    let manifest = settings.manifest_file();
    if settings.is_validation_only() {
        info!("Validation-only event; checking {}", manifest.display());
        return commands::validate::run(&manifest, json, color).await;
    }

    let repo = settings.repo_slug()?;
    let token = settings
        .token
        .as_deref()
        .ok_or_else(|| anyhow!("No access token; set GITHUB_TOKEN or --token"))?;
    let host: Arc<dyn RepositoryHost> = Arc::new(
        GitHubClient::new(&settings.api_url, token).context("Failed to build API client")?,
    );
    let counter = SccCounter::new(&settings.line_counter);
    let collector =
        FieldCollector::new(host.as_ref(), &repo, &counter, &settings.workspace, settings.labor);

    let (existing, collected) = tokio::join!(store::read_existing(&manifest), collector.collect());
    let collected = collected.context("Failed to collect repository metadata")?;
    let previous = existing.as_ref().map(ExistingFile::document);

    let doc = reconcile(&MetadataDocument::baseline(), previous.as_ref(), &collected, &SystemClock);

    let issues = validate_document(&doc);
    if !issues.is_empty() {
        for issue in &issues {
            warn!("{}", issue);
        }
        if settings.validation_policy == ValidationPolicy::Blocking {
            bail!("Reconciled manifest has {} schema issue(s); not publishing", issues.len());
        }
        warn!("Publishing despite {} schema issue(s)", issues.len());
    }

    let content = store::render(&doc).context("Failed to render manifest")?;

    if let Some(output) = &settings.output {
        store::write_rendered(output, &content).await?;
        println!("Wrote {}", output.display());
        return Ok(());
    }

    if existing.as_ref().is_some_and(|file| unchanged(file, &doc)) {
        println!("{} is up to date", settings.manifest_path);
        return Ok(());
    }

    let mut publisher = Publisher::new(Arc::clone(&host), repo.clone(), settings.manifest_path.clone());
    if let Some(admin_token) = settings.admin_token.as_deref() {
        let admin = GitHubClient::new(&settings.api_url, admin_token)
            .context("Failed to build admin API client")?;
        publisher = publisher.with_admin(Arc::new(admin));
    }

    let target = publisher
        .target_branch(settings.branch.as_deref())
        .await
        .context("Failed to resolve target branch")?;
    let mode = if settings.skip_pr { PublishMode::Direct } else { PublishMode::Propose };
    info!("Publishing {} to {} ({:?})", settings.manifest_path, target, mode);

    match publisher.publish(&content, mode, &target).await {
        Ok(outcome) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&report::outcome_json(&outcome))?);
            } else {
                println!("Published: {outcome}");
            }
            if let Some(path) = &settings.step_output {
                report::write_step_outputs(path, &outcome)?;
            }
        }
        Err(err) if settings.fail_on_publish_error => {
            return Err(err).context("Failed to publish manifest");
        }
        Err(err) => error!("Failed to publish manifest: {}", err),
    }

    Ok(())
}
