// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Publisher
//!
//! Delivers a rendered manifest either as a reviewable change proposal or
//! as a direct commit to the target branch. Direct commits need the
//! elevated credential; without it, or when the commit fails, the
//! publisher opens a proposal instead. That fallback is attempted once.

use crate::error::{HostError, PublishError};
use crate::host::{ChangeProposal, FileChange, FileWrite, RepositoryHost};
use crate::reconcile::{Clock, SystemClock};
use crate::types::RepoSlug;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Title of the change proposal
pub const PROPOSAL_TITLE: &str = "Update code.json";

/// Commit message for manifest writes
pub const COMMIT_MESSAGE: &str = "Update code.json metadata";

/// Label applied to change proposals
pub const PROPOSAL_LABEL: &str = "codejson-initialized";

const PROPOSAL_BODY: &str = "\
## Repository metadata update

This change adds or refreshes `code.json`, the machine-readable inventory \
record for this repository.

### What was filled in automatically
- Name, description, URL, visibility and languages from the repository settings
- Fork count, topics and repository dates
- A labor-hour estimate from a line count of the default branch

### What needs a human
Fields such as contact details, licenses, usage type and organization \
cannot be derived automatically. Edit `code.json` on this branch to complete \
them before merging; values you enter are kept on future refreshes.
";

/// How the manifest should reach the repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PublishMode {
    /// Open a change proposal against the target branch
    #[default]
    Propose,
    /// Commit straight to the target branch, falling back to a proposal
    Direct,
}

/// Where the manifest ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// A change proposal was opened
    Proposed {
        /// Proposal URL
        url: String,
    },
    /// The manifest was committed to the target branch
    Committed {
        /// New commit sha
        commit_sha: String,
        /// Branch written
        branch: String,
    },
}

impl fmt::Display for PublishOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Proposed { url } => write!(f, "opened pull request {url}"),
            Self::Committed { commit_sha, branch } => {
                write!(f, "committed {commit_sha} to {branch}")
            }
        }
    }
}

/// Publishes manifests for one repository
pub struct Publisher {
    host: Arc<dyn RepositoryHost>,
    admin: Option<Arc<dyn RepositoryHost>>,
    repo: RepoSlug,
    path: String,
    clock: Arc<dyn Clock>,
}

impl Publisher {
    /// Publisher writing `path` in `repo` through `host`
    pub fn new(host: Arc<dyn RepositoryHost>, repo: RepoSlug, path: impl Into<String>) -> Self {
        Self {
            host,
            admin: None,
            repo,
            path: path.into(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Host authenticated with the elevated credential, enabling direct commits
    #[must_use]
    pub fn with_admin(mut self, admin: Arc<dyn RepositoryHost>) -> Self {
        self.admin = Some(admin);
        self
    }

    /// Clock used to name proposal branches
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The explicit branch if given, otherwise the repository default
    ///
    /// # Errors
    ///
    /// Fails when the default branch cannot be looked up.
    pub async fn target_branch(&self, explicit: Option<&str>) -> Result<String, HostError> {
        match explicit.map(str::trim).filter(|b| !b.is_empty()) {
            Some(branch) => Ok(branch.to_string()),
            None => self.host.default_branch(&self.repo).await,
        }
    }

    /// Open a change proposal carrying `content` against `base`
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::Proposal`] if any step of opening it fails.
    pub async fn propose(&self, content: &str, base: &str) -> Result<PublishOutcome, PublishError> {
        let proposal = ChangeProposal {
            title: PROPOSAL_TITLE.to_string(),
            body: PROPOSAL_BODY.to_string(),
            base: base.to_string(),
            head: format!("code-json-{}", self.clock.now().timestamp_millis()),
            files: vec![FileChange { path: self.path.clone(), content: content.to_string() }],
            commit_message: COMMIT_MESSAGE.to_string(),
            labels: vec![PROPOSAL_LABEL.to_string()],
        };
        let receipt = self
            .host
            .create_change_proposal(&self.repo, &proposal)
            .await
            .map_err(PublishError::Proposal)?;
        info!("Opened pull request #{}: {}", receipt.number, receipt.url);
        Ok(PublishOutcome::Proposed { url: receipt.url })
    }

    /// Commit `content` straight to `target`.
    ///
    /// Uses the elevated credential when configured. An existing file is
    /// replaced only if it is unchanged since its sha was read.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::Commit`] on any failure, including a
    /// concurrent modification.
    pub async fn commit_direct(
        &self,
        content: &str,
        target: &str,
    ) -> Result<PublishOutcome, PublishError> {
        let host = self.admin.as_ref().unwrap_or(&self.host);
        let sha = host
            .file_sha(&self.repo, &self.path, target)
            .await
            .map_err(PublishError::Commit)?;
        let write = FileWrite {
            path: self.path.clone(),
            message: COMMIT_MESSAGE.to_string(),
            content: content.to_string(),
            branch: target.to_string(),
            sha,
        };
        let commit_sha = host
            .create_or_update_file(&self.repo, &write)
            .await
            .map_err(PublishError::Commit)?;
        info!("Committed {} to {} ({})", self.path, target, commit_sha);
        Ok(PublishOutcome::Committed { commit_sha, branch: target.to_string() })
    }

    /// Publish according to `mode`
    ///
    /// # Errors
    ///
    /// Returns the proposal failure, or [`PublishError::Fallback`] when both
    /// the direct commit and the fallback proposal failed.
    pub async fn publish(
        &self,
        content: &str,
        mode: PublishMode,
        target: &str,
    ) -> Result<PublishOutcome, PublishError> {
        match mode {
            PublishMode::Propose => self.propose(content, target).await,
            PublishMode::Direct if self.admin.is_none() => {
                warn!("Direct commit requested but no admin token is configured");
                warn!("Direct commits need a token with write access to {}", target);
                info!("Falling back to pull request creation");
                self.propose(content, target).await
            }
            PublishMode::Direct => match self.commit_direct(content, target).await {
                Ok(outcome) => Ok(outcome),
                Err(PublishError::Commit(commit)) => {
                    warn!("Direct commit failed: {}; opening a pull request instead", commit);
                    match self.propose(content, target).await {
                        Err(PublishError::Proposal(proposal)) => {
                            Err(PublishError::Fallback { commit, proposal })
                        }
                        other => other,
                    }
                }
                Err(err) => Err(err),
            },
        }
    }
}
