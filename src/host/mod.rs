// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Repository hosting API boundary
//!
//! Collection and publishing only talk to the host through
//! [`RepositoryHost`], so tests can substitute an in-memory host.

pub mod github;

use crate::error::HostError;
use crate::types::RepoSlug;
use async_trait::async_trait;

pub use github::GitHubClient;

/// Repository facts reported by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryMetadata {
    /// Repository name
    pub name: String,
    /// Description, if one is set
    pub description: Option<String>,
    /// Web URL
    pub html_url: String,
    /// Whether the repository is private
    pub private: bool,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
    /// Topics, as entered
    pub topics: Vec<String>,
    /// Fork count
    pub forks_count: u64,
    /// Default branch name
    pub default_branch: String,
}

/// Bytes of source per language
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageBytes {
    /// Language name
    pub name: String,
    /// Bytes of code
    pub bytes: u64,
}

/// A file to write as part of a change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    /// Repository-relative path
    pub path: String,
    /// Full UTF-8 content
    pub content: String,
}

/// A reviewable change set against a base branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeProposal {
    /// Proposal title
    pub title: String,
    /// Proposal description (markdown)
    pub body: String,
    /// Branch the change targets
    pub base: String,
    /// Branch created to carry the change
    pub head: String,
    /// Files written on the head branch
    pub files: Vec<FileChange>,
    /// Commit message for the file writes
    pub commit_message: String,
    /// Labels applied to the proposal
    pub labels: Vec<String>,
}

/// Result of opening a proposal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposalReceipt {
    /// Web URL of the proposal
    pub url: String,
    /// Proposal number
    pub number: u64,
}

/// A single-file commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileWrite {
    /// Repository-relative path
    pub path: String,
    /// Commit message
    pub message: String,
    /// Full UTF-8 content
    pub content: String,
    /// Branch to commit to
    pub branch: String,
    /// Blob sha of the entry being replaced; the write fails if the entry
    /// changed since it was read
    pub sha: Option<String>,
}

/// Operations consumed from the repository host
#[async_trait]
pub trait RepositoryHost: Send + Sync {
    /// Repository facts
    async fn repository_metadata(&self, repo: &RepoSlug) -> Result<RepositoryMetadata, HostError>;

    /// Languages ordered by byte count, largest first
    async fn repository_languages(&self, repo: &RepoSlug) -> Result<Vec<LanguageBytes>, HostError>;

    /// Name of the default branch
    async fn default_branch(&self, repo: &RepoSlug) -> Result<String, HostError>;

    /// Create `head` from `base`, write the files on it and open a proposal
    async fn create_change_proposal(
        &self,
        repo: &RepoSlug,
        proposal: &ChangeProposal,
    ) -> Result<ProposalReceipt, HostError>;

    /// Blob sha of a file at a ref, `None` when the file does not exist
    async fn file_sha(
        &self,
        repo: &RepoSlug,
        path: &str,
        git_ref: &str,
    ) -> Result<Option<String>, HostError>;

    /// Create or replace a file, returning the commit sha
    async fn create_or_update_file(
        &self,
        repo: &RepoSlug,
        write: &FileWrite,
    ) -> Result<String, HostError>;
}
