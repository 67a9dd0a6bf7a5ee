// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Field Collector
//!
//! Gathers the automatically derived manifest fields from the repository
//! host and the local line counter. Either source failing fails the whole
//! collection; partial results are never handed to the reconciler.

pub mod labor;

use crate::error::CollectError;
use crate::host::RepositoryHost;
use crate::reconcile::CollectedFields;
use crate::types::{RepoSlug, Visibility};
use std::path::Path;
use tracing::{debug, info};

pub use labor::{LaborEstimator, LineCountReport, LineCounter, SccCounter};

/// Repository facts mapped onto manifest fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicInfo {
    /// Repository name
    pub title: String,
    /// Description, empty when unset
    pub description: String,
    /// Web URL
    pub url: String,
    /// Visibility derived from the private flag
    pub visibility: Visibility,
    /// Languages, most bytes first
    pub languages: Vec<String>,
    /// Fork count
    pub forks: u64,
    /// Non-blank topics
    pub tags: Vec<String>,
    /// Creation timestamp
    pub created: String,
    /// Last update timestamp
    pub last_modified: String,
}

/// Collects fresh values for one repository
pub struct FieldCollector<'a> {
    host: &'a dyn RepositoryHost,
    repo: &'a RepoSlug,
    counter: &'a dyn LineCounter,
    workspace: &'a Path,
    estimator: LaborEstimator,
}

impl<'a> FieldCollector<'a> {
    /// Collector for `repo`, counting lines under `workspace`
    pub fn new(
        host: &'a dyn RepositoryHost,
        repo: &'a RepoSlug,
        counter: &'a dyn LineCounter,
        workspace: &'a Path,
        estimator: LaborEstimator,
    ) -> Self {
        Self { host, repo, counter, workspace, estimator }
    }

    /// Repository metadata and languages
    ///
    /// # Errors
    ///
    /// Fails when either hosting call fails.
    pub async fn collect_basic_info(&self) -> Result<BasicInfo, CollectError> {
        let (metadata, languages) = tokio::try_join!(
            self.host.repository_metadata(self.repo),
            self.host.repository_languages(self.repo),
        )?;
        debug!("Fetched metadata for {} ({} languages)", self.repo, languages.len());

        Ok(BasicInfo {
            title: metadata.name,
            description: metadata.description.unwrap_or_default(),
            url: metadata.html_url,
            visibility: Visibility::from_private_flag(metadata.private),
            languages: languages.into_iter().map(|lang| lang.name).collect(),
            forks: metadata.forks_count,
            tags: metadata
                .topics
                .into_iter()
                .filter(|topic| !topic.trim().is_empty())
                .collect(),
            created: metadata.created_at,
            last_modified: metadata.updated_at,
        })
    }

    /// Labor-hour estimate for the workspace
    ///
    /// # Errors
    ///
    /// Fails when the line counter cannot run or its report is unreadable.
    pub async fn collect_labor_hours(&self) -> Result<f64, CollectError> {
        let report = self.counter.count(self.workspace).await?;
        let hours = self.estimator.estimate(&report);
        debug!("Estimated {} labor hours from {:?}", hours, report);
        Ok(hours)
    }

    /// All collected fields, or the first failure
    ///
    /// # Errors
    ///
    /// Propagates the first failure from either source.
    pub async fn collect(&self) -> Result<CollectedFields, CollectError> {
        let (info, labor_hours) =
            tokio::try_join!(self.collect_basic_info(), self.collect_labor_hours())?;
        info!("Collected metadata for {}", self.repo);

        Ok(CollectedFields {
            name: info.title,
            description: info.description,
            repository_url: info.url,
            repository_visibility: info.visibility,
            labor_hours,
            languages: info.languages,
            forks: Some(info.forks),
            tags: info.tags,
            created: Some(info.created),
            last_modified: Some(info.last_modified),
            metadata_last_updated: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HostError;
    use crate::host::{
        ChangeProposal, FileWrite, LanguageBytes, ProposalReceipt, RepositoryMetadata,
    };
    use async_trait::async_trait;

    struct StaticHost {
        fail_languages: bool,
    }

    #[async_trait]
    impl RepositoryHost for StaticHost {
        async fn repository_metadata(&self, _: &RepoSlug) -> Result<RepositoryMetadata, HostError> {
            Ok(RepositoryMetadata {
                name: "widget".to_string(),
                description: None,
                html_url: "https://github.com/acme/widget".to_string(),
                private: true,
                created_at: "2020-01-01T00:00:00Z".to_string(),
                updated_at: "2024-05-01T00:00:00Z".to_string(),
                topics: vec!["cli".to_string(), "  ".to_string(), String::new(), "rust".to_string()],
                forks_count: 7,
                default_branch: "main".to_string(),
            })
        }

        async fn repository_languages(&self, _: &RepoSlug) -> Result<Vec<LanguageBytes>, HostError> {
            if self.fail_languages {
                return Err(HostError::Status { status: 500, message: "boom".to_string() });
            }
            Ok(vec![
                LanguageBytes { name: "Rust".to_string(), bytes: 900 },
                LanguageBytes { name: "Shell".to_string(), bytes: 20 },
            ])
        }

        async fn default_branch(&self, _: &RepoSlug) -> Result<String, HostError> {
            Ok("main".to_string())
        }

        async fn create_change_proposal(
            &self,
            _: &RepoSlug,
            _: &ChangeProposal,
        ) -> Result<ProposalReceipt, HostError> {
            unreachable!("collector never publishes")
        }

        async fn file_sha(&self, _: &RepoSlug, _: &str, _: &str) -> Result<Option<String>, HostError> {
            Ok(None)
        }

        async fn create_or_update_file(&self, _: &RepoSlug, _: &FileWrite) -> Result<String, HostError> {
            unreachable!("collector never publishes")
        }
    }

    struct FixedCounter(Option<LineCountReport>);

    #[async_trait]
    impl LineCounter for FixedCounter {
        async fn count(&self, _: &Path) -> Result<LineCountReport, CollectError> {
            self.0.ok_or_else(|| CollectError::Report("no output".to_string()))
        }
    }

    fn report() -> LineCountReport {
        LineCountReport { schedule_months: 1.0, people: 1.0, code_lines: 100 }
    }

    #[tokio::test]
    async fn test_collect_maps_host_fields() {
        let host = StaticHost { fail_languages: false };
        let repo = RepoSlug::new("acme", "widget");
        let counter = FixedCounter(Some(report()));
        let collector =
            FieldCollector::new(&host, &repo, &counter, Path::new("."), LaborEstimator::default());

        let fields = collector.collect().await.unwrap();
        assert_eq!(fields.name, "widget");
        assert_eq!(fields.description, "");
        assert_eq!(fields.repository_visibility, Visibility::Private);
        assert_eq!(fields.languages, vec!["Rust", "Shell"]);
        assert_eq!(fields.tags, vec!["cli", "rust"]);
        assert_eq!(fields.forks, Some(7));
        assert_eq!(fields.labor_hours, 731.0);
        assert_eq!(fields.created.as_deref(), Some("2020-01-01T00:00:00Z"));
        assert!(fields.metadata_last_updated.is_none());
    }

    #[tokio::test]
    async fn test_host_failure_aborts_collection() {
        let host = StaticHost { fail_languages: true };
        let repo = RepoSlug::new("acme", "widget");
        let counter = FixedCounter(Some(report()));
        let collector =
            FieldCollector::new(&host, &repo, &counter, Path::new("."), LaborEstimator::default());

        assert!(matches!(collector.collect().await, Err(CollectError::Host(_))));
    }

    #[tokio::test]
    async fn test_counter_failure_aborts_collection() {
        let host = StaticHost { fail_languages: false };
        let repo = RepoSlug::new("acme", "widget");
        let counter = FixedCounter(None);
        let collector =
            FieldCollector::new(&host, &repo, &counter, Path::new("."), LaborEstimator::default());

        assert!(matches!(collector.collect().await, Err(CollectError::Report(_))));
    }
}
