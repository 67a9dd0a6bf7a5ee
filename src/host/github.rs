// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! GitHub REST implementation of [`RepositoryHost`]

use super::{
    ChangeProposal, FileWrite, LanguageBytes, ProposalReceipt, RepositoryHost, RepositoryMetadata,
};
use crate::error::HostError;
use crate::types::RepoSlug;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as Base64;
use base64::Engine;
use reqwest::header::ACCEPT;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Public GitHub API endpoint
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const API_VERSION: &str = "2022-11-28";

/// GitHub REST client bound to one credential
pub struct GitHubClient {
    /// API base URL (no trailing slash)
    base_url: String,
    /// Bearer token
    token: String,
    /// HTTP client configured with timeouts
    client: Client,
}

#[derive(Debug, Deserialize)]
struct RepoResponse {
    name: String,
    description: Option<String>,
    html_url: String,
    private: bool,
    created_at: String,
    updated_at: String,
    #[serde(default)]
    topics: Option<Vec<String>>,
    forks_count: u64,
    default_branch: String,
}

#[derive(Debug, Deserialize)]
struct RefResponse {
    object: RefObject,
}

#[derive(Debug, Deserialize)]
struct RefObject {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct ContentResponse {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct WriteResponse {
    commit: CommitRef,
}

#[derive(Debug, Deserialize)]
struct CommitRef {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct PullResponse {
    html_url: String,
    number: u64,
}

#[derive(Debug, Serialize)]
struct WriteRequest<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

impl GitHubClient {
    /// Build a client for `base_url` authenticating with `token`.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Transport`] when the HTTP client cannot be built.
    pub fn new(base_url: &str, token: impl Into<String>) -> Result<Self, HostError> {
        let client = Client::builder()
            .user_agent(concat!("codejson-sync/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| HostError::Transport(err.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
            client,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(&self.token)
            .header(ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Response, HostError> {
        let response = request
            .send()
            .await
            .map_err(|err| HostError::Transport(format!("{what}: {err}")))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = format!("{what}: {}", body.trim());
        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => HostError::Unauthorized(message),
            StatusCode::NOT_FOUND => HostError::NotFound(message),
            StatusCode::CONFLICT => HostError::Conflict(message),
            other => HostError::Status { status: other.as_u16(), message },
        })
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &str,
    ) -> Result<T, HostError> {
        self.send(request, what)
            .await?
            .json::<T>()
            .await
            .map_err(|err| HostError::Decode(format!("{what}: {err}")))
    }

    async fn repo(&self, repo: &RepoSlug) -> Result<RepoResponse, HostError> {
        let path = format!("/repos/{}/{}", repo.owner, repo.name);
        self.send_json(self.request(Method::GET, &path), "get repository").await
    }
}

#[async_trait]
impl RepositoryHost for GitHubClient {
    async fn repository_metadata(&self, repo: &RepoSlug) -> Result<RepositoryMetadata, HostError> {
        let data = self.repo(repo).await?;
        Ok(RepositoryMetadata {
            name: data.name,
            description: data.description,
            html_url: data.html_url,
            private: data.private,
            created_at: data.created_at,
            updated_at: data.updated_at,
            topics: data.topics.unwrap_or_default(),
            forks_count: data.forks_count,
            default_branch: data.default_branch,
        })
    }

    async fn repository_languages(&self, repo: &RepoSlug) -> Result<Vec<LanguageBytes>, HostError> {
        let path = format!("/repos/{}/{}/languages", repo.owner, repo.name);
        let raw: HashMap<String, u64> =
            self.send_json(self.request(Method::GET, &path), "list languages").await?;
        let mut languages: Vec<LanguageBytes> = raw
            .into_iter()
            .map(|(name, bytes)| LanguageBytes { name, bytes })
            .collect();
        languages.sort_by(|a, b| b.bytes.cmp(&a.bytes).then_with(|| a.name.cmp(&b.name)));
        Ok(languages)
    }

    async fn default_branch(&self, repo: &RepoSlug) -> Result<String, HostError> {
        Ok(self.repo(repo).await?.default_branch)
    }

    async fn create_change_proposal(
        &self,
        repo: &RepoSlug,
        proposal: &ChangeProposal,
    ) -> Result<ProposalReceipt, HostError> {
        let base_path = format!("/repos/{}/{}/git/ref/heads/{}", repo.owner, repo.name, proposal.base);
        let base: RefResponse =
            self.send_json(self.request(Method::GET, &base_path), "read base branch").await?;

        let refs_path = format!("/repos/{}/{}/git/refs", repo.owner, repo.name);
        let create_ref = self
            .request(Method::POST, &refs_path)
            .json(&json!({ "ref": format!("refs/heads/{}", proposal.head), "sha": base.object.sha }));
        self.send(create_ref, "create head branch").await?;
        debug!("Created branch {} from {}", proposal.head, proposal.base);

        for file in &proposal.files {
            let sha = self.file_sha(repo, &file.path, &proposal.head).await?;
            let write = FileWrite {
                path: file.path.clone(),
                message: proposal.commit_message.clone(),
                content: file.content.clone(),
                branch: proposal.head.clone(),
                sha,
            };
            self.create_or_update_file(repo, &write).await?;
        }

        let pulls_path = format!("/repos/{}/{}/pulls", repo.owner, repo.name);
        let open = self.request(Method::POST, &pulls_path).json(&json!({
            "title": proposal.title,
            "body": proposal.body,
            "head": proposal.head,
            "base": proposal.base,
        }));
        let pull: PullResponse = self.send_json(open, "open pull request").await?;

        if !proposal.labels.is_empty() {
            let labels_path =
                format!("/repos/{}/{}/issues/{}/labels", repo.owner, repo.name, pull.number);
            let label = self
                .request(Method::POST, &labels_path)
                .json(&json!({ "labels": proposal.labels }));
            if let Err(err) = self.send(label, "apply labels").await {
                warn!("Pull request opened but labels were not applied: {}", err);
            }
        }

        Ok(ProposalReceipt { url: pull.html_url, number: pull.number })
    }

    async fn file_sha(
        &self,
        repo: &RepoSlug,
        path: &str,
        git_ref: &str,
    ) -> Result<Option<String>, HostError> {
        let contents_path = format!("/repos/{}/{}/contents/{}", repo.owner, repo.name, path);
        let request = self.request(Method::GET, &contents_path).query(&[("ref", git_ref)]);
        match self.send_json::<ContentResponse>(request, "read file").await {
            Ok(content) => Ok(Some(content.sha)),
            Err(HostError::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn create_or_update_file(
        &self,
        repo: &RepoSlug,
        write: &FileWrite,
    ) -> Result<String, HostError> {
        let contents_path = format!("/repos/{}/{}/contents/{}", repo.owner, repo.name, write.path);
        let body = WriteRequest {
            message: &write.message,
            content: Base64.encode(write.content.as_bytes()),
            branch: &write.branch,
            sha: write.sha.as_deref(),
        };
        let request = self.request(Method::PUT, &contents_path).json(&body);
        match self.send_json::<WriteResponse>(request, "write file").await {
            Ok(response) => Ok(response.commit.sha),
            // A missing or stale sha is rejected with 422 on some endpoints
            Err(HostError::Status { status: 422, message }) => Err(HostError::Conflict(message)),
            Err(err) => Err(err),
        }
    }
}
