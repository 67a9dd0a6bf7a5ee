// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! GitHub REST client against a local mock API

mod common;

use codejson_sync::error::HostError;
use codejson_sync::host::{ChangeProposal, FileChange, FileWrite, GitHubClient, RepositoryHost};
use codejson_sync::types::RepoSlug;
use common::MockApi;
use serde_json::json;

fn repo() -> RepoSlug {
    RepoSlug::new("acme", "widget")
}

fn repo_body() -> serde_json::Value {
    json!({
        "name": "widget",
        "description": null,
        "html_url": "https://github.test/acme/widget",
        "private": true,
        "created_at": "2020-01-01T00:00:00Z",
        "updated_at": "2024-05-01T00:00:00Z",
        "topics": ["cli", " "],
        "forks_count": 7,
        "default_branch": "trunk",
        "watchers": 99
    })
}

#[tokio::test]
async fn test_repository_metadata_sends_credentials() {
    let api = MockApi::builder()
        .route("GET", "/repos/acme/widget", 200, repo_body())
        .start();
    let client = GitHubClient::new(&api.url, "t0ken").unwrap();

    let metadata = client.repository_metadata(&repo()).await.unwrap();
    assert_eq!(metadata.name, "widget");
    assert_eq!(metadata.description, None);
    assert!(metadata.private);
    assert_eq!(metadata.topics, vec!["cli", " "]);
    assert_eq!(metadata.forks_count, 7);
    assert_eq!(client.default_branch(&repo()).await.unwrap(), "trunk");

    let requests = api.requests();
    assert_eq!(requests[0].authorization.as_deref(), Some("Bearer t0ken"));
    assert_eq!(requests[0].api_version.as_deref(), Some("2022-11-28"));
}

#[tokio::test]
async fn test_languages_ordered_by_bytes_then_name() {
    let api = MockApi::builder()
        .route("GET", "/repos/acme/widget/languages", 200, json!({"Shell": 20, "Rust": 900, "C": 20}))
        .start();
    let client = GitHubClient::new(&api.url, "t").unwrap();

    let names: Vec<String> = client
        .repository_languages(&repo())
        .await
        .unwrap()
        .into_iter()
        .map(|l| l.name)
        .collect();
    assert_eq!(names, vec!["Rust", "C", "Shell"]);
}

#[tokio::test]
async fn test_file_sha_lookup() {
    let api = MockApi::builder()
        .route("GET", "/repos/acme/widget/contents/code.json", 200, json!({"sha": "abc123"}))
        .start();
    let client = GitHubClient::new(&api.url, "t").unwrap();

    let sha = client.file_sha(&repo(), "code.json", "main").await.unwrap();
    assert_eq!(sha.as_deref(), Some("abc123"));
    assert_eq!(api.requests()[0].url, "/repos/acme/widget/contents/code.json?ref=main");

    let missing = client.file_sha(&repo(), "other.json", "main").await.unwrap();
    assert_eq!(missing, None);
}

#[tokio::test]
async fn test_write_sends_base64_and_sha() {
    let api = MockApi::builder()
        .route(
            "PUT",
            "/repos/acme/widget/contents/code.json",
            200,
            json!({"commit": {"sha": "c0ffee"}, "content": {}}),
        )
        .start();
    let client = GitHubClient::new(&api.url, "t").unwrap();
    let write = FileWrite {
        path: "code.json".to_string(),
        message: "Update code.json metadata".to_string(),
        content: "hello\n".to_string(),
        branch: "main".to_string(),
        sha: Some("abc123".to_string()),
    };

    assert_eq!(client.create_or_update_file(&repo(), &write).await.unwrap(), "c0ffee");

    let body = api.requests()[0].json();
    assert_eq!(body["content"], "aGVsbG8K");
    assert_eq!(body["sha"], "abc123");
    assert_eq!(body["branch"], "main");
}

#[tokio::test]
async fn test_stale_write_is_conflict() {
    let api = MockApi::builder()
        .route("PUT", "/repos/acme/widget/contents/code.json", 409, json!({"message": "sha mismatch"}))
        .route("PUT", "/repos/acme/widget/contents/new.json", 422, json!({"message": "sha wasn't supplied"}))
        .start();
    let client = GitHubClient::new(&api.url, "t").unwrap();
    let mut write = FileWrite {
        path: "code.json".to_string(),
        message: "m".to_string(),
        content: "{}".to_string(),
        branch: "main".to_string(),
        sha: Some("old".to_string()),
    };

    let err = client.create_or_update_file(&repo(), &write).await.unwrap_err();
    assert!(matches!(err, HostError::Conflict(_)));

    write.path = "new.json".to_string();
    write.sha = None;
    let err = client.create_or_update_file(&repo(), &write).await.unwrap_err();
    assert!(matches!(err, HostError::Conflict(_)));
    assert!(api.requests()[1].json().get("sha").is_none());
}

#[tokio::test]
async fn test_rejected_credential() {
    let api = MockApi::builder()
        .route("GET", "/repos/acme/widget", 401, json!({"message": "Bad credentials"}))
        .start();
    let client = GitHubClient::new(&api.url, "expired").unwrap();

    let err = client.repository_metadata(&repo()).await.unwrap_err();
    assert!(matches!(err, HostError::Unauthorized(_)));
    assert!(err.to_string().contains("Bad credentials"));
}

#[tokio::test]
async fn test_change_proposal_flow() {
    let api = MockApi::builder()
        .route("GET", "/repos/acme/widget/git/ref/heads/main", 200, json!({"object": {"sha": "base1"}}))
        .route("POST", "/repos/acme/widget/git/refs", 201, json!({"ref": "refs/heads/code-json-1"}))
        .route("PUT", "/repos/acme/widget/contents/code.json", 201, json!({"commit": {"sha": "new1"}}))
        .route(
            "POST",
            "/repos/acme/widget/pulls",
            201,
            json!({"html_url": "https://github.test/acme/widget/pull/9", "number": 9}),
        )
        .route("POST", "/repos/acme/widget/issues/9/labels", 500, json!({"message": "oops"}))
        .start();
    let client = GitHubClient::new(&api.url, "t").unwrap();
    let proposal = ChangeProposal {
        title: "Update code.json".to_string(),
        body: "body".to_string(),
        base: "main".to_string(),
        head: "code-json-1".to_string(),
        files: vec![FileChange { path: "code.json".to_string(), content: "{}\n".to_string() }],
        commit_message: "Update code.json metadata".to_string(),
        labels: vec!["codejson-initialized".to_string()],
    };

    let receipt = client.create_change_proposal(&repo(), &proposal).await.unwrap();
    assert_eq!(receipt.url, "https://github.test/acme/widget/pull/9");
    assert_eq!(receipt.number, 9);

    let requests = api.requests();
    let calls: Vec<(&str, &str)> = requests
        .iter()
        .map(|r| (r.method.as_str(), r.url.split('?').next().unwrap()))
        .collect();
    assert_eq!(
        calls,
        vec![
            ("GET", "/repos/acme/widget/git/ref/heads/main"),
            ("POST", "/repos/acme/widget/git/refs"),
            ("GET", "/repos/acme/widget/contents/code.json"),
            ("PUT", "/repos/acme/widget/contents/code.json"),
            ("POST", "/repos/acme/widget/pulls"),
            ("POST", "/repos/acme/widget/issues/9/labels"),
        ]
    );
    assert_eq!(requests[1].json(), json!({"ref": "refs/heads/code-json-1", "sha": "base1"}));
    let write = requests[3].json();
    assert_eq!(write["branch"], "code-json-1");
    assert!(write.get("sha").is_none());
    assert_eq!(requests[4].json()["base"], "main");
    assert_eq!(requests[5].json(), json!({"labels": ["codejson-initialized"]}));
}
