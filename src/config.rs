// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Configuration management
//!
//! Settings are layered, lowest precedence first: built-in defaults, a TOML
//! file, `CODEJSON_*` environment variables, then command-line flags (which
//! also pick up the CI variables such as `GITHUB_TOKEN`).

use crate::collect::LaborEstimator;
use crate::host::github::DEFAULT_API_URL;
use crate::types::RepoSlug;
use anyhow::{anyhow, Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name looked up in the working directory
pub const LOCAL_CONFIG: &str = "codejson.toml";

/// Whether schema issues stop publication in normal mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationPolicy {
    /// Log issues and publish anyway
    #[default]
    Advisory,
    /// Refuse to publish an invalid manifest
    Blocking,
}

/// Application configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// `owner/repo` of the repository being described
    pub repository: Option<String>,
    /// API credential
    pub token: Option<String>,
    /// Elevated credential enabling direct commits
    pub admin_token: Option<String>,
    /// Target branch, the repository default when unset
    pub branch: Option<String>,
    /// Commit directly instead of opening a pull request
    pub skip_pr: bool,
    /// Checkout directory
    pub workspace: PathBuf,
    /// Manifest location, relative to the workspace and the repository root
    pub manifest_path: String,
    /// REST API base URL
    pub api_url: String,
    /// Triggering CI event
    pub event_name: Option<String>,
    /// Events that switch the run into validation-only mode
    pub validation_events: Vec<String>,
    /// Whether invalid output blocks publishing
    pub validation_policy: ValidationPolicy,
    /// Fail the run when publishing fails
    pub fail_on_publish_error: bool,
    /// Labor-hour formula
    pub labor: LaborEstimator,
    /// Line counter executable
    pub line_counter: String,
    /// Write the manifest here instead of publishing it
    pub output: Option<PathBuf>,
    /// CI step output file
    pub step_output: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            repository: None,
            token: None,
            admin_token: None,
            branch: None,
            skip_pr: false,
            workspace: PathBuf::from("."),
            manifest_path: "code.json".to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            event_name: None,
            validation_events: vec!["pull_request".to_string(), "pull_request_target".to_string()],
            validation_policy: ValidationPolicy::Advisory,
            fail_on_publish_error: false,
            labor: LaborEstimator::default(),
            line_counter: "scc".to_string(),
            output: None,
            step_output: None,
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |t: &Option<String>| t.as_ref().map(|_| "<redacted>");
        f.debug_struct("Settings")
            .field("repository", &self.repository)
            .field("token", &redact(&self.token))
            .field("admin_token", &redact(&self.admin_token))
            .field("branch", &self.branch)
            .field("skip_pr", &self.skip_pr)
            .field("workspace", &self.workspace)
            .field("manifest_path", &self.manifest_path)
            .field("api_url", &self.api_url)
            .field("event_name", &self.event_name)
            .field("validation_events", &self.validation_events)
            .field("validation_policy", &self.validation_policy)
            .field("fail_on_publish_error", &self.fail_on_publish_error)
            .field("labor", &self.labor)
            .field("line_counter", &self.line_counter)
            .field("output", &self.output)
            .field("step_output", &self.step_output)
            .finish()
    }
}

/// Values supplied on the command line, highest precedence
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// Explicit configuration file
    pub config_file: Option<PathBuf>,
    /// `--repository` / `GITHUB_REPOSITORY`
    pub repository: Option<String>,
    /// `--token` / `GITHUB_TOKEN`
    pub token: Option<String>,
    /// `--admin-token` / `ADMIN_TOKEN`
    pub admin_token: Option<String>,
    /// `--branch` / `BRANCH`
    pub branch: Option<String>,
    /// `--skip-pr` / `SKIP_PR`
    pub skip_pr: Option<bool>,
    /// `--workspace` / `GITHUB_WORKSPACE`
    pub workspace: Option<PathBuf>,
    /// `--manifest`
    pub manifest_path: Option<String>,
    /// `--api-url` / `GITHUB_API_URL`
    pub api_url: Option<String>,
    /// `--event-name` / `GITHUB_EVENT_NAME`
    pub event_name: Option<String>,
    /// `--output`
    pub output: Option<PathBuf>,
    /// `GITHUB_OUTPUT`
    pub step_output: Option<PathBuf>,
}

/// User-level configuration file
#[must_use]
pub fn user_config_file() -> Option<PathBuf> {
    directories::ProjectDirs::from("com", "hyperpolymath", "codejson-sync")
        .map(|d| d.config_dir().join("config.toml"))
}

fn path_string(path: Option<&PathBuf>) -> Option<String> {
    path.map(|p| p.display().to_string())
}

/// Non-empty values only; CI passes unset inputs as empty strings
fn present(value: Option<&String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty()).cloned()
}

impl Settings {
    /// Load configuration from every layer
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly named file is missing or any layer
    /// holds a value of the wrong type.
    pub fn load(overrides: &Overrides) -> Result<Self> {
        let defaults = Config::try_from(&Self::default()).context("Failed to encode defaults")?;
        let mut builder = Config::builder().add_source(defaults);

        if let Some(path) = &overrides.config_file {
            builder = builder.add_source(File::from(path.clone()).required(true));
        } else if Path::new(LOCAL_CONFIG).exists() {
            builder = builder.add_source(File::from(PathBuf::from(LOCAL_CONFIG)).required(false));
        } else if let Some(path) = user_config_file() {
            builder = builder.add_source(File::from(path).required(false));
        }

        builder = builder
            .add_source(
                Environment::with_prefix("CODEJSON")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("validation_events"),
            )
            .set_override_option("repository", present(overrides.repository.as_ref()))?
            .set_override_option("token", present(overrides.token.as_ref()))?
            .set_override_option("admin_token", present(overrides.admin_token.as_ref()))?
            .set_override_option("branch", present(overrides.branch.as_ref()))?
            .set_override_option("skip_pr", overrides.skip_pr)?
            .set_override_option("workspace", path_string(overrides.workspace.as_ref()))?
            .set_override_option("manifest_path", present(overrides.manifest_path.as_ref()))?
            .set_override_option("api_url", present(overrides.api_url.as_ref()))?
            .set_override_option("event_name", present(overrides.event_name.as_ref()))?
            .set_override_option("output", path_string(overrides.output.as_ref()))?
            .set_override_option("step_output", path_string(overrides.step_output.as_ref()))?;

        let settings: Self = builder
            .build()
            .context("Failed to load configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;
        debug!("Loaded settings: {:?}", settings);
        Ok(settings)
    }

    /// Repository being described
    ///
    /// # Errors
    ///
    /// Fails when no repository is configured or it is not `owner/repo`.
    pub fn repo_slug(&self) -> Result<RepoSlug> {
        let raw = self
            .repository
            .as_deref()
            .ok_or_else(|| anyhow!("No repository configured; set GITHUB_REPOSITORY or --repository"))?;
        raw.parse().map_err(|e: String| anyhow!(e))
    }

    /// Whether the triggering event only asks for validation
    #[must_use]
    pub fn is_validation_only(&self) -> bool {
        self.event_name
            .as_ref()
            .is_some_and(|event| self.validation_events.iter().any(|e| e == event))
    }

    /// Local path of the manifest
    #[must_use]
    pub fn manifest_file(&self) -> PathBuf {
        self.workspace.join(&self.manifest_path)
    }
}
