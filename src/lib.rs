// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! codejson-sync library - keeps a repository's code.json manifest current
//!
//! This crate provides the schema contract for the code.json metadata
//! manifest, a validator, a legacy-shape normalizer, the three-way
//! reconcile algorithm and the collectors/publishers that run around it
//! inside a CI pipeline.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod collect;
pub mod commands;
pub mod config;
pub mod error;
pub mod host;
pub mod legacy;
pub mod publish;
pub mod reconcile;
pub mod report;
pub mod schema;
pub mod store;
pub mod validate;

/// Core data types for the code.json manifest
pub mod types {
    use serde::{Deserialize, Serialize, Serializer};
    use std::fmt;
    use std::str::FromStr;

    // =========================================================================
    // Manifest
    // =========================================================================

    /// The code.json metadata manifest describing one repository.
    ///
    /// Field order follows the schema declaration order and is the order
    /// fields are written to disk.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct MetadataDocument {
        /// Repository name
        pub name: String,
        /// Software version
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub version: Option<String>,
        /// Short description
        pub description: String,
        /// Long-form description
        #[serde(rename = "longDescription")]
        pub long_description: String,
        /// Development status
        pub status: String,
        /// Licensing and usage rights
        pub permissions: Permissions,
        /// Owning organization
        pub organization: String,
        /// Canonical repository URL
        #[serde(rename = "repositoryURL")]
        pub repository_url: String,
        /// Hosting platform name
        #[serde(rename = "repositoryHost")]
        pub repository_host: String,
        /// "public" or "private"
        #[serde(rename = "repositoryVisibility")]
        pub repository_visibility: String,
        /// Project homepage
        #[serde(rename = "homepageURL", default, skip_serializing_if = "Option::is_none")]
        pub homepage_url: Option<String>,
        /// Download location
        #[serde(rename = "downloadURL", default, skip_serializing_if = "Option::is_none")]
        pub download_url: Option<String>,
        /// Disclaimer location
        #[serde(rename = "disclaimerURL", default, skip_serializing_if = "Option::is_none")]
        pub disclaimer_url: Option<String>,
        /// Inline disclaimer
        #[serde(rename = "disclaimerText", default, skip_serializing_if = "Option::is_none")]
        pub disclaimer_text: Option<String>,
        /// Version control system
        pub vcs: String,
        /// Estimated labor hours
        #[serde(rename = "laborHours", serialize_with = "whole_number")]
        pub labor_hours: f64,
        /// Fork and clone counts
        #[serde(rename = "reuseFrequency")]
        pub reuse_frequency: ReuseFrequency,
        /// Supported platforms
        pub platforms: Vec<String>,
        /// Subject categories
        pub categories: Vec<String>,
        /// Kind of software
        #[serde(rename = "softwareType")]
        pub software_type: String,
        /// Programming languages
        pub languages: Vec<String>,
        /// Maintenance arrangement
        pub maintenance: String,
        /// Contract numbers
        #[serde(rename = "contractNumber")]
        pub contract_number: Vec<String>,
        /// Software bill of materials location
        #[serde(rename = "SBOM")]
        pub sbom: String,
        /// Related repositories
        #[serde(rename = "relatedCode", default, skip_serializing_if = "Option::is_none")]
        pub related_code: Option<Vec<RelatedCode>>,
        /// Reused upstream code
        #[serde(rename = "reusedCode", default, skip_serializing_if = "Option::is_none")]
        pub reused_code: Option<Vec<ReusedCode>>,
        /// Partner organizations
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub partners: Option<Vec<Partner>>,
        /// Timestamp triple
        pub date: DateTriple,
        /// Topic tags
        pub tags: Vec<String>,
        /// Point of contact
        pub contact: Contact,
        /// Where feedback is collected
        #[serde(rename = "feedbackMechanism")]
        pub feedback_mechanism: String,
        /// AI use case inventory identifier
        #[serde(rename = "AIUseCaseID")]
        pub ai_use_case_id: String,
        /// Whether the software is localised
        pub localisation: bool,
        /// Repository type
        #[serde(rename = "repositoryType")]
        pub repository_type: String,
        /// Whether the software accepts user input
        #[serde(rename = "userInput")]
        pub user_input: bool,
        /// FISMA impact level
        #[serde(rename = "fismaLevel")]
        pub fisma_level: String,
        /// Owning group
        pub group: String,
        /// Associated projects
        pub projects: Vec<String>,
        /// Associated systems
        pub systems: Vec<String>,
        /// Healthcare subsets
        #[serde(rename = "subsetInHealthcare")]
        pub subset_in_healthcare: Vec<String>,
        /// Intended user types
        #[serde(rename = "userType")]
        pub user_type: Vec<String>,
        /// Maturity model tier
        #[serde(rename = "maturityModelTier")]
        pub maturity_model_tier: u64,
    }

    /// Licensing block
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Permissions {
        /// Licenses, in order of precedence
        pub licenses: Vec<License>,
        /// Usage type token(s)
        #[serde(rename = "usageType")]
        pub usage_type: UsageType,
        /// Justification when an exemption usage type is claimed
        #[serde(rename = "exemptionText")]
        pub exemption_text: String,
    }

    /// A single license entry
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct License {
        /// License name or SPDX identifier
        pub name: String,
        /// License text location
        #[serde(rename = "URL")]
        pub url: String,
    }

    /// Usage type, written either as a single token or a list of tokens
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(untagged)]
    pub enum UsageType {
        /// Single token
        Single(String),
        /// Several tokens
        Many(Vec<String>),
    }

    impl UsageType {
        /// All tokens, a lone token wrapped as a one-element list
        #[must_use]
        pub fn tokens(&self) -> Vec<&str> {
            match self {
                Self::Single(token) => vec![token.as_str()],
                Self::Many(tokens) => tokens.iter().map(String::as_str).collect(),
            }
        }
    }

    impl Default for UsageType {
        fn default() -> Self {
            Self::Many(Vec::new())
        }
    }

    /// Fork and clone counters
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct ReuseFrequency {
        /// Fork count
        pub forks: u64,
        /// Clone count, not observable from the hosting API
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub clones: Option<u64>,
    }

    /// Created / modified / metadata-updated timestamps.
    ///
    /// An empty string means "not yet computed".
    #[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct DateTriple {
        /// Repository creation
        pub created: String,
        /// Last repository modification
        #[serde(rename = "lastModified")]
        pub last_modified: String,
        /// Last manifest refresh
        #[serde(rename = "metadataLastUpdated")]
        pub metadata_last_updated: String,
    }

    /// Point of contact
    #[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct Contact {
        /// Contact email
        pub email: String,
        /// Contact name
        pub name: String,
    }

    /// Link to a related repository
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct RelatedCode {
        /// Display name
        pub name: String,
        /// Location
        #[serde(rename = "URL")]
        pub url: String,
        /// Whether it is a government repository
        #[serde(rename = "isGovernmentRepo")]
        pub is_government_repo: bool,
    }

    /// Upstream code reused by this repository
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ReusedCode {
        /// Display name
        pub name: String,
        /// Location
        #[serde(rename = "URL")]
        pub url: String,
    }

    /// Partner organization
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Partner {
        /// Partner name
        pub name: String,
        /// Partner email
        pub email: String,
    }

    /// Writes whole finite numbers without a fractional part, so that an
    /// hours estimate of 120 is stored as `120` rather than `120.0`.
    #[allow(clippy::trivially_copy_pass_by_ref, clippy::cast_possible_truncation)]
    fn whole_number<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        const EXACT: f64 = 9_007_199_254_740_992.0;
        if value.is_finite() && value.fract() == 0.0 && value.abs() < EXACT {
            serializer.serialize_i64(*value as i64)
        } else {
            serializer.serialize_f64(*value)
        }
    }

    // =========================================================================
    // Repository identity
    // =========================================================================

    /// Repository visibility as reported by the host
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum Visibility {
        /// Public repository
        Public,
        /// Private repository
        Private,
    }

    impl Visibility {
        /// Manifest spelling
        #[must_use]
        pub fn as_str(&self) -> &'static str {
            match self {
                Self::Public => "public",
                Self::Private => "private",
            }
        }

        /// Map the host's `private` flag
        #[must_use]
        pub fn from_private_flag(private: bool) -> Self {
            if private {
                Self::Private
            } else {
                Self::Public
            }
        }
    }

    /// `owner/name` pair identifying a hosted repository
    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    pub struct RepoSlug {
        /// Owner or organization
        pub owner: String,
        /// Repository name
        pub name: String,
    }

    impl RepoSlug {
        /// Build a slug from its parts
        #[must_use]
        pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
            Self { owner: owner.into(), name: name.into() }
        }
    }

    impl FromStr for RepoSlug {
        type Err = String;

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            match s.trim().split_once('/') {
                Some((owner, name))
                    if !owner.is_empty() && !name.is_empty() && !name.contains('/') =>
                {
                    Ok(Self::new(owner, name))
                }
                _ => Err(format!("expected <owner>/<repo>, got '{s}'")),
            }
        }
    }

    impl fmt::Display for RepoSlug {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}/{}", self.owner, self.name)
        }
    }

    // =========================================================================
    // Validation
    // =========================================================================

    /// One schema violation
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct ValidationIssue {
        /// Dot-separated field path, empty for the document root
        pub path: String,
        /// Human-readable message
        pub message: String,
    }

    impl ValidationIssue {
        /// Create an issue
        #[must_use]
        pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
            Self { path: path.into(), message: message.into() }
        }
    }

    impl fmt::Display for ValidationIssue {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let field = if self.path.is_empty() { "root" } else { &self.path };
            write!(f, "{}: {}", field, self.message)
        }
    }
}

/// Prelude for common imports
pub mod prelude {
    pub use crate::types::*;
    pub use anyhow::{Context, Result};
}
