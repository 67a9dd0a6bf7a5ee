// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Declarative schema for the code.json manifest
//!
//! The tables below are the single description of the manifest shape. The
//! validator walks them to produce issues and the legacy normalizer walks
//! them to decide which keys survive.

/// Prefix marking a usage type that claims an exemption
pub const EXEMPTION_PREFIX: &str = "exemptBy";

/// Accepted `repositoryVisibility` values
pub const VISIBILITIES: &[&str] = &["public", "private"];

/// Whether a field must be present
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Absence is a violation
    Required,
    /// Absence is allowed; a present value is still checked
    Optional,
}

/// Rules that look at more than one field of an object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossFieldRule {
    /// `exemptionText` must be non-blank when any `usageType` token starts
    /// with [`EXEMPTION_PREFIX`]
    ExemptionText,
}

/// Shape and constraints of one field
#[derive(Debug, Clone, Copy)]
pub enum Kind {
    /// Any string; `Some(message)` additionally requires it to be non-empty
    Text(Option<&'static str>),
    /// Absolute URL; `required` is the message for an empty string
    Url {
        /// Message when the string is empty
        required: Option<&'static str>,
        /// Message when the string does not parse
        invalid: &'static str,
    },
    /// Email address
    Email {
        /// Message when the string is empty
        required: Option<&'static str>,
        /// Message when the string is malformed
        invalid: &'static str,
    },
    /// One of [`VISIBILITIES`]
    Visibility(&'static str),
    /// Non-negative number
    Number,
    /// Non-negative integer
    Count,
    /// Boolean
    Flag,
    /// List of strings; `Some(message)` requires at least one entry
    TextList(Option<&'static str>),
    /// A single string or a list of strings
    TextOrList,
    /// Nested object
    Object(&'static [Field], Option<CrossFieldRule>),
    /// List of nested objects; `Some(message)` requires at least one entry
    ObjectList(&'static [Field], Option<&'static str>),
}

impl Kind {
    /// Name of the expected JSON type, used in type-mismatch messages
    #[must_use]
    pub fn expected(&self) -> &'static str {
        match self {
            Self::Text(_) | Self::Url { .. } | Self::Email { .. } | Self::Visibility(_) => "string",
            Self::Number | Self::Count => "number",
            Self::Flag => "boolean",
            Self::TextList(_) | Self::ObjectList(..) => "array",
            Self::TextOrList => "string or array",
            Self::Object(..) => "object",
        }
    }
}

/// A named field of an object
#[derive(Debug, Clone, Copy)]
pub struct Field {
    /// JSON key
    pub name: &'static str,
    /// Shape
    pub kind: Kind,
    /// Presence requirement
    pub presence: Presence,
}

const fn required(name: &'static str, kind: Kind) -> Field {
    Field { name, kind, presence: Presence::Required }
}

const fn optional(name: &'static str, kind: Kind) -> Field {
    Field { name, kind, presence: Presence::Optional }
}

const DATE: &[Field] = &[
    required("created", Kind::Text(Some("created date is required"))),
    required("lastModified", Kind::Text(Some("lastModified date is required"))),
    required("metadataLastUpdated", Kind::Text(Some("metadataLastUpdated date is required"))),
];

const CONTACT: &[Field] = &[
    required(
        "email",
        Kind::Email { required: Some("email is required"), invalid: "must be a valid email" },
    ),
    required("name", Kind::Text(Some("name is required"))),
];

const LICENSE: &[Field] = &[
    required("name", Kind::Text(Some("license name is required"))),
    required(
        "URL",
        Kind::Url { required: Some("license URL is required"), invalid: "license URL must be valid" },
    ),
];

const PERMISSIONS: &[Field] = &[
    required("licenses", Kind::ObjectList(LICENSE, Some("at least one license is required"))),
    required("usageType", Kind::TextOrList),
    required("exemptionText", Kind::Text(None)),
];

const REUSE_FREQUENCY: &[Field] = &[required("forks", Kind::Count), optional("clones", Kind::Count)];

const RELATED_CODE: &[Field] = &[
    required("name", Kind::Text(None)),
    required("URL", Kind::Url { required: None, invalid: "invalid URL" }),
    required("isGovernmentRepo", Kind::Flag),
];

const REUSED_CODE: &[Field] = &[
    required("name", Kind::Text(None)),
    required("URL", Kind::Url { required: None, invalid: "invalid URL" }),
];

const PARTNER: &[Field] = &[
    required("name", Kind::Text(None)),
    required("email", Kind::Email { required: None, invalid: "invalid email address" }),
];

/// Top-level manifest fields in declaration order
pub const MANIFEST: &[Field] = &[
    required("name", Kind::Text(Some("name is required"))),
    optional("version", Kind::Text(None)),
    required("description", Kind::Text(Some("description is required"))),
    required("longDescription", Kind::Text(None)),
    required("status", Kind::Text(Some("status is required"))),
    required("permissions", Kind::Object(PERMISSIONS, Some(CrossFieldRule::ExemptionText))),
    required("organization", Kind::Text(Some("organization is required"))),
    required(
        "repositoryURL",
        Kind::Url { required: Some("repositoryURL is required"), invalid: "must be a valid URL" },
    ),
    required("repositoryHost", Kind::Text(None)),
    required("repositoryVisibility", Kind::Visibility("repositoryVisibility is required")),
    optional("homepageURL", Kind::Text(None)),
    optional("downloadURL", Kind::Text(None)),
    optional("disclaimerURL", Kind::Text(None)),
    optional("disclaimerText", Kind::Text(None)),
    required("vcs", Kind::Text(None)),
    required("laborHours", Kind::Number),
    required("reuseFrequency", Kind::Object(REUSE_FREQUENCY, None)),
    required("platforms", Kind::TextList(None)),
    required("categories", Kind::TextList(None)),
    required("softwareType", Kind::Text(None)),
    required("languages", Kind::TextList(Some("at least one language is required"))),
    required("maintenance", Kind::Text(None)),
    required("contractNumber", Kind::TextList(None)),
    required("SBOM", Kind::Text(None)),
    optional("relatedCode", Kind::ObjectList(RELATED_CODE, None)),
    optional("reusedCode", Kind::ObjectList(REUSED_CODE, None)),
    optional("partners", Kind::ObjectList(PARTNER, None)),
    required("date", Kind::Object(DATE, None)),
    required("tags", Kind::TextList(None)),
    required("contact", Kind::Object(CONTACT, None)),
    required("feedbackMechanism", Kind::Text(Some("feedbackMechanism is required"))),
    required("AIUseCaseID", Kind::Text(None)),
    required("localisation", Kind::Flag),
    required("repositoryType", Kind::Text(None)),
    required("userInput", Kind::Flag),
    required("fismaLevel", Kind::Text(None)),
    required("group", Kind::Text(None)),
    required("projects", Kind::TextList(None)),
    required("systems", Kind::TextList(None)),
    required("subsetInHealthcare", Kind::TextList(None)),
    required("userType", Kind::TextList(None)),
    required("maturityModelTier", Kind::Count),
];

/// Look up a field by key in a field table
#[must_use]
pub fn field<'a>(fields: &'a [Field], name: &str) -> Option<&'a Field> {
    fields.iter().find(|f| f.name == name)
}
