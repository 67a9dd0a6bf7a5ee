// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Tolerant reading of previously persisted manifests
//!
//! Persisted manifests may predate the current schema. [`normalize`] applies
//! the known shape migrations and strips keys the schema does not know;
//! [`ExistingDocument`] then reads each field on its own so a single
//! mistyped field cannot discard the rest of the document.

use crate::schema::{self, Field, Kind};
use crate::types::{
    Contact, DateTriple, License, Partner, Permissions, RelatedCode, ReuseFrequency, ReusedCode,
    UsageType,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use tracing::debug;

/// A shape change between schema versions
struct Migration {
    /// Schema version that used the old shape
    since: &'static str,
    /// Short description for logs
    summary: &'static str,
    /// Rewrites the document in place, returns whether anything changed
    apply: fn(&mut Map<String, Value>) -> bool,
}

/// Applied oldest first
const MIGRATIONS: &[Migration] = &[
    Migration {
        since: "1.0",
        summary: "date.metaDataLastUpdated renamed to date.metadataLastUpdated",
        apply: rename_metadata_last_updated,
    },
    Migration {
        since: "1.0",
        summary: "feedbackMechanisms list collapsed to feedbackMechanism",
        apply: collapse_feedback_mechanisms,
    },
    Migration {
        since: "1.0",
        summary: "permissions.license renamed to permissions.licenses",
        apply: rename_licenses,
    },
];

/// Bring a persisted manifest to the current shape.
///
/// Never fails. A non-object root is returned unchanged; nested values whose
/// type does not match the schema are left in place for
/// [`ExistingDocument`] to ignore.
#[must_use]
pub fn normalize(raw: Value) -> Value {
    let Value::Object(mut map) = raw else {
        return raw;
    };

    for migration in MIGRATIONS {
        if (migration.apply)(&mut map) {
            debug!("Migrated legacy field (schema {}): {}", migration.since, migration.summary);
        }
    }

    strip_unknown(&mut map, schema::MANIFEST);
    Value::Object(map)
}

fn rename_metadata_last_updated(map: &mut Map<String, Value>) -> bool {
    let Some(Value::Object(date)) = map.get_mut("date") else {
        return false;
    };
    match date.remove("metaDataLastUpdated") {
        Some(legacy) => {
            date.entry("metadataLastUpdated").or_insert(legacy);
            true
        }
        None => false,
    }
}

fn collapse_feedback_mechanisms(map: &mut Map<String, Value>) -> bool {
    let Some(legacy) = map.remove("feedbackMechanisms") else {
        return false;
    };
    // A blank current value counts as absent
    if matches!(map.get("feedbackMechanism"), Some(Value::String(s)) if !s.trim().is_empty()) {
        return true;
    }
    let collapsed = match legacy {
        Value::Array(items) => items
            .into_iter()
            .find_map(|item| match item {
                Value::String(s) if !s.trim().is_empty() => Some(s),
                _ => None,
            })
            .map(Value::String),
        Value::String(s) => Some(Value::String(s)),
        _ => None,
    };
    if let Some(value) = collapsed {
        map.insert("feedbackMechanism".into(), value);
    }
    true
}

fn rename_licenses(map: &mut Map<String, Value>) -> bool {
    let Some(Value::Object(permissions)) = map.get_mut("permissions") else {
        return false;
    };
    match permissions.remove("license") {
        Some(legacy) => {
            permissions.entry("licenses").or_insert(legacy);
            true
        }
        None => false,
    }
}

fn strip_unknown(map: &mut Map<String, Value>, fields: &[Field]) {
    map.retain(|key, _| schema::field(fields, key).is_some());
    for field in fields {
        match (field.kind, map.get_mut(field.name)) {
            (Kind::Object(nested, _), Some(Value::Object(inner))) => strip_unknown(inner, nested),
            (Kind::ObjectList(nested, _), Some(Value::Array(items))) => {
                for item in items {
                    if let Value::Object(inner) = item {
                        strip_unknown(inner, nested);
                    }
                }
            }
            _ => {}
        }
    }
}

// =============================================================================
// Typed view
// =============================================================================

/// `contractNumber` as persisted: older manifests stored a single string
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ContractNumber {
    /// Legacy single value
    Single(String),
    /// Current list form
    List(Vec<String>),
}

impl ContractNumber {
    /// Current list form. A blank legacy value becomes an empty list.
    #[must_use]
    pub fn into_list(self) -> Vec<String> {
        match self {
            Self::Single(s) if s.trim().is_empty() => Vec::new(),
            Self::Single(s) => vec![s],
            Self::List(list) => list,
        }
    }
}

/// Reads a field, yielding `None` instead of an error on a type mismatch
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Nested objects tolerate missing members, which fall back to empty values
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct LoosePermissions {
    #[serde(deserialize_with = "lenient")]
    licenses: Option<Vec<License>>,
    #[serde(rename = "usageType", deserialize_with = "lenient")]
    usage_type: Option<UsageType>,
    #[serde(rename = "exemptionText", deserialize_with = "lenient")]
    exemption_text: Option<String>,
}

impl From<LoosePermissions> for Permissions {
    fn from(loose: LoosePermissions) -> Self {
        Self {
            licenses: loose.licenses.unwrap_or_default(),
            usage_type: loose.usage_type.unwrap_or_default(),
            exemption_text: loose.exemption_text.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct LooseReuseFrequency {
    #[serde(deserialize_with = "lenient")]
    forks: Option<u64>,
    #[serde(deserialize_with = "lenient")]
    clones: Option<u64>,
}

impl From<LooseReuseFrequency> for ReuseFrequency {
    fn from(loose: LooseReuseFrequency) -> Self {
        Self { forks: loose.forks.unwrap_or_default(), clones: loose.clones }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct LooseDate {
    #[serde(deserialize_with = "lenient")]
    created: Option<String>,
    #[serde(rename = "lastModified", deserialize_with = "lenient")]
    last_modified: Option<String>,
    #[serde(rename = "metadataLastUpdated", deserialize_with = "lenient")]
    metadata_last_updated: Option<String>,
}

impl From<LooseDate> for DateTriple {
    fn from(loose: LooseDate) -> Self {
        Self {
            created: loose.created.unwrap_or_default(),
            last_modified: loose.last_modified.unwrap_or_default(),
            metadata_last_updated: loose.metadata_last_updated.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct LooseContact {
    #[serde(deserialize_with = "lenient")]
    email: Option<String>,
    #[serde(deserialize_with = "lenient")]
    name: Option<String>,
}

impl From<LooseContact> for Contact {
    fn from(loose: LooseContact) -> Self {
        Self {
            email: loose.email.unwrap_or_default(),
            name: loose.name.unwrap_or_default(),
        }
    }
}

/// A previously persisted manifest, every field optional.
///
/// A field is `None` when it was absent or its value could not be read as
/// the current type.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExistingDocument {
    /// Project name
    #[serde(deserialize_with = "lenient")]
    pub name: Option<String>,
    /// Project version
    #[serde(deserialize_with = "lenient")]
    pub version: Option<String>,
    /// Short description
    #[serde(deserialize_with = "lenient")]
    pub description: Option<String>,
    /// Long description
    #[serde(rename = "longDescription", deserialize_with = "lenient")]
    pub long_description: Option<String>,
    /// Development status
    #[serde(deserialize_with = "lenient")]
    pub status: Option<String>,
    /// Licensing block
    #[serde(deserialize_with = "loose_permissions")]
    pub permissions: Option<Permissions>,
    /// Owning organization
    #[serde(deserialize_with = "lenient")]
    pub organization: Option<String>,
    /// Repository URL
    #[serde(rename = "repositoryURL", deserialize_with = "lenient")]
    pub repository_url: Option<String>,
    /// Hosting platform
    #[serde(rename = "repositoryHost", deserialize_with = "lenient")]
    pub repository_host: Option<String>,
    /// Visibility token as written
    #[serde(rename = "repositoryVisibility", deserialize_with = "lenient")]
    pub repository_visibility: Option<String>,
    /// Homepage URL
    #[serde(rename = "homepageURL", deserialize_with = "lenient")]
    pub homepage_url: Option<String>,
    /// Download URL
    #[serde(rename = "downloadURL", deserialize_with = "lenient")]
    pub download_url: Option<String>,
    /// Disclaimer URL
    #[serde(rename = "disclaimerURL", deserialize_with = "lenient")]
    pub disclaimer_url: Option<String>,
    /// Disclaimer text
    #[serde(rename = "disclaimerText", deserialize_with = "lenient")]
    pub disclaimer_text: Option<String>,
    /// Version control system
    #[serde(deserialize_with = "lenient")]
    pub vcs: Option<String>,
    /// Labor hours
    #[serde(rename = "laborHours", deserialize_with = "lenient")]
    pub labor_hours: Option<f64>,
    /// Fork and clone counts
    #[serde(rename = "reuseFrequency", deserialize_with = "loose_reuse")]
    pub reuse_frequency: Option<ReuseFrequency>,
    /// Supported platforms
    #[serde(deserialize_with = "lenient")]
    pub platforms: Option<Vec<String>>,
    /// Categories
    #[serde(deserialize_with = "lenient")]
    pub categories: Option<Vec<String>>,
    /// Software type
    #[serde(rename = "softwareType", deserialize_with = "lenient")]
    pub software_type: Option<String>,
    /// Languages
    #[serde(deserialize_with = "lenient")]
    pub languages: Option<Vec<String>>,
    /// Maintenance mode
    #[serde(deserialize_with = "lenient")]
    pub maintenance: Option<String>,
    /// Contract number(s), either persisted shape
    #[serde(rename = "contractNumber", deserialize_with = "lenient")]
    pub contract_number: Option<ContractNumber>,
    /// SBOM link
    #[serde(rename = "SBOM", deserialize_with = "lenient")]
    pub sbom: Option<String>,
    /// Related code entries
    #[serde(rename = "relatedCode", deserialize_with = "lenient")]
    pub related_code: Option<Vec<RelatedCode>>,
    /// Reused code entries
    #[serde(rename = "reusedCode", deserialize_with = "lenient")]
    pub reused_code: Option<Vec<ReusedCode>>,
    /// Partners
    #[serde(deserialize_with = "lenient")]
    pub partners: Option<Vec<Partner>>,
    /// Dates
    #[serde(deserialize_with = "loose_date")]
    pub date: Option<DateTriple>,
    /// Tags
    #[serde(deserialize_with = "lenient")]
    pub tags: Option<Vec<String>>,
    /// Contact
    #[serde(deserialize_with = "loose_contact")]
    pub contact: Option<Contact>,
    /// Feedback URL
    #[serde(rename = "feedbackMechanism", deserialize_with = "lenient")]
    pub feedback_mechanism: Option<String>,
    /// AI use case identifier
    #[serde(rename = "AIUseCaseID", deserialize_with = "lenient")]
    pub ai_use_case_id: Option<String>,
    /// Localisation support
    #[serde(deserialize_with = "lenient")]
    pub localisation: Option<bool>,
    /// Repository type
    #[serde(rename = "repositoryType", deserialize_with = "lenient")]
    pub repository_type: Option<String>,
    /// Whether the software accepts user input
    #[serde(rename = "userInput", deserialize_with = "lenient")]
    pub user_input: Option<bool>,
    /// FISMA impact level
    #[serde(rename = "fismaLevel", deserialize_with = "lenient")]
    pub fisma_level: Option<String>,
    /// Owning group
    #[serde(deserialize_with = "lenient")]
    pub group: Option<String>,
    /// Associated projects
    #[serde(deserialize_with = "lenient")]
    pub projects: Option<Vec<String>>,
    /// Associated systems
    #[serde(deserialize_with = "lenient")]
    pub systems: Option<Vec<String>>,
    /// Healthcare subsets
    #[serde(rename = "subsetInHealthcare", deserialize_with = "lenient")]
    pub subset_in_healthcare: Option<Vec<String>>,
    /// Intended user types
    #[serde(rename = "userType", deserialize_with = "lenient")]
    pub user_type: Option<Vec<String>>,
    /// Maturity model tier
    #[serde(rename = "maturityModelTier", deserialize_with = "lenient")]
    pub maturity_model_tier: Option<u64>,
}

/// Reads a nested object through its loose counterpart
fn loose<'de, D, L, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    L: DeserializeOwned + Into<T>,
{
    let value = Value::deserialize(deserializer)?;
    if !value.is_object() {
        return Ok(None);
    }
    Ok(serde_json::from_value::<L>(value).ok().map(Into::into))
}

fn loose_permissions<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Permissions>, D::Error> {
    loose::<D, LoosePermissions, Permissions>(d)
}

fn loose_reuse<'de, D: Deserializer<'de>>(d: D) -> Result<Option<ReuseFrequency>, D::Error> {
    loose::<D, LooseReuseFrequency, ReuseFrequency>(d)
}

fn loose_date<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DateTriple>, D::Error> {
    loose::<D, LooseDate, DateTriple>(d)
}

fn loose_contact<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Contact>, D::Error> {
    loose::<D, LooseContact, Contact>(d)
}

impl ExistingDocument {
    /// Read a normalized manifest. Never fails: a non-object yields an
    /// empty document.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        if !value.is_object() {
            return Self::default();
        }
        serde_json::from_value(value).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_non_object_unchanged() {
        assert_eq!(normalize(json!("code.json")), json!("code.json"));
        assert_eq!(normalize(json!([1, 2])), json!([1, 2]));
        assert_eq!(normalize(Value::Null), Value::Null);
    }

    #[test]
    fn test_unknown_fields_dropped_at_every_level() {
        let out = normalize(json!({
            "name": "widget",
            "projectURL": "https://example.test",
            "upstream": "",
            "contact": { "email": "a@example.test", "name": "A", "phone": "555" },
            "permissions": { "licenses": [{ "name": "MIT", "URL": "u", "spdx": true }] }
        }));
        assert_eq!(
            out,
            json!({
                "name": "widget",
                "contact": { "email": "a@example.test", "name": "A" },
                "permissions": { "licenses": [{ "name": "MIT", "URL": "u" }] }
            })
        );
    }

    #[test]
    fn test_absent_fields_stay_absent() {
        let out = normalize(json!({ "name": "widget" }));
        assert_eq!(out, json!({ "name": "widget" }));
    }

    #[test]
    fn test_legacy_keys_migrated() {
        let out = normalize(json!({
            "date": { "created": "c", "lastModified": "m", "metaDataLastUpdated": "u" },
            "feedbackMechanisms": ["", "https://example.test/issues"],
            "permissions": { "license": [{ "name": "MIT", "URL": "u" }], "usageType": "openSource" }
        }));
        assert_eq!(out["date"]["metadataLastUpdated"], "u");
        assert!(out["date"].get("metaDataLastUpdated").is_none());
        assert_eq!(out["feedbackMechanism"], "https://example.test/issues");
        assert!(out.get("feedbackMechanisms").is_none());
        assert_eq!(out["permissions"]["licenses"][0]["name"], "MIT");
        assert_eq!(out["permissions"]["usageType"], "openSource");
    }

    #[test]
    fn test_current_keys_win_over_legacy() {
        let out = normalize(json!({
            "feedbackMechanism": "https://example.test/feedback",
            "feedbackMechanisms": ["https://old.test"],
            "date": { "metadataLastUpdated": "new", "metaDataLastUpdated": "old" }
        }));
        assert_eq!(out["feedbackMechanism"], "https://example.test/feedback");
        assert_eq!(out["date"]["metadataLastUpdated"], "new");
    }

    #[test]
    fn test_blank_current_feedback_takes_legacy_entry() {
        let out = normalize(json!({
            "feedbackMechanism": "  ",
            "feedbackMechanisms": ["https://example.test/feedback"]
        }));
        assert_eq!(out, json!({ "feedbackMechanism": "https://example.test/feedback" }));
    }

    #[test]
    fn test_mistyped_known_fields_kept_unknown_dropped() {
        let out = normalize(json!({
            "name": 42,
            "extra": 1,
            "feedbackMechanisms": ["https://example.test/issues"]
        }));
        assert_eq!(out, json!({ "name": 42, "feedbackMechanism": "https://example.test/issues" }));
        assert_eq!(ExistingDocument::from_value(out).name, None);
    }

    #[test]
    fn test_large_maturity_tier_survives() {
        let existing = ExistingDocument::from_value(normalize(json!({
            "maturityModelTier": 5_000_000_000_u64
        })));
        assert_eq!(existing.maturity_model_tier, Some(5_000_000_000));
    }

    #[test]
    fn test_existing_tolerates_bad_types() {
        let existing = ExistingDocument::from_value(json!({
            "name": 42,
            "description": "kept",
            "tags": "not-a-list",
            "laborHours": 12,
            "reuseFrequency": { "forks": "many", "clones": 9 },
            "contact": { "email": "a@example.test" }
        }));
        assert_eq!(existing.name, None);
        assert_eq!(existing.description.as_deref(), Some("kept"));
        assert_eq!(existing.tags, None);
        assert_eq!(existing.labor_hours, Some(12.0));
        assert_eq!(existing.reuse_frequency, Some(ReuseFrequency { forks: 0, clones: Some(9) }));
        assert_eq!(existing.contact.unwrap().name, "");
    }

    #[test]
    fn test_existing_contract_number_shapes() {
        let single = ExistingDocument::from_value(json!({ "contractNumber": "ABC-123" }));
        assert_eq!(single.contract_number, Some(ContractNumber::Single("ABC-123".into())));

        let list = ExistingDocument::from_value(json!({ "contractNumber": ["A", "B"] }));
        assert_eq!(list.contract_number.unwrap().into_list(), vec!["A", "B"]);

        assert!(ContractNumber::Single("  ".into()).into_list().is_empty());
    }

    #[test]
    fn test_existing_from_non_object() {
        let existing = ExistingDocument::from_value(json!(["x"]));
        assert!(existing.name.is_none());
    }
}
