// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Three-way reconcile of baseline, persisted and freshly collected fields

use crate::legacy::ExistingDocument;
use crate::types::{
    Contact, DateTriple, License, MetadataDocument, Permissions, ReuseFrequency, UsageType,
    Visibility,
};
use chrono::{DateTime, SecondsFormat, Utc};

/// Source of the current instant
pub trait Clock: Send + Sync {
    /// Current instant
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Manifest timestamp format: RFC 3339, UTC, millisecond precision
#[must_use]
pub fn timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Values derived automatically from the hosting API and the line counter
#[derive(Debug, Clone, PartialEq)]
pub struct CollectedFields {
    /// Repository name
    pub name: String,
    /// Repository description, possibly empty
    pub description: String,
    /// Repository web URL
    pub repository_url: String,
    /// Repository visibility
    pub repository_visibility: Visibility,
    /// Estimated labor hours
    pub labor_hours: f64,
    /// Languages, most used first
    pub languages: Vec<String>,
    /// Fork count
    pub forks: Option<u64>,
    /// Topic tags
    pub tags: Vec<String>,
    /// Repository creation timestamp
    pub created: Option<String>,
    /// Last repository modification timestamp
    pub last_modified: Option<String>,
    /// Manifest refresh timestamp, synthesized from the clock when absent
    pub metadata_last_updated: Option<String>,
}

impl MetadataDocument {
    /// The all-defaults starting document
    #[must_use]
    pub fn baseline() -> Self {
        Self {
            name: String::new(),
            version: Some(String::new()),
            description: String::new(),
            long_description: String::new(),
            status: String::new(),
            permissions: Permissions {
                licenses: vec![License { name: String::new(), url: String::new() }],
                usage_type: UsageType::Many(Vec::new()),
                exemption_text: String::new(),
            },
            organization: String::new(),
            repository_url: String::new(),
            repository_host: "github".into(),
            repository_visibility: String::new(),
            homepage_url: Some(String::new()),
            download_url: Some(String::new()),
            disclaimer_url: Some(String::new()),
            disclaimer_text: Some(String::new()),
            vcs: "git".into(),
            labor_hours: 0.0,
            reuse_frequency: ReuseFrequency { forks: 0, clones: Some(0) },
            platforms: Vec::new(),
            categories: Vec::new(),
            software_type: String::new(),
            languages: Vec::new(),
            maintenance: String::new(),
            contract_number: Vec::new(),
            sbom: String::new(),
            related_code: Some(Vec::new()),
            reused_code: Some(Vec::new()),
            partners: Some(Vec::new()),
            date: DateTriple::default(),
            tags: Vec::new(),
            contact: Contact::default(),
            feedback_mechanism: String::new(),
            ai_use_case_id: "0".into(),
            localisation: false,
            repository_type: String::new(),
            user_input: false,
            fisma_level: String::new(),
            group: String::new(),
            projects: Vec::new(),
            systems: Vec::new(),
            subset_in_healthcare: Vec::new(),
            user_type: Vec::new(),
            maturity_model_tier: 0,
        }
    }
}

/// Replace each target field with the existing value when one was read
macro_rules! overlay {
    ($doc:ident, $existing:ident, $($field:ident),+ $(,)?) => {
        $(
            if let Some(value) = &$existing.$field {
                $doc.$field = value.clone();
            }
        )+
    };
}

/// Same as `overlay!` for fields that are optional in the manifest
macro_rules! overlay_optional {
    ($doc:ident, $existing:ident, $($field:ident),+ $(,)?) => {
        $(
            if let Some(value) = &$existing.$field {
                $doc.$field = Some(value.clone());
            }
        )+
    };
}

/// Combine baseline, existing and collected values into the final manifest.
///
/// Precedence, lowest first: baseline, existing, collected. Carry-forward
/// rules for description, tags, feedback mechanism, SBOM, clone counts and
/// contract numbers are applied on top. The clock is consulted only when
/// the collected fields carry no refresh timestamp.
#[must_use]
pub fn reconcile(
    baseline: &MetadataDocument,
    existing: Option<&ExistingDocument>,
    collected: &CollectedFields,
    clock: &dyn Clock,
) -> MetadataDocument {
    let mut doc = baseline.clone();

    if let Some(existing) = existing {
        overlay!(
            doc,
            existing,
            name,
            description,
            long_description,
            status,
            permissions,
            organization,
            repository_url,
            repository_host,
            repository_visibility,
            vcs,
            labor_hours,
            reuse_frequency,
            platforms,
            categories,
            software_type,
            languages,
            maintenance,
            sbom,
            date,
            tags,
            contact,
            feedback_mechanism,
            ai_use_case_id,
            localisation,
            repository_type,
            user_input,
            fisma_level,
            group,
            projects,
            systems,
            subset_in_healthcare,
            user_type,
            maturity_model_tier,
        );
        overlay_optional!(
            doc,
            existing,
            version,
            homepage_url,
            download_url,
            disclaimer_url,
            disclaimer_text,
            related_code,
            reused_code,
            partners,
        );
        if let Some(contract_number) = &existing.contract_number {
            doc.contract_number = contract_number.clone().into_list();
        }
    }

    doc.name = collected.name.clone();
    doc.repository_url = collected.repository_url.clone();
    doc.repository_visibility = collected.repository_visibility.as_str().to_string();
    doc.labor_hours = collected.labor_hours;
    doc.languages = collected.languages.clone();

    doc.description = if collected.description.trim().is_empty() {
        existing.and_then(|e| e.description.clone()).unwrap_or_default()
    } else {
        collected.description.clone()
    };

    doc.tags = if collected.tags.is_empty() {
        existing.and_then(|e| e.tags.clone()).unwrap_or_default()
    } else {
        collected.tags.clone()
    };

    doc.feedback_mechanism = existing
        .and_then(|e| e.feedback_mechanism.clone())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| format!("{}/issues", collected.repository_url));

    doc.sbom = existing
        .and_then(|e| e.sbom.clone())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| format!("{}/network/dependencies", collected.repository_url));

    doc.reuse_frequency = ReuseFrequency {
        forks: collected.forks.unwrap_or(0),
        clones: Some(
            existing
                .and_then(|e| e.reuse_frequency)
                .and_then(|r| r.clones)
                .unwrap_or(0),
        ),
    };

    doc.date = DateTriple {
        created: collected.created.clone().unwrap_or_default(),
        last_modified: collected.last_modified.clone().unwrap_or_default(),
        metadata_last_updated: collected
            .metadata_last_updated
            .clone()
            .unwrap_or_else(|| timestamp(clock.now())),
    };

    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::legacy::ContractNumber;
    use chrono::TimeZone;

    fn clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap())
    }

    fn collected() -> CollectedFields {
        CollectedFields {
            name: "widget".into(),
            description: "Widget service".into(),
            repository_url: "https://example.test/org/widget".into(),
            repository_visibility: Visibility::Public,
            labor_hours: 2191.0,
            languages: vec!["Rust".into(), "Shell".into()],
            forks: Some(4),
            tags: vec!["cli".into()],
            created: Some("2024-01-01T00:00:00Z".into()),
            last_modified: Some("2024-06-01T00:00:00Z".into()),
            metadata_last_updated: None,
        }
    }

    fn run(existing: Option<&ExistingDocument>, collected: &CollectedFields) -> MetadataDocument {
        reconcile(&MetadataDocument::baseline(), existing, collected, &clock())
    }

    #[test]
    fn test_no_existing_uses_baseline_and_collected() {
        let doc = run(None, &collected());
        assert_eq!(doc.name, "widget");
        assert_eq!(doc.repository_visibility, "public");
        assert_eq!(doc.repository_host, "github");
        assert_eq!(doc.ai_use_case_id, "0");
        assert_eq!(doc.feedback_mechanism, "https://example.test/org/widget/issues");
        assert_eq!(doc.sbom, "https://example.test/org/widget/network/dependencies");
        assert_eq!(doc.reuse_frequency, ReuseFrequency { forks: 4, clones: Some(0) });
        assert_eq!(doc.date.metadata_last_updated, "2025-03-04T05:06:07.000Z");
    }

    #[test]
    fn test_existing_overrides_baseline() {
        let existing = ExistingDocument {
            organization: Some("Example Agency".into()),
            vcs: Some("hg".into()),
            partners: Some(vec![]),
            homepage_url: Some("https://example.test".into()),
            ..ExistingDocument::default()
        };
        let doc = run(Some(&existing), &collected());
        assert_eq!(doc.organization, "Example Agency");
        assert_eq!(doc.vcs, "hg");
        assert_eq!(doc.homepage_url.as_deref(), Some("https://example.test"));
        assert_eq!(doc.status, "");
    }

    #[test]
    fn test_collected_overrides_existing() {
        let existing = ExistingDocument {
            name: Some("old-name".into()),
            languages: Some(vec!["COBOL".into()]),
            labor_hours: Some(5.0),
            ..ExistingDocument::default()
        };
        let doc = run(Some(&existing), &collected());
        assert_eq!(doc.name, "widget");
        assert_eq!(doc.languages, vec!["Rust", "Shell"]);
        assert!((doc.labor_hours - 2191.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_blank_description_keeps_existing() {
        let existing = ExistingDocument {
            description: Some("Hand-written".into()),
            ..ExistingDocument::default()
        };
        let mut fresh = collected();
        fresh.description = "   ".into();
        assert_eq!(run(Some(&existing), &fresh).description, "Hand-written");
        assert_eq!(run(None, &fresh).description, "");
    }

    #[test]
    fn test_empty_topics_keep_existing_tags() {
        let existing = ExistingDocument {
            tags: Some(vec!["health".into(), "api".into()]),
            ..ExistingDocument::default()
        };
        let mut fresh = collected();
        fresh.tags.clear();
        assert_eq!(run(Some(&existing), &fresh).tags, vec!["health", "api"]);

        fresh.tags = vec!["new".into()];
        assert_eq!(run(Some(&existing), &fresh).tags, vec!["new"]);
    }

    #[test]
    fn test_feedback_and_sbom_carried_forward() {
        let existing = ExistingDocument {
            feedback_mechanism: Some("mailto:team@example.test".into()),
            sbom: Some("https://example.test/sbom.json".into()),
            ..ExistingDocument::default()
        };
        let doc = run(Some(&existing), &collected());
        assert_eq!(doc.feedback_mechanism, "mailto:team@example.test");
        assert_eq!(doc.sbom, "https://example.test/sbom.json");

        let blank = ExistingDocument {
            feedback_mechanism: Some(String::new()),
            sbom: Some(String::new()),
            ..ExistingDocument::default()
        };
        let doc = run(Some(&blank), &collected());
        assert_eq!(doc.feedback_mechanism, "https://example.test/org/widget/issues");
        assert_eq!(doc.sbom, "https://example.test/org/widget/network/dependencies");
    }

    #[test]
    fn test_clones_survive_and_forks_refresh() {
        let existing = ExistingDocument {
            reuse_frequency: Some(ReuseFrequency { forks: 99, clones: Some(17) }),
            ..ExistingDocument::default()
        };
        let mut fresh = collected();
        fresh.forks = None;
        let doc = run(Some(&existing), &fresh);
        assert_eq!(doc.reuse_frequency, ReuseFrequency { forks: 0, clones: Some(17) });
    }

    #[test]
    fn test_dates_come_from_collected() {
        let existing = ExistingDocument {
            date: Some(DateTriple {
                created: "old".into(),
                last_modified: "old".into(),
                metadata_last_updated: "old".into(),
            }),
            ..ExistingDocument::default()
        };
        let mut fresh = collected();
        fresh.created = None;
        fresh.metadata_last_updated = Some("2025-01-01T00:00:00.000Z".into());
        let doc = run(Some(&existing), &fresh);
        assert_eq!(doc.date.created, "");
        assert_eq!(doc.date.last_modified, "2024-06-01T00:00:00Z");
        assert_eq!(doc.date.metadata_last_updated, "2025-01-01T00:00:00.000Z");
    }

    #[test]
    fn test_contract_number_migration() {
        let cases = [
            (ContractNumber::Single("ABC-123".into()), vec!["ABC-123".to_string()]),
            (ContractNumber::Single("  ".into()), vec![]),
            (ContractNumber::List(vec!["A".into(), " ".into()]), vec!["A".to_string(), " ".to_string()]),
        ];
        for (legacy, expected) in cases {
            let existing = ExistingDocument {
                contract_number: Some(legacy),
                ..ExistingDocument::default()
            };
            assert_eq!(run(Some(&existing), &collected()).contract_number, expected);
        }
    }

    #[test]
    fn test_deterministic() {
        let existing = ExistingDocument {
            status: Some("Production".into()),
            ..ExistingDocument::default()
        };
        let a = run(Some(&existing), &collected());
        let b = run(Some(&existing), &collected());
        assert_eq!(serde_json::to_string(&a).unwrap(), serde_json::to_string(&b).unwrap());
    }
}
