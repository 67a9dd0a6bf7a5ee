// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Manifest validation against the declarative schema
//!
//! Validation never fails: malformed input of any shape is reported as a
//! list of issues. Issues come out in schema declaration order, one per
//! offending field, so the output is stable across runs.

use crate::schema::{self, CrossFieldRule, Field, Kind, Presence};
use crate::types::{MetadataDocument, ValidationIssue};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_'+\-.]*[A-Za-z0-9_+\-]@([A-Za-z0-9][A-Za-z0-9\-]*\.)+[A-Za-z]{2,}$")
        .expect("email pattern is valid")
});

/// Validate an arbitrary JSON value as a manifest.
///
/// Returns an empty list iff the value fully conforms.
#[must_use]
pub fn validate(document: &Value) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    match document {
        Value::Object(map) => check_object(map, schema::MANIFEST, None, "", &mut issues),
        other => issues.push(mismatch("", "object", other)),
    }
    issues
}

/// Validate a typed manifest.
#[must_use]
pub fn validate_document(document: &MetadataDocument) -> Vec<ValidationIssue> {
    match serde_json::to_value(document) {
        Ok(value) => validate(&value),
        Err(err) => vec![ValidationIssue::new("", format!("document is not serializable: {err}"))],
    }
}

fn check_object(
    map: &Map<String, Value>,
    fields: &[Field],
    rule: Option<CrossFieldRule>,
    prefix: &str,
    issues: &mut Vec<ValidationIssue>,
) {
    for field in fields {
        let path = join(prefix, field.name);
        match map.get(field.name) {
            Some(value) => check_value(value, &field.kind, &path, issues),
            None if field.presence == Presence::Required => {
                issues.push(ValidationIssue::new(
                    path,
                    format!("expected {}, received undefined", field.kind.expected()),
                ));
            }
            None => {}
        }
    }

    if let Some(rule) = rule {
        apply_rule(rule, map, prefix, issues);
    }
}

fn check_value(value: &Value, kind: &Kind, path: &str, issues: &mut Vec<ValidationIssue>) {
    match *kind {
        Kind::Text(required) => match value.as_str() {
            Some("") => {
                if let Some(message) = required {
                    issues.push(ValidationIssue::new(path, message));
                }
            }
            Some(_) => {}
            None => issues.push(mismatch(path, "string", value)),
        },
        Kind::Url { required, invalid } => {
            check_format(value, path, required, invalid, |s| url::Url::parse(s).is_ok(), issues);
        }
        Kind::Email { required, invalid } => {
            check_format(value, path, required, invalid, is_email, issues);
        }
        Kind::Visibility(required) => match value.as_str() {
            Some("") => issues.push(ValidationIssue::new(path, required)),
            Some(s) if !schema::VISIBILITIES.contains(&s) => issues.push(ValidationIssue::new(
                path,
                format!("must be one of: {}", schema::VISIBILITIES.join(", ")),
            )),
            Some(_) => {}
            None => issues.push(mismatch(path, "string", value)),
        },
        Kind::Number => match value.as_f64() {
            Some(n) if n < 0.0 => issues.push(ValidationIssue::new(path, "must not be negative")),
            Some(_) => {}
            None => issues.push(mismatch(path, "number", value)),
        },
        Kind::Count => match value {
            Value::Number(n) if n.is_u64() => {}
            Value::Number(n) if n.as_f64().is_some_and(|f| f < 0.0) => {
                issues.push(ValidationIssue::new(path, "must not be negative"));
            }
            Value::Number(_) => issues.push(ValidationIssue::new(path, "expected integer, received float")),
            other => issues.push(mismatch(path, "number", other)),
        },
        Kind::Flag => {
            if !value.is_boolean() {
                issues.push(mismatch(path, "boolean", value));
            }
        }
        Kind::TextList(min_one) => match value.as_array() {
            Some(items) if items.is_empty() => {
                if let Some(message) = min_one {
                    issues.push(ValidationIssue::new(path, message));
                }
            }
            Some(items) => check_strings(items, path, issues),
            None => issues.push(mismatch(path, "array", value)),
        },
        Kind::TextOrList => match value {
            Value::String(_) => {}
            Value::Array(items) => check_strings(items, path, issues),
            other => issues.push(mismatch(path, "string or array", other)),
        },
        Kind::Object(fields, rule) => match value.as_object() {
            Some(map) => check_object(map, fields, rule, path, issues),
            None => issues.push(mismatch(path, "object", value)),
        },
        Kind::ObjectList(fields, min_one) => match value.as_array() {
            Some(items) if items.is_empty() => {
                if let Some(message) = min_one {
                    issues.push(ValidationIssue::new(path, message));
                }
            }
            Some(items) => {
                for (i, item) in items.iter().enumerate() {
                    let item_path = join(path, &i.to_string());
                    match item.as_object() {
                        Some(map) => check_object(map, fields, None, &item_path, issues),
                        None => issues.push(mismatch(&item_path, "object", item)),
                    }
                }
            }
            None => issues.push(mismatch(path, "array", value)),
        },
    }
}

fn check_format(
    value: &Value,
    path: &str,
    required: Option<&'static str>,
    invalid: &'static str,
    accepts: impl Fn(&str) -> bool,
    issues: &mut Vec<ValidationIssue>,
) {
    match value.as_str() {
        Some("") if required.is_some() => {
            issues.push(ValidationIssue::new(path, required.unwrap_or(invalid)));
        }
        Some(s) if !accepts(s) => issues.push(ValidationIssue::new(path, invalid)),
        Some(_) => {}
        None => issues.push(mismatch(path, "string", value)),
    }
}

fn check_strings(items: &[Value], path: &str, issues: &mut Vec<ValidationIssue>) {
    for (i, item) in items.iter().enumerate() {
        if !item.is_string() {
            issues.push(mismatch(&join(path, &i.to_string()), "string", item));
        }
    }
}

fn apply_rule(
    rule: CrossFieldRule,
    map: &Map<String, Value>,
    prefix: &str,
    issues: &mut Vec<ValidationIssue>,
) {
    match rule {
        CrossFieldRule::ExemptionText => {
            // A missing or mistyped exemptionText was already reported above
            let Some(text) = map.get("exemptionText").and_then(Value::as_str) else {
                return;
            };
            let claims_exemption = usage_tokens(map.get("usageType"))
                .iter()
                .any(|token| token.starts_with(schema::EXEMPTION_PREFIX));
            if claims_exemption && text.trim().is_empty() {
                issues.push(ValidationIssue::new(
                    join(prefix, "exemptionText"),
                    "exemptionText is required when usageType contains an exemption",
                ));
            }
        }
    }
}

fn usage_tokens(value: Option<&Value>) -> Vec<&str> {
    match value {
        Some(Value::String(token)) => vec![token.as_str()],
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

fn is_email(s: &str) -> bool {
    !s.starts_with('.') && !s.contains("..") && EMAIL.is_match(s)
}

fn mismatch(path: &str, expected: &str, actual: &Value) -> ValidationIssue {
    ValidationIssue::new(path, format!("expected {expected}, received {}", json_type(actual)))
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}
