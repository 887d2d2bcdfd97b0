// crates/canon-gate-registry/src/integrity.rs
// ============================================================================
// Module: Registry Constitution Check
// Description: Self-integrity gate for the canonical action registry file.
// Purpose: Catch structural and purity violations before the registry is
//          trusted anywhere else.
// Dependencies: regex, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The registry constitution is a JSON document `{schema_version, actions}`
//! where every action key is UPPER_SNAKE_CASE with single underscores and
//! every action value carries a recognized `status`. The raw file text must
//! not contain vendor-branded keywords; provider identity never leaks into
//! the canonical vocabulary. All per-action violations are collected and
//! reported together so one run surfaces the full damage.

// ============================================================================
// SECTION: Imports
// ============================================================================

use regex::Regex;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Recognized action lifecycle statuses.
const VALID_STATUSES: [&str; 3] = ["core", "aurelia", "deprecated"];

/// Keywords that must never appear in the registry text.
const FORBIDDEN_KEYWORDS: [&str; 6] =
    ["vendor", "opta", "statsbomb", "skillcorner", "wyscout", "sportsbase"];

/// Shape every action key must match.
const UPPER_SNAKE_CASE_PATTERN: &str = r"^[A-Z0-9]+(?:_[A-Z0-9]+)*$";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Constitution check failures.
///
/// # Invariants
/// - Variants are stable for programmatic handling; any variant is terminal
///   for the registry under test.
#[derive(Debug, Error)]
pub enum IntegrityError {
    /// Vendor-branded keywords appeared in the raw registry text.
    #[error("vendor keyword(s) leaked into action registry: {0}")]
    VendorLeak(String),
    /// The registry was not parseable JSON.
    #[error("invalid registry json: {0}")]
    Parse(String),
    /// The document root was not an object.
    #[error("registry root must be an object")]
    RootNotObject,
    /// `schema_version` was missing or empty.
    #[error("schema_version must be a non-empty string")]
    BadSchemaVersion,
    /// `actions` was missing, not an object, or empty.
    #[error("actions must be a non-empty object")]
    BadActions,
    /// Per-action violations, collected.
    #[error("registry constitution violations:\n{0}")]
    Violations(String),
    /// The key-shape pattern failed to compile; fail closed.
    #[error("constitution pattern error: {0}")]
    Pattern(String),
}

// ============================================================================
// SECTION: Check
// ============================================================================

/// Checks the raw registry text against its constitution.
///
/// # Errors
///
/// Returns [`IntegrityError`] on the first structural failure, or with every
/// collected per-action violation.
pub fn check_registry_constitution(raw: &str) -> Result<(), IntegrityError> {
    let lowered = raw.to_lowercase();
    let leaked: Vec<&str> = FORBIDDEN_KEYWORDS
        .into_iter()
        .filter(|keyword| lowered.contains(keyword))
        .collect();
    if !leaked.is_empty() {
        return Err(IntegrityError::VendorLeak(leaked.join(", ")));
    }

    let document: Value =
        serde_json::from_str(raw).map_err(|err| IntegrityError::Parse(err.to_string()))?;
    let Value::Object(root) = &document else {
        return Err(IntegrityError::RootNotObject);
    };

    let schema_version_ok = root
        .get("schema_version")
        .and_then(Value::as_str)
        .is_some_and(|version| !version.trim().is_empty());
    if !schema_version_ok {
        return Err(IntegrityError::BadSchemaVersion);
    }

    let Some(Value::Object(actions)) = root.get("actions") else {
        return Err(IntegrityError::BadActions);
    };
    if actions.is_empty() {
        return Err(IntegrityError::BadActions);
    }

    let key_shape = Regex::new(UPPER_SNAKE_CASE_PATTERN)
        .map_err(|err| IntegrityError::Pattern(err.to_string()))?;

    let mut violations: Vec<String> = Vec::new();
    for (key, value) in actions {
        if key.trim().is_empty() {
            violations.push(format!("- {key}: action key must be a non-empty string"));
            continue;
        }
        if !key_shape.is_match(key) {
            violations.push(format!(
                "- {key}: action key must be UPPER_SNAKE_CASE with single underscores only"
            ));
        }
        if key.contains("__") {
            violations.push(format!("- {key}: action key must not contain double underscores"));
        }

        let Value::Object(fields) = value else {
            violations.push(format!("- {key}: action value must be an object"));
            continue;
        };
        match fields.get("status") {
            None => violations.push(format!("- {key}: missing required field 'status'")),
            Some(Value::String(status)) => {
                if !VALID_STATUSES.contains(&status.as_str()) {
                    violations.push(format!(
                        "- {key}: invalid status '{status}', must be one of {}",
                        VALID_STATUSES.join("|")
                    ));
                }
            }
            Some(_) => violations.push(format!("- {key}: status must be a string")),
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(IntegrityError::Violations(violations.join("\n")))
    }
}
