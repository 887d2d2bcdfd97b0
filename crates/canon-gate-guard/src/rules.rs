// crates/canon-gate-guard/src/rules.rs
// ============================================================================
// Module: Guard Rule Set
// Description: Declarative narrative guard rules loaded from YAML.
// Purpose: Keep the guard's vocabulary data, not code.
// Dependencies: serde, serde_yaml, thiserror
// ============================================================================

//! ## Overview
//! The rule document declares a deny-list of uncertainty terms, two
//! state-scoped rewrite rules with a regex and canonical replacement each,
//! and the `UNVALIDATED` gate regex. Every field is mandatory: a document
//! missing a rule or a field fails to load, and the guard treats an
//! unloadable rule set as deny-everything.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Built-in default rule document.
const DEFAULT_RULES_YAML: &str = include_str!("../rules/narrative_rules.yaml");

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Rule set loading errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling; callers must deny on any
///   variant.
#[derive(Debug, Error)]
pub enum GuardRulesError {
    /// The rules file could not be read.
    #[error("guard rules io error: {0}")]
    Io(String),
    /// The rules document was malformed or missing fields.
    #[error("guard rules parse error: {0}")]
    Parse(String),
}

// ============================================================================
// SECTION: Rule Records
// ============================================================================

/// Deny-list of uncertainty terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenyRule {
    /// Terms matched on word boundaries, case-insensitively.
    pub terms: Vec<String>,
}

/// One state-scoped rewrite rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteRule {
    /// Pattern identifying the offending claim.
    pub regex: String,
    /// Canonical wording substituted on rewrite.
    pub canonical: String,
}

/// The `UNVALIDATED` gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnvalidatedGate {
    /// Pattern the only allowed log line must match.
    pub allow_log_regex: String,
}

/// The full guard rule set.
///
/// # Invariants
/// - All rules are mandatory; partial documents do not load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardRules {
    /// Uncertainty deny-list.
    pub deny_uncertainty: DenyRule,
    /// Rewrite rule scoped to `CONTESTED`.
    pub rewrite_contested_possession_claim: RewriteRule,
    /// Rewrite rule scoped to `DEAD_BALL`.
    pub rewrite_dead_ball_in_play_claim: RewriteRule,
    /// Gate scoped to `UNVALIDATED`.
    pub unvalidated_gate: UnvalidatedGate,
}

/// Wrapper matching the on-disk document shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct GuardRulesDocument {
    /// The rule set.
    rules: GuardRules,
}

impl GuardRules {
    /// Loads the built-in default rule set.
    ///
    /// # Errors
    ///
    /// Returns [`GuardRulesError`] when the embedded document fails to parse.
    pub fn default_rules() -> Result<Self, GuardRulesError> {
        Self::from_yaml_str(DEFAULT_RULES_YAML)
    }

    /// Loads a rule set from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`GuardRulesError`] on I/O or parse failure.
    pub fn from_yaml_file(path: &Path) -> Result<Self, GuardRulesError> {
        let raw = fs::read_to_string(path).map_err(|err| GuardRulesError::Io(err.to_string()))?;
        Self::from_yaml_str(&raw)
    }

    /// Parses a rule set from YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`GuardRulesError`] when the document is malformed or any rule
    /// field is missing.
    pub fn from_yaml_str(raw: &str) -> Result<Self, GuardRulesError> {
        let document: GuardRulesDocument =
            serde_yaml::from_str(raw).map_err(|err| GuardRulesError::Parse(err.to_string()))?;
        Ok(document.rules)
    }
}
