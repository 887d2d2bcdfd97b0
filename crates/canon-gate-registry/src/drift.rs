// crates/canon-gate-registry/src/drift.rs
// ============================================================================
// Module: Drift Checker
// Description: Registry-vs-code enumeration drift and alias collision audit.
// Purpose: Catch silent divergence between declarations and code.
// Dependencies: canon-gate-core, serde, serde_json, serde_yaml, thiserror
// ============================================================================

//! ## Overview
//! The drift checker compares the lists declared in the canonical action
//! registry (actions, aliases, possession effects, allowed states,
//! fail-closed defaults) against a JSON export of the code-side
//! enumerations. Exact set differences are drift; a doc-only/code-only pair
//! whose token overlap reaches the similarity threshold is downgraded to a
//! rename warning. Alias collisions under normalization are always critical.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Token-overlap ratio at which a drift pair is treated as a rename.
const SIMILARITY_THRESHOLD: f64 = 0.6;

/// Maximum collision examples retained per normalized alias.
const MAX_COLLISION_EXAMPLES: usize = 10;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Drift checker input errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling; all map to exit code 2 in
///   the CLI.
#[derive(Debug, Error)]
pub enum DriftError {
    /// An input file could not be read.
    #[error("drift input io error: {0}")]
    Io(String),
    /// An input file could not be parsed.
    #[error("drift input parse error: {0}")]
    Parse(String),
    /// The registry document had an unexpected shape.
    #[error("registry document must be a sequence of records")]
    RegistryShape,
}

// ============================================================================
// SECTION: Report Types
// ============================================================================

/// A doc/code pair judged to be a rename rather than true drift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftMismatch {
    /// The registry-side token.
    pub doc: String,
    /// The code-side token.
    pub code: String,
}

/// Set comparison for one enumeration key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftDetail {
    /// Tokens present only in the registry.
    pub doc_only: Vec<String>,
    /// Tokens present only in the code export.
    pub code_only: Vec<String>,
    /// Pairs downgraded to rename warnings.
    pub mismatch: Vec<DriftMismatch>,
}

/// Aliases colliding under normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasCollision {
    /// The normalized token both aliases map to.
    pub normalized: String,
    /// Raw spellings involved (bounded).
    pub examples: Vec<String>,
    /// Total colliding spellings.
    pub count: usize,
}

/// Aggregate drift counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftSummary {
    /// Tokens only in the registry, across all keys.
    pub doc_only_count: usize,
    /// Tokens only in the code export, across all keys.
    pub code_only_count: usize,
    /// Rename warnings, across all keys.
    pub mismatch_count: usize,
    /// Alias collisions.
    pub alias_collision_count: usize,
}

/// Full drift report.
///
/// # Invariants
/// - Serialization is deterministic: keyed maps are ordered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftReport {
    /// Aggregate counters.
    pub summary: DriftSummary,
    /// Per-key set comparisons.
    pub details: BTreeMap<String, DriftDetail>,
    /// Alias collisions under normalization.
    pub alias_collisions: Vec<AliasCollision>,
}

impl DriftReport {
    /// Returns whether the report should fail a gate.
    #[must_use]
    pub const fn has_drift(&self) -> bool {
        self.summary.doc_only_count > 0
            || self.summary.code_only_count > 0
            || self.summary.alias_collision_count > 0
    }
}

// ============================================================================
// SECTION: Registry Extraction
// ============================================================================

/// Lists declared by the registry, extracted for comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryDecls {
    /// Canonical action identifiers.
    pub canonical_actions: Vec<String>,
    /// Raw alias spellings (kept unsorted for collision analysis).
    pub aliases: Vec<String>,
    /// Possession effect tokens.
    pub possession_effects: Vec<String>,
    /// Allowed state tokens.
    pub allowed_states: Vec<String>,
    /// Fail-closed default tokens.
    pub fail_closed_defaults: Vec<String>,
}

/// Extracts declaration lists from a parsed registry document.
///
/// # Errors
///
/// Returns [`DriftError::RegistryShape`] when the root is not a sequence.
pub fn extract_registry_decls(document: &Value) -> Result<RegistryDecls, DriftError> {
    let Value::Array(records) = document else {
        return Err(DriftError::RegistryShape);
    };

    let mut decls = RegistryDecls::default();
    for record in records {
        let Value::Object(fields) = record else {
            continue;
        };
        if let Some(action) = fields.get("canonical_action").and_then(Value::as_str) {
            decls.canonical_actions.push(action.to_string());
        }
        if let Some(Value::Array(aliases)) = fields.get("aliases") {
            for alias in aliases {
                if let Some(token) = alias.as_str() {
                    decls.aliases.push(token.to_string());
                }
            }
        }
        if let Some(effect) = fields.get("possession_effect").and_then(Value::as_str) {
            decls.possession_effects.push(effect.to_string());
        }
        if let Some(Value::Array(states)) = fields.get("allowed_states") {
            for state in states {
                if let Some(token) = state.as_str() {
                    decls.allowed_states.push(token.to_string());
                }
            }
        }
        if let Some(default) = fields.get("fail_closed_default").and_then(Value::as_str) {
            decls.fail_closed_defaults.push(default.to_string());
        }
    }
    Ok(decls)
}

/// Loads and extracts registry declarations from a YAML file.
///
/// # Errors
///
/// Returns [`DriftError`] on I/O, parse, or shape failure.
pub fn load_registry_decls(path: &Path) -> Result<RegistryDecls, DriftError> {
    let raw = fs::read_to_string(path).map_err(|err| DriftError::Io(err.to_string()))?;
    let document: Value =
        serde_yaml::from_str(&raw).map_err(|err| DriftError::Parse(err.to_string()))?;
    extract_registry_decls(&document)
}

/// Loads the code-enums export: a JSON object of string lists.
///
/// # Errors
///
/// Returns [`DriftError`] on I/O or parse failure.
pub fn load_code_enums(path: &Path) -> Result<BTreeMap<String, Vec<String>>, DriftError> {
    let raw = fs::read_to_string(path).map_err(|err| DriftError::Io(err.to_string()))?;
    let document: Value =
        serde_json::from_str(&raw).map_err(|err| DriftError::Parse(err.to_string()))?;
    let Value::Object(entries) = document else {
        return Err(DriftError::Parse("code enums export must be an object".to_string()));
    };
    let mut out = BTreeMap::new();
    for (key, value) in entries {
        if let Value::Array(tokens) = value {
            out.insert(
                key,
                tokens.iter().filter_map(Value::as_str).map(str::to_string).collect(),
            );
        }
    }
    Ok(out)
}

// ============================================================================
// SECTION: Comparison
// ============================================================================

/// Builds the drift report from registry declarations and code enums.
#[must_use]
pub fn check_drift(decls: &RegistryDecls, code: &BTreeMap<String, Vec<String>>) -> DriftReport {
    let doc_lists: BTreeMap<String, Vec<String>> = BTreeMap::from([
        ("canonical_actions".to_string(), sorted_unique(&decls.canonical_actions)),
        ("aliases".to_string(), sorted_unique(&decls.aliases)),
        ("possession_effects".to_string(), sorted_unique(&decls.possession_effects)),
        ("allowed_states".to_string(), sorted_unique(&decls.allowed_states)),
        ("fail_closed_defaults".to_string(), sorted_unique(&decls.fail_closed_defaults)),
    ]);

    let mut keys: BTreeSet<String> = doc_lists.keys().cloned().collect();
    keys.extend(code.keys().cloned());

    let mut details = BTreeMap::new();
    let mut doc_only_count = 0;
    let mut code_only_count = 0;
    let mut mismatch_count = 0;

    for key in keys {
        let doc_list = doc_lists.get(&key).cloned().unwrap_or_default();
        let code_list = code.get(&key).cloned().unwrap_or_default();
        let detail = compare_lists(&doc_list, &code_list);
        doc_only_count += detail.doc_only.len();
        code_only_count += detail.code_only.len();
        mismatch_count += detail.mismatch.len();
        details.insert(key, detail);
    }

    let alias_collisions = check_alias_collisions(&decls.aliases);

    DriftReport {
        summary: DriftSummary {
            doc_only_count,
            code_only_count,
            mismatch_count,
            alias_collision_count: alias_collisions.len(),
        },
        details,
        alias_collisions,
    }
}

/// Compares two token lists; near-matches become rename warnings.
fn compare_lists(doc_list: &[String], code_list: &[String]) -> DriftDetail {
    let doc_set: BTreeSet<&String> = doc_list.iter().collect();
    let code_set: BTreeSet<&String> = code_list.iter().collect();

    let mut doc_only: Vec<String> =
        doc_set.difference(&code_set).map(|token| (*token).clone()).collect();
    let mut code_only: Vec<String> =
        code_set.difference(&doc_set).map(|token| (*token).clone()).collect();

    let mut mismatch = Vec::new();
    let mut remaining_doc = Vec::new();
    for doc_token in doc_only.drain(..) {
        let matched = code_only
            .iter()
            .position(|code_token| similar(&doc_token, code_token));
        if let Some(index) = matched {
            let code_token = code_only.remove(index);
            mismatch.push(DriftMismatch {
                doc: doc_token,
                code: code_token,
            });
        } else {
            remaining_doc.push(doc_token);
        }
    }

    DriftDetail {
        doc_only: remaining_doc,
        code_only,
        mismatch,
    }
}

/// Token-overlap similarity over underscore-normalized names.
fn similar(lhs: &str, rhs: &str) -> bool {
    let lhs_tokens = name_tokens(lhs);
    let rhs_tokens = name_tokens(rhs);
    if lhs_tokens.is_empty() || rhs_tokens.is_empty() {
        return false;
    }
    let overlap = lhs_tokens.intersection(&rhs_tokens).count();
    let denom = lhs_tokens.len().max(rhs_tokens.len());
    ratio(overlap, denom) >= SIMILARITY_THRESHOLD
}

/// Splits a name into lowercase tokens on whitespace, dashes, underscores.
fn name_tokens(name: &str) -> BTreeSet<String> {
    name.to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Detects alias spellings colliding under lower+trim normalization.
fn check_alias_collisions(aliases: &[String]) -> Vec<AliasCollision> {
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for alias in aliases {
        let normalized = alias.trim().to_lowercase();
        groups.entry(normalized).or_default().push(alias.clone());
    }
    groups
        .into_iter()
        .filter(|(_, group)| group.len() > 1)
        .map(|(normalized, group)| AliasCollision {
            normalized,
            count: group.len(),
            examples: group.into_iter().take(MAX_COLLISION_EXAMPLES).collect(),
        })
        .collect()
}

/// Sorted, deduplicated copy of a token list.
fn sorted_unique(tokens: &[String]) -> Vec<String> {
    let set: BTreeSet<&String> = tokens.iter().collect();
    set.into_iter().cloned().collect()
}

/// Converts a count ratio into `f64`.
#[allow(clippy::cast_precision_loss, reason = "token counts are tiny")]
fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 { 0.0 } else { numerator as f64 / denominator as f64 }
}

// ============================================================================
// SECTION: Markdown Rendering
// ============================================================================

/// Renders the drift report as human-readable markdown.
#[must_use]
pub fn render_markdown(report: &DriftReport) -> String {
    let mut out = String::from("# Drift Report\n\n## Summary\n");
    out.push_str(&format!("- Doc-only: {}\n", report.summary.doc_only_count));
    out.push_str(&format!("- Code-only: {}\n", report.summary.code_only_count));
    out.push_str(&format!("- Mismatch (WARN): {}\n", report.summary.mismatch_count));
    out.push_str(&format!(
        "- Alias collisions: {}\n\n## Details\n\n",
        report.summary.alias_collision_count
    ));
    for (key, detail) in &report.details {
        out.push_str(&format!("### {key}\n"));
        out.push_str(&format!("- Doc-only: {}\n", detail.doc_only.join(", ")));
        out.push_str(&format!("- Code-only: {}\n", detail.code_only.join(", ")));
        let renames: Vec<String> = detail
            .mismatch
            .iter()
            .map(|pair| format!("{} -> {}", pair.doc, pair.code))
            .collect();
        out.push_str(&format!("- Mismatch: {}\n\n", renames.join(", ")));
    }
    out.push_str("## Alias Collisions\n");
    for collision in &report.alias_collisions {
        out.push_str(&format!(
            "- normalized='{}' count={} examples={}\n",
            collision.normalized,
            collision.count,
            collision.examples.join(", ")
        ));
    }
    out
}
