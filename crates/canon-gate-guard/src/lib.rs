// crates/canon-gate-guard/src/lib.rs
// ============================================================================
// Module: Canon Gate Narrative Guard
// Description: Rule-driven validator for state-scoped narrative text.
// Purpose: Deny uncertainty language and rewrite claims that contradict the
//          possession state; fail closed on every rule defect.
// Dependencies: regex, serde, serde_yaml, thiserror
// ============================================================================

//! ## Overview
//! The narrative guard scans free text produced alongside canonical telemetry
//! and decides `PASS`, `DENY`, or `REWRITE` keyed on the possession state.
//! Before scanning, blockquoted lines are dropped and double-quoted spans are
//! neutralized so reported speech never triggers a rule. The guard is
//! fail-closed throughout: an unloadable rule set, a missing rule field, a
//! regex that does not compile, or unmatched quotes all produce `DENY`, never
//! a silent pass.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod rules;

// ============================================================================
// SECTION: Imports
// ============================================================================

use regex::Regex;
use serde::Deserialize;
use serde::Serialize;

use crate::rules::GuardRules;
use crate::rules::RewriteRule;

// ============================================================================
// SECTION: Decisions
// ============================================================================

/// Guard decision kinds.
///
/// # Invariants
/// - Variants are stable for serialization and gate matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GuardDecision {
    /// The text is acceptable as-is.
    Pass,
    /// The text is rejected.
    Deny,
    /// The text must be replaced with the canonical wording.
    Rewrite,
}

/// One rule hit recorded in a verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hit {
    /// Rule identifier that fired.
    pub rule: String,
    /// Detail of the match.
    pub detail: String,
}

/// Outcome of validating one narrative.
///
/// # Invariants
/// - `canonical` is present exactly when the decision is `Rewrite`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardVerdict {
    /// The decision.
    pub decision: GuardDecision,
    /// Canonical replacement wording for rewrites.
    pub canonical: Option<String>,
    /// Rules that fired.
    pub hits: Vec<Hit>,
}

impl GuardVerdict {
    /// Builds the fail-closed `DENY` verdict.
    fn fail_closed(detail: String) -> Self {
        Self {
            decision: GuardDecision::Deny,
            canonical: None,
            hits: vec![Hit {
                rule: "FAIL_CLOSED".to_string(),
                detail,
            }],
        }
    }
}

// ============================================================================
// SECTION: Guard
// ============================================================================

/// Narrative guard bound to a loaded rule set.
///
/// # Invariants
/// - The rule set is immutable once loaded; regexes compile per validation
///   and compilation failures deny.
#[derive(Debug, Clone)]
pub struct NarrativeGuard {
    /// Loaded declarative rules.
    rules: GuardRules,
}

impl NarrativeGuard {
    /// Creates a guard over an explicit rule set.
    #[must_use]
    pub const fn new(rules: GuardRules) -> Self {
        Self {
            rules,
        }
    }

    /// Creates a guard over the built-in default rules.
    ///
    /// # Errors
    ///
    /// Returns [`rules::GuardRulesError`] when the embedded document fails to
    /// parse; callers must treat that as a deny-everything condition.
    pub fn with_default_rules() -> Result<Self, rules::GuardRulesError> {
        Ok(Self::new(GuardRules::default_rules()?))
    }

    /// Validates one narrative against the possession state.
    #[must_use]
    pub fn validate(&self, text: &str, state: Option<&str>) -> GuardVerdict {
        let state = state
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_uppercase);

        // UNVALIDATED allows exactly the structured log line, nothing else.
        if state.as_deref() == Some("UNVALIDATED") {
            let pattern = match Regex::new(&self.rules.unvalidated_gate.allow_log_regex) {
                Ok(pattern) => pattern,
                Err(err) => {
                    return GuardVerdict::fail_closed(format!("allow_log_regex:{err}"));
                }
            };
            if pattern.is_match(text.trim()) {
                return GuardVerdict {
                    decision: GuardDecision::Pass,
                    canonical: None,
                    hits: vec![Hit {
                        rule: "UNVALIDATED_GATE".to_string(),
                        detail: "allow_log_line".to_string(),
                    }],
                };
            }
            return GuardVerdict {
                decision: GuardDecision::Deny,
                canonical: None,
                hits: vec![Hit {
                    rule: "UNVALIDATED_GATE".to_string(),
                    detail: "state_unvalidated_deny_all".to_string(),
                }],
            };
        }

        let scan_text = match neutralize(text) {
            Ok(masked) => masked,
            Err(detail) => return GuardVerdict::fail_closed(detail),
        };

        let mut term_hits: Vec<String> = Vec::new();
        for term in &self.rules.deny_uncertainty.terms {
            let trimmed = term.trim();
            if trimmed.is_empty() {
                continue;
            }
            let pattern = match Regex::new(&format!(r"(?i)\b{}\b", regex::escape(trimmed))) {
                Ok(pattern) => pattern,
                Err(err) => {
                    return GuardVerdict::fail_closed(format!("deny_term_regex:{err}"));
                }
            };
            if pattern.is_match(&scan_text) {
                term_hits.push(trimmed.to_string());
            }
        }
        if !term_hits.is_empty() {
            return GuardVerdict {
                decision: GuardDecision::Deny,
                canonical: None,
                hits: vec![Hit {
                    rule: "DENY_UNCERTAINTY".to_string(),
                    detail: format!("terms={}", term_hits.join(", ")),
                }],
            };
        }

        if state.as_deref() == Some("CONTESTED") {
            return apply_rewrite(
                &self.rules.rewrite_contested_possession_claim,
                "REWRITE_CONTESTED_POSSESSION",
                &scan_text,
            );
        }
        if state.as_deref() == Some("DEAD_BALL") {
            return apply_rewrite(
                &self.rules.rewrite_dead_ball_in_play_claim,
                "REWRITE_DEAD_BALL_IN_PLAY",
                &scan_text,
            );
        }

        GuardVerdict {
            decision: GuardDecision::Pass,
            canonical: None,
            hits: Vec::new(),
        }
    }
}

// ============================================================================
// SECTION: Preprocessing
// ============================================================================

/// Drops blockquote lines and blanks double-quoted spans.
///
/// Returns the fail-closed detail when a line carries unmatched quotes.
fn neutralize(text: &str) -> Result<String, String> {
    let mut masked_lines: Vec<String> = Vec::new();
    for line in text.split('\n') {
        if line.trim_start().starts_with('>') {
            masked_lines.push(String::new());
            continue;
        }
        masked_lines.push(mask_quotes(line)?);
    }
    Ok(masked_lines.join("\n"))
}

/// Blanks characters inside double-quoted spans, keeping the quotes.
fn mask_quotes(line: &str) -> Result<String, String> {
    if !line.contains('"') {
        return Ok(line.to_string());
    }
    let mut masked = String::with_capacity(line.len());
    let mut in_quote = false;
    for ch in line.chars() {
        if ch == '"' {
            in_quote = !in_quote;
            masked.push('"');
        } else if in_quote {
            masked.push(' ');
        } else {
            masked.push(ch);
        }
    }
    if in_quote {
        return Err("UNMATCHED_QUOTES".to_string());
    }
    Ok(masked)
}

// ============================================================================
// SECTION: Rewrite Application
// ============================================================================

/// Applies one state-scoped rewrite rule to neutralized text.
fn apply_rewrite(rule: &RewriteRule, rule_name: &str, scan_text: &str) -> GuardVerdict {
    let pattern = match Regex::new(&rule.regex) {
        Ok(pattern) => pattern,
        Err(err) => {
            return GuardVerdict::fail_closed(format!("{rule_name}:{err}"));
        }
    };
    if pattern.is_match(scan_text) {
        return GuardVerdict {
            decision: GuardDecision::Rewrite,
            canonical: Some(rule.canonical.clone()),
            hits: vec![Hit {
                rule: rule_name.to_string(),
                detail: "matched".to_string(),
            }],
        };
    }
    GuardVerdict {
        decision: GuardDecision::Pass,
        canonical: None,
        hits: Vec::new(),
    }
}
