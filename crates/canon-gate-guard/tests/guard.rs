// crates/canon-gate-guard/tests/guard.rs
// ============================================================================
// Module: Narrative Guard Tests
// Description: Deny, rewrite, and pass decisions with quote neutralization.
// Purpose: Pin the fail-closed narrative validation contract.
// Dependencies: canon-gate-guard
// ============================================================================

//! Narrative guard behavior tests.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions and helpers are permitted."
)]

use canon_gate_guard::GuardDecision;
use canon_gate_guard::NarrativeGuard;
use canon_gate_guard::rules::GuardRules;

/// Builds a guard over the built-in rules.
fn guard() -> NarrativeGuard {
    NarrativeGuard::with_default_rules().unwrap()
}

#[test]
fn plain_observation_passes() {
    let verdict = guard().validate("Observation: Pas, (x=45, y=30).", Some("CONTROLLED"));
    assert_eq!(verdict.decision, GuardDecision::Pass, "plain observations pass");
}

#[test]
fn banned_terms_inside_quotes_are_neutralized() {
    let verdict =
        guard().validate("Oyuncu dedi ki: \"maybe we were winning\"", Some("CONTROLLED"));
    assert_eq!(verdict.decision, GuardDecision::Pass, "reported speech never triggers");
}

#[test]
fn uncertainty_terms_deny_case_insensitively() {
    let samples = [
        "Belki takım üstün.",
        "muhtemelen kazanıyorlar",
        "I think they are in control",
        "maybe the pass was key",
        "perhaps top oyunda",
        "apparently domine ediyor",
        "seems controlling possession",
        "could be a goal",
    ];
    for text in samples {
        let verdict = guard().validate(text, Some("CONTROLLED"));
        assert_eq!(verdict.decision, GuardDecision::Deny, "uncertainty must deny: {text}");
        assert_eq!(verdict.hits[0].rule, "DENY_UNCERTAINTY", "hit names the rule");
    }
}

#[test]
fn unvalidated_state_allows_only_the_log_line() {
    let allowed = guard().validate("State: UNVALIDATED (veri eksikliği)", Some("UNVALIDATED"));
    assert_eq!(allowed.decision, GuardDecision::Pass, "the log line is the one exception");

    let denied = guard().validate("The team looks sharp today.", Some("UNVALIDATED"));
    assert_eq!(denied.decision, GuardDecision::Deny, "everything else denies");
    assert_eq!(denied.hits[0].detail, "state_unvalidated_deny_all", "detail is stable");
}

#[test]
fn contested_state_rewrites_possession_claims() {
    let verdict = guard().validate("Takım üstün.", Some("CONTESTED"));
    assert_eq!(verdict.decision, GuardDecision::Rewrite, "control claims rewrite");
    assert!(verdict.canonical.is_some(), "a canonical replacement is supplied");
}

#[test]
fn dead_ball_state_rewrites_in_play_claims() {
    let verdict = guard().validate("Top oyunda.", Some("DEAD_BALL"));
    assert_eq!(verdict.decision, GuardDecision::Rewrite, "in-play claims rewrite");
    assert!(verdict.canonical.is_some(), "a canonical replacement is supplied");
}

#[test]
fn blockquote_lines_are_dropped_before_scanning() {
    let text = "> maybe they dominate\nObservation: pass completed.";
    let verdict = guard().validate(text, Some("CONTROLLED"));
    assert_eq!(verdict.decision, GuardDecision::Pass, "quoted material is not scanned");
}

#[test]
fn unmatched_quotes_fail_closed() {
    let verdict = guard().validate("He said \"unfinished thought", Some("CONTROLLED"));
    assert_eq!(verdict.decision, GuardDecision::Deny, "unmatched quotes deny");
    assert_eq!(verdict.hits[0].rule, "FAIL_CLOSED", "hit names the fail-closed path");
    assert_eq!(verdict.hits[0].detail, "UNMATCHED_QUOTES", "detail is stable");
}

#[test]
fn missing_rule_field_fails_to_load() {
    let partial = r"
rules:
  deny_uncertainty:
    terms: [belki]
";
    assert!(
        GuardRules::from_yaml_str(partial).is_err(),
        "a document missing rules must not load"
    );
}

#[test]
fn broken_rewrite_regex_denies() {
    let mut rules = GuardRules::default_rules().unwrap();
    rules.rewrite_contested_possession_claim.regex = "([unclosed".to_string();
    let guard = NarrativeGuard::new(rules);
    let verdict = guard.validate("Takım üstün.", Some("CONTESTED"));
    assert_eq!(verdict.decision, GuardDecision::Deny, "regex failure fails closed");
    assert_eq!(verdict.hits[0].rule, "FAIL_CLOSED", "hit names the fail-closed path");
}

#[test]
fn state_tokens_are_trimmed_and_uppercased() {
    let verdict = guard().validate("Takım üstün.", Some("  contested "));
    assert_eq!(verdict.decision, GuardDecision::Rewrite, "state tokens normalize");
}
