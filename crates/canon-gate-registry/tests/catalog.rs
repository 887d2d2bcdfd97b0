// crates/canon-gate-registry/tests/catalog.rs
// ============================================================================
// Module: Action Catalog Tests
// Description: Loading, alias normalization, and resolution behavior.
// Purpose: Pin the zero-drift alias contract of the action registry.
// Dependencies: canon-gate-core, canon-gate-registry
// ============================================================================

//! Action catalog behavior tests.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions and helpers are permitted."
)]

use canon_gate_core::EpistemicVerdict;
use canon_gate_registry::ActionRegistry;
use canon_gate_registry::RegistryError;
use canon_gate_registry::normalize_alias;

/// A small valid catalog used across tests.
const CATALOG: &str = r#"
- canonical_action: PASS
  possession_effect: CONTINUE
  allowed_states: [CONTROLLED]
  fail_closed_default: UNVALIDATED
  aliases: ["pass", "Pas", "short-pass"]
- canonical_action: GK_SAVE
  possession_effect: NEUTRAL
  allowed_states: [CONTROLLED, CONTESTED]
  fail_closed_default: UNVALIDATED
  aliases: ["save", "kurtarış", "parry"]
  qualifiers:
    gk_holds: [true, false]
"#;

#[test]
fn catalog_loads_and_resolves_aliases() {
    let registry = ActionRegistry::from_yaml_str(CATALOG).unwrap();
    assert_eq!(registry.items().len(), 2, "two records loaded");

    let resolution = registry.resolve("Short Pass", None);
    assert_eq!(resolution.canonical_action, "PASS", "separator variants resolve");
    assert_eq!(resolution.status, EpistemicVerdict::Valid, "known aliases are valid");
}

#[test]
fn unknown_action_resolves_to_unknown_unvalidated_without_error() {
    let registry = ActionRegistry::from_yaml_str(CATALOG).unwrap();
    let resolution = registry.resolve("never seen before", None);
    assert_eq!(resolution.canonical_action, "UNKNOWN", "unknown input never throws");
    assert!(resolution.qualifiers.is_empty(), "no qualifiers for unknown input");
    assert_eq!(resolution.status, EpistemicVerdict::Unvalidated, "status degrades");
}

#[test]
fn gk_save_defaults_to_not_holding() {
    let registry = ActionRegistry::from_yaml_str(CATALOG).unwrap();
    let resolution = registry.resolve("kurtarış", None);
    assert_eq!(resolution.canonical_action, "GK_SAVE", "alias resolves");
    assert_eq!(
        resolution.qualifiers.get("gk_holds"),
        Some(&serde_json::json!(false)),
        "no hint means no control establishment"
    );
}

#[test]
fn gk_save_hint_is_honored() {
    let registry = ActionRegistry::from_yaml_str(CATALOG).unwrap();
    let resolution = registry.resolve("save", Some(true));
    assert_eq!(
        resolution.qualifiers.get("gk_holds"),
        Some(&serde_json::json!(true)),
        "an explicit hint overrides the conservative default"
    );
}

#[test]
fn missing_canonical_action_is_a_hard_failure() {
    let source = "- aliases: [\"x\"]\n  possession_effect: NEUTRAL\n";
    let err = ActionRegistry::from_yaml_str(source).unwrap_err();
    assert!(
        matches!(err, RegistryError::MissingCanonicalAction(0)),
        "missing identifier must fail: {err}"
    );
}

#[test]
fn allowed_states_must_be_a_sequence() {
    let source = "- canonical_action: PASS\n  allowed_states: CONTROLLED\n";
    let err = ActionRegistry::from_yaml_str(source).unwrap_err();
    assert!(
        matches!(err, RegistryError::AllowedStatesNotASequence(_)),
        "scalar allowed_states must fail: {err}"
    );
}

#[test]
fn duplicate_alias_across_actions_is_a_hard_failure() {
    let source = r#"
- canonical_action: PASS
  aliases: ["pass"]
- canonical_action: CROSS
  aliases: ["Pass"]
"#;
    let err = ActionRegistry::from_yaml_str(source).unwrap_err();
    let RegistryError::DuplicateAlias {
        alias,
        first,
        second,
    } = err
    else {
        panic!("expected duplicate alias error, got {err}");
    };
    assert_eq!(alias, "pass", "collision is reported on the normalized token");
    assert_eq!(first, "PASS", "first claimant named");
    assert_eq!(second, "CROSS", "second claimant named");
}

#[test]
fn normalization_is_total_and_deterministic() {
    assert_eq!(normalize_alias("  Short  Pass "), "short_pass", "whitespace collapses");
    assert_eq!(normalize_alias("short-pass"), "short_pass", "dashes map to underscores");
    assert_eq!(normalize_alias("short/pass"), "short_pass", "slashes map to underscores");
    assert_eq!(normalize_alias("__short__pass__"), "short_pass", "underscore runs collapse");
    assert_eq!(normalize_alias("Şut Çıkarma"), "şut_çıkarma", "unicode survives folding");
    assert_eq!(normalize_alias("!!!"), "", "pure punctuation normalizes to empty");
}

#[test]
fn equivalent_spellings_share_one_normalized_token() {
    let spellings = ["Short Pass", "short-pass", "SHORT/PASS", " short  pass "];
    let tokens: Vec<String> = spellings.iter().map(|raw| normalize_alias(raw)).collect();
    assert!(tokens.iter().all(|token| token == "short_pass"), "all variants agree: {tokens:?}");
}
