// crates/canon-gate-contract/tests/reader_policy.rs
// ============================================================================
// Module: Canon Reader and Policy Tests
// Description: Schema gate ordering and epistemic policy decisions.
// Purpose: Pin the fail-closed canon reading contract.
// Dependencies: canon-gate-contract, serde_json
// ============================================================================

//! Canon contract reader and epistemic policy tests.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions and helpers are permitted."
)]

use canon_gate_contract::JsonSchemaValidator;
use canon_gate_contract::PolicyOutcome;
use canon_gate_contract::ReaderError;
use canon_gate_contract::evaluate_epistemic_policy;
use canon_gate_contract::read_canon_document;
use serde_json::json;

/// Compiles a schema requiring a `payload` object.
fn validator() -> JsonSchemaValidator {
    let schema = json!({
        "type": "object",
        "required": ["payload"],
        "properties": {"payload": {"type": "object"}}
    });
    JsonSchemaValidator::new(&schema).unwrap()
}

// ============================================================================
// SECTION: Reader
// ============================================================================

#[test]
fn reader_accepts_a_clean_fact_document() {
    let document = json!({
        "payload": {"rows": 3},
        "epistemic_meta": {
            "epistemic_status": "fact",
            "lossy_mapping": false,
            "human_override": false
        }
    });
    let result = read_canon_document(&document, &validator()).unwrap();
    assert_eq!(result.decision.decision, PolicyOutcome::Accept, "facts are accepted");
    assert_eq!(result.payload, document, "payload is carried unmodified");
}

#[test]
fn reader_rejects_non_object_roots() {
    let err = read_canon_document(&json!([1, 2, 3]), &validator()).unwrap_err();
    assert!(matches!(err, ReaderError::RootNotObject), "arrays are not canon roots");
}

#[test]
fn reader_raises_on_schema_violation_before_policy() {
    let document = json!({
        "epistemic_meta": {"epistemic_status": "fact"}
    });
    let err = read_canon_document(&document, &validator()).unwrap_err();
    assert!(matches!(err, ReaderError::SchemaInvalid(_)), "schema gate runs first: {err}");
}

#[test]
fn reader_requires_non_empty_epistemic_status() {
    let document = json!({
        "payload": {},
        "epistemic_meta": {"epistemic_status": "   "}
    });
    let err = read_canon_document(&document, &validator()).unwrap_err();
    assert!(matches!(err, ReaderError::MissingEpistemicStatus), "blank status fails: {err}");
}

#[test]
fn reader_soft_fails_lossy_documents() {
    let document = json!({
        "payload": {},
        "epistemic_meta": {"epistemic_status": "signal", "lossy_mapping": true}
    });
    let result = read_canon_document(&document, &validator()).unwrap();
    assert_eq!(result.decision.decision, PolicyOutcome::SoftFail, "lossy degrades");
}

// ============================================================================
// SECTION: Policy
// ============================================================================

#[test]
fn policy_hard_fails_statuses_outside_the_enum() {
    let decision = evaluate_epistemic_policy("guesswork", false, false, None).unwrap();
    assert_eq!(decision.decision, PolicyOutcome::HardFail, "unknown status rejects");
    assert!(
        decision.reason.contains("not in allowed enum"),
        "reason lists the allowed set: {}",
        decision.reason
    );
}

#[test]
fn policy_hard_fails_override_without_assumption() {
    let decision = evaluate_epistemic_policy("fact", false, true, None).unwrap();
    assert_eq!(decision.decision, PolicyOutcome::HardFail, "overrides need provenance");
    assert_eq!(
        decision.reason, "human_override=true requires assumption_id",
        "reason is stable"
    );
}

#[test]
fn policy_soft_fails_lossy_regardless_of_override() {
    let with_override =
        evaluate_epistemic_policy("signal", true, true, Some("a-1")).unwrap();
    assert_eq!(with_override.decision, PolicyOutcome::SoftFail, "override stays degraded");

    let without_override = evaluate_epistemic_policy("signal", true, false, None).unwrap();
    assert_eq!(without_override.decision, PolicyOutcome::SoftFail, "lossy degrades");
}

#[test]
fn policy_accepts_clean_statuses() {
    for status in ["fact", "opinion", "hypothesis", "signal"] {
        let decision = evaluate_epistemic_policy(status, false, false, None).unwrap();
        assert_eq!(
            decision.decision,
            PolicyOutcome::Accept,
            "clean {status} documents are accepted"
        );
    }
}

#[test]
fn policy_trims_status_tokens() {
    let decision = evaluate_epistemic_policy("  fact  ", false, false, None).unwrap();
    assert_eq!(decision.decision, PolicyOutcome::Accept, "surrounding whitespace is ignored");
}
