// crates/canon-gate-core/tests/rings.rs
// ============================================================================
// Module: Safety Ring Tests
// Description: Veto and fail-closed behavior of rings 3, 4, and 5.
// Purpose: Pin the hardened safety ring contracts.
// Dependencies: canon-gate-core, serde_json
// ============================================================================

//! Hardened safety ring behavior tests.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions and helpers are permitted."
)]

use canon_gate_core::ContextRing;
use canon_gate_core::PhysicsRing;
use canon_gate_core::validate_dead_ball;
use serde_json::json;

// ============================================================================
// SECTION: Ring 3 — Dead Ball
// ============================================================================

#[test]
fn dead_ball_vetoes_tackle_after_dead_ball() {
    let event = json!({
        "event_type": "TACKLE",
        "prev_state_id": "DEAD_BALL",
        "state_id": "CONTESTED",
    });
    let err = validate_dead_ball(&event).unwrap_err();
    assert!(
        err.to_string().contains("HSR_DEAD_BALL_VIOLATION:TACKLE"),
        "veto must name the event: {err}"
    );
}

#[test]
fn dead_ball_vetoes_interception_in_dead_ball_state() {
    let event = json!({
        "event_type": "INTERCEPTION",
        "prev_state_id": "CONTROLLED",
        "state_id": "DEAD_BALL",
    });
    let err = validate_dead_ball(&event).unwrap_err();
    assert!(err.to_string().contains("HSR_DEAD_BALL_VIOLATION"), "veto fires on state_id too");
}

#[test]
fn dead_ball_allows_restart_after_dead_ball() {
    let event = json!({
        "event_type": "RESTART_KICKOFF",
        "prev_state_id": "DEAD_BALL",
        "state_id": "CONTROLLED",
    });
    assert!(validate_dead_ball(&event).is_ok(), "restarts are legal after a dead ball");
}

#[test]
fn dead_ball_fails_closed_on_missing_event_type() {
    let event = json!({"prev_state_id": "DEAD_BALL"});
    let err = validate_dead_ball(&event).unwrap_err();
    assert!(err.to_string().contains("HSR_FAIL_CLOSED:missing_event_type"), "stable reason");
}

#[test]
fn dead_ball_fails_closed_when_both_state_fields_missing() {
    let event = json!({"event_type": "TACKLE"});
    let err = validate_dead_ball(&event).unwrap_err();
    assert!(err.to_string().contains("HSR_FAIL_CLOSED:missing_state_fields"), "stable reason");
}

// ============================================================================
// SECTION: Ring 4 — Physics
// ============================================================================

#[test]
fn physics_passes_normal_speed() {
    let mut ring = PhysicsRing::new(12.0);
    ring.validate(&json!({"event_start_time": 0.0, "x": 0.0, "y": 0.0})).unwrap();
    ring.validate(&json!({"event_start_time": 1.0, "x": 6.0, "y": 0.0})).unwrap();
}

#[test]
fn physics_vetoes_impossible_speed() {
    let mut ring = PhysicsRing::new(12.0);
    ring.validate(&json!({"event_start_time": 0.0, "x": 0.0, "y": 0.0})).unwrap();
    let err =
        ring.validate(&json!({"event_start_time": 0.1, "x": 50.0, "y": 0.0})).unwrap_err();
    assert!(err.to_string().contains("HSR_PHYSICS_VIOLATION"), "speed veto: {err}");
}

#[test]
fn physics_fails_closed_on_missing_xy() {
    let mut ring = PhysicsRing::default();
    let err = ring.validate(&json!({"event_start_time": 0.0, "x": 0.0})).unwrap_err();
    assert!(err.to_string().contains("HSR_FAIL_CLOSED:physics:missing_xy"), "stable reason");
}

#[test]
fn physics_fails_closed_on_nonpositive_dt() {
    let mut ring = PhysicsRing::default();
    ring.validate(&json!({"event_start_time": 1.0, "x": 0.0, "y": 0.0})).unwrap();
    let err =
        ring.validate(&json!({"event_start_time": 1.0, "x": 1.0, "y": 1.0})).unwrap_err();
    assert!(err.to_string().contains("HSR_FAIL_CLOSED:physics:nonpositive_dt"), "stable reason");
}

#[test]
fn physics_keeps_seed_after_a_veto() {
    let mut ring = PhysicsRing::new(12.0);
    ring.validate(&json!({"event_start_time": 0.0, "x": 0.0, "y": 0.0})).unwrap();
    let _ = ring.validate(&json!({"event_start_time": 0.1, "x": 50.0, "y": 0.0})).unwrap_err();
    // The vetoed observation must not advance the stored coordinates.
    ring.validate(&json!({"event_start_time": 1.0, "x": 6.0, "y": 0.0})).unwrap();
}

// ============================================================================
// SECTION: Ring 5 — Context / Temporal
// ============================================================================

#[test]
fn context_vetoes_time_regression() {
    let ring = ContextRing::default();
    let event = json!({
        "event_start_time": 1.0,
        "prev_event_time": 2.0,
        "state_id": "CONTROLLED",
        "prev_state_id": "CONTROLLED",
        "possession_effect": "CONTINUE",
    });
    let err = ring.validate(&event).unwrap_err();
    assert!(err.to_string().contains("HSR_CONTEXT_VIOLATION:time_non_monotonic"), "stable");
}

#[test]
fn context_vetoes_start_outside_dead_ball_edge() {
    let ring = ContextRing::default();
    let event = json!({
        "event_start_time": 2.0,
        "prev_event_time": 1.0,
        "state_id": "CONTROLLED",
        "prev_state_id": "CONTESTED",
        "possession_effect": "START",
    });
    let err = ring.validate(&event).unwrap_err();
    assert!(err.to_string().contains("HSR_CONTEXT_VIOLATION:start_out_of_dead_ball"), "stable");
}

#[test]
fn context_vetoes_cooldown_breach() {
    let ring = ContextRing::new(0.3);
    let event = json!({
        "event_start_time": 2.0,
        "prev_event_time": 1.0,
        "state_id": "CONTESTED",
        "prev_state_id": "DEAD_BALL",
        "possession_effect": "NEUTRAL",
        "event_type": "TACKLE",
    });
    let err = ring.validate(&event).unwrap_err();
    assert!(err.to_string().contains("HSR_CONTEXT_VIOLATION:cooldown_breach"), "stable");
}

#[test]
fn context_allows_start_on_dead_ball_to_controlled() {
    let ring = ContextRing::default();
    let event = json!({
        "event_start_time": 1.1,
        "prev_event_time": 1.0,
        "state_id": "CONTROLLED",
        "prev_state_id": "DEAD_BALL",
        "possession_effect": "START",
    });
    assert!(ring.validate(&event).is_ok(), "the canonical start edge is legal");
}

#[test]
fn context_fails_closed_on_missing_fields() {
    let ring = ContextRing::default();
    let event = json!({"event_start_time": 1.0, "state_id": "CONTROLLED"});
    let err = ring.validate(&event).unwrap_err();
    assert!(err.to_string().contains("HSR_FAIL_CLOSED:context:missing_fields"), "stable");
}
