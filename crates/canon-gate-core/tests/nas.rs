// crates/canon-gate-core/tests/nas.rs
// ============================================================================
// Module: NAS Detector Tests
// Description: Chain construction, gating, and fail-closed behavior.
// Purpose: Pin the negative-action-spiral detection contract.
// Dependencies: canon-gate-core, serde_json
// ============================================================================

//! Negative action spiral detector tests.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    reason = "Test-only assertions and helpers are permitted."
)]

use canon_gate_core::NasDetector;
use canon_gate_core::NasStatus;
use serde_json::Value;
use serde_json::json;

/// Builds one NAS input event with overridable fields.
fn nas_event(ts: f64) -> Value {
    json!({
        "event_start_time": ts,
        "phase": "DEFENSIVE",
        "state_id": "CONTROLLED",
        "action_type": "X",
        "outcome": "FAIL",
        "zone_id": 1,
        "pressure_level": 5.0,
        "hsr_flags": {"ring3_dead_ball_veto": false, "ring4_physics_veto": false},
    })
}

#[test]
fn three_failures_same_zone_within_window_count_one_sequence() {
    let detector = NasDetector::new(0.5, 3);
    let events = vec![nas_event(10.0), nas_event(10.3), nas_event(10.7)];
    let result = detector.evaluate(&events);
    assert_eq!(result.status, NasStatus::Pass, "evaluation completes");
    assert_eq!(result.nas_sequence_count, 1, "one sequence expected");
    let sequence = &result.sequences[0];
    assert_eq!(sequence.fail_count, 3, "three failures chained");
    assert_eq!(sequence.zone_id, "1", "zone token is normalized");
    assert_eq!(sequence.start_ts, 10.0, "chain starts at the first failure");
    assert_eq!(sequence.end_ts, 10.7, "chain ends at the last failure");
}

#[test]
fn dead_ball_state_breaks_the_chain() {
    let detector = NasDetector::default();
    let mut first = nas_event(10.0);
    first["state_id"] = json!("DEAD_BALL");
    let events = vec![first, nas_event(10.3), nas_event(10.6)];
    let result = detector.evaluate(&events);
    assert_eq!(result.status, NasStatus::Pass, "evaluation completes");
    assert_eq!(result.nas_sequence_count, 0, "two failures are below the threshold");
}

#[test]
fn ring4_vetoed_event_is_excluded_and_breaks_the_chain() {
    let detector = NasDetector::default();
    let mut vetoed = nas_event(10.3);
    vetoed["hsr_flags"] = json!({"ring3_dead_ball_veto": false, "ring4_physics_veto": true});
    let events = vec![nas_event(10.0), vetoed, nas_event(10.6)];
    let result = detector.evaluate(&events);
    assert_eq!(result.nas_sequence_count, 0, "the veto splits the chain");
}

#[test]
fn missing_required_field_fails_closed_unvalidated() {
    let detector = NasDetector::default();
    let mut event = nas_event(10.0);
    event.as_object_mut().unwrap().remove("zone_id");
    let result = detector.evaluate(&[event]);
    assert_eq!(result.status, NasStatus::Unvalidated, "missing fields fail closed");
    assert!(
        result.reason.contains("NAS_FAIL_CLOSED:missing_zone_id"),
        "reason names the first missing field: {}",
        result.reason
    );
}

#[test]
fn missing_hsr_subkey_fails_closed_with_dotted_name() {
    let detector = NasDetector::default();
    let mut event = nas_event(10.0);
    event["hsr_flags"] = json!({"ring3_dead_ball_veto": false});
    let result = detector.evaluate(&[event]);
    assert_eq!(result.status, NasStatus::Unvalidated, "subkeys are required");
    assert!(
        result.reason.contains("missing_hsr_flags.ring4_physics_veto"),
        "reason names the subkey: {}",
        result.reason
    );
}

#[test]
fn gap_over_window_breaks_the_chain() {
    let detector = NasDetector::default();
    let events = vec![nas_event(10.0), nas_event(10.3), nas_event(11.0)];
    let result = detector.evaluate(&events);
    assert_eq!(result.nas_sequence_count, 0, "the gap splits the chain");
}

#[test]
fn gap_exactly_at_window_extends_the_chain() {
    let detector = NasDetector::new(0.5, 3);
    let events = vec![nas_event(10.0), nas_event(10.5), nas_event(11.0)];
    let result = detector.evaluate(&events);
    assert_eq!(result.nas_sequence_count, 1, "dt equal to the window is inclusive");
    assert_eq!(result.sequences[0].fail_count, 3, "all three failures chain");
}

#[test]
fn zone_change_breaks_the_chain() {
    let detector = NasDetector::default();
    let mut second = nas_event(10.3);
    second["zone_id"] = json!(2);
    let mut third = nas_event(10.6);
    third["zone_id"] = json!(2);
    let events = vec![nas_event(10.0), second, third];
    let result = detector.evaluate(&events);
    assert_eq!(result.nas_sequence_count, 0, "zone change splits the chain");
}

#[test]
fn out_of_scope_phases_are_ignored() {
    let detector = NasDetector::default();
    let events: Vec<Value> = [10.0, 10.3, 10.6]
        .into_iter()
        .map(|ts| {
            let mut event = nas_event(ts);
            event["phase"] = json!("ATTACK");
            event
        })
        .collect();
    let result = detector.evaluate(&events);
    assert_eq!(result.nas_sequence_count, 0, "attack phases are out of scope");
}

#[test]
fn chain_at_threshold_minus_one_does_not_count() {
    let detector = NasDetector::new(0.5, 3);
    let events = vec![nas_event(10.0), nas_event(10.3)];
    let result = detector.evaluate(&events);
    assert_eq!(result.nas_sequence_count, 0, "two failures are below min_fail_count");
}

#[test]
fn extended_chain_counts_as_a_single_sequence() {
    let detector = NasDetector::default();
    let events: Vec<Value> =
        [10.0, 10.2, 10.4, 10.6, 10.8].into_iter().map(nas_event).collect();
    let result = detector.evaluate(&events);
    assert_eq!(result.nas_sequence_count, 1, "one uninterrupted chain");
    assert_eq!(result.sequences[0].fail_count, 5, "all five failures chain");
}

#[test]
fn sequences_record_pressure_statistics_and_event_ids() {
    let detector = NasDetector::default();
    let events: Vec<Value> = [(10.0, 4.0, "e1"), (10.2, 6.0, "e2"), (10.4, 8.0, "e3")]
        .into_iter()
        .map(|(ts, pressure, event_id)| {
            let mut event = nas_event(ts);
            event["pressure_level"] = json!(pressure);
            event["event_id"] = json!(event_id);
            event
        })
        .collect();
    let result = detector.evaluate(&events);
    let sequence = &result.sequences[0];
    assert_eq!(sequence.avg_pressure, 6.0, "mean pressure");
    assert_eq!(sequence.max_pressure, 8.0, "peak pressure");
    assert_eq!(sequence.event_ids, vec!["e1", "e2", "e3"], "ids in chain order");
}
