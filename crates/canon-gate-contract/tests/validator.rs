// crates/canon-gate-contract/tests/validator.rs
// ============================================================================
// Module: Contract Validator Tests
// Description: Coercion, enum quarantine, nullability, and constraints.
// Purpose: Pin the fail-closed, no-drop tabular contract.
// Dependencies: canon-gate-contract, serde_json, tempfile, time
// ============================================================================

//! Tabular contract validator behavior tests.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::collections::BTreeMap;

use canon_gate_contract::QuarantineWriter;
use canon_gate_contract::Row;
use canon_gate_contract::SchemaSpec;
use canon_gate_contract::check_contract;
use serde_json::Value;
use serde_json::json;
use time::OffsetDateTime;

/// Test schema mirroring the canonical master schema shape.
const SCHEMA: &str = r#"{
    "schema_name": "canon_rows",
    "schema_version": "1.0.0",
    "released_at": "2026-01-01",
    "groups": {
        "identity": {
            "required": true,
            "columns": {
                "event_id": {"dtype": "string", "nullable": false},
                "team_id": {"dtype": "string", "nullable": false}
            }
        },
        "kinematics": {
            "required": true,
            "columns": {
                "x_norm": {"dtype": "float64", "nullable": false},
                "y_norm": {"dtype": "float64", "nullable": false},
                "timestamp": {"dtype": "float64", "nullable": false},
                "phase_id": {"dtype": "int64", "nullable": false}
            }
        },
        "semantics": {
            "required": false,
            "columns": {
                "action_type": {"dtype": "enum:action_type", "nullable": true},
                "keeper_flag": {"dtype": "bool", "nullable": true}
            }
        }
    },
    "enums": {
        "action_type": {
            "canonical": ["PASS", "TACKLE", "SHOT"],
            "fallback": "UNKNOWN",
            "max_new_values_per_pr": 0
        }
    },
    "constraints": {
        "pitch": {"x_max": 100.0, "y_max": 50.0, "epsilon": 0.5},
        "time": {"timestamp_min": 0.0, "timestamp_max": 7200.0},
        "phase": {"min": 1, "max": 6}
    }
}"#;

/// Fixed instant so quarantine filenames are reproducible.
fn fixed_now() -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap()
}

/// Parses the test schema.
fn schema() -> SchemaSpec {
    SchemaSpec::from_json_str(SCHEMA).unwrap()
}

/// Builds one well-formed row.
fn good_row(event_id: &str) -> Row {
    BTreeMap::from([
        ("event_id".to_string(), json!(event_id)),
        ("team_id".to_string(), json!("A")),
        ("x_norm".to_string(), json!(42.0)),
        ("y_norm".to_string(), json!(21.0)),
        ("timestamp".to_string(), json!(120.5)),
        ("phase_id".to_string(), json!(3)),
        ("action_type".to_string(), json!("pass")),
        ("keeper_flag".to_string(), json!("yes")),
    ])
}

#[test]
fn clean_table_passes_and_normalizes() {
    let rows = vec![good_row("e1"), good_row("e2")];
    let (table, report) = check_contract(&rows, &schema(), None, fixed_now()).unwrap();
    assert!(report.ok(), "clean table must pass: {:?}", report.errors);
    assert_eq!(report.schema_version, "1.0.0", "schema version travels on the report");
    assert_eq!(table[0]["action_type"], json!("PASS"), "enum cells uppercase");
    assert_eq!(table[0]["keeper_flag"], json!(true), "boolean tokens coerce");
    assert_eq!(table[0]["audit_flag"], json!(false), "audit column is ensured");
}

#[test]
fn missing_required_column_is_critical() {
    let mut row = good_row("e1");
    row.remove("team_id");
    let (_, report) = check_contract(&[row], &schema(), None, fixed_now()).unwrap();
    assert!(!report.ok(), "missing required column must fail");
    assert!(
        report.errors[0].contains("missing required columns"),
        "error names the rule: {}",
        report.errors[0]
    );
}

#[test]
fn unmapped_enum_quarantines_and_degrades_without_deleting() {
    let mut row = good_row("e1");
    row.insert("action_type".to_string(), json!("BICYCLE_KICK"));
    let rows = vec![row, good_row("e2")];
    let (table, report) = check_contract(&rows, &schema(), None, fixed_now()).unwrap();
    assert!(report.ok(), "enum degrade is soft: {:?}", report.errors);
    assert_eq!(table.len(), 2, "no row is ever deleted");
    assert_eq!(report.quarantined_rows, 1, "one row quarantined");
    assert_eq!(table[0]["action_type"], json!("UNKNOWN"), "fallback substituted");
    assert_eq!(table[0]["audit_flag"], json!(true), "audit flag raised");
    assert_eq!(table[0]["popper_tag"], json!("LOW_CONFIDENCE"), "epistemic tag degraded");
    assert_eq!(table[1]["action_type"], json!("PASS"), "clean rows untouched");
    assert!(
        report.warnings.iter().any(|warning| warning.contains("action_type")),
        "warning names the column: {:?}",
        report.warnings
    );
}

#[test]
fn null_enum_cell_falls_back_without_quarantine() {
    let mut row = good_row("e1");
    row.insert("action_type".to_string(), Value::Null);
    let (table, report) = check_contract(&[row], &schema(), None, fixed_now()).unwrap();
    assert!(report.ok(), "null in a nullable enum is legal");
    assert_eq!(report.quarantined_rows, 0, "fallback is not quarantine");
    assert_eq!(table[0]["action_type"], json!("UNKNOWN"), "fallback substituted");
}

#[test]
fn coercion_loss_on_non_nullable_column_is_critical() {
    let mut row = good_row("e1");
    row.insert("x_norm".to_string(), json!("not a number"));
    let (_, report) = check_contract(&[row], &schema(), None, fixed_now()).unwrap();
    assert!(!report.ok(), "loss on non-nullable must fail");
    assert!(
        report.errors[0].contains("coercion loss in 'x_norm'"),
        "error names the column: {}",
        report.errors[0]
    );
}

#[test]
fn null_in_non_nullable_column_is_critical_after_coercion() {
    let mut row = good_row("e1");
    row.insert("timestamp".to_string(), Value::Null);
    let (_, report) = check_contract(&[row], &schema(), None, fixed_now()).unwrap();
    assert!(!report.ok(), "null in non-nullable must fail");
    assert!(
        report.errors[0].contains("nulls in non-nullable columns"),
        "error names the rule: {}",
        report.errors[0]
    );
}

#[test]
fn pitch_constraint_violation_is_critical() {
    let mut row = good_row("e1");
    row.insert("x_norm".to_string(), json!(250.0));
    let (_, report) = check_contract(&[row], &schema(), None, fixed_now()).unwrap();
    assert!(!report.ok(), "coordinates outside the pitch must fail");
    assert!(
        report.errors[0].contains("x_norm outside pitch ontology"),
        "error names the axis: {}",
        report.errors[0]
    );
}

#[test]
fn epsilon_tolerates_boundary_coordinates() {
    let mut row = good_row("e1");
    row.insert("x_norm".to_string(), json!(100.4));
    row.insert("y_norm".to_string(), json!(-0.4));
    let (_, report) = check_contract(&[row], &schema(), None, fixed_now()).unwrap();
    assert!(report.ok(), "within epsilon is legal: {:?}", report.errors);
}

#[test]
fn phase_outside_range_is_critical() {
    let mut row = good_row("e1");
    row.insert("phase_id".to_string(), json!(7));
    let (_, report) = check_contract(&[row], &schema(), None, fixed_now()).unwrap();
    assert!(!report.ok(), "phase 7 is outside the ontology");
    assert!(report.errors[0].contains("phase_id"), "error names the column");
}

#[test]
fn integer_target_rounds_then_widens() {
    let mut row = good_row("e1");
    row.insert("phase_id".to_string(), json!("2.6"));
    let (table, report) = check_contract(&[row], &schema(), None, fixed_now()).unwrap();
    assert!(report.ok(), "numeric strings coerce: {:?}", report.errors);
    assert_eq!(table[0]["phase_id"], json!(3), "round-then-widen");
}

#[test]
fn quarantine_stream_writes_csv_and_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let writer = QuarantineWriter::new(dir.path().to_path_buf());

    let mut row = good_row("e1");
    row.insert("action_type".to_string(), json!("BICYCLE_KICK"));
    let (_, report) =
        check_contract(&[row], &schema(), Some(&writer), fixed_now()).unwrap();
    assert_eq!(report.quarantined_rows, 1, "one row quarantined");

    let entries: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert!(
        entries.iter().any(|name| name.starts_with("quarantine_UNMAPPED_ACTION_TYPE_")
            && name.ends_with(".csv")),
        "reason-keyed csv written: {entries:?}"
    );
    assert!(entries.iter().any(|name| name == "manifest.log"), "manifest appended");

    let manifest = std::fs::read_to_string(dir.path().join("manifest.log")).unwrap();
    assert!(manifest.contains("reason=UNMAPPED_ACTION_TYPE"), "manifest names the reason");
    assert!(manifest.contains("rows=1"), "manifest counts the rows");
}

#[test]
fn source_rows_are_never_mutated() {
    let rows = vec![good_row("e1")];
    let snapshot = rows.clone();
    let (_, _) = check_contract(&rows, &schema(), None, fixed_now()).unwrap();
    assert_eq!(rows, snapshot, "the input table is treated as immutable");
}
