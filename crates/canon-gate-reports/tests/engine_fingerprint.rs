// crates/canon-gate-reports/tests/engine_fingerprint.rs
// ============================================================================
// Module: Engine Gate and Fingerprint Tests
// Description: Run-directory evaluation and artifact drift detection.
// Purpose: Pin the gate actions and fingerprint comparison semantics.
// Dependencies: canon-gate-reports, serde_json, tempfile
// ============================================================================

//! Engine gate and artifact fingerprint behavior tests.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::fs;
use std::path::Path;

use canon_gate_reports::engine_gate::GateAction;
use canon_gate_reports::engine_gate::evaluate;
use canon_gate_reports::fingerprint::collect_fingerprint;
use canon_gate_reports::fingerprint::diff_fingerprints;
use canon_gate_reports::fingerprint::fingerprints_match;
use serde_json::Value;
use serde_json::json;

/// Writes a JSON fixture file.
fn write_json(path: &Path, value: &Value) {
    fs::write(path, serde_json::to_vec(value).unwrap()).unwrap();
}

/// Builds a clean stamped-metadata document.
fn clean_stamped() -> Value {
    json!({
        "engine_id": "engine-7",
        "provider": "engine",
        "algo_version": "v3",
        "input": {"source_csv_sha256": "aa".repeat(32)},
        "evidence": {"artifact_sha256": {
            "engine_meta.json": "bb".repeat(32),
            "engine_seq_possessions.json": "cc".repeat(32),
            "engine_xt01_grid.json": "dd".repeat(32)
        }},
        "raw_engine_meta": {"modules": {"coord_normalize": {"seen_xy": 412}}}
    })
}

/// Builds a clean possession-sequence document.
fn clean_seq() -> Value {
    json!({
        "policy": "baseline",
        "n_possessions": 1,
        "summaries": [{
            "possession_id": "p000001",
            "team": "A",
            "half": 1,
            "t_start": 0.0,
            "t_end": 12.5,
            "n_events": 9,
            "start_xy": [50.0, 25.0],
            "end_xy": [80.0, 30.0]
        }]
    })
}

/// Builds a clean grid document.
fn clean_grid() -> Value {
    json!({
        "grid_spec": {"nx": 2, "ny": 2},
        "solve_spec": {"iters": 10},
        "grid_values": {"0_0": 0.1, "0_1": 0.0, "1_0": 0.3, "1_1": 0.2}
    })
}

/// Writes a full run directory.
fn write_run_dir(dir: &Path, stamped: &Value, seq: &Value, grid: &Value) {
    write_json(&dir.join("engine_meta_stamped.json"), stamped);
    write_json(&dir.join("engine_seq_possessions.json"), seq);
    write_json(&dir.join("engine_xt01_grid.json"), grid);
}

// ============================================================================
// SECTION: Engine Gate
// ============================================================================

#[test]
fn clean_run_passes() {
    let dir = tempfile::tempdir().unwrap();
    write_run_dir(dir.path(), &clean_stamped(), &clean_seq(), &clean_grid());
    let report = evaluate(dir.path()).unwrap();
    assert_eq!(report.action, GateAction::Pass, "clean run passes: {:?}", report.findings);
    assert_eq!(report.engine_id.as_deref(), Some("engine-7"), "metadata surfaced");
}

#[test]
fn missing_evidence_hash_quarantines() {
    let dir = tempfile::tempdir().unwrap();
    let mut stamped = clean_stamped();
    stamped["input"] = json!({});
    write_run_dir(dir.path(), &stamped, &clean_seq(), &clean_grid());
    let report = evaluate(dir.path()).unwrap();
    assert_eq!(report.action, GateAction::Quarantine, "missing evidence quarantines");
    assert!(
        report.findings.iter().any(|finding| finding.rule == "evidence.input_hash"),
        "finding names the rule: {:?}",
        report.findings
    );
}

#[test]
fn all_zero_grid_warns_but_does_not_quarantine() {
    let dir = tempfile::tempdir().unwrap();
    let mut grid = clean_grid();
    grid["grid_values"] = json!({"0_0": 0.0, "0_1": 0.0});
    write_run_dir(dir.path(), &clean_stamped(), &clean_seq(), &grid);
    let report = evaluate(dir.path()).unwrap();
    assert_eq!(report.action, GateAction::Warn, "degenerate grids warn");
    assert!(
        report.findings.iter().any(|finding| finding.rule == "xt.degenerate_all_zero"),
        "finding names the degeneracy"
    );
}

#[test]
fn high_unknown_team_ratio_warns() {
    let dir = tempfile::tempdir().unwrap();
    let mut seq = clean_seq();
    let known = seq["summaries"][0].clone();
    let mut unknown = known.clone();
    unknown["team"] = json!("UNKNOWN");
    seq["summaries"] = json!([unknown.clone(), unknown, known]);
    write_run_dir(dir.path(), &clean_stamped(), &seq, &clean_grid());
    let report = evaluate(dir.path()).unwrap();
    assert_eq!(report.action, GateAction::Warn, "unknown-heavy summaries warn");
    assert!(
        report.findings.iter().any(|finding| finding.rule == "team.unknown_ratio"),
        "finding names the ratio rule"
    );
}

#[test]
fn malformed_summaries_quarantine() {
    let dir = tempfile::tempdir().unwrap();
    let mut seq = clean_seq();
    seq["summaries"] = json!([]);
    write_run_dir(dir.path(), &clean_stamped(), &seq, &clean_grid());
    let report = evaluate(dir.path()).unwrap();
    assert_eq!(report.action, GateAction::Quarantine, "empty summaries quarantine");
}

#[test]
fn missing_artifact_is_an_input_error() {
    let dir = tempfile::tempdir().unwrap();
    write_json(&dir.path().join("engine_meta_stamped.json"), &clean_stamped());
    assert!(evaluate(dir.path()).is_err(), "missing artifacts are errors, not findings");
}

// ============================================================================
// SECTION: Fingerprints
// ============================================================================

#[test]
fn identical_directories_fingerprint_identically() {
    let dir = tempfile::tempdir().unwrap();
    write_run_dir(dir.path(), &clean_stamped(), &clean_seq(), &clean_grid());
    let watch = vec!["engine_seq_possessions.json".to_string(), "engine_xt01_grid.json".to_string()];
    let first = collect_fingerprint(dir.path(), &watch, "2026-01-01T00:00:00Z").unwrap();
    let second = collect_fingerprint(dir.path(), &watch, "2026-01-01T00:00:00Z").unwrap();
    assert!(fingerprints_match(&first, &second), "identical content matches");
    assert!(diff_fingerprints(&first, &second).is_empty(), "no diff lines");
}

#[test]
fn content_change_is_detected_with_file_level_diff() {
    let dir = tempfile::tempdir().unwrap();
    write_run_dir(dir.path(), &clean_stamped(), &clean_seq(), &clean_grid());
    let watch = vec!["engine_xt01_grid.json".to_string()];
    let baseline = collect_fingerprint(dir.path(), &watch, "2026-01-01T00:00:00Z").unwrap();

    let mut grid = clean_grid();
    grid["grid_values"] = json!({"0_0": 0.9});
    write_json(&dir.path().join("engine_xt01_grid.json"), &grid);
    let current = collect_fingerprint(dir.path(), &watch, "2026-01-01T00:00:00Z").unwrap();

    assert!(!fingerprints_match(&baseline, &current), "content drift is detected");
    let diff = diff_fingerprints(&baseline, &current);
    assert!(
        diff.iter().any(|line| line.contains("engine_xt01_grid.json")),
        "diff names the file: {diff:?}"
    );
}

#[test]
fn key_reordering_keeps_the_canonical_digest() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("doc.json"), b"{\"a\":1,\"b\":2}").unwrap();
    let watch = vec!["doc.json".to_string()];
    let before = collect_fingerprint(dir.path(), &watch, "t").unwrap();

    fs::write(dir.path().join("doc.json"), b"{\"b\":2,\"a\":1}").unwrap();
    let after = collect_fingerprint(dir.path(), &watch, "t").unwrap();

    assert!(!fingerprints_match(&before, &after), "raw bytes differ");
    assert_eq!(
        before.files[0].json_canon_sha256, after.files[0].json_canon_sha256,
        "canonical digest ignores key order"
    );
}

#[test]
fn absent_watched_artifact_is_recorded_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let watch = vec!["never_written.json".to_string()];
    let fingerprint = collect_fingerprint(dir.path(), &watch, "t").unwrap();
    assert!(!fingerprint.files[0].present, "absence is recorded");
    assert!(fingerprint.files[0].sha256.is_none(), "no digest for absent files");
}
