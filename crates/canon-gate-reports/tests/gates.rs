// crates/canon-gate-reports/tests/gates.rs
// ============================================================================
// Module: Gate Tests
// Description: Baseline drift, canon hash, and coverage behavior.
// Purpose: Pin the terminal gate contracts.
// Dependencies: canon-gate-core, canon-gate-reports, serde_json, tempfile,
//               time
// ============================================================================

//! Baseline, hash-gate, and coverage behavior tests.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::fs;
use std::path::Path;

use canon_gate_core::sha256_hex;
use canon_gate_reports::ReportError;
use canon_gate_reports::baseline::check_baseline;
use canon_gate_reports::coverage::build_coverage_report;
use canon_gate_reports::hash_gate::HashCheckStatus;
use canon_gate_reports::hash_gate::verify_manifest;
use serde_json::json;
use time::OffsetDateTime;

/// Fixed instant so generation stamps are reproducible.
fn fixed_now() -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap()
}

/// Writes a JSON fixture file.
fn write_json(path: &Path, value: &serde_json::Value) {
    fs::write(path, serde_json::to_vec(value).unwrap()).unwrap();
}

// ============================================================================
// SECTION: Baseline Gate
// ============================================================================

#[test]
fn baseline_gate_passes_when_no_novel_actions() {
    let dir = tempfile::tempdir().unwrap();
    let report = dir.path().join("unmapped_actions.json");
    let baseline = dir.path().join("baseline.json");
    write_json(
        &report,
        &json!({"unmapped_actions": [{"provider_action": "KNOWN", "count": 2}]}),
    );
    write_json(&baseline, &json!({"provider_actions": ["KNOWN", "ALSO_KNOWN"]}));

    let outcome = check_baseline(&report, &baseline).unwrap();
    assert!(outcome.is_clean(), "known actions pass: {:?}", outcome.novel);
}

#[test]
fn baseline_gate_fails_with_full_sorted_novel_list() {
    let dir = tempfile::tempdir().unwrap();
    let report = dir.path().join("unmapped_actions.json");
    let baseline = dir.path().join("baseline.json");
    write_json(
        &report,
        &json!({"unmapped_actions": [
            {"provider_action": "ZETA", "count": 1},
            {"provider_action": "ALPHA", "count": 1},
            {"provider_action": "KNOWN", "count": 1}
        ]}),
    );
    write_json(&baseline, &json!({"provider_actions": ["KNOWN"]}));

    let outcome = check_baseline(&report, &baseline).unwrap();
    assert!(!outcome.is_clean(), "novel actions must fail");
    assert_eq!(outcome.novel, vec!["ALPHA", "ZETA"], "full list, sorted");
}

#[test]
fn baseline_gate_errors_on_unreadable_inputs() {
    let dir = tempfile::tempdir().unwrap();
    let report = dir.path().join("missing.json");
    let baseline = dir.path().join("baseline.json");
    write_json(&baseline, &json!({"provider_actions": []}));
    let err = check_baseline(&report, &baseline).unwrap_err();
    assert!(matches!(err, ReportError::Io { .. }), "missing input is an error: {err}");
}

// ============================================================================
// SECTION: Canon Hash Gate
// ============================================================================

#[test]
fn hash_gate_passes_matching_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let content = b"canonical content\n";
    fs::write(dir.path().join("canon.md"), content).unwrap();
    let manifest = dir.path().join("canon_hashes.json");
    write_json(
        &manifest,
        &json!({
            "algo": "sha256",
            "version": "1.0.0",
            "files": {"canon.md": sha256_hex(content)}
        }),
    );

    let result = verify_manifest(&manifest, dir.path()).unwrap();
    assert!(result.passed, "matching manifest passes");
    assert_eq!(result.version, "1.0.0", "version is surfaced");
    assert_eq!(result.checks[0].status, HashCheckStatus::Pass, "per-file pass");
}

#[test]
fn hash_gate_reports_mismatch_and_missing() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("canon.md"), b"tampered").unwrap();
    let manifest = dir.path().join("canon_hashes.json");
    write_json(
        &manifest,
        &json!({
            "algo": "sha256",
            "version": "1",
            "files": {
                "canon.md": sha256_hex(b"original"),
                "gone.md": sha256_hex(b"whatever")
            }
        }),
    );

    let result = verify_manifest(&manifest, dir.path()).unwrap();
    assert!(!result.passed, "any failure fails the gate");
    let statuses: Vec<&HashCheckStatus> =
        result.checks.iter().map(|check| &check.status).collect();
    assert!(
        statuses.iter().any(|status| matches!(status, HashCheckStatus::Mismatch { .. })),
        "mismatch reported"
    );
    assert!(
        statuses.iter().any(|status| matches!(status, HashCheckStatus::Missing)),
        "missing file reported"
    );
}

#[test]
fn hash_gate_fails_closed_on_unsupported_algo() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = dir.path().join("canon_hashes.json");
    write_json(&manifest, &json!({"algo": "md5", "files": {"a": "00"}}));
    let err = verify_manifest(&manifest, dir.path()).unwrap_err();
    assert!(matches!(err, ReportError::Shape(_)), "algo gate is terminal: {err}");
}

#[test]
fn hash_gate_fails_closed_on_empty_files() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = dir.path().join("canon_hashes.json");
    write_json(&manifest, &json!({"algo": "sha256", "files": {}}));
    let err = verify_manifest(&manifest, dir.path()).unwrap_err();
    assert!(matches!(err, ReportError::Shape(_)), "empty manifest is terminal: {err}");
}

#[test]
fn hash_gate_marks_short_digests_invalid() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("canon.md"), b"x").unwrap();
    let manifest = dir.path().join("canon_hashes.json");
    write_json(
        &manifest,
        &json!({"algo": "sha256", "version": "1", "files": {"canon.md": "abc"}}),
    );
    let result = verify_manifest(&manifest, dir.path()).unwrap();
    assert_eq!(result.checks[0].status, HashCheckStatus::InvalidEntry, "short digest invalid");
    assert!(!result.passed, "invalid entries fail the gate");
}

// ============================================================================
// SECTION: Coverage
// ============================================================================

#[test]
fn coverage_ratio_is_type_level() {
    let rows =
        vec![("MYSTERY".to_string(), 7_usize), ("ODDITY".to_string(), 2_usize)];
    let report = build_coverage_report("engine", 8, &rows, fixed_now()).unwrap();
    assert_eq!(report.mapping.mapped_actions, 8, "mapped count carried");
    assert_eq!(report.mapping.unmapped_actions, 2, "unmapped types counted");
    assert_eq!(report.mapping.total_observed_actions, 10, "denominator is the sum");
    assert_eq!(report.mapping.coverage_ratio, 0.8, "type-level ratio");
}

#[test]
fn coverage_top_unmapped_sorts_by_count_then_name() {
    let rows = vec![
        ("BETA".to_string(), 3_usize),
        ("ALPHA".to_string(), 3_usize),
        ("GAMMA".to_string(), 9_usize),
    ];
    let report = build_coverage_report("engine", 1, &rows, fixed_now()).unwrap();
    let names: Vec<&str> =
        report.top_unmapped.iter().map(|row| row.provider_action.as_str()).collect();
    assert_eq!(names, vec!["GAMMA", "ALPHA", "BETA"], "count desc, then name asc");
}

#[test]
fn coverage_with_empty_denominator_is_full() {
    let report = build_coverage_report("engine", 0, &[], fixed_now()).unwrap();
    assert_eq!(report.mapping.coverage_ratio, 1.0, "nothing observed means full coverage");
}
