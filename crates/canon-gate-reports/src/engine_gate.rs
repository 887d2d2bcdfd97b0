// crates/canon-gate-reports/src/engine_gate.rs
// ============================================================================
// Module: Engine Gate Evaluator
// Description: Evidence and format gate over one engine run directory.
// Purpose: Decide PASS / WARN / QUARANTINE for produced run artifacts.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! The engine gate inspects one run directory's artifacts: the stamped
//! metadata, the possession sequence summaries, and the value grid. Missing
//! evidence hashes or malformed required structure quarantines the run;
//! degenerate content (an all-zero grid, absent coordinates, a high
//! UNKNOWN-team ratio) downgrades it to a warning. The findings list names
//! every rule that fired so the report stands on its own.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::ReportError;
use crate::read_json;
use crate::write_deterministic_json;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Stamped metadata artifact name.
const STAMPED_FILE: &str = "engine_meta_stamped.json";

/// Possession sequence artifact name.
const SEQ_FILE: &str = "engine_seq_possessions.json";

/// Value grid artifact name.
const GRID_FILE: &str = "engine_xt01_grid.json";

/// Written gate report name.
pub const ENGINE_GATE_REPORT_FILE: &str = "engine_gate_report.json";

/// UNKNOWN-team share above which the run is downgraded.
const UNKNOWN_TEAM_RATIO_LIMIT: f64 = 0.25;

/// Keys every sequence summary must carry.
const SUMMARY_KEYS: [&str; 8] =
    ["possession_id", "team", "half", "t_start", "t_end", "n_events", "start_xy", "end_xy"];

/// Artifacts whose evidence hashes must be stamped.
const EVIDENCE_ARTIFACTS: [&str; 3] =
    ["engine_meta.json", "engine_seq_possessions.json", "engine_xt01_grid.json"];

// ============================================================================
// SECTION: Report Types
// ============================================================================

/// Gate action, ordered by severity.
///
/// # Invariants
/// - Variants are stable for serialization and CI matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GateAction {
    /// The run is clean.
    Pass,
    /// The run is degraded but usable.
    Warn,
    /// The run must not be consumed.
    Quarantine,
}

impl GateAction {
    /// Returns the stable wire form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Warn => "WARN",
            Self::Quarantine => "QUARANTINE",
        }
    }
}

impl fmt::Display for GateAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One gate finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateFinding {
    /// Rule identifier.
    pub rule: String,
    /// Severity of the finding.
    pub status: GateAction,
    /// Detail of what fired.
    pub detail: String,
}

/// The engine gate report document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineGateReport {
    /// Final gate action (the worst finding wins).
    pub action: GateAction,
    /// Run directory evaluated.
    pub out_dir: String,
    /// Engine identifier from the stamped metadata.
    pub engine_id: Option<String>,
    /// Provider from the stamped metadata.
    pub provider: Option<String>,
    /// Algorithm version from the stamped metadata.
    pub algo_version: Option<String>,
    /// Every rule that fired.
    pub findings: Vec<GateFinding>,
}

// ============================================================================
// SECTION: Evaluation
// ============================================================================

/// Evaluates one run directory and writes `engine_gate_report.json` into it.
///
/// # Errors
///
/// Returns [`ReportError`] when a required artifact is missing or unreadable,
/// or when the report cannot be written.
pub fn evaluate_run_dir(out_dir: &Path) -> Result<(EngineGateReport, PathBuf), ReportError> {
    let report = evaluate(out_dir)?;
    let out_path = out_dir.join(ENGINE_GATE_REPORT_FILE);
    write_deterministic_json(&out_path, &report)?;
    Ok((report, out_path))
}

/// Evaluates one run directory without writing.
///
/// # Errors
///
/// Returns [`ReportError`] when a required artifact is missing or unreadable.
pub fn evaluate(out_dir: &Path) -> Result<EngineGateReport, ReportError> {
    for name in [STAMPED_FILE, SEQ_FILE, GRID_FILE] {
        let path = out_dir.join(name);
        if !path.exists() {
            return Err(ReportError::Io {
                path: path.display().to_string(),
                message: "missing artifact".to_string(),
            });
        }
    }

    let stamped = read_json(&out_dir.join(STAMPED_FILE))?;
    let seq = read_json(&out_dir.join(SEQ_FILE))?;
    let grid = read_json(&out_dir.join(GRID_FILE))?;

    let mut findings: Vec<GateFinding> = Vec::new();

    check_evidence(&stamped, &mut findings);
    check_seq_format(&seq, &mut findings);
    check_grid(&grid, &mut findings);
    check_coordinates(&stamped, &mut findings);
    check_team_quality(&seq, &mut findings);

    let action =
        findings.iter().map(|finding| finding.status).max().unwrap_or(GateAction::Pass);

    Ok(EngineGateReport {
        action,
        out_dir: out_dir.display().to_string(),
        engine_id: string_field(&stamped, "engine_id"),
        provider: string_field(&stamped, "provider"),
        algo_version: string_field(&stamped, "algo_version"),
        findings,
    })
}

// ============================================================================
// SECTION: Rules
// ============================================================================

/// Evidence presence: input and artifact hashes must be stamped.
fn check_evidence(stamped: &Value, findings: &mut Vec<GateFinding>) {
    let input_hash = stamped
        .get("input")
        .and_then(|input| input.get("source_csv_sha256"))
        .and_then(Value::as_str)
        .is_some_and(|digest| !digest.trim().is_empty());
    if !input_hash {
        findings.push(GateFinding {
            rule: "evidence.input_hash".to_string(),
            status: GateAction::Quarantine,
            detail: "missing input.source_csv_sha256".to_string(),
        });
    }

    let artifact_hashes = stamped
        .get("evidence")
        .and_then(|evidence| evidence.get("artifact_sha256"))
        .cloned()
        .unwrap_or(Value::Null);
    for artifact in EVIDENCE_ARTIFACTS {
        let present = artifact_hashes
            .get(artifact)
            .and_then(Value::as_str)
            .is_some_and(|digest| !digest.trim().is_empty());
        if !present {
            findings.push(GateFinding {
                rule: "evidence.artifact_hash".to_string(),
                status: GateAction::Quarantine,
                detail: format!("missing sha256 for {artifact}"),
            });
        }
    }
}

/// Sequence artifact structure: required keys and a non-empty summary list.
fn check_seq_format(seq: &Value, findings: &mut Vec<GateFinding>) {
    for key in ["policy", "n_possessions", "summaries"] {
        if seq.get(key).is_none() {
            findings.push(GateFinding {
                rule: "seq.required_keys".to_string(),
                status: GateAction::Quarantine,
                detail: format!("missing {key}"),
            });
        }
    }

    let Some(Value::Array(summaries)) = seq.get("summaries") else {
        findings.push(GateFinding {
            rule: "seq.summaries_list".to_string(),
            status: GateAction::Quarantine,
            detail: "summaries must be non-empty list".to_string(),
        });
        return;
    };
    if summaries.is_empty() {
        findings.push(GateFinding {
            rule: "seq.summaries_list".to_string(),
            status: GateAction::Quarantine,
            detail: "summaries must be non-empty list".to_string(),
        });
        return;
    }

    let missing: Vec<&str> = SUMMARY_KEYS
        .into_iter()
        .filter(|key| summaries[0].get(key).is_none())
        .collect();
    if !missing.is_empty() {
        findings.push(GateFinding {
            rule: "seq.summaries_schema".to_string(),
            status: GateAction::Quarantine,
            detail: format!("missing keys in summaries[0]: {}", missing.join(", ")),
        });
    }
}

/// Grid artifact structure and degeneracy.
fn check_grid(grid: &Value, findings: &mut Vec<GateFinding>) {
    for key in ["grid_spec", "solve_spec", "grid_values"] {
        if grid.get(key).is_none() {
            findings.push(GateFinding {
                rule: "xt.required_keys".to_string(),
                status: GateAction::Quarantine,
                detail: format!("missing {key}"),
            });
        }
    }

    let Some(Value::Object(values)) = grid.get("grid_values") else {
        findings.push(GateFinding {
            rule: "xt.grid_values".to_string(),
            status: GateAction::Quarantine,
            detail: "grid_values must be non-empty object".to_string(),
        });
        return;
    };
    if values.is_empty() {
        findings.push(GateFinding {
            rule: "xt.grid_values".to_string(),
            status: GateAction::Quarantine,
            detail: "grid_values must be non-empty object".to_string(),
        });
        return;
    }

    let all_zero = values
        .values()
        .all(|value| value.as_f64().is_some_and(|number| number == 0.0));
    if all_zero {
        findings.push(GateFinding {
            rule: "xt.degenerate_all_zero".to_string(),
            status: GateAction::Warn,
            detail: "all grid values are 0, likely missing x/y in input".to_string(),
        });
    }
}

/// Coordinate presence recorded by the normalization module.
fn check_coordinates(stamped: &Value, findings: &mut Vec<GateFinding>) {
    let seen_xy = stamped
        .get("raw_engine_meta")
        .and_then(|meta| meta.get("modules"))
        .and_then(|modules| modules.get("coord_normalize"))
        .and_then(|module| module.get("seen_xy"))
        .and_then(Value::as_f64);
    if seen_xy.is_none_or(|count| count == 0.0) {
        findings.push(GateFinding {
            rule: "coord.seen_xy".to_string(),
            status: GateAction::Warn,
            detail: format!("seen_xy={}, spatial features absent", seen_xy.unwrap_or(0.0)),
        });
    }
}

/// UNKNOWN-team share across sequence summaries.
fn check_team_quality(seq: &Value, findings: &mut Vec<GateFinding>) {
    let Some(Value::Array(summaries)) = seq.get("summaries") else {
        return;
    };
    let teams: Vec<String> = summaries
        .iter()
        .filter_map(|summary| summary.get("team"))
        .filter(|team| !team.is_null())
        .map(team_token)
        .collect();
    if teams.is_empty() {
        return;
    }
    let unknown = teams.iter().filter(|team| team.eq_ignore_ascii_case("UNKNOWN")).count();
    let ratio = count_ratio(unknown, teams.len());
    if ratio > UNKNOWN_TEAM_RATIO_LIMIT {
        findings.push(GateFinding {
            rule: "team.unknown_ratio".to_string(),
            status: GateAction::Warn,
            detail: format!("UNKNOWN ratio in summaries: {:.2}%", ratio * 100.0),
        });
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Extracts an optional string field from the stamped metadata.
fn string_field(document: &Value, key: &str) -> Option<String> {
    document.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Renders a team cell as a comparison token.
fn team_token(team: &Value) -> String {
    match team {
        Value::String(token) => token.clone(),
        other => other.to_string(),
    }
}

/// Share of a count over a total.
#[allow(clippy::cast_precision_loss, reason = "summary counts are tiny")]
fn count_ratio(count: usize, total: usize) -> f64 {
    if total == 0 { 0.0 } else { count as f64 / total as f64 }
}
