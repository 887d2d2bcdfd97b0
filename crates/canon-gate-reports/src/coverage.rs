// crates/canon-gate-reports/src/coverage.rs
// ============================================================================
// Module: Mapping Coverage Report
// Description: Type-level coverage of the mapping contract.
// Purpose: Quantify how much observed provider vocabulary is mapped.
// Dependencies: canon-gate-core, serde, serde_json, time
// ============================================================================

//! ## Overview
//! Coverage is type-level: mapped action types over mapped plus unmapped
//! action types, with the top unmapped offenders listed by descending count.
//! An empty denominator reports full coverage, never a division error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;

use canon_gate_core::format_utc_seconds;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;

use crate::ReportError;
use crate::read_json;
use crate::write_deterministic_json;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Number of top unmapped actions listed.
const TOP_UNMAPPED_LIMIT: usize = 10;

/// File name of the written report.
pub const COVERAGE_REPORT_FILE: &str = "mapping_coverage.json";

// ============================================================================
// SECTION: Report Types
// ============================================================================

/// Mapping counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageCounts {
    /// Mapped provider action types.
    pub mapped_actions: usize,
    /// Observed unmapped provider action types.
    pub unmapped_actions: usize,
    /// Denominator of the coverage ratio.
    pub total_observed_actions: usize,
    /// `mapped / (mapped + unmapped)`, `1.0` when nothing was observed.
    pub coverage_ratio: f64,
}

/// One top-unmapped listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopUnmapped {
    /// Provider action name.
    pub provider_action: String,
    /// Quarantined event count for the action.
    pub count: usize,
}

/// The mapping-coverage report document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    /// Provider the batch came from.
    pub provider: String,
    /// Generation timestamp, the only non-deterministic field.
    pub generated_at_utc: String,
    /// Coverage counters.
    pub mapping: CoverageCounts,
    /// Top unmapped actions by descending count, then name.
    pub top_unmapped: Vec<TopUnmapped>,
}

// ============================================================================
// SECTION: Generation
// ============================================================================

/// Builds the coverage report from counts and unmapped rows.
///
/// `unmapped_rows` are `(provider_action, count)` pairs as extracted from the
/// unmapped-actions report.
///
/// # Errors
///
/// Returns [`ReportError`] when the generation timestamp cannot be rendered.
pub fn build_coverage_report(
    provider: &str,
    mapped_types: usize,
    unmapped_rows: &[(String, usize)],
    now: OffsetDateTime,
) -> Result<CoverageReport, ReportError> {
    let generated_at_utc =
        format_utc_seconds(now).map_err(|err| ReportError::Timestamp(err.to_string()))?;

    let unmapped_types = unmapped_rows.len();
    let denominator = mapped_types + unmapped_types;
    let coverage_ratio = if denominator == 0 {
        1.0
    } else {
        count_to_f64(mapped_types) / count_to_f64(denominator)
    };

    let mut top: Vec<TopUnmapped> = unmapped_rows
        .iter()
        .filter(|(name, _)| !name.trim().is_empty())
        .map(|(name, count)| TopUnmapped {
            provider_action: name.trim().to_string(),
            count: *count,
        })
        .collect();
    top.sort_by(|lhs, rhs| {
        rhs.count.cmp(&lhs.count).then_with(|| lhs.provider_action.cmp(&rhs.provider_action))
    });
    top.truncate(TOP_UNMAPPED_LIMIT);

    Ok(CoverageReport {
        provider: provider.to_string(),
        generated_at_utc,
        mapping: CoverageCounts {
            mapped_actions: mapped_types,
            unmapped_actions: unmapped_types,
            total_observed_actions: denominator,
            coverage_ratio,
        },
        top_unmapped: top,
    })
}

/// Builds the report from on-disk inputs and writes it.
///
/// Reads the mapping contract (an object keyed by provider action) and the
/// unmapped-actions report, then writes `mapping_coverage.json` next to it.
///
/// # Errors
///
/// Returns [`ReportError`] on I/O, parse, shape, or write failure.
pub fn write_coverage_report(
    provider: &str,
    mappings_path: &Path,
    unmapped_report_path: &Path,
    output_dir: &Path,
    now: OffsetDateTime,
) -> Result<PathBuf, ReportError> {
    let action_map = read_json(mappings_path)?;
    let Value::Object(entries) = action_map else {
        return Err(ReportError::Shape("mapping contract must be an object".to_string()));
    };
    let mapped_types = entries.len();

    let unmapped = read_json(unmapped_report_path)?;
    let rows = unmapped.get("unmapped_actions").cloned().unwrap_or(Value::Array(Vec::new()));
    let Value::Array(rows) = rows else {
        return Err(ReportError::Shape("unmapped_actions must be a list".to_string()));
    };

    let mut unmapped_rows: Vec<(String, usize)> = Vec::with_capacity(rows.len());
    for row in &rows {
        let Value::Object(fields) = row else {
            continue;
        };
        let name = fields
            .get("provider_action")
            .and_then(Value::as_str)
            .map_or_else(String::new, |token| token.trim().to_string());
        let count = fields
            .get("count")
            .and_then(Value::as_u64)
            .and_then(|count| usize::try_from(count).ok())
            .unwrap_or(0);
        unmapped_rows.push((name, count));
    }

    let report = build_coverage_report(provider, mapped_types, &unmapped_rows, now)?;
    let out_path = output_dir.join(COVERAGE_REPORT_FILE);
    write_deterministic_json(&out_path, &report)?;
    Ok(out_path)
}

/// Writes the coverage report only when the reports directory knob is set.
///
/// The unmapped-actions report is read from, and the coverage report written
/// into, the knobbed directory. Missing inputs disable the write rather than
/// erroring, since the unmapped report itself is knob-gated upstream.
///
/// # Errors
///
/// Returns [`ReportError`] on parse, shape, or write failure.
pub fn maybe_write_coverage_report(
    provider: &str,
    mappings_path: &Path,
    now: OffsetDateTime,
) -> Result<Option<PathBuf>, ReportError> {
    let Some(dir) = crate::reports_dir_from_env() else {
        return Ok(None);
    };
    let unmapped_report_path = dir.join(crate::unmapped::UNMAPPED_REPORT_FILE);
    if !mappings_path.exists() || !unmapped_report_path.exists() {
        return Ok(None);
    }
    write_coverage_report(provider, mappings_path, &unmapped_report_path, &dir, now).map(Some)
}

/// Converts a type count into `f64` for the ratio.
#[allow(clippy::cast_precision_loss, reason = "action type counts are tiny")]
fn count_to_f64(value: usize) -> f64 {
    value as f64
}
