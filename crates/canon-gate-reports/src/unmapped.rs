// crates/canon-gate-reports/src/unmapped.rs
// ============================================================================
// Module: Unmapped Actions Report
// Description: Deterministic grouping of UNMAPPED_ACTION quarantine items.
// Purpose: Show operators exactly which provider vocabulary fell through.
// Dependencies: canon-gate-core, serde, serde_json, time
// ============================================================================

//! ## Overview
//! The unmapped-actions report groups `UNMAPPED_ACTION` quarantine items by
//! provider action and records, per group, the count plus up to three example
//! raw events. Examples are chosen deterministically by the stable JSON
//! ordering of the raw event, then normalized (sorted keys, bounded string
//! and key lengths) and trimmed to a byte budget; an example that cannot fit
//! is replaced by a truncation wrapper carrying the canonical JSON prefix.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;

use canon_gate_core::QuarantineItem;
use canon_gate_core::QuarantineReason;
use canon_gate_core::canonical_json_string;
use canon_gate_core::format_utc_seconds;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use time::OffsetDateTime;

use crate::ReportError;
use crate::write_deterministic_json;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Byte budget for one serialized example.
const MAX_EXAMPLE_BYTES: usize = 2048;

/// Maximum examples retained per provider action.
const MAX_EXAMPLES_PER_ACTION: usize = 3;

/// Byte budget for one string value inside an example.
const MAX_STRING_BYTES: usize = 512;

/// Byte budget for one key inside an example.
const MAX_KEY_BYTES: usize = 128;

/// File name of the written report.
pub const UNMAPPED_REPORT_FILE: &str = "unmapped_actions.json";

// ============================================================================
// SECTION: Report Types
// ============================================================================

/// One grouped row of the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnmappedRow {
    /// Provider action that fell through the mapping.
    pub provider_action: String,
    /// Number of quarantined events carrying the action.
    pub count: usize,
    /// Up to three normalized example raw events.
    pub examples: Vec<Value>,
}

/// The unmapped-actions report document.
///
/// # Invariants
/// - Rows are sorted by descending count, then provider action.
/// - The sum of row counts equals the number of `UNMAPPED_ACTION` items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnmappedReport {
    /// Provider the batch came from.
    pub provider: String,
    /// Generation timestamp, the only non-deterministic field.
    pub generated_at_utc: String,
    /// Grouped rows.
    pub unmapped_actions: Vec<UnmappedRow>,
}

// ============================================================================
// SECTION: Generation
// ============================================================================

/// Builds the unmapped-actions report from quarantine items.
///
/// Only items with reason `UNMAPPED_ACTION` contribute; other reasons are
/// reported elsewhere.
///
/// # Errors
///
/// Returns [`ReportError`] when the generation timestamp cannot be rendered
/// or an example cannot be serialized.
pub fn build_unmapped_report(
    provider: &str,
    quarantine_items: &[QuarantineItem],
    now: OffsetDateTime,
) -> Result<UnmappedReport, ReportError> {
    let generated_at_utc =
        format_utc_seconds(now).map_err(|err| ReportError::Timestamp(err.to_string()))?;

    let mut by_action: BTreeMap<String, Vec<&QuarantineItem>> = BTreeMap::new();
    for item in quarantine_items {
        if item.reason != QuarantineReason::UnmappedAction {
            continue;
        }
        by_action.entry(item.provider_action.trim().to_string()).or_default().push(item);
    }

    let mut rows: Vec<UnmappedRow> = Vec::with_capacity(by_action.len());
    for (action, items) in by_action {
        let mut keyed: Vec<(String, &QuarantineItem)> = Vec::with_capacity(items.len());
        for item in &items {
            let key = canonical_json_string(&item.raw_event)
                .map_err(|err| ReportError::Serialization(err.to_string()))?;
            keyed.push((key, item));
        }
        keyed.sort_by(|lhs, rhs| lhs.0.cmp(&rhs.0));

        let mut examples = Vec::new();
        for (_, item) in keyed.iter().take(MAX_EXAMPLES_PER_ACTION) {
            examples.push(trim_example(&item.raw_event)?);
        }

        rows.push(UnmappedRow {
            provider_action: action,
            count: items.len(),
            examples,
        });
    }

    rows.sort_by(|lhs, rhs| {
        rhs.count.cmp(&lhs.count).then_with(|| lhs.provider_action.cmp(&rhs.provider_action))
    });

    Ok(UnmappedReport {
        provider: provider.to_string(),
        generated_at_utc,
        unmapped_actions: rows,
    })
}

/// Builds and writes the report into a directory.
///
/// # Errors
///
/// Returns [`ReportError`] on generation or write failure.
pub fn write_unmapped_report(
    provider: &str,
    quarantine_items: &[QuarantineItem],
    reports_dir: &Path,
    now: OffsetDateTime,
) -> Result<PathBuf, ReportError> {
    let report = build_unmapped_report(provider, quarantine_items, now)?;
    let out_path = reports_dir.join(UNMAPPED_REPORT_FILE);
    write_deterministic_json(&out_path, &report)?;
    Ok(out_path)
}

/// Writes the report only when the reports directory knob is set.
///
/// # Errors
///
/// Returns [`ReportError`] on generation or write failure.
pub fn maybe_write_unmapped_report(
    provider: &str,
    quarantine_items: &[QuarantineItem],
    now: OffsetDateTime,
) -> Result<Option<PathBuf>, ReportError> {
    let Some(dir) = crate::reports_dir_from_env() else {
        return Ok(None);
    };
    write_unmapped_report(provider, quarantine_items, &dir, now).map(Some)
}

// ============================================================================
// SECTION: Example Normalization
// ============================================================================

/// Truncates a string to a UTF-8 byte budget, appending an ellipsis.
fn truncate_utf8(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let ellipsis = "…";
    let budget = max_bytes.saturating_sub(ellipsis.len());
    let mut cut = budget;
    while cut > 0 && !text.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}{ellipsis}", &text[..cut])
}

/// Normalizes an example value: sorted keys, bounded keys and strings.
fn normalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sorted: BTreeMap<String, Value> = BTreeMap::new();
            for (key, inner) in map {
                sorted.insert(truncate_utf8(key, MAX_KEY_BYTES), normalize(inner));
            }
            json!(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(normalize).collect()),
        Value::String(text) => json!(truncate_utf8(text, MAX_STRING_BYTES)),
        other => other.clone(),
    }
}

/// Trims a normalized example to the byte budget.
///
/// Oversize examples become `{_truncated: true, _json_prefix: <prefix>}`.
fn trim_example(raw_event: &Value) -> Result<Value, ReportError> {
    let normalized = normalize(raw_event);
    let rendered = canonical_json_string(&normalized)
        .map_err(|err| ReportError::Serialization(err.to_string()))?;
    if rendered.len() <= MAX_EXAMPLE_BYTES {
        return Ok(normalized);
    }

    let mut prefix = truncate_utf8(&rendered, MAX_EXAMPLE_BYTES);
    let wrapper = json!({"_truncated": true, "_json_prefix": prefix});
    let wrapper_rendered = canonical_json_string(&wrapper)
        .map_err(|err| ReportError::Serialization(err.to_string()))?;
    if wrapper_rendered.len() <= MAX_EXAMPLE_BYTES {
        return Ok(wrapper);
    }

    prefix = truncate_utf8(&prefix, (MAX_EXAMPLE_BYTES / 2).max(64));
    Ok(json!({"_truncated": true, "_json_prefix": prefix}))
}
