// crates/canon-gate-core/src/runtime/extract.rs
// ============================================================================
// Module: Canon Gate Field Extraction
// Description: Normalizing accessors over untrusted JSON event payloads.
// Purpose: Give runtime components one deterministic view of loose fields.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! Provider events arrive as untrusted JSON objects. These helpers extract
//! and normalize individual fields without ever repairing them: a field that
//! cannot be normalized is `None`, and the caller decides the fail-closed
//! consequence.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;

// ============================================================================
// SECTION: Accessors
// ============================================================================

/// Extracts a trimmed, non-empty string field.
pub fn norm_str(event: &Value, key: &str) -> Option<String> {
    let raw = event.get(key)?.as_str()?;
    let trimmed = raw.trim();
    if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
}

/// Extracts a numeric field, accepting numbers and numeric strings.
pub fn norm_f64(event: &Value, key: &str) -> Option<f64> {
    match event.get(key)? {
        Value::Number(number) => number.as_f64(),
        Value::String(raw) => raw.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Extracts an uppercased event-type token.
pub fn norm_event_type(event: &Value, key: &str) -> Option<String> {
    norm_str(event, key).map(|token| token.to_uppercase())
}

/// Extracts a team identifier, accepting strings and integral numbers.
///
/// Integral numbers render without a fractional part so `1` and `1.0`
/// normalize identically.
pub fn norm_team_id(event: &Value, key: &str) -> Option<String> {
    match event.get(key)? {
        Value::Number(number) => {
            let as_f64 = number.as_f64()?;
            if as_f64.fract() == 0.0 && as_f64.is_finite() {
                #[allow(
                    clippy::cast_possible_truncation,
                    reason = "fract() == 0.0 guarantees an integral value"
                )]
                return Some(format!("{}", as_f64 as i64));
            }
            Some(as_f64.to_string())
        }
        Value::String(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
        }
        _ => None,
    }
}

/// Renders any JSON value as a zone token: strings trim, scalars render.
pub fn zone_token(value: &Value) -> String {
    match value {
        Value::String(raw) => raw.trim().to_string(),
        other => other.to_string(),
    }
}
