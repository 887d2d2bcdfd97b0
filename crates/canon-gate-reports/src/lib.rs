// crates/canon-gate-reports/src/lib.rs
// ============================================================================
// Module: Canon Gate Reports
// Description: Deterministic JSON reports, gates, and artifact fingerprints.
// Purpose: Surface pipeline health as byte-stable artifacts and terminal
//          gates.
// Dependencies: canon-gate-core, serde, serde_json, thiserror, time
// ============================================================================

//! ## Overview
//! Every artifact this crate writes is deterministic: canonical key order,
//! two-space indentation, UTF-8 without non-ASCII escaping, and a trailing
//! newline. The single non-deterministic field is `generated_at_utc`, and
//! hosts supply that instant explicitly. Report writes are gated by one
//! environment knob, [`REPORTS_DIR_ENV`]; when it is absent, nothing is
//! written anywhere.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod baseline;
pub mod coverage;
pub mod engine_gate;
pub mod fingerprint;
pub mod hash_gate;
pub mod unmapped;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Environment Knob
// ============================================================================

/// The single environment knob gating all report writes.
pub const REPORTS_DIR_ENV: &str = "CANON_GATE_REPORTS_DIR";

/// Resolves the reports directory from the environment.
///
/// Absence (or an empty value) disables all report writes.
#[must_use]
pub fn reports_dir_from_env() -> Option<PathBuf> {
    let raw = env::var(REPORTS_DIR_ENV).ok()?;
    let trimmed = raw.trim();
    if trimmed.is_empty() { None } else { Some(PathBuf::from(trimmed)) }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Report generation and gate errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling; all map to exit code 2 in
///   the CLI unless a gate result says otherwise.
#[derive(Debug, Error)]
pub enum ReportError {
    /// A file could not be read or written.
    #[error("report io error: {path}: {message}")]
    Io {
        /// Path involved.
        path: String,
        /// Underlying error description.
        message: String,
    },
    /// A document could not be parsed.
    #[error("report parse error: {0}")]
    Parse(String),
    /// A document had an unexpected shape.
    #[error("report shape error: {0}")]
    Shape(String),
    /// Deterministic serialization failed.
    #[error("report serialization error: {0}")]
    Serialization(String),
    /// A generation timestamp could not be rendered.
    #[error("report timestamp error: {0}")]
    Timestamp(String),
}

// ============================================================================
// SECTION: Shared Write Helpers
// ============================================================================

/// Writes a value as a deterministic JSON artifact.
///
/// # Errors
///
/// Returns [`ReportError`] on serialization or write failure.
pub(crate) fn write_deterministic_json<T: Serialize>(
    path: &Path,
    value: &T,
) -> Result<(), ReportError> {
    let bytes = canon_gate_core::deterministic_json_bytes(value)
        .map_err(|err| ReportError::Serialization(err.to_string()))?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| ReportError::Io {
            path: parent.display().to_string(),
            message: err.to_string(),
        })?;
    }
    fs::write(path, bytes).map_err(|err| ReportError::Io {
        path: path.display().to_string(),
        message: err.to_string(),
    })
}

/// Reads and parses one JSON document.
pub(crate) fn read_json(path: &Path) -> Result<serde_json::Value, ReportError> {
    let raw = fs::read_to_string(path).map_err(|err| ReportError::Io {
        path: path.display().to_string(),
        message: err.to_string(),
    })?;
    serde_json::from_str(&raw)
        .map_err(|err| ReportError::Parse(format!("{}: {err}", path.display())))
}
