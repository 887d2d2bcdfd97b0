// crates/canon-gate-reports/src/hash_gate.rs
// ============================================================================
// Module: Canon Hash Gate
// Description: Manifest-driven SHA-256 verification of canonical files.
// Purpose: Refuse to run against tampered or missing canon documents.
// Dependencies: canon-gate-core, serde, serde_json
// ============================================================================

//! ## Overview
//! The canon manifest pins `{algo, version, files}` where `files` maps
//! relative paths to expected SHA-256 digests. Every listed path must exist
//! and match; the algorithm must be `sha256`. A malformed manifest fails
//! closed before any file is touched; per-file mismatches are collected into
//! the gate result so one run reports the full damage.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;

use canon_gate_core::sha256_hex_of_file;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::ReportError;
use crate::read_json;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// The only supported digest algorithm.
const SUPPORTED_ALGO: &str = "sha256";

/// Minimum plausible digest length accepted from a manifest.
const MIN_DIGEST_CHARS: usize = 32;

// ============================================================================
// SECTION: Gate Result
// ============================================================================

/// Status of one manifest entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum HashCheckStatus {
    /// The file exists and matches its digest.
    Pass,
    /// The manifest entry itself was malformed.
    InvalidEntry,
    /// The file does not exist.
    Missing,
    /// The file digest does not match.
    Mismatch {
        /// Expected digest.
        expected: String,
        /// Actual digest.
        actual: String,
    },
    /// The file could not be read.
    Unreadable {
        /// Underlying error description.
        message: String,
    },
}

/// One manifest entry verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashCheck {
    /// Manifest-relative path.
    pub path: String,
    /// Verification status.
    #[serde(flatten)]
    pub status: HashCheckStatus,
}

/// Result of running the hash gate.
///
/// # Invariants
/// - `passed` is true exactly when every check is `Pass`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashGateResult {
    /// Manifest version string.
    pub version: String,
    /// Per-file checks in manifest order.
    pub checks: Vec<HashCheck>,
    /// Overall outcome.
    pub passed: bool,
}

// ============================================================================
// SECTION: Gate
// ============================================================================

/// Verifies a canon hash manifest against files under a root directory.
///
/// # Errors
///
/// Returns [`ReportError`] when the manifest is unreadable or malformed
/// (wrong root shape, unsupported algorithm, missing or empty `files`);
/// per-file failures populate the result instead.
pub fn verify_manifest(manifest_path: &Path, root: &Path) -> Result<HashGateResult, ReportError> {
    let document = read_json(manifest_path)?;
    let Value::Object(fields) = &document else {
        return Err(ReportError::Shape("manifest root must be an object".to_string()));
    };

    let algo = fields.get("algo").and_then(Value::as_str).unwrap_or_default();
    if algo != SUPPORTED_ALGO {
        return Err(ReportError::Shape(format!("unsupported algo: {algo}")));
    }

    let version = fields
        .get("version")
        .and_then(Value::as_str)
        .map_or_else(String::new, str::to_string);

    let Some(Value::Object(files)) = fields.get("files") else {
        return Err(ReportError::Shape("manifest files missing or empty".to_string()));
    };
    if files.is_empty() {
        return Err(ReportError::Shape("manifest files missing or empty".to_string()));
    }

    let mut checks = Vec::with_capacity(files.len());
    let mut passed = true;
    for (relative, expected) in files {
        let status = check_entry(root, relative, expected);
        if status != HashCheckStatus::Pass {
            passed = false;
        }
        checks.push(HashCheck {
            path: relative.clone(),
            status,
        });
    }

    Ok(HashGateResult {
        version,
        checks,
        passed,
    })
}

/// Verifies one manifest entry.
fn check_entry(root: &Path, relative: &str, expected: &Value) -> HashCheckStatus {
    if relative.trim().is_empty() {
        return HashCheckStatus::InvalidEntry;
    }
    let Some(expected) = expected.as_str().map(str::trim) else {
        return HashCheckStatus::InvalidEntry;
    };
    if expected.len() < MIN_DIGEST_CHARS {
        return HashCheckStatus::InvalidEntry;
    }

    let path = root.join(relative);
    if !path.exists() {
        return HashCheckStatus::Missing;
    }
    match sha256_hex_of_file(&path) {
        Ok(actual) => {
            if actual == expected {
                HashCheckStatus::Pass
            } else {
                HashCheckStatus::Mismatch {
                    expected: expected.to_string(),
                    actual,
                }
            }
        }
        Err(err) => HashCheckStatus::Unreadable {
            message: err.to_string(),
        },
    }
}
