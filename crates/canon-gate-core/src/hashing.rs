// crates/canon-gate-core/src/hashing.rs
// ============================================================================
// Module: Canon Gate Hashing
// Description: Canonical JSON serialization and SHA-256 content digests.
// Purpose: Guarantee byte-stable artifacts and verifiable fingerprints.
// Dependencies: serde, serde_jcs, serde_json, sha2, thiserror
// ============================================================================

//! ## Overview
//! Every JSON artifact Canon Gate emits is serialized deterministically:
//! canonical key ordering, two-space indentation, UTF-8 without non-ASCII
//! escaping, and a trailing newline. Tests compare bytes, so these helpers are
//! the only sanctioned serialization path for artifacts. SHA-256 digests over
//! raw bytes and over canonical JSON back the hash gate and the artifact
//! fingerprinting tools.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;

use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Hashing and canonical serialization errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum HashError {
    /// Canonical serialization failed.
    #[error("canonical serialization error: {0}")]
    Serialization(String),
    /// Reading a file for digesting failed.
    #[error("hash input io error: {path}: {message}")]
    Io {
        /// Path that failed to read.
        path: String,
        /// Underlying error description.
        message: String,
    },
}

// ============================================================================
// SECTION: Canonical JSON
// ============================================================================

/// Serializes a value into compact canonical JSON (sorted keys, stable
/// separators, no non-ASCII escaping).
///
/// # Errors
///
/// Returns [`HashError`] when the value cannot be serialized.
pub fn canonical_json_string<T: Serialize>(value: &T) -> Result<String, HashError> {
    serde_jcs::to_string(value).map_err(|err| HashError::Serialization(err.to_string()))
}

/// Serializes a value into deterministic pretty JSON bytes.
///
/// The value is first canonicalized for key ordering, then re-rendered with
/// two-space indentation and a trailing newline. Byte-stable across runs for
/// identical inputs.
///
/// # Errors
///
/// Returns [`HashError`] when the value cannot be serialized.
pub fn deterministic_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, HashError> {
    let canonical = canonical_json_string(value)?;
    let canonical_value: serde_json::Value = serde_json::from_str(&canonical)
        .map_err(|err| HashError::Serialization(err.to_string()))?;
    let mut bytes = serde_json::to_vec_pretty(&canonical_value)
        .map_err(|err| HashError::Serialization(err.to_string()))?;
    bytes.push(b'\n');
    Ok(bytes)
}

// ============================================================================
// SECTION: Digests
// ============================================================================

/// Returns the lowercase hex SHA-256 digest of a byte slice.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// Returns the lowercase hex SHA-256 digest of a file's contents.
///
/// # Errors
///
/// Returns [`HashError`] when the file cannot be read.
pub fn sha256_hex_of_file(path: &Path) -> Result<String, HashError> {
    let bytes = fs::read(path).map_err(|err| HashError::Io {
        path: path.display().to_string(),
        message: err.to_string(),
    })?;
    Ok(sha256_hex(&bytes))
}

/// Returns the SHA-256 digest of a value's canonical JSON form.
///
/// Insensitive to source key ordering: two structurally equal documents hash
/// identically.
///
/// # Errors
///
/// Returns [`HashError`] when the value cannot be serialized.
pub fn sha256_hex_of_canonical<T: Serialize>(value: &T) -> Result<String, HashError> {
    let canonical = canonical_json_string(value)?;
    Ok(sha256_hex(canonical.as_bytes()))
}
