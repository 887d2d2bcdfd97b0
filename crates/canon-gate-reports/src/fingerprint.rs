// crates/canon-gate-reports/src/fingerprint.rs
// ============================================================================
// Module: Artifact Fingerprinting
// Description: SHA-256 fingerprints for produced artifacts with baseline diff.
// Purpose: Detect artifact drift between runs at file and content level.
// Dependencies: canon-gate-core, serde, serde_json
// ============================================================================

//! ## Overview
//! A fingerprint covers a watch list of artifacts in one run directory: raw
//! content digest, size, and, for JSON artifacts, a canonical-JSON digest
//! that ignores key ordering. The per-file entries roll up into one aggregate
//! fingerprint digest; comparing aggregates answers "did anything change" and
//! the file-level diff answers "what".

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use canon_gate_core::canonical_json_string;
use canon_gate_core::sha256_hex;
use canon_gate_core::sha256_hex_of_canonical;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::ReportError;
use crate::write_deterministic_json;

// ============================================================================
// SECTION: Fingerprint Types
// ============================================================================

/// Fingerprint of one watched artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFingerprint {
    /// Watched artifact basename.
    pub name: String,
    /// Full path the artifact was read from.
    pub path: String,
    /// Whether the artifact existed.
    pub present: bool,
    /// Size in bytes, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    /// Raw content digest, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    /// Canonical-JSON digest for JSON artifacts, when parseable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_canon_sha256: Option<String>,
}

/// Fingerprint of one run directory.
///
/// # Invariants
/// - `fingerprint_sha256` is the digest of the canonical JSON of this record
///   with the aggregate field absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactFingerprint {
    /// Run directory fingerprinted.
    pub run_dir: String,
    /// Host-supplied creation stamp.
    pub created_at: String,
    /// Watched artifacts in watch-list order.
    pub files: Vec<FileFingerprint>,
    /// Aggregate digest over the whole fingerprint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint_sha256: Option<String>,
}

// ============================================================================
// SECTION: Collection
// ============================================================================

/// Collects a fingerprint over a run directory's watch list.
///
/// # Errors
///
/// Returns [`ReportError`] when a present artifact cannot be read or the
/// aggregate cannot be serialized.
pub fn collect_fingerprint(
    run_dir: &Path,
    watch: &[String],
    created_at: &str,
) -> Result<ArtifactFingerprint, ReportError> {
    let mut files = Vec::with_capacity(watch.len());
    for name in watch {
        let path = run_dir.join(name);
        if !path.exists() {
            files.push(FileFingerprint {
                name: name.clone(),
                path: path.display().to_string(),
                present: false,
                size_bytes: None,
                sha256: None,
                json_canon_sha256: None,
            });
            continue;
        }

        let bytes = fs::read(&path).map_err(|err| ReportError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        let json_canon_sha256 = serde_json::from_slice::<Value>(&bytes)
            .ok()
            .and_then(|document| sha256_hex_of_canonical(&document).ok());

        files.push(FileFingerprint {
            name: name.clone(),
            path: path.display().to_string(),
            present: true,
            size_bytes: Some(u64::try_from(bytes.len()).unwrap_or(u64::MAX)),
            sha256: Some(sha256_hex(&bytes)),
            json_canon_sha256,
        });
    }

    let mut fingerprint = ArtifactFingerprint {
        run_dir: run_dir.display().to_string(),
        created_at: created_at.to_string(),
        files,
        fingerprint_sha256: None,
    };
    let canonical = canonical_json_string(&fingerprint)
        .map_err(|err| ReportError::Serialization(err.to_string()))?;
    fingerprint.fingerprint_sha256 = Some(sha256_hex(canonical.as_bytes()));
    Ok(fingerprint)
}

/// Writes a fingerprint as a deterministic JSON baseline.
///
/// # Errors
///
/// Returns [`ReportError`] on serialization or write failure.
pub fn write_fingerprint(
    path: &Path,
    fingerprint: &ArtifactFingerprint,
) -> Result<(), ReportError> {
    write_deterministic_json(path, fingerprint)
}

/// Loads a previously written fingerprint baseline.
///
/// # Errors
///
/// Returns [`ReportError`] on I/O or parse failure.
pub fn load_fingerprint(path: &Path) -> Result<ArtifactFingerprint, ReportError> {
    let raw = fs::read_to_string(path).map_err(|err| ReportError::Io {
        path: path.display().to_string(),
        message: err.to_string(),
    })?;
    serde_json::from_str(&raw).map_err(|err| ReportError::Parse(err.to_string()))
}

// ============================================================================
// SECTION: Comparison
// ============================================================================

/// Returns whether two fingerprints carry the same aggregate digest.
#[must_use]
pub fn fingerprints_match(baseline: &ArtifactFingerprint, current: &ArtifactFingerprint) -> bool {
    baseline.fingerprint_sha256.is_some()
        && baseline.fingerprint_sha256 == current.fingerprint_sha256
}

/// File-level diff between a baseline and a current fingerprint.
///
/// Each line names one artifact and the way it changed; an empty list means
/// the file sets and digests agree.
#[must_use]
pub fn diff_fingerprints(
    baseline: &ArtifactFingerprint,
    current: &ArtifactFingerprint,
) -> Vec<String> {
    let baseline_map: BTreeMap<&str, &FileFingerprint> =
        baseline.files.iter().map(|file| (file.name.as_str(), file)).collect();
    let current_map: BTreeMap<&str, &FileFingerprint> =
        current.files.iter().map(|file| (file.name.as_str(), file)).collect();

    let mut names: Vec<&str> = baseline_map.keys().copied().collect();
    for name in current_map.keys() {
        if !baseline_map.contains_key(name) {
            names.push(name);
        }
    }
    names.sort_unstable();

    let mut diff = Vec::new();
    for name in names {
        match (baseline_map.get(name), current_map.get(name)) {
            (None, Some(current_file)) => {
                diff.push(format!(
                    "+ {name} (new) sha256={}",
                    current_file.sha256.clone().unwrap_or_default()
                ));
            }
            (Some(baseline_file), None) => {
                diff.push(format!(
                    "- {name} (missing now) baseline_sha256={}",
                    baseline_file.sha256.clone().unwrap_or_default()
                ));
            }
            (Some(baseline_file), Some(current_file)) => {
                if baseline_file.present != current_file.present {
                    diff.push(format!(
                        "! {name} present baseline={} now={}",
                        baseline_file.present, current_file.present
                    ));
                    continue;
                }
                if baseline_file.sha256 != current_file.sha256 {
                    diff.push(format!("* {name} sha256 changed"));
                }
                if baseline_file.json_canon_sha256.is_some()
                    && current_file.json_canon_sha256.is_some()
                    && baseline_file.json_canon_sha256 != current_file.json_canon_sha256
                {
                    diff.push(format!("* {name} json_canon_sha256 changed"));
                }
            }
            (None, None) => {}
        }
    }
    diff
}
