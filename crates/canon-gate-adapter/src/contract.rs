// crates/canon-gate-adapter/src/contract.rs
// ============================================================================
// Module: Mapping Contract
// Description: Loader for the provider-action to canonical-action contract.
// Purpose: Validate every mapping entry before any event is adapted.
// Dependencies: serde_json, thiserror, uuid
// ============================================================================

//! ## Overview
//! The mapping contract is a JSON object keyed by provider action. Every
//! entry must carry `canon_action`, `lossy`, and a well-formed
//! `assumption_id`; a single malformed entry aborts the load. Nothing
//! downstream runs against an unvalidated contract.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Mapping contract loading errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling; any variant aborts the
///   load.
#[derive(Debug, Error)]
pub enum MappingError {
    /// The contract file could not be read.
    #[error("mapping contract io error: {0}")]
    Io(String),
    /// The contract was not parseable JSON.
    #[error("mapping contract parse error: {0}")]
    Parse(String),
    /// The document root was not an object.
    #[error("mapping contract root must be an object")]
    RootNotObject,
    /// An entry was not an object.
    #[error("invalid mapping spec for {0}: not an object")]
    EntryNotObject(String),
    /// An entry was missing a required key.
    #[error("mapping for {provider} missing key: {key}")]
    MissingKey {
        /// Provider action the entry maps.
        provider: String,
        /// The missing key.
        key: &'static str,
    },
    /// `canon_action` was empty or not a string.
    #[error("invalid canon_action for {0}")]
    InvalidCanonAction(String),
    /// `lossy` was not a boolean.
    #[error("invalid lossy flag for {0}")]
    InvalidLossy(String),
    /// `assumption_id` was not a well-formed UUID.
    #[error("invalid assumption_id for {provider}: {message}")]
    InvalidAssumptionId {
        /// Provider action the entry maps.
        provider: String,
        /// Parse failure description.
        message: String,
    },
}

// ============================================================================
// SECTION: Entries
// ============================================================================

/// One validated mapping contract entry.
///
/// # Invariants
/// - `canon_action` is non-empty and trimmed.
/// - `assumption_id` serializes in canonical lowercase hyphenated form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEntry {
    /// Canonical action the provider action maps to.
    pub canon_action: String,
    /// Indicates the mapping discards provider detail.
    pub lossy: bool,
    /// Assumption identifier for provenance.
    pub assumption_id: Uuid,
}

// ============================================================================
// SECTION: Loading
// ============================================================================

/// Loads and validates a mapping contract from a JSON file.
///
/// # Errors
///
/// Returns [`MappingError`] on I/O, parse, or per-entry validation failure.
pub fn load_action_map(path: &Path) -> Result<BTreeMap<String, MappingEntry>, MappingError> {
    let raw = fs::read_to_string(path).map_err(|err| MappingError::Io(err.to_string()))?;
    parse_action_map(&raw)
}

/// Parses and validates a mapping contract from JSON text.
///
/// # Errors
///
/// Returns [`MappingError`] on parse or per-entry validation failure.
pub fn parse_action_map(raw: &str) -> Result<BTreeMap<String, MappingEntry>, MappingError> {
    let document: Value =
        serde_json::from_str(raw).map_err(|err| MappingError::Parse(err.to_string()))?;
    let Value::Object(entries) = document else {
        return Err(MappingError::RootNotObject);
    };

    let mut out = BTreeMap::new();
    for (provider_action, spec) in entries {
        let Value::Object(fields) = &spec else {
            return Err(MappingError::EntryNotObject(provider_action));
        };

        for key in ["canon_action", "lossy", "assumption_id"] {
            if !fields.contains_key(key) {
                return Err(MappingError::MissingKey {
                    provider: provider_action,
                    key,
                });
            }
        }

        let canon_action = fields
            .get("canon_action")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| MappingError::InvalidCanonAction(provider_action.clone()))?
            .to_string();

        let lossy = fields
            .get("lossy")
            .and_then(Value::as_bool)
            .ok_or_else(|| MappingError::InvalidLossy(provider_action.clone()))?;

        let assumption_id = fields
            .get("assumption_id")
            .and_then(Value::as_str)
            .ok_or_else(|| MappingError::InvalidAssumptionId {
                provider: provider_action.clone(),
                message: "not a string".to_string(),
            })
            .and_then(|token| {
                Uuid::parse_str(token.trim()).map_err(|err| MappingError::InvalidAssumptionId {
                    provider: provider_action.clone(),
                    message: err.to_string(),
                })
            })?;

        out.insert(
            provider_action,
            MappingEntry {
                canon_action,
                lossy,
                assumption_id,
            },
        );
    }
    Ok(out)
}
