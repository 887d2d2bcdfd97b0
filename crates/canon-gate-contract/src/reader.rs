// crates/canon-gate-contract/src/reader.rs
// ============================================================================
// Module: Canon Contract Reader
// Description: Schema-gated reading of canonical documents.
// Purpose: Validate, extract epistemic metadata, and apply policy, in order.
// Dependencies: crate::policy, jsonschema, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The reader performs three steps in a fixed order: schema validation
//! through a pluggable validator that must raise on invalid input, epistemic
//! metadata extraction (`epistemic_status` is mandatory and non-empty), and
//! the policy decision. Any failure before the policy step is a reader
//! error; the reader never hands an unvalidated document to the policy.

// ============================================================================
// SECTION: Imports
// ============================================================================

use jsonschema::Draft;
use serde_json::Value;
use thiserror::Error;

use crate::policy::PolicyDecision;
use crate::policy::PolicyError;
use crate::policy::evaluate_epistemic_policy;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Canon reader errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling; any variant means the
///   document was rejected before a policy decision existed.
#[derive(Debug, Error)]
pub enum ReaderError {
    /// The document root was not an object.
    #[error("canon root must be an object")]
    RootNotObject,
    /// The validator schema failed to compile.
    #[error("canon schema compile error: {0}")]
    SchemaCompile(String),
    /// The document failed schema validation.
    #[error("canon schema violation: {0}")]
    SchemaInvalid(String),
    /// `epistemic_status` was missing or empty.
    #[error("epistemic_status is mandatory and must be non-empty")]
    MissingEpistemicStatus,
    /// The policy engine failed closed.
    #[error("canon policy error: {0}")]
    Policy(#[from] PolicyError),
}

// ============================================================================
// SECTION: Validator Seam
// ============================================================================

/// Pluggable document validator.
///
/// Implementations must raise on invalid input; a validator that silently
/// passes malformed documents breaks the fail-closed contract.
pub trait SchemaValidator {
    /// Validates a document, returning the first violation as text.
    ///
    /// # Errors
    ///
    /// Returns a description of the first violation when the document does
    /// not conform.
    fn validate(&self, document: &Value) -> Result<(), String>;
}

/// JSON Schema validator backed by a compiled draft 2020-12 schema.
#[derive(Debug)]
pub struct JsonSchemaValidator {
    /// Compiled schema.
    validator: jsonschema::Validator,
}

impl JsonSchemaValidator {
    /// Compiles a schema document into a validator.
    ///
    /// # Errors
    ///
    /// Returns [`ReaderError::SchemaCompile`] when the schema is invalid.
    pub fn new(schema: &Value) -> Result<Self, ReaderError> {
        let validator = jsonschema::options()
            .with_draft(Draft::Draft202012)
            .build(schema)
            .map_err(|err| ReaderError::SchemaCompile(err.to_string()))?;
        Ok(Self {
            validator,
        })
    }
}

impl SchemaValidator for JsonSchemaValidator {
    fn validate(&self, document: &Value) -> Result<(), String> {
        match self.validator.iter_errors(document).next() {
            None => Ok(()),
            Some(error) => Err(error.to_string()),
        }
    }
}

// ============================================================================
// SECTION: Reading
// ============================================================================

/// Outcome of reading one canonical document.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonReadResult {
    /// Policy decision for the document.
    pub decision: PolicyDecision,
    /// The validated document payload.
    pub payload: Value,
}

/// Reads a canonical document through schema, metadata, and policy gates.
///
/// # Errors
///
/// Returns [`ReaderError`] when the document is not an object, fails schema
/// validation, lacks a usable `epistemic_status`, or the policy engine fails
/// closed.
pub fn read_canon_document(
    document: &Value,
    validator: &dyn SchemaValidator,
) -> Result<CanonReadResult, ReaderError> {
    if !document.is_object() {
        return Err(ReaderError::RootNotObject);
    }

    validator.validate(document).map_err(ReaderError::SchemaInvalid)?;

    let meta = document.get("epistemic_meta").filter(|value| value.is_object()).unwrap_or(document);

    let status = meta
        .get("epistemic_status")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(ReaderError::MissingEpistemicStatus)?;

    let lossy_mapping = meta.get("lossy_mapping").and_then(Value::as_bool).unwrap_or(false);
    let human_override = meta.get("human_override").and_then(Value::as_bool).unwrap_or(false);
    let assumption_id = meta.get("assumption_id").and_then(Value::as_str);

    let decision =
        evaluate_epistemic_policy(status, lossy_mapping, human_override, assumption_id)?;

    Ok(CanonReadResult {
        decision,
        payload: document.clone(),
    })
}
