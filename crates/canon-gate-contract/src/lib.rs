// crates/canon-gate-contract/src/lib.rs
// ============================================================================
// Module: Canon Gate Contract
// Description: Schema enforcement, canon reading, and epistemic policy.
// Purpose: Gate every canonical document and tabular row through typed,
//          fail-closed validation.
// Dependencies: canon-gate-core, csv, jsonschema, serde, serde_json,
//               thiserror, time
// ============================================================================

//! ## Overview
//! The contract crate owns three gates. The tabular contract validator
//! enforces the master schema over rows: required columns, typed coercion,
//! enum enforcement with quarantine-and-degrade, nullability, and range
//! constraints. The canon contract reader validates whole documents against a
//! JSON schema and extracts their epistemic metadata. The epistemic policy
//! engine turns that metadata into an `ACCEPT` / `SOFT_FAIL` / `HARD_FAIL`
//! decision. Rows are never deleted and documents are never repaired.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod policy;
pub mod reader;
pub mod schema;
pub mod validator;

// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use crate::policy::PolicyDecision;
pub use crate::policy::PolicyOutcome;
pub use crate::policy::evaluate_epistemic_policy;
pub use crate::reader::CanonReadResult;
pub use crate::reader::JsonSchemaValidator;
pub use crate::reader::ReaderError;
pub use crate::reader::SchemaValidator;
pub use crate::reader::read_canon_document;
pub use crate::schema::SchemaError;
pub use crate::schema::SchemaSpec;
pub use crate::validator::ContractError;
pub use crate::validator::QuarantineWriter;
pub use crate::validator::Row;
pub use crate::validator::ValidationReport;
pub use crate::validator::check_contract;
