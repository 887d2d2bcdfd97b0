// crates/canon-gate-contract/src/schema.rs
// ============================================================================
// Module: Master Schema
// Description: Declarative column, enum, and constraint specification.
// Purpose: Describe the tabular canonical contract the validator enforces.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The master schema is a JSON document declaring column groups (with dtype
//! and nullability per column), canonical enum sets with fallbacks, and the
//! physical range constraints of the pitch ontology. The validator treats it
//! as the single source of truth; the schema version travels on every
//! validation report.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Schema loading errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling; any variant is terminal.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The schema file could not be read.
    #[error("schema io error: {0}")]
    Io(String),
    /// The schema document was malformed.
    #[error("schema parse error: {0}")]
    Parse(String),
}

// ============================================================================
// SECTION: Column Targets
// ============================================================================

/// Coercion target for one column.
///
/// # Invariants
/// - Parsed from the declarative `dtype` token; unknown tokens degrade to
///   `String` with a warning at validation time, never silently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnTarget {
    /// UTF-8 string.
    String,
    /// Boolean with a fixed accepted token set.
    Bool,
    /// 64-bit integer, round-then-widen on numeric input.
    Int,
    /// 64-bit float.
    Float,
    /// Enum column referencing a named canonical set.
    Enum(String),
    /// Unrecognized dtype token, retained for the warning path.
    Unknown(String),
}

impl ColumnTarget {
    /// Parses a declarative dtype token.
    #[must_use]
    pub fn parse(token: &str) -> Self {
        match token {
            "string" => Self::String,
            "bool" => Self::Bool,
            "int64" => Self::Int,
            "float64" => Self::Float,
            _ => token.strip_prefix("enum:").map_or_else(
                || Self::Unknown(token.to_string()),
                |name| Self::Enum(name.to_string()),
            ),
        }
    }
}

// ============================================================================
// SECTION: Specification Records
// ============================================================================

/// One column declaration inside a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDecl {
    /// Declarative dtype token.
    pub dtype: String,
    /// Whether null survives coercion in this column.
    pub nullable: bool,
}

/// One column group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSpec {
    /// Whether every column of the group must be present.
    #[serde(default)]
    pub required: bool,
    /// Column declarations keyed by column name.
    #[serde(default)]
    pub columns: BTreeMap<String, ColumnDecl>,
}

/// One canonical enum set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumSpec {
    /// Canonical uppercase values.
    pub canonical: Vec<String>,
    /// Fallback substituted for nulls and degraded cells.
    pub fallback: String,
    /// Review budget for new values per change.
    #[serde(default)]
    pub max_new_values_per_pr: u32,
}

/// Pitch coordinate constraints.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PitchConstraints {
    /// Maximum normalized x.
    pub x_max: f64,
    /// Maximum normalized y.
    pub y_max: f64,
    /// Tolerance applied on both ends.
    pub epsilon: f64,
}

/// Timestamp constraints.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeConstraints {
    /// Minimum allowed timestamp.
    pub timestamp_min: f64,
    /// Maximum allowed timestamp.
    pub timestamp_max: f64,
}

/// Phase identifier constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseConstraints {
    /// Minimum phase identifier.
    pub min: i64,
    /// Maximum phase identifier.
    pub max: i64,
}

/// Physical range constraints.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    /// Pitch coordinate box.
    pub pitch: PitchConstraints,
    /// Timestamp window.
    pub time: TimeConstraints,
    /// Phase identifier range.
    pub phase: PhaseConstraints,
}

/// The master schema document.
///
/// # Invariants
/// - Immutable once loaded; the validator never mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaSpec {
    /// Schema family name.
    pub schema_name: String,
    /// Schema version carried on every validation report.
    pub schema_version: String,
    /// Release date string, informational.
    #[serde(default)]
    pub released_at: String,
    /// Column groups keyed by group name.
    pub groups: BTreeMap<String, GroupSpec>,
    /// Canonical enum sets keyed by enum name.
    #[serde(default)]
    pub enums: BTreeMap<String, EnumSpec>,
    /// Physical range constraints.
    pub constraints: Constraints,
}

impl SchemaSpec {
    /// Loads a schema from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] on I/O or parse failure.
    pub fn from_json_file(path: &Path) -> Result<Self, SchemaError> {
        let raw = fs::read_to_string(path).map_err(|err| SchemaError::Io(err.to_string()))?;
        Self::from_json_str(&raw)
    }

    /// Parses a schema from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] on parse failure.
    pub fn from_json_str(raw: &str) -> Result<Self, SchemaError> {
        serde_json::from_str(raw).map_err(|err| SchemaError::Parse(err.to_string()))
    }

    /// Flattens all column declarations across groups.
    #[must_use]
    pub fn flat_columns(&self) -> BTreeMap<String, ColumnDecl> {
        let mut out = BTreeMap::new();
        for group in self.groups.values() {
            for (name, decl) in &group.columns {
                out.insert(name.clone(), decl.clone());
            }
        }
        out
    }

    /// Lists every column belonging to a required group.
    #[must_use]
    pub fn required_columns(&self) -> Vec<String> {
        let mut out = Vec::new();
        for group in self.groups.values() {
            if group.required {
                out.extend(group.columns.keys().cloned());
            }
        }
        out
    }
}
