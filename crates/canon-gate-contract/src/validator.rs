// crates/canon-gate-contract/src/validator.rs
// ============================================================================
// Module: Tabular Contract Validator
// Description: Typed, fail-closed schema enforcement over canonical rows.
// Purpose: Coerce, constrain, and quarantine without ever deleting a row.
// Dependencies: crate::schema, canon-gate-core, csv, serde_json, thiserror,
//               time
// ============================================================================

//! ## Overview
//! The validator runs a fixed pipeline over a table of rows keyed by column
//! name: required-column presence, typed coercion, enum enforcement,
//! quarantine with epistemic degrade, a non-null recheck, and physical range
//! constraints. Hard errors abort with the report; soft violations degrade
//! the row (`audit_flag`, `popper_tag`) and append it to a reason-keyed CSV
//! quarantine stream. Canonical rows are built as new values; the source
//! table is never mutated.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

use canon_gate_core::compact_utc_stamp;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;
use time::OffsetDateTime;

use crate::schema::ColumnDecl;
use crate::schema::ColumnTarget;
use crate::schema::SchemaSpec;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Epistemic tag applied to degraded rows.
const LOW_CONFIDENCE_TAG: &str = "LOW_CONFIDENCE";

/// Marker substituted into enum cells outside the canonical set.
const UNMAPPED_ENUM_MARKER: &str = "UNMAPPED_ENUM";

/// Accepted boolean truthy tokens.
const BOOL_TRUE_TOKENS: [&str; 5] = ["1", "true", "t", "yes", "y"];

/// Accepted boolean falsy tokens.
const BOOL_FALSE_TOKENS: [&str; 5] = ["0", "false", "f", "no", "n"];

// ============================================================================
// SECTION: Types
// ============================================================================

/// One tabular row keyed by column name.
pub type Row = BTreeMap<String, Value>;

/// Validation outcome for one table.
///
/// # Invariants
/// - `errors` non-empty means the table must not be trusted downstream.
/// - Quarantined rows remain in the table, degraded, never deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    /// Version of the schema the table was validated against.
    pub schema_version: String,
    /// Hard errors; any entry is terminal for the table.
    pub errors: Vec<String>,
    /// Soft findings that degraded rows without rejecting them.
    pub warnings: Vec<String>,
    /// Number of rows appended to the quarantine stream.
    pub quarantined_rows: usize,
}

impl ValidationReport {
    /// Creates an empty report for a schema version.
    #[must_use]
    pub const fn new(schema_version: String) -> Self {
        Self {
            schema_version,
            errors: Vec::new(),
            warnings: Vec::new(),
            quarantined_rows: 0,
        }
    }

    /// Returns whether the table passed without hard errors.
    #[must_use]
    pub fn ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Contract validator environmental errors.
///
/// # Invariants
/// - Only side-stream I/O raises; validation findings go into the report.
#[derive(Debug, Error)]
pub enum ContractError {
    /// Writing the quarantine side-stream failed.
    #[error("quarantine stream io error: {0}")]
    Io(String),
    /// Rendering the quarantine CSV failed.
    #[error("quarantine csv error: {0}")]
    Csv(String),
}

// ============================================================================
// SECTION: Quarantine Writer
// ============================================================================

/// Reason-keyed CSV quarantine side-stream.
///
/// # Invariants
/// - Streams are append-only within a run; every write also appends one line
///   to `manifest.log`.
#[derive(Debug, Clone)]
pub struct QuarantineWriter {
    /// Directory quarantine files are written into.
    dir: PathBuf,
}

impl QuarantineWriter {
    /// Creates a writer targeting a quarantine directory.
    #[must_use]
    pub const fn new(dir: PathBuf) -> Self {
        Self {
            dir,
        }
    }

    /// Appends rows to a reason-keyed CSV stream.
    ///
    /// The file is named `quarantine_<reason>_<utc-stamp>.csv`; the header is
    /// the sorted union of row columns plus `quarantine_reason`.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError`] when the directory, CSV, or manifest cannot
    /// be written.
    pub fn write_rows(
        &self,
        reason: &str,
        rows: &[Row],
        now: OffsetDateTime,
    ) -> Result<PathBuf, ContractError> {
        fs::create_dir_all(&self.dir).map_err(|err| ContractError::Io(err.to_string()))?;
        let stamp = compact_utc_stamp(now);
        let file_name = format!("quarantine_{reason}_{stamp}.csv");
        let out_path = self.dir.join(&file_name);

        let mut columns: BTreeSet<String> = BTreeSet::new();
        for row in rows {
            columns.extend(row.keys().cloned());
        }
        let mut header: Vec<String> = columns.into_iter().collect();
        header.push("quarantine_reason".to_string());

        let mut writer = csv::Writer::from_path(&out_path)
            .map_err(|err| ContractError::Csv(err.to_string()))?;
        writer.write_record(&header).map_err(|err| ContractError::Csv(err.to_string()))?;
        for row in rows {
            let record: Vec<String> = header
                .iter()
                .map(|column| {
                    if column == "quarantine_reason" {
                        reason.to_string()
                    } else {
                        row.get(column).map_or_else(String::new, render_cell)
                    }
                })
                .collect();
            writer.write_record(&record).map_err(|err| ContractError::Csv(err.to_string()))?;
        }
        writer.flush().map_err(|err| ContractError::Csv(err.to_string()))?;

        let manifest = self.dir.join("manifest.log");
        let mut handle = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(manifest)
            .map_err(|err| ContractError::Io(err.to_string()))?;
        writeln!(handle, "{stamp}\t{file_name}\treason={reason}\trows={}", rows.len())
            .map_err(|err| ContractError::Io(err.to_string()))?;

        Ok(out_path)
    }
}

/// Renders one cell for CSV output.
fn render_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

// ============================================================================
// SECTION: Contract Check
// ============================================================================

/// Validates a table against the master schema.
///
/// Returns the rebuilt canonical table alongside the validation report. Rows
/// are never deleted: soft violations degrade and quarantine, hard errors
/// populate `report.errors` and abort the pipeline for this table.
///
/// # Errors
///
/// Returns [`ContractError`] only when the quarantine side-stream cannot be
/// written; validation findings never raise.
pub fn check_contract(
    rows: &[Row],
    schema: &SchemaSpec,
    quarantine: Option<&QuarantineWriter>,
    now: OffsetDateTime,
) -> Result<(Vec<Row>, ValidationReport), ContractError> {
    let mut report = ValidationReport::new(schema.schema_version.clone());
    let columns = schema.flat_columns();

    // 1) Required columns must exist in the table.
    let table_columns: BTreeSet<String> =
        rows.iter().flat_map(|row| row.keys().cloned()).collect();
    let missing: Vec<String> = schema
        .required_columns()
        .into_iter()
        .filter(|column| !table_columns.contains(column))
        .collect();
    if !missing.is_empty() {
        report.errors.push(format!("Critical: missing required columns: {}", missing.join(", ")));
        return Ok((rows.to_vec(), report));
    }

    // 2) Typed coercion into a rebuilt table.
    let mut table: Vec<Row> = rows.to_vec();
    for (column, decl) in &columns {
        if !table_columns.contains(column) {
            continue;
        }
        coerce_column(&mut table, column, decl, &mut report);
    }
    if !report.ok() {
        return Ok((table, report));
    }

    // 3) Validator columns exist even when upstream never set them.
    for row in &mut table {
        row.entry("audit_flag".to_string()).or_insert(json!(false));
        row.entry("popper_tag".to_string()).or_insert(json!(LOW_CONFIDENCE_TAG));
    }

    // 4) Enum enforcement with quarantine and epistemic degrade.
    for (column, decl) in &columns {
        let ColumnTarget::Enum(enum_name) = ColumnTarget::parse(&decl.dtype) else {
            continue;
        };
        let Some(enum_spec) = schema.enums.get(&enum_name) else {
            report.warnings.push(format!(
                "Enum '{enum_name}' referenced by '{column}' is not declared; column left as-is."
            ));
            continue;
        };
        if !table_columns.contains(column) {
            continue;
        }

        let canonical: BTreeSet<String> =
            enum_spec.canonical.iter().map(|value| value.to_uppercase()).collect();
        let fallback = enum_spec.fallback.to_uppercase();

        let mut unmapped_indexes: Vec<usize> = Vec::new();
        for (index, row) in table.iter_mut().enumerate() {
            let cell = row.get(column).cloned().unwrap_or(Value::Null);
            if cell.is_null() {
                row.insert(column.clone(), json!(fallback.clone()));
                continue;
            }
            let normalized = enum_cell_token(&cell);
            if canonical.contains(&normalized) {
                row.insert(column.clone(), json!(normalized));
            } else {
                row.insert(column.clone(), json!(UNMAPPED_ENUM_MARKER));
                unmapped_indexes.push(index);
            }
        }

        if unmapped_indexes.is_empty() {
            continue;
        }

        let reason = format!("UNMAPPED_{}", column.to_uppercase());
        if let Some(writer) = quarantine {
            let quarantined: Vec<Row> =
                unmapped_indexes.iter().filter_map(|index| table.get(*index).cloned()).collect();
            writer.write_rows(&reason, &quarantined, now)?;
        }
        for index in &unmapped_indexes {
            if let Some(row) = table.get_mut(*index) {
                row.insert("audit_flag".to_string(), json!(true));
                row.insert("popper_tag".to_string(), json!(LOW_CONFIDENCE_TAG));
                row.insert(column.clone(), json!(fallback.clone()));
            }
        }
        report
            .warnings
            .push(format!("Unmapped {column} rows quarantined: {}", unmapped_indexes.len()));
        report.quarantined_rows += unmapped_indexes.len();
    }

    // 5) Non-nullable columns must be non-null after coercion.
    let null_violations: Vec<String> = columns
        .iter()
        .filter(|(column, decl)| {
            !decl.nullable
                && table_columns.contains(*column)
                && table.iter().any(|row| row.get(*column).is_none_or(Value::is_null))
        })
        .map(|(column, _)| column.clone())
        .collect();
    if !null_violations.is_empty() {
        report.errors.push(format!(
            "Critical: nulls in non-nullable columns: {}",
            null_violations.join(", ")
        ));
        return Ok((table, report));
    }

    // 6) Physical range constraints.
    check_range(
        &table,
        "x_norm",
        -schema.constraints.pitch.epsilon,
        schema.constraints.pitch.x_max + schema.constraints.pitch.epsilon,
        "Critical: x_norm outside pitch ontology.",
        &mut report,
    );
    if !report.ok() {
        return Ok((table, report));
    }
    check_range(
        &table,
        "y_norm",
        -schema.constraints.pitch.epsilon,
        schema.constraints.pitch.y_max + schema.constraints.pitch.epsilon,
        "Critical: y_norm outside pitch ontology.",
        &mut report,
    );
    if !report.ok() {
        return Ok((table, report));
    }
    check_range(
        &table,
        "timestamp",
        schema.constraints.time.timestamp_min,
        schema.constraints.time.timestamp_max,
        "Critical: timestamp outside allowed range.",
        &mut report,
    );
    if !report.ok() {
        return Ok((table, report));
    }
    check_phase_range(&table, schema, &mut report);

    Ok((table, report))
}

// ============================================================================
// SECTION: Coercion
// ============================================================================

/// Coerces one column in place across the table.
fn coerce_column(table: &mut [Row], column: &str, decl: &ColumnDecl, report: &mut ValidationReport) {
    let target = ColumnTarget::parse(&decl.dtype);
    let mut loss_count = 0_usize;
    let kind = match &target {
        ColumnTarget::Bool => "bool",
        ColumnTarget::Int | ColumnTarget::Float => "numeric",
        ColumnTarget::String | ColumnTarget::Enum(_) => "string",
        ColumnTarget::Unknown(token) => {
            report.warnings.push(format!(
                "Unknown dtype '{token}' for '{column}', coerced to string."
            ));
            "string"
        }
    };

    for row in table.iter_mut() {
        let cell = row.get(column).cloned().unwrap_or(Value::Null);
        if cell.is_null() {
            row.insert(column.to_string(), Value::Null);
            continue;
        }
        let (coerced, lost) = coerce_cell(&cell, &target);
        if lost {
            loss_count += 1;
        }
        row.insert(column.to_string(), coerced);
    }

    if loss_count > 0 && !decl.nullable {
        report.errors.push(format!(
            "Critical: {kind} coercion loss in '{column}' ({loss_count} rows)."
        ));
    }
}

/// Coerces one non-null cell; returns the value and whether data was lost.
fn coerce_cell(cell: &Value, target: &ColumnTarget) -> (Value, bool) {
    match target {
        ColumnTarget::String | ColumnTarget::Unknown(_) => (json!(string_repr(cell)), false),
        ColumnTarget::Bool => match parse_bool(cell) {
            Some(flag) => (json!(flag), false),
            None => (Value::Null, true),
        },
        ColumnTarget::Float => match parse_f64(cell) {
            Some(number) => (json!(number), false),
            None => (Value::Null, true),
        },
        ColumnTarget::Int => match parse_f64(cell) {
            Some(number) => (json!(round_to_i64(number)), false),
            None => (Value::Null, true),
        },
        ColumnTarget::Enum(_) => (json!(enum_cell_token(cell)), false),
    }
}

/// String form of a scalar cell.
fn string_repr(cell: &Value) -> String {
    match cell {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Accepts a fixed token set for booleans.
fn parse_bool(cell: &Value) -> Option<bool> {
    if let Value::Bool(flag) = cell {
        return Some(*flag);
    }
    let token = string_repr(cell).trim().to_lowercase();
    if BOOL_TRUE_TOKENS.contains(&token.as_str()) {
        Some(true)
    } else if BOOL_FALSE_TOKENS.contains(&token.as_str()) {
        Some(false)
    } else {
        None
    }
}

/// Numeric parsing: numbers pass through, strings parse, booleans widen.
fn parse_f64(cell: &Value) -> Option<f64> {
    match cell {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        Value::Bool(flag) => Some(if *flag { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Rounds a float into a 64-bit integer.
#[allow(clippy::cast_possible_truncation, reason = "values are rounded and bounded by contract")]
fn round_to_i64(number: f64) -> i64 {
    number.round() as i64
}

/// Uppercase token of an enum cell.
fn enum_cell_token(cell: &Value) -> String {
    string_repr(cell).trim().to_uppercase()
}

// ============================================================================
// SECTION: Constraints
// ============================================================================

/// Checks one numeric column against an inclusive range.
fn check_range(
    table: &[Row],
    column: &str,
    min: f64,
    max: f64,
    message: &str,
    report: &mut ValidationReport,
) {
    if !table.iter().any(|row| row.contains_key(column)) {
        return;
    }
    for row in table {
        let Some(cell) = row.get(column) else {
            continue;
        };
        if cell.is_null() {
            continue;
        }
        match parse_f64(cell) {
            Some(value) if value >= min && value <= max => {}
            _ => {
                report.errors.push(message.to_string());
                return;
            }
        }
    }
}

/// Checks `phase_id` against the declared integer range.
fn check_phase_range(table: &[Row], schema: &SchemaSpec, report: &mut ValidationReport) {
    let min = schema.constraints.phase.min;
    let max = schema.constraints.phase.max;
    if !table.iter().any(|row| row.contains_key("phase_id")) {
        return;
    }
    for row in table {
        let Some(cell) = row.get("phase_id") else {
            continue;
        };
        if cell.is_null() {
            continue;
        }
        let in_range = parse_f64(cell)
            .map(round_to_i64)
            .is_some_and(|phase| phase >= min && phase <= max);
        if !in_range {
            report.errors.push(format!("Critical: phase_id outside {min}-{max} range."));
            return;
        }
    }
}
