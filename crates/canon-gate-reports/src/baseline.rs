// crates/canon-gate-reports/src/baseline.rs
// ============================================================================
// Module: Unmapped Baseline Gate
// Description: Set-difference gate against the accepted unmapped baseline.
// Purpose: Make every new unmapped provider action an explicit decision.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! The baseline file pins the set of provider actions already known to be
//! unmapped. The gate compares the current unmapped-actions report against
//! that set; any novel action is a hard failure carrying the full sorted
//! list, so accepting new vocabulary always leaves a trail in the baseline.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::ReportError;
use crate::read_json;

// ============================================================================
// SECTION: Gate Result
// ============================================================================

/// Outcome of the baseline gate.
///
/// # Invariants
/// - `novel` is sorted; an empty list means the gate passed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselineOutcome {
    /// Provider actions present in the report but not in the baseline.
    pub novel: Vec<String>,
}

impl BaselineOutcome {
    /// Returns whether the gate passed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.novel.is_empty()
    }
}

// ============================================================================
// SECTION: Gate
// ============================================================================

/// Loads the baseline set of accepted unmapped provider actions.
///
/// # Errors
///
/// Returns [`ReportError`] on I/O or parse failure.
pub fn load_baseline_actions(path: &Path) -> Result<BTreeSet<String>, ReportError> {
    let document = read_json(path)?;
    let actions = document.get("provider_actions").cloned().unwrap_or(Value::Array(Vec::new()));
    let Value::Array(actions) = actions else {
        return Err(ReportError::Shape("provider_actions must be a list".to_string()));
    };
    Ok(actions.iter().filter_map(Value::as_str).map(str::to_string).collect())
}

/// Extracts the provider actions named by an unmapped-actions report.
///
/// # Errors
///
/// Returns [`ReportError`] on I/O or parse failure.
pub fn current_report_actions(path: &Path) -> Result<BTreeSet<String>, ReportError> {
    let document = read_json(path)?;
    let rows = document.get("unmapped_actions").cloned().unwrap_or(Value::Array(Vec::new()));
    let Value::Array(rows) = rows else {
        return Err(ReportError::Shape("unmapped_actions must be a list".to_string()));
    };
    let mut out = BTreeSet::new();
    for row in &rows {
        if let Some(action) = row.get("provider_action").and_then(Value::as_str) {
            let trimmed = action.trim();
            if !trimmed.is_empty() {
                out.insert(trimmed.to_string());
            }
        }
    }
    Ok(out)
}

/// Runs the baseline gate over a report and a baseline file.
///
/// # Errors
///
/// Returns [`ReportError`] when either input cannot be read; a populated
/// [`BaselineOutcome::novel`] is the gate failure itself.
pub fn check_baseline(
    report_path: &Path,
    baseline_path: &Path,
) -> Result<BaselineOutcome, ReportError> {
    let baseline = load_baseline_actions(baseline_path)?;
    let current = current_report_actions(report_path)?;
    let novel: Vec<String> = current.difference(&baseline).cloned().collect();
    Ok(BaselineOutcome {
        novel,
    })
}
