// crates/canon-gate-contract/src/policy.rs
// ============================================================================
// Module: Epistemic Policy Engine
// Description: ACCEPT / SOFT_FAIL / HARD_FAIL decisions over canon metadata.
// Purpose: Gate every canonical document on its epistemic provenance.
// Dependencies: canon-gate-core, serde, thiserror
// ============================================================================

//! ## Overview
//! The policy engine decides what to do with a canonical document given its
//! epistemic status, lossy-mapping flag, and human-override request. The
//! allowed status set is derived from the [`EpistemicStatus`] enumeration at
//! decision time; an unresolvable set fails closed rather than accepting
//! anything. Lossy mappings always degrade to `SOFT_FAIL`, with or without an
//! override.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fmt;

use canon_gate_core::EpistemicStatus;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Policy engine errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling; any variant means no
///   decision was reached and callers must fail closed.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The allowed status set resolved empty.
    #[error("epistemic status enumeration resolved empty (fail-closed)")]
    EmptyAllowedSet,
}

// ============================================================================
// SECTION: Decisions
// ============================================================================

/// Policy decision kinds.
///
/// # Invariants
/// - Variants are stable for serialization and gate matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyOutcome {
    /// The document is accepted as-is.
    Accept,
    /// The document is accepted in degraded mode.
    SoftFail,
    /// The document is rejected.
    HardFail,
}

impl PolicyOutcome {
    /// Returns the stable wire form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Accept => "ACCEPT",
            Self::SoftFail => "SOFT_FAIL",
            Self::HardFail => "HARD_FAIL",
        }
    }
}

impl fmt::Display for PolicyOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One policy decision with its reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDecision {
    /// The decision kind.
    pub decision: PolicyOutcome,
    /// Human-readable justification.
    pub reason: String,
}

// ============================================================================
// SECTION: Evaluation
// ============================================================================

/// Derives the allowed epistemic status set from the enumeration.
///
/// # Errors
///
/// Returns [`PolicyError::EmptyAllowedSet`] when the derived set is empty;
/// the policy must never run against an unresolved enumeration.
fn allowed_epistemic_statuses() -> Result<BTreeSet<&'static str>, PolicyError> {
    let values: BTreeSet<&'static str> =
        EpistemicStatus::ALL.iter().map(|status| status.as_str()).collect();
    if values.is_empty() {
        return Err(PolicyError::EmptyAllowedSet);
    }
    Ok(values)
}

/// Evaluates the epistemic policy over extracted canon metadata.
///
/// # Errors
///
/// Returns [`PolicyError`] when the allowed set cannot be derived; every
/// other input shape produces a decision, not an error.
pub fn evaluate_epistemic_policy(
    epistemic_status: &str,
    lossy_mapping: bool,
    human_override: bool,
    assumption_id: Option<&str>,
) -> Result<PolicyDecision, PolicyError> {
    let allowed = allowed_epistemic_statuses()?;

    let status = epistemic_status.trim();
    if !allowed.contains(status) {
        let listing: Vec<&str> = allowed.into_iter().collect();
        return Ok(PolicyDecision {
            decision: PolicyOutcome::HardFail,
            reason: format!(
                "epistemic_status '{status}' not in allowed enum: [{}]",
                listing.join(", ")
            ),
        });
    }

    let has_assumption = assumption_id.is_some_and(|id| !id.trim().is_empty());
    if human_override && !has_assumption {
        return Ok(PolicyDecision {
            decision: PolicyOutcome::HardFail,
            reason: "human_override=true requires assumption_id".to_string(),
        });
    }

    if lossy_mapping {
        let reason = if human_override {
            "lossy_mapping=true with human_override=true (override accepted, degraded mode)"
        } else {
            "lossy_mapping=true without human_override (degraded mode)"
        };
        return Ok(PolicyDecision {
            decision: PolicyOutcome::SoftFail,
            reason: reason.to_string(),
        });
    }

    Ok(PolicyDecision {
        decision: PolicyOutcome::Accept,
        reason: "policy OK".to_string(),
    })
}
