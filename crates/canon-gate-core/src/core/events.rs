// crates/canon-gate-core/src/core/events.rs
// ============================================================================
// Module: Canon Gate Event Records
// Description: Canonical events, possession frames, and quarantine items.
// Purpose: Capture the typed records the pipeline emits at every stage.
// Dependencies: crate::core::epistemic, serde, serde_json, uuid
// ============================================================================

//! ## Overview
//! Records in this module form the observable surface of the pipeline: the
//! adapter emits [`CanonEvent`]s, the possession state machine emits one
//! [`PossessionFrame`] per step, and every rejected input becomes an
//! append-only [`QuarantineItem`] with enough provenance to audit and
//! reprocess. Maps use ordered keys so serialized artifacts are byte-stable.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::core::epistemic::EpistemicStatus;
use crate::core::epistemic::EpistemicVerdict;
use crate::core::epistemic::EventType;
use crate::core::epistemic::Outcome;
use crate::core::epistemic::PossessionEffect;
use crate::core::epistemic::PossessionState;
use crate::core::epistemic::ShotOutcome;

// ============================================================================
// SECTION: Canon Metadata
// ============================================================================

/// Epistemic provenance attached to every mapped record.
///
/// # Invariants
/// - `assumption_id` must be present whenever `human_override` is set; the
///   policy engine hard-fails otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonMeta {
    /// Epistemic status of the mapping that produced the record.
    pub epistemic_status: EpistemicStatus,
    /// Indicates the mapping discarded provider detail.
    pub lossy_mapping: bool,
    /// Assumption identifier for provenance (canonical hyphenated form).
    pub assumption_id: Option<Uuid>,
    /// Indicates a human explicitly overrode a policy outcome.
    #[serde(default)]
    pub human_override: bool,
}

// ============================================================================
// SECTION: Canonical Events
// ============================================================================

/// Pitch position in normalized coordinates.
///
/// # Invariants
/// - Coordinates are provider-normalized; range enforcement is the contract
///   validator's concern, not this type's.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

/// Canonical event produced by the mapping adapter.
///
/// # Invariants
/// - `action` is a canonical action identifier from the registry.
/// - If `team_id` or `player_id` is absent, the possession state machine must
///   drive state to `UNVALIDATED` without allocating possession identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonEvent {
    /// Stable event identifier.
    pub event_id: String,
    /// Team identifier, when the provider supplied one.
    pub team_id: Option<String>,
    /// Player identifier, when the provider supplied one.
    pub player_id: Option<String>,
    /// Canonical action identifier resolved by the mapping.
    pub action: String,
    /// Classified event kind.
    pub event_type: EventType,
    /// General action outcome.
    pub outcome: Outcome,
    /// Shot-specific outcome.
    pub shot_outcome: ShotOutcome,
    /// Normalized qualifier values keyed by qualifier name.
    pub qualifiers: BTreeMap<String, Value>,
    /// Runtime validator verdict.
    pub epistemic: EpistemicVerdict,
    /// Mapping provenance metadata.
    pub meta: CanonMeta,
    /// Pitch position, when the provider supplied coordinates.
    pub position: Option<Position>,
    /// Event timestamp in seconds, monotonic within a half.
    pub timestamp: Option<f64>,
    /// Raw provider event retained for provenance.
    pub payload: Value,
}

// ============================================================================
// SECTION: Possession Frames
// ============================================================================

/// One possession state machine step, as an emitted record.
///
/// # Invariants
/// - `state_after == DEAD_BALL` implies both `possession_id_after` and
///   `possessing_team_after` are absent.
/// - `possession_effect == CONTINUE` implies possession id and team are
///   unchanged and `state_after == CONTROLLED`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PossessionFrame {
    /// Event identifier the step consumed (empty when the input had none).
    pub event_id: String,
    /// State before the step.
    #[serde(rename = "prev_state_id")]
    pub state_before: PossessionState,
    /// State after the step.
    #[serde(rename = "state_id")]
    pub state_after: PossessionState,
    /// Effect the step had on the possession lifecycle.
    pub possession_effect: PossessionEffect,
    /// Possession identifier before the step.
    pub possession_id_before: Option<String>,
    /// Possession identifier after the step.
    #[serde(rename = "possession_id")]
    pub possession_id_after: Option<String>,
    /// Possessing team before the step.
    pub possessing_team_before: Option<String>,
    /// Possessing team after the step.
    #[serde(rename = "possessing_team")]
    pub possessing_team_after: Option<String>,
    /// Diagnostic reason string for the transition taken.
    pub sm_reason: String,
    /// Version of the transition logic that produced the frame.
    pub logic_version: String,
    /// Observational flags (scramble, contested count, fail-closed markers).
    pub flags: BTreeMap<String, Value>,
}

// ============================================================================
// SECTION: Quarantine
// ============================================================================

/// Reason a record was quarantined by the mapping layer.
///
/// # Invariants
/// - Variants are stable for serialization and report grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuarantineReason {
    /// The provider event carried no action at all.
    MissingAction,
    /// The provider action has no entry in the mapping contract.
    UnmappedAction,
    /// An enum cell held a value outside the canonical set.
    UnmappedEnum,
}

impl QuarantineReason {
    /// Returns the stable wire form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingAction => "MISSING_ACTION",
            Self::UnmappedAction => "UNMAPPED_ACTION",
            Self::UnmappedEnum => "UNMAPPED_ENUM",
        }
    }
}

impl fmt::Display for QuarantineReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Non-destructively sidelined record with provenance.
///
/// # Invariants
/// - Items are append-only within a run; a new run starts a fresh stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarantineItem {
    /// Why the record was quarantined.
    pub reason: QuarantineReason,
    /// Provider action token (`__MISSING__` when absent entirely).
    pub provider_action: String,
    /// The raw provider event, unmodified.
    pub raw_event: Value,
    /// UTC timestamp of quarantine, ISO-8601 with `Z` suffix.
    pub ts_utc: String,
}
