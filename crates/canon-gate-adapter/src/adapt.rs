// crates/canon-gate-adapter/src/adapt.rs
// ============================================================================
// Module: Event Adaptation
// Description: Raw provider events onto canonical events plus quarantine.
// Purpose: Emit epistemically tagged canonical events; sideline the rest.
// Dependencies: canon-gate-core, serde_json, thiserror, time
// ============================================================================

//! ## Overview
//! Adaptation walks the provider event list once. Three outcomes per event:
//! a missing action quarantines as `MISSING_ACTION`, an action absent from
//! the contract quarantines as `UNMAPPED_ACTION`, and a mapped action becomes
//! a [`CanonEvent`] whose epistemic status is `signal` when the mapping is
//! lossy and `fact` otherwise. The adapter never raises on bad input and
//! never mutates it; quarantined events carry the raw payload verbatim.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use canon_gate_core::CanonEvent;
use canon_gate_core::CanonMeta;
use canon_gate_core::EpistemicStatus;
use canon_gate_core::EpistemicVerdict;
use canon_gate_core::EventType;
use canon_gate_core::Outcome;
use canon_gate_core::Position;
use canon_gate_core::QuarantineItem;
use canon_gate_core::QuarantineReason;
use canon_gate_core::ShotOutcome;
use canon_gate_core::format_utc_seconds;
use canon_gate_core::runtime::extract::norm_f64;
use canon_gate_core::runtime::extract::norm_str;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use time::OffsetDateTime;

use crate::contract::MappingEntry;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Provider action recorded when the event carried none at all.
const MISSING_ACTION_TOKEN: &str = "__MISSING__";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Adapter errors.
///
/// # Invariants
/// - Bad provider input is never an error; only environmental failures are.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The quarantine timestamp could not be rendered.
    #[error("adapter timestamp error: {0}")]
    Timestamp(String),
}

// ============================================================================
// SECTION: Output
// ============================================================================

/// Result of adapting one provider event batch.
///
/// # Invariants
/// - Ordering follows input order within each list; re-running on the same
///   input yields identical output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterOutput {
    /// Canonical events in input order.
    pub canon_events: Vec<CanonEvent>,
    /// Quarantined inputs in input order.
    pub quarantine: Vec<QuarantineItem>,
}

// ============================================================================
// SECTION: Adaptation
// ============================================================================

/// Adapts raw provider events through the mapping contract.
///
/// `now` stamps quarantine provenance; hosts supply it explicitly so runs
/// stay reproducible under substituted time.
///
/// # Errors
///
/// Returns [`AdapterError`] only when the supplied instant cannot be
/// rendered; provider input problems are encoded into quarantine.
pub fn adapt_events(
    events: &[Value],
    action_map: &BTreeMap<String, MappingEntry>,
    now: OffsetDateTime,
) -> Result<AdapterOutput, AdapterError> {
    let ts_utc =
        format_utc_seconds(now).map_err(|err| AdapterError::Timestamp(err.to_string()))?;

    let mut canon_events = Vec::new();
    let mut quarantine = Vec::new();

    for event in events {
        let provider_action = norm_str(event, "action");
        let Some(provider_action) = provider_action else {
            quarantine.push(QuarantineItem {
                reason: QuarantineReason::MissingAction,
                provider_action: MISSING_ACTION_TOKEN.to_string(),
                raw_event: event.clone(),
                ts_utc: ts_utc.clone(),
            });
            continue;
        };

        let Some(entry) = action_map.get(&provider_action) else {
            quarantine.push(QuarantineItem {
                reason: QuarantineReason::UnmappedAction,
                provider_action,
                raw_event: event.clone(),
                ts_utc: ts_utc.clone(),
            });
            continue;
        };

        canon_events.push(build_canon_event(event, entry));
    }

    Ok(AdapterOutput {
        canon_events,
        quarantine,
    })
}

/// Builds one canonical event from a mapped provider event.
fn build_canon_event(event: &Value, entry: &MappingEntry) -> CanonEvent {
    let meta = CanonMeta {
        epistemic_status: if entry.lossy {
            EpistemicStatus::Signal
        } else {
            EpistemicStatus::Fact
        },
        lossy_mapping: entry.lossy,
        assumption_id: Some(entry.assumption_id),
        human_override: false,
    };

    let position = match (norm_f64(event, "x"), norm_f64(event, "y")) {
        (Some(x), Some(y)) => Some(Position {
            x,
            y,
        }),
        _ => None,
    };

    CanonEvent {
        event_id: norm_str(event, "event_id").unwrap_or_default(),
        team_id: norm_str(event, "team_id"),
        player_id: norm_str(event, "player_id"),
        action: entry.canon_action.clone(),
        event_type: EventType::classify(&entry.canon_action.to_uppercase()),
        outcome: Outcome::parse_loose(norm_str(event, "outcome").as_deref()),
        shot_outcome: parse_shot_outcome(event),
        qualifiers: extract_qualifiers(event),
        epistemic: EpistemicVerdict::Valid,
        meta,
        position,
        timestamp: norm_f64(event, "event_start_time"),
        payload: event.clone(),
    }
}

/// Parses the provider shot outcome, defaulting to `UNKNOWN`.
fn parse_shot_outcome(event: &Value) -> ShotOutcome {
    match norm_str(event, "shot_outcome").map(|token| token.to_uppercase()) {
        Some(token) => match token.as_str() {
            "GOAL" => ShotOutcome::Goal,
            "SAVED" => ShotOutcome::Saved,
            "OFF_TARGET" => ShotOutcome::OffTarget,
            _ => ShotOutcome::Unknown,
        },
        None => ShotOutcome::Unknown,
    }
}

/// Copies the provider qualifier object into an ordered map.
fn extract_qualifiers(event: &Value) -> BTreeMap<String, Value> {
    let mut out = BTreeMap::new();
    if let Some(Value::Object(qualifiers)) = event.get("qualifiers") {
        for (name, value) in qualifiers {
            out.insert(name.clone(), value.clone());
        }
    }
    out
}
