// crates/canon-gate-core/src/runtime/state_machine.rs
// ============================================================================
// Module: Possession State Machine
// Description: Deterministic possession transitions with fail-closed gates.
// Purpose: Drive possession lifecycle per stream without ever raising.
// Dependencies: crate::core, crate::runtime::extract, serde_json
// ============================================================================

//! ## Overview
//! The possession state machine consumes loosely shaped provider events and
//! emits one [`PossessionFrame`] per step. It never raises: malformed input
//! and undefined transitions are encoded into `ERROR` or `UNVALIDATED` state
//! with a diagnostic reason. Possession identifiers are allocated from a
//! strictly monotonic counter private to the instance; construct one machine
//! per stream and thread it through callers explicitly.
//!
//! Fail-closed principles:
//! - Non-object event or missing required keys yields `ERROR` without a
//!   transition.
//! - Missing player identity yields `UNVALIDATED` with possession identity
//!   cleared; no possession is ever allocated for an unattributed event.
//! - Unknown events yield `UNVALIDATED` without a transition.
//! - `PASS`/`DRIBBLE` with a failed or missing outcome yields `UNVALIDATED`;
//!   the transition table does not speculate.
//! - `DEAD_BALL` always clears possession identity.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde_json::Value;
use serde_json::json;

use crate::core::epistemic::EventType;
use crate::core::epistemic::Outcome;
use crate::core::epistemic::PossessionEffect;
use crate::core::epistemic::PossessionState;
use crate::core::events::PossessionFrame;
use crate::runtime::extract::norm_event_type;
use crate::runtime::extract::norm_f64;
use crate::runtime::extract::norm_str;
use crate::runtime::extract::norm_team_id;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Version tag stamped into every emitted frame.
pub const LOGIC_VERSION: &str = "v1.0.0";

/// Upstream verdicts that force the epistemic gate closed.
const EPISTEMIC_GATE_VERDICTS: [&str; 2] = ["UNVALIDATED", "FALSIFIED"];

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Tunable parameters for a possession state machine instance.
///
/// # Invariants
/// - `scramble_buffer_s` is a non-negative window in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateMachineConfig {
    /// Time window during which a team change out of `CONTESTED` keeps the
    /// existing possession instead of allocating a new one.
    pub scramble_buffer_s: f64,
}

impl Default for StateMachineConfig {
    fn default() -> Self {
        Self {
            scramble_buffer_s: 0.5,
        }
    }
}

// ============================================================================
// SECTION: State Machine
// ============================================================================

/// Deterministic possession state machine.
///
/// # Invariants
/// - `DEAD_BALL` implies possession id and possessing team are absent.
/// - Possession ids strictly increase and are never reused.
/// - Required-key failures preserve possession identity and last-seen
///   fields; the identity and epistemic gates clear possession without
///   allocating.
#[derive(Debug)]
pub struct PossessionStateMachine {
    /// Instance configuration.
    config: StateMachineConfig,
    /// Current state.
    state: PossessionState,
    /// Current possession identifier.
    possession_id: Option<String>,
    /// Current possessing team.
    team_id: Option<String>,
    /// Timestamp of the last committed event.
    last_ts: Option<f64>,
    /// Team of the last committed event.
    last_team_id: Option<String>,
    /// Monotonic possession id counter.
    pos_counter: u64,
    /// Consecutive contested steps, observational only.
    contested_count: u64,
}

impl PossessionStateMachine {
    /// Creates a machine in the initial `DEAD_BALL` state.
    #[must_use]
    pub fn new(config: StateMachineConfig) -> Self {
        Self {
            config,
            state: PossessionState::DeadBall,
            possession_id: None,
            team_id: None,
            last_ts: None,
            last_team_id: None,
            pos_counter: 0,
            contested_count: 0,
        }
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> PossessionState {
        self.state
    }

    /// Returns the current possession identifier.
    #[must_use]
    pub fn possession_id(&self) -> Option<&str> {
        self.possession_id.as_deref()
    }

    /// Allocates the next possession identifier.
    fn next_possession_id(&mut self) -> String {
        self.pos_counter += 1;
        format!("p{:06}", self.pos_counter)
    }

    /// Processes one event and emits the resulting frame.
    ///
    /// Never panics or errors; every malformed input is encoded into the
    /// frame's state and reason.
    pub fn update(&mut self, event: &Value) -> PossessionFrame {
        let prev_state = self.state;
        let prev_pos_id = self.possession_id.clone();
        let prev_team = self.team_id.clone();

        // Fail-closed: the event must be a JSON object.
        if !event.is_object() {
            return self.frame_uncommitted(
                event,
                prev_state,
                PossessionState::Error,
                PossessionEffect::Neutral,
                "fail_closed:event_not_object",
                BTreeMap::new(),
            );
        }

        let event_type = norm_event_type(event, "event_type");
        let team_id = norm_team_id(event, "team_id");
        let ts = norm_f64(event, "event_start_time");

        // Fail-closed: required keys, possession identity preserved.
        let (Some(type_token), Some(team_id), Some(ts)) = (event_type, team_id, ts) else {
            return self.frame_uncommitted(
                event,
                prev_state,
                PossessionState::Error,
                PossessionEffect::Neutral,
                "fail_closed:missing_required_keys",
                BTreeMap::new(),
            );
        };

        // Identity gate: player identity is mandatory; no possession may be
        // allocated for an unattributed event.
        if norm_str(event, "player_id").is_none() {
            return self.commit_unvalidated(event, prev_state, "fail_closed:MISSING_IDENTITY");
        }

        // Epistemic gate: upstream rejection is never propagated as play.
        if let Some(verdict) = norm_str(event, "epistemic")
            && EPISTEMIC_GATE_VERDICTS.contains(&verdict.to_uppercase().as_str())
        {
            let reason = format!("fail_closed:EPISTEMIC_{}", verdict.to_uppercase());
            return self.commit_unvalidated(event, prev_state, &reason);
        }

        // Atomic unification: same timestamp and same team as the previous
        // event collapse into one logical atom with no transition.
        if let (Some(last_ts), Some(last_team)) = (self.last_ts, self.last_team_id.as_ref())
            && ts == last_ts
            && team_id == *last_team
        {
            self.last_ts = Some(ts);
            self.last_team_id = Some(team_id);
            return self.frame_uncommitted(
                event,
                prev_state,
                prev_state,
                PossessionEffect::Neutral,
                "atomic_unify:same_ts_same_team",
                BTreeMap::new(),
            );
        }

        let outcome = Outcome::parse_loose(norm_str(event, "outcome").as_deref());
        let (mut new_state, mut effect, mut reason) = transition(prev_state, &type_token, outcome);

        let mut new_pos_id = prev_pos_id.clone();
        let mut new_team = prev_team.clone();
        let mut flags: BTreeMap<String, Value> = BTreeMap::new();

        if new_state == PossessionState::DeadBall {
            new_pos_id = None;
            new_team = None;
        } else if effect == PossessionEffect::Start {
            if new_state == PossessionState::Controlled {
                let in_scramble_window = prev_team.is_some()
                    && prev_team.as_deref() != Some(team_id.as_str())
                    && prev_state == PossessionState::Contested
                    && self.last_ts.is_some_and(|last| {
                        (ts - last) <= self.config.scramble_buffer_s
                    });
                if in_scramble_window {
                    effect = PossessionEffect::Neutral;
                    let dt = self.last_ts.map_or(0.0, |last| ts - last);
                    reason = format!("scramble_buffer:hold_possession_dt={dt:.3}");
                    flags.insert("scramble_hold".to_string(), json!(true));
                } else {
                    new_pos_id = Some(self.next_possession_id());
                    new_team = Some(team_id.clone());
                }
            } else {
                new_state = PossessionState::Error;
                effect = PossessionEffect::Neutral;
                reason = "invariant_violation:start_not_controlled".to_string();
            }
        } else if effect == PossessionEffect::Continue {
            if new_state != PossessionState::Controlled {
                new_state = PossessionState::Error;
                effect = PossessionEffect::Neutral;
                reason = "invariant_violation:continue_not_controlled".to_string();
            }
            if new_pos_id.is_none() {
                new_pos_id = Some(self.next_possession_id());
                new_team = Some(team_id.clone());
                reason = format!("{reason}|autostart_missing_possession");
            }
        } else if new_team.is_none() && new_pos_id.is_some() {
            new_state = PossessionState::Error;
            effect = PossessionEffect::Neutral;
            reason = "fail_closed:possession_without_team".to_string();
        }

        if new_state == PossessionState::Contested {
            self.contested_count += 1;
            flags.insert("contested_count".to_string(), json!(self.contested_count));
        } else {
            self.contested_count = 0;
        }

        self.state = new_state;
        self.possession_id = new_pos_id;
        self.team_id = new_team;
        self.last_ts = Some(ts);
        self.last_team_id = Some(team_id);

        self.frame(event, prev_state, prev_pos_id, prev_team, effect, &reason, flags)
    }

    /// Commits the `UNVALIDATED` state with possession identity cleared.
    fn commit_unvalidated(
        &mut self,
        event: &Value,
        prev_state: PossessionState,
        reason: &str,
    ) -> PossessionFrame {
        let prev_pos_id = self.possession_id.clone();
        let prev_team = self.team_id.clone();
        self.state = PossessionState::Unvalidated;
        self.possession_id = None;
        self.team_id = None;
        self.contested_count = 0;
        let mut flags = BTreeMap::new();
        flags.insert("fail_closed".to_string(), json!(reason));
        self.frame(
            event,
            prev_state,
            prev_pos_id,
            prev_team,
            PossessionEffect::Neutral,
            reason,
            flags,
        )
    }

    /// Builds a frame without committing any machine state.
    fn frame_uncommitted(
        &self,
        event: &Value,
        prev_state: PossessionState,
        reported_state: PossessionState,
        effect: PossessionEffect,
        reason: &str,
        flags: BTreeMap<String, Value>,
    ) -> PossessionFrame {
        PossessionFrame {
            event_id: event_id_of(event),
            state_before: prev_state,
            state_after: reported_state,
            possession_effect: effect,
            possession_id_before: self.possession_id.clone(),
            possession_id_after: self.possession_id.clone(),
            possessing_team_before: self.team_id.clone(),
            possessing_team_after: self.team_id.clone(),
            sm_reason: reason.to_string(),
            logic_version: LOGIC_VERSION.to_string(),
            flags,
        }
    }

    /// Builds a frame from committed machine state.
    fn frame(
        &self,
        event: &Value,
        prev_state: PossessionState,
        prev_pos_id: Option<String>,
        prev_team: Option<String>,
        effect: PossessionEffect,
        reason: &str,
        flags: BTreeMap<String, Value>,
    ) -> PossessionFrame {
        PossessionFrame {
            event_id: event_id_of(event),
            state_before: prev_state,
            state_after: self.state,
            possession_effect: effect,
            possession_id_before: prev_pos_id,
            possession_id_after: self.possession_id.clone(),
            possessing_team_before: prev_team,
            possessing_team_after: self.team_id.clone(),
            sm_reason: reason.to_string(),
            logic_version: LOGIC_VERSION.to_string(),
            flags,
        }
    }
}

impl Default for PossessionStateMachine {
    fn default() -> Self {
        Self::new(StateMachineConfig::default())
    }
}

// ============================================================================
// SECTION: Transition Table
// ============================================================================

/// Decides the canonical transition for one event.
///
/// The table is complete: undefined cells resolve to `ERROR` (defined events
/// in undefined states) or `UNVALIDATED` (unknown events), never to a guess.
fn transition(
    prev_state: PossessionState,
    type_token: &str,
    outcome: Outcome,
) -> (PossessionState, PossessionEffect, String) {
    match EventType::classify(type_token) {
        EventType::Out | EventType::Foul => (
            PossessionState::DeadBall,
            PossessionEffect::End,
            format!("transition:any+{type_token}->DEAD_BALL"),
        ),
        EventType::LooseBall => (
            PossessionState::Contested,
            PossessionEffect::Neutral,
            "transition:any+LOOSE_BALL->CONTESTED_NEUTRAL".to_string(),
        ),
        EventType::Restart => (
            PossessionState::Controlled,
            PossessionEffect::Start,
            format!("transition:DEAD_BALL+{type_token}->CONTROLLED_START"),
        ),
        EventType::Pass | EventType::Dribble => match outcome {
            Outcome::Success if prev_state == PossessionState::Controlled => (
                PossessionState::Controlled,
                PossessionEffect::Continue,
                format!("transition:CONTROLLED+{type_token}_success->CONTROLLED_CONTINUE"),
            ),
            Outcome::Success => (
                PossessionState::Error,
                PossessionEffect::Neutral,
                format!("undefined_transition:{prev_state}+{type_token}_success"),
            ),
            // Fail or missing outcome is not defined by the canonical table;
            // fail closed without speculation.
            _ => (
                PossessionState::Unvalidated,
                PossessionEffect::Neutral,
                format!("unvalidated:{prev_state}+{type_token}_missing_or_fail"),
            ),
        },
        EventType::Tackle => match prev_state {
            PossessionState::Controlled | PossessionState::Contested => (
                PossessionState::Contested,
                PossessionEffect::Neutral,
                format!("transition:{prev_state}+TACKLE->CONTESTED_NEUTRAL"),
            ),
            _ => (
                PossessionState::Error,
                PossessionEffect::Neutral,
                format!("undefined_transition:{prev_state}+TACKLE"),
            ),
        },
        EventType::Interception => match prev_state {
            PossessionState::Controlled | PossessionState::Contested => (
                PossessionState::Controlled,
                PossessionEffect::Start,
                format!("transition:{prev_state}+INTERCEPTION->CONTROLLED_START"),
            ),
            _ => (
                PossessionState::Error,
                PossessionEffect::Neutral,
                format!("undefined_transition:{prev_state}+INTERCEPTION"),
            ),
        },
        EventType::Shot | EventType::Offside | EventType::Unknown => (
            PossessionState::Unvalidated,
            PossessionEffect::Neutral,
            format!("unknown_event:{type_token}"),
        ),
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Extracts the event identifier, empty when absent.
fn event_id_of(event: &Value) -> String {
    norm_str(event, "event_id").unwrap_or_default()
}

/// Merges a frame's annotations into a copy of the source event.
///
/// Produces the annotated record downstream rings and the NAS detector
/// consume: the original fields plus `prev_state_id`, `state_id`,
/// `possession_effect`, `possession_id`, `sm_reason`, and `logic_version`.
#[must_use]
pub fn annotate_event(event: &Value, frame: &PossessionFrame) -> Value {
    let mut out = match event {
        Value::Object(map) => map.clone(),
        _ => serde_json::Map::new(),
    };
    out.insert("prev_state_id".to_string(), json!(frame.state_before.as_str()));
    out.insert("state_id".to_string(), json!(frame.state_after.as_str()));
    out.insert("possession_effect".to_string(), json!(frame.possession_effect.as_str()));
    out.insert("possession_id".to_string(), json!(frame.possession_id_after.clone()));
    out.insert("sm_reason".to_string(), json!(frame.sm_reason.clone()));
    out.insert("logic_version".to_string(), json!(frame.logic_version.clone()));
    Value::Object(out)
}
