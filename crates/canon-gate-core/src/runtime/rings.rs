// crates/canon-gate-core/src/runtime/rings.rs
// ============================================================================
// Module: Hardened Safety Rings
// Description: Dead-ball, physics, and context/temporal validators.
// Purpose: Veto contract-violating events; never repair them.
// Dependencies: crate::runtime::extract, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The hardened safety rings are layered validators around the possession
//! state machine. A ring may veto an event by returning an error with a
//! stable string prefix; it never rewrites the event. Missing fields fail
//! closed with an `HSR_FAIL_CLOSED:*` reason.
//!
//! - Ring 3 (dead ball): vetoes contact events in dead-ball contexts.
//! - Ring 4 (physics): vetoes kinematically impossible displacements.
//! - Ring 5 (context): vetoes temporal and lifecycle inconsistencies.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use thiserror::Error;

use crate::runtime::extract::norm_event_type;
use crate::runtime::extract::norm_f64;
use crate::runtime::extract::norm_str;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Event kinds illegal in any dead-ball context.
const DEAD_BALL_ILLEGAL_EVENTS: [&str; 2] = ["TACKLE", "INTERCEPTION"];

/// Default maximum plausible player speed in meters per second.
const DEFAULT_MAX_SPEED_MPS: f64 = 12.0;

/// Default dead-ball cooldown window in seconds.
const DEFAULT_COOLDOWN_S: f64 = 0.3;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Safety ring veto and fail-closed errors.
///
/// # Invariants
/// - `Display` prefixes are stable; tests and operators match substrings.
#[derive(Debug, Error)]
pub enum RingError {
    /// A required field was missing or malformed.
    #[error("HSR_FAIL_CLOSED:{0}")]
    FailClosed(String),
    /// An illegal event occurred in a dead-ball context.
    #[error("HSR_DEAD_BALL_VIOLATION:{0}")]
    DeadBallViolation(String),
    /// A displacement exceeded the physical speed ceiling.
    #[error("HSR_PHYSICS_VIOLATION:speed={0:.2}")]
    PhysicsViolation(f64),
    /// A temporal or lifecycle rule was breached.
    #[error("HSR_CONTEXT_VIOLATION:{0}")]
    ContextViolation(String),
}

// ============================================================================
// SECTION: Ring 3 (Dead Ball)
// ============================================================================

/// Validates that no contact event occurs in a dead-ball context.
///
/// Triggers when the previous or current state is `DEAD_BALL`. Missing event
/// type, or both state fields absent, fails closed.
///
/// # Errors
///
/// Returns [`RingError`] on veto or fail-closed input.
pub fn validate_dead_ball(event: &Value) -> Result<(), RingError> {
    if !event.is_object() {
        return Err(RingError::FailClosed("event_not_object".to_string()));
    }

    let Some(event_type) = norm_event_type(event, "event_type") else {
        return Err(RingError::FailClosed("missing_event_type".to_string()));
    };

    let prev_state = norm_str(event, "prev_state_id");
    let state = norm_str(event, "state_id");
    if prev_state.is_none() && state.is_none() {
        return Err(RingError::FailClosed("missing_state_fields".to_string()));
    }

    let dead_ball_context = prev_state.as_deref() == Some("DEAD_BALL")
        || state.as_deref() == Some("DEAD_BALL");
    if dead_ball_context && DEAD_BALL_ILLEGAL_EVENTS.contains(&event_type.as_str()) {
        return Err(RingError::DeadBallViolation(event_type));
    }
    Ok(())
}

// ============================================================================
// SECTION: Ring 4 (Physics)
// ============================================================================

/// Stateful physics ring validating displacement speed between consecutive
/// positions.
///
/// # Invariants
/// - The first valid observation seeds the ring without validating.
/// - Stored coordinates advance only after a passing validation.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicsRing {
    /// Maximum plausible speed in meters per second.
    pub max_speed_mps: f64,
    /// Timestamp of the last accepted observation.
    prev_t: Option<f64>,
    /// X coordinate of the last accepted observation.
    prev_x: Option<f64>,
    /// Y coordinate of the last accepted observation.
    prev_y: Option<f64>,
}

impl PhysicsRing {
    /// Creates a ring with the given speed ceiling.
    #[must_use]
    pub const fn new(max_speed_mps: f64) -> Self {
        Self {
            max_speed_mps,
            prev_t: None,
            prev_x: None,
            prev_y: None,
        }
    }

    /// Validates one observation against the previous one.
    ///
    /// # Errors
    ///
    /// Returns [`RingError`] when coordinates or time are missing, when time
    /// does not advance, or when the implied speed exceeds the ceiling.
    pub fn validate(&mut self, event: &Value) -> Result<(), RingError> {
        if !event.is_object() {
            return Err(RingError::FailClosed("physics:event_not_object".to_string()));
        }

        let t = norm_f64(event, "event_start_time");
        let x = norm_f64(event, "x");
        let y = norm_f64(event, "y");

        let (Some(x), Some(y)) = (x, y) else {
            return Err(RingError::FailClosed("physics:missing_xy".to_string()));
        };
        let Some(t) = t else {
            return Err(RingError::FailClosed("physics:missing_time".to_string()));
        };

        // First observation seeds the ring.
        let Some(prev_t) = self.prev_t else {
            self.prev_t = Some(t);
            self.prev_x = Some(x);
            self.prev_y = Some(y);
            return Ok(());
        };

        let (Some(prev_x), Some(prev_y)) = (self.prev_x, self.prev_y) else {
            return Err(RingError::FailClosed("physics:missing_prev_xy".to_string()));
        };

        let dt = t - prev_t;
        if dt <= 0.0 {
            return Err(RingError::FailClosed("physics:nonpositive_dt".to_string()));
        }

        let dx = x - prev_x;
        let dy = y - prev_y;
        let speed = (dx * dx + dy * dy).sqrt() / dt;
        if speed > self.max_speed_mps {
            return Err(RingError::PhysicsViolation(speed));
        }

        self.prev_t = Some(t);
        self.prev_x = Some(x);
        self.prev_y = Some(y);
        Ok(())
    }
}

impl Default for PhysicsRing {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SPEED_MPS)
    }
}

// ============================================================================
// SECTION: Ring 5 (Context / Temporal)
// ============================================================================

/// Context and temporal validator.
///
/// # Invariants
/// - Pure per call; the cooldown window is the only configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContextRing {
    /// Dead-ball cooldown window in seconds.
    pub cooldown_s: f64,
}

impl ContextRing {
    /// Creates a ring with the given cooldown window.
    #[must_use]
    pub const fn new(cooldown_s: f64) -> Self {
        Self {
            cooldown_s,
        }
    }

    /// Validates temporal monotonicity and possession lifecycle coupling.
    ///
    /// # Errors
    ///
    /// Returns [`RingError`] when required fields are missing, time regresses,
    /// a `START` effect occurs outside the `DEAD_BALL -> CONTROLLED` edge, or
    /// a contact event follows a dead ball beyond the cooldown window.
    pub fn validate(&self, event: &Value) -> Result<(), RingError> {
        if !event.is_object() {
            return Err(RingError::FailClosed("context:event_not_object".to_string()));
        }

        let ts = norm_f64(event, "event_start_time");
        let prev_ts = norm_f64(event, "prev_event_time");
        let state = norm_str(event, "state_id");
        let prev_state = norm_str(event, "prev_state_id");
        let effect = norm_str(event, "possession_effect");

        let (Some(ts), Some(prev_ts), Some(state), Some(prev_state)) =
            (ts, prev_ts, state, prev_state)
        else {
            return Err(RingError::FailClosed("context:missing_fields".to_string()));
        };

        if ts < prev_ts {
            return Err(RingError::ContextViolation("time_non_monotonic".to_string()));
        }

        if effect.as_deref() == Some("START")
            && !(prev_state == "DEAD_BALL" && state == "CONTROLLED")
        {
            return Err(RingError::ContextViolation("start_out_of_dead_ball".to_string()));
        }

        if prev_state == "DEAD_BALL"
            && (ts - prev_ts) > self.cooldown_s
            && norm_event_type(event, "event_type")
                .is_some_and(|token| DEAD_BALL_ILLEGAL_EVENTS.contains(&token.as_str()))
        {
            return Err(RingError::ContextViolation("cooldown_breach".to_string()));
        }

        Ok(())
    }
}

impl Default for ContextRing {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN_S)
    }
}
