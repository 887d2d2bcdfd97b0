// crates/canon-gate-core/src/core/epistemic.rs
// ============================================================================
// Module: Canon Gate Epistemic Types
// Description: Closed enumerations for epistemic and possession semantics.
// Purpose: Provide stable, exhaustive wire forms for every tagged value the
//          pipeline emits or consumes.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Every tag in the canonical data model is a closed enumeration with a
//! stable wire form. Two epistemic enumerations coexist: [`EpistemicStatus`]
//! carries canon-metadata provenance (lowercase wire form) while
//! [`EpistemicVerdict`] carries the runtime validator's judgment (uppercase
//! wire form). Downstream components must treat both sets as exhaustive; any
//! value outside them is a contract violation, never a soft default.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Epistemic Status
// ============================================================================

/// Canon-metadata epistemic status attached to mapped records.
///
/// # Invariants
/// - Variants are stable for serialization and policy matching.
/// - The wire form is lowercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EpistemicStatus {
    /// Directly observed, loss-free mapping.
    Fact,
    /// Human judgment recorded as such.
    Opinion,
    /// Unconfirmed proposition awaiting evidence.
    Hypothesis,
    /// Lossy or inferred mapping; degraded confidence.
    Signal,
}

impl EpistemicStatus {
    /// All statuses, in declaration order.
    pub const ALL: [Self; 4] = [Self::Fact, Self::Opinion, Self::Hypothesis, Self::Signal];

    /// Returns the stable wire form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fact => "fact",
            Self::Opinion => "opinion",
            Self::Hypothesis => "hypothesis",
            Self::Signal => "signal",
        }
    }
}

impl fmt::Display for EpistemicStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Epistemic Verdict
// ============================================================================

/// Runtime validator verdict attached to every evaluated record.
///
/// # Invariants
/// - Variants are stable for serialization and gate matching.
/// - The wire form is uppercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EpistemicVerdict {
    /// The record passed every applicable validation class.
    Valid,
    /// Identity or another mandatory class is missing; excluded downstream.
    Unvalidated,
    /// Context or intent is insufficient to judge the record.
    Inconclusive,
    /// A falsification test failed; the record is rejected.
    Falsified,
}

impl EpistemicVerdict {
    /// All verdicts, in declaration order.
    pub const ALL: [Self; 4] =
        [Self::Valid, Self::Unvalidated, Self::Inconclusive, Self::Falsified];

    /// Returns the stable wire form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Valid => "VALID",
            Self::Unvalidated => "UNVALIDATED",
            Self::Inconclusive => "INCONCLUSIVE",
            Self::Falsified => "FALSIFIED",
        }
    }
}

impl fmt::Display for EpistemicVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Possession State
// ============================================================================

/// Possession state machine states.
///
/// # Invariants
/// - Variants are stable for serialization and transition matching.
/// - `DeadBall` is the initial state of every stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PossessionState {
    /// Play is stopped; possession identity must be absent.
    DeadBall,
    /// One team exclusively controls the ball.
    Controlled,
    /// Possession is actively disputed.
    Contested,
    /// The event could not be validated; safe no-op state.
    Unvalidated,
    /// An invariant was violated; veto state.
    Error,
}

impl PossessionState {
    /// All states, in declaration order.
    pub const ALL: [Self; 5] =
        [Self::DeadBall, Self::Controlled, Self::Contested, Self::Unvalidated, Self::Error];

    /// Returns the stable wire form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DeadBall => "DEAD_BALL",
            Self::Controlled => "CONTROLLED",
            Self::Contested => "CONTESTED",
            Self::Unvalidated => "UNVALIDATED",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for PossessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Possession Effect
// ============================================================================

/// Effect a transition has on the possession lifecycle.
///
/// # Invariants
/// - Variants are stable for serialization and invariant checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PossessionEffect {
    /// A new possession is allocated.
    Start,
    /// The current possession continues unchanged.
    Continue,
    /// The current possession ends.
    End,
    /// No effect on possession identity.
    Neutral,
}

impl PossessionEffect {
    /// All effects, in declaration order.
    pub const ALL: [Self; 4] = [Self::Start, Self::Continue, Self::End, Self::Neutral];

    /// Returns the stable wire form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "START",
            Self::Continue => "CONTINUE",
            Self::End => "END",
            Self::Neutral => "NEUTRAL",
        }
    }
}

impl fmt::Display for PossessionEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Event Type
// ============================================================================

/// Canonical event kinds consumed by the possession state machine.
///
/// # Invariants
/// - Variants are stable for serialization and exhaustive transition
///   handling; unknown provider vocabulary classifies as `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    /// Any restart of play (the `RESTART_*` family).
    Restart,
    /// A pass attempt.
    Pass,
    /// A dribble attempt.
    Dribble,
    /// A shot at goal.
    Shot,
    /// A tackle.
    Tackle,
    /// An interception.
    Interception,
    /// Ball out of play.
    Out,
    /// A foul stopping play.
    Foul,
    /// An offside decision stopping play.
    Offside,
    /// An uncontrolled loose ball.
    LooseBall,
    /// Unrecognized event vocabulary.
    Unknown,
}

impl EventType {
    /// All event kinds, in declaration order.
    pub const ALL: [Self; 11] = [
        Self::Restart,
        Self::Pass,
        Self::Dribble,
        Self::Shot,
        Self::Tackle,
        Self::Interception,
        Self::Out,
        Self::Foul,
        Self::Offside,
        Self::LooseBall,
        Self::Unknown,
    ];

    /// Classifies a normalized (trimmed, uppercased) event-type token.
    ///
    /// The `RESTART_*` family collapses onto [`EventType::Restart`]; every
    /// unrecognized token classifies as [`EventType::Unknown`] rather than
    /// failing, so callers can encode the fail-closed path into state.
    #[must_use]
    pub fn classify(token: &str) -> Self {
        if token.starts_with("RESTART_") || token == "RESTART" {
            return Self::Restart;
        }
        match token {
            "PASS" => Self::Pass,
            "DRIBBLE" => Self::Dribble,
            "SHOT" => Self::Shot,
            "TACKLE" => Self::Tackle,
            "INTERCEPTION" => Self::Interception,
            "OUT" => Self::Out,
            "FOUL" => Self::Foul,
            "OFFSIDE" => Self::Offside,
            "LOOSE_BALL" => Self::LooseBall,
            _ => Self::Unknown,
        }
    }

    /// Returns the stable wire form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Restart => "RESTART",
            Self::Pass => "PASS",
            Self::Dribble => "DRIBBLE",
            Self::Shot => "SHOT",
            Self::Tackle => "TACKLE",
            Self::Interception => "INTERCEPTION",
            Self::Out => "OUT",
            Self::Foul => "FOUL",
            Self::Offside => "OFFSIDE",
            Self::LooseBall => "LOOSE_BALL",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// General action outcome.
///
/// # Invariants
/// - `Absent` is an explicit variant, not a null: the state machine's
///   fail-closed paths key on it directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    /// The action succeeded.
    Success,
    /// The action failed.
    Fail,
    /// The provider reported an outcome outside the canonical set.
    Unknown,
    /// No outcome was provided.
    Absent,
}

impl Outcome {
    /// Parses a loosely shaped provider outcome token.
    ///
    /// Accepts `success`, `fail`, `failed`, and `failure` case-insensitively;
    /// a missing or empty token is `Absent`, any other token is `Unknown`.
    #[must_use]
    pub fn parse_loose(token: Option<&str>) -> Self {
        let Some(raw) = token else {
            return Self::Absent;
        };
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::Absent;
        }
        match trimmed.to_lowercase().as_str() {
            "success" => Self::Success,
            "fail" | "failed" | "failure" => Self::Fail,
            _ => Self::Unknown,
        }
    }

    /// Returns the stable wire form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Fail => "FAIL",
            Self::Unknown => "UNKNOWN",
            Self::Absent => "ABSENT",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shot-specific outcome.
///
/// # Invariants
/// - Variants are stable for serialization and transition matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShotOutcome {
    /// The shot scored.
    Goal,
    /// The goalkeeper saved the shot.
    Saved,
    /// The shot missed the target.
    OffTarget,
    /// The provider reported no recognizable shot outcome.
    Unknown,
}

impl ShotOutcome {
    /// Returns the stable wire form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Goal => "GOAL",
            Self::Saved => "SAVED",
            Self::OffTarget => "OFF_TARGET",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ShotOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
