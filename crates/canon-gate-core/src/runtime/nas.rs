// crates/canon-gate-core/src/runtime/nas.rs
// ============================================================================
// Module: Negative Action Spiral Detector
// Description: Sequence detector for consecutive failed defensive actions.
// Purpose: Surface sustained defensive pressure deterministically.
// Dependencies: crate::runtime::extract, serde, serde_json
// ============================================================================

//! ## Overview
//! The NAS detector identifies chains of consecutive `FAIL` outcomes inside a
//! single zone during `DEFENSIVE` or `TRANSITION` phases. Chains respect the
//! ring vetoes: events flagged by the dead-ball or physics rings break the
//! current chain and never contribute. The detector fails closed as a result
//! value, never a panic: any missing required field yields an `UNVALIDATED`
//! result naming the first missing field.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::runtime::extract::norm_f64;
use crate::runtime::extract::norm_str;
use crate::runtime::extract::zone_token;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Fields every evaluated event must carry.
const REQUIRED_FIELDS: [&str; 8] = [
    "event_start_time",
    "phase",
    "state_id",
    "action_type",
    "outcome",
    "zone_id",
    "pressure_level",
    "hsr_flags",
];

/// Phases in scope for NAS detection.
const IN_SCOPE_PHASES: [&str; 2] = ["DEFENSIVE", "TRANSITION"];

// ============================================================================
// SECTION: Results
// ============================================================================

/// Overall outcome of a NAS evaluation.
///
/// # Invariants
/// - `Pass` is emitted even when zero sequences were found; `Unvalidated`
///   only when the input could not be evaluated at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NasStatus {
    /// Evaluation completed.
    Pass,
    /// Evaluation was impossible; see the reason string.
    Unvalidated,
}

/// One detected negative action spiral.
///
/// # Invariants
/// - `fail_count` is at least the detector's `min_fail_count`.
/// - All contributing events share `zone_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NasSequence {
    /// Timestamp of the first contributing failure.
    pub start_ts: f64,
    /// Timestamp of the last contributing failure.
    pub end_ts: f64,
    /// Zone the spiral occurred in.
    pub zone_id: String,
    /// Number of consecutive failures.
    pub fail_count: usize,
    /// Mean pressure level across the chain.
    pub avg_pressure: f64,
    /// Peak pressure level across the chain.
    pub max_pressure: f64,
    /// Identifiers of contributing events, in chain order.
    pub event_ids: Vec<String>,
}

/// Result of one NAS evaluation.
///
/// # Invariants
/// - `nas_sequence_count == sequences.len()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NasResult {
    /// Evaluation status.
    pub status: NasStatus,
    /// Diagnostic reason (`OK` on success).
    pub reason: String,
    /// Number of detected sequences.
    pub nas_sequence_count: usize,
    /// Detected sequences in chronological order.
    pub sequences: Vec<NasSequence>,
}

impl NasResult {
    /// Builds the fail-closed `UNVALIDATED` result.
    fn unvalidated(reason: String) -> Self {
        Self {
            status: NasStatus::Unvalidated,
            reason,
            nas_sequence_count: 0,
            sequences: Vec::new(),
        }
    }
}

// ============================================================================
// SECTION: Detector
// ============================================================================

/// Deterministic NAS detector.
///
/// # Invariants
/// - Evaluation is a pure function of the input slice and the two
///   configuration values; no state survives between calls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NasDetector {
    /// Maximum gap between consecutive failures in one chain, in seconds.
    pub max_dt_s: f64,
    /// Minimum failure count for a flushed chain to count as a sequence.
    pub min_fail_count: usize,
}

impl NasDetector {
    /// Creates a detector with explicit thresholds.
    #[must_use]
    pub const fn new(max_dt_s: f64, min_fail_count: usize) -> Self {
        Self {
            max_dt_s,
            min_fail_count,
        }
    }

    /// Evaluates an event slice into a NAS result.
    ///
    /// Events are stably sorted by timestamp before chain construction, so
    /// ties preserve input order and the output is deterministic.
    #[must_use]
    pub fn evaluate(&self, events: &[Value]) -> NasResult {
        for (index, event) in events.iter().enumerate() {
            if !event.is_object() {
                return NasResult::unvalidated(format!(
                    "NAS_FAIL_CLOSED:event_not_object:index={index}"
                ));
            }
            if let Some(missing) = first_missing_field(event) {
                return NasResult::unvalidated(format!("NAS_FAIL_CLOSED:missing_{missing}"));
            }
        }

        let mut sorted: Vec<&Value> = events.iter().collect();
        sorted.sort_by(|lhs, rhs| {
            let lhs_ts = norm_f64(lhs, "event_start_time").unwrap_or(0.0);
            let rhs_ts = norm_f64(rhs, "event_start_time").unwrap_or(0.0);
            lhs_ts.partial_cmp(&rhs_ts).unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut sequences: Vec<NasSequence> = Vec::new();
        let mut chain = Chain::empty();

        for event in sorted {
            let Some(fields) = EventFields::extract(event) else {
                return NasResult::unvalidated("NAS_FAIL_CLOSED:bad_field_type".to_string());
            };

            // Hard gates: out-of-scope events break the current chain and
            // never contribute.
            let gated = !IN_SCOPE_PHASES.contains(&fields.phase.as_str())
                || fields.state_id == "DEAD_BALL"
                || fields.ring3_veto
                || fields.ring4_veto
                || fields.outcome.to_uppercase() != "FAIL";
            if gated {
                chain.flush(self.min_fail_count, &mut sequences);
                continue;
            }

            if chain.zone.is_none() {
                chain.start(&fields);
                continue;
            }

            if chain.zone.as_deref() != Some(fields.zone_id.as_str()) {
                chain.flush(self.min_fail_count, &mut sequences);
                chain.start(&fields);
                continue;
            }

            let Some(prev_fail_ts) = chain.prev_fail_ts else {
                return NasResult::unvalidated(
                    "NAS_FAIL_CLOSED:internal_prev_ts_missing".to_string(),
                );
            };

            if fields.ts - prev_fail_ts > self.max_dt_s {
                chain.flush(self.min_fail_count, &mut sequences);
                chain.start(&fields);
                continue;
            }

            chain.extend(&fields);
        }

        chain.flush(self.min_fail_count, &mut sequences);

        NasResult {
            status: NasStatus::Pass,
            reason: "OK".to_string(),
            nas_sequence_count: sequences.len(),
            sequences,
        }
    }
}

impl Default for NasDetector {
    fn default() -> Self {
        Self::new(0.5, 3)
    }
}

// ============================================================================
// SECTION: Field Extraction
// ============================================================================

/// Typed view of one validated event.
struct EventFields {
    /// Event timestamp.
    ts: f64,
    /// Play phase token.
    phase: String,
    /// Possession state token.
    state_id: String,
    /// Outcome token.
    outcome: String,
    /// Zone token.
    zone_id: String,
    /// Pressure level.
    pressure: f64,
    /// Ring 3 veto flag.
    ring3_veto: bool,
    /// Ring 4 veto flag.
    ring4_veto: bool,
    /// Optional event identifier.
    event_id: Option<String>,
}

impl EventFields {
    /// Extracts and type-checks the fields required for evaluation.
    fn extract(event: &Value) -> Option<Self> {
        let ts = norm_f64(event, "event_start_time")?;
        let phase = norm_str(event, "phase")?;
        let state_id = norm_str(event, "state_id")?;
        norm_str(event, "action_type")?;
        let outcome = norm_str(event, "outcome")?;
        let zone_id = zone_token(event.get("zone_id")?);
        let pressure = norm_f64(event, "pressure_level")?;
        let hsr_flags = event.get("hsr_flags")?;
        let ring3_veto = hsr_flags
            .get("ring3_dead_ball_veto")
            .is_some_and(|flag| flag.as_bool().unwrap_or(false));
        let ring4_veto = hsr_flags
            .get("ring4_physics_veto")
            .is_some_and(|flag| flag.as_bool().unwrap_or(false));
        Some(Self {
            ts,
            phase,
            state_id,
            outcome,
            zone_id,
            pressure,
            ring3_veto,
            ring4_veto,
            event_id: norm_str(event, "event_id"),
        })
    }
}

/// Names the first missing required field, including `hsr_flags` subkeys.
fn first_missing_field(event: &Value) -> Option<String> {
    for field in REQUIRED_FIELDS {
        if event.get(field).is_none() {
            return Some(field.to_string());
        }
    }
    match event.get("hsr_flags") {
        Some(Value::Object(flags)) => {
            for subkey in ["ring3_dead_ball_veto", "ring4_physics_veto"] {
                if !flags.contains_key(subkey) {
                    return Some(format!("hsr_flags.{subkey}"));
                }
            }
            None
        }
        _ => Some("hsr_flags".to_string()),
    }
}

// ============================================================================
// SECTION: Chain State
// ============================================================================

/// Running chain of qualifying failures.
struct Chain {
    /// Zone the chain is bound to.
    zone: Option<String>,
    /// Timestamp of the first failure.
    start_ts: Option<f64>,
    /// Timestamp of the latest failure.
    end_ts: Option<f64>,
    /// Failure count.
    fail_count: usize,
    /// Pressure samples.
    pressures: Vec<f64>,
    /// Contributing event identifiers.
    event_ids: Vec<String>,
    /// Timestamp of the previous qualifying failure.
    prev_fail_ts: Option<f64>,
}

impl Chain {
    /// Creates an empty chain.
    const fn empty() -> Self {
        Self {
            zone: None,
            start_ts: None,
            end_ts: None,
            fail_count: 0,
            pressures: Vec::new(),
            event_ids: Vec::new(),
            prev_fail_ts: None,
        }
    }

    /// Starts a fresh chain from one qualifying failure.
    fn start(&mut self, fields: &EventFields) {
        self.zone = Some(fields.zone_id.clone());
        self.start_ts = Some(fields.ts);
        self.end_ts = Some(fields.ts);
        self.fail_count = 1;
        self.pressures = vec![fields.pressure];
        self.event_ids = fields.event_id.clone().into_iter().collect();
        self.prev_fail_ts = Some(fields.ts);
    }

    /// Extends the chain with one qualifying failure.
    fn extend(&mut self, fields: &EventFields) {
        self.end_ts = Some(fields.ts);
        self.fail_count += 1;
        self.pressures.push(fields.pressure);
        if let Some(event_id) = &fields.event_id {
            self.event_ids.push(event_id.clone());
        }
        self.prev_fail_ts = Some(fields.ts);
    }

    /// Flushes the chain into a sequence when it meets the threshold.
    fn flush(&mut self, min_fail_count: usize, sequences: &mut Vec<NasSequence>) {
        if let (Some(zone), Some(start_ts), Some(end_ts)) =
            (self.zone.take(), self.start_ts, self.end_ts)
            && self.fail_count >= min_fail_count
        {
            let sum: f64 = self.pressures.iter().sum();
            let avg_pressure = if self.pressures.is_empty() {
                0.0
            } else {
                sum / usize_to_f64(self.pressures.len())
            };
            let max_pressure = self.pressures.iter().copied().fold(0.0, f64::max);
            sequences.push(NasSequence {
                start_ts,
                end_ts,
                zone_id: zone,
                fail_count: self.fail_count,
                avg_pressure,
                max_pressure,
                event_ids: std::mem::take(&mut self.event_ids),
            });
        }
        *self = Self::empty();
    }
}

/// Converts a collection length into `f64` for averaging.
#[allow(clippy::cast_precision_loss, reason = "chain lengths are far below 2^52")]
const fn usize_to_f64(value: usize) -> f64 {
    value as f64
}
