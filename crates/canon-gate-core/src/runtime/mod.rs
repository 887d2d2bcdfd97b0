// crates/canon-gate-core/src/runtime/mod.rs
// ============================================================================
// Module: Canon Gate Runtime
// Description: Possession state machine, safety rings, and NAS detection.
// Purpose: Drive per-stream mutable state deterministically and fail closed.
// Dependencies: crate::core, serde_json
// ============================================================================

//! ## Overview
//! Runtime components carry mutable per-stream state: the possession state
//! machine, the physics ring, and the NAS detector. A producer feeds events in
//! strict timestamp order per stream; each update is logically atomic and
//! there is no shared mutable state between streams. Rings raise; the state
//! machine never does; it encodes failure into state and a diagnostic
//! reason.

pub mod extract;
pub mod nas;
pub mod rings;
pub mod state_machine;
