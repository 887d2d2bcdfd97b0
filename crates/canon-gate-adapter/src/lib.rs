// crates/canon-gate-adapter/src/lib.rs
// ============================================================================
// Module: Canon Gate Adapter
// Description: Provider event translation onto the canonical ontology.
// Purpose: Map raw events via a contract-validated action map; quarantine
//          everything the contract does not cover.
// Dependencies: canon-gate-core, serde, serde_json, thiserror, time, uuid
// ============================================================================

//! ## Overview
//! The adapter consumes a list of raw provider events plus the mapping
//! contract, and produces canonical events alongside a quarantine list. It is
//! side-effect-free: quarantine is an output, not an ambient log, and two
//! runs over the same input produce identical output in identical order.
//! Lossy mappings degrade the emitted epistemic status from `fact` to
//! `signal` and carry their assumption identifier for provenance.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod adapt;
pub mod contract;

// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use crate::adapt::AdapterError;
pub use crate::adapt::AdapterOutput;
pub use crate::adapt::adapt_events;
pub use crate::contract::MappingEntry;
pub use crate::contract::MappingError;
pub use crate::contract::load_action_map;
pub use crate::contract::parse_action_map;
