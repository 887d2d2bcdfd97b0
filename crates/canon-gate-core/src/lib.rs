// crates/canon-gate-core/src/lib.rs
// ============================================================================
// Module: Canon Gate Core
// Description: Canonical types, possession state machine, and safety rings.
// Purpose: Provide the deterministic, fail-closed core of the Canon Gate
//          telemetry canonicalization pipeline.
// Dependencies: serde, serde_json, serde_jcs, sha2, thiserror, time, uuid
// ============================================================================

//! ## Overview
//! Canon Gate ingests raw telemetry events from heterogeneous providers, maps
//! them onto a canonical ontology, and drives them through a possession state
//! machine guarded by layered safety rings. The core discipline is that no
//! record is ever silently modified or dropped: every deviation from the
//! canonical contract is either quarantined with provenance or surfaced as a
//! hard failure.
//!
//! This crate holds the pieces every other Canon Gate crate builds on: the
//! closed epistemic and possession enumerations, the canonical event model,
//! deterministic JSON and hashing helpers, the possession state machine, the
//! hardened safety rings, and the negative-action-spiral detector.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod hashing;
pub mod runtime;

// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use crate::core::epistemic::EpistemicStatus;
pub use crate::core::epistemic::EpistemicVerdict;
pub use crate::core::epistemic::EventType;
pub use crate::core::epistemic::Outcome;
pub use crate::core::epistemic::PossessionEffect;
pub use crate::core::epistemic::PossessionState;
pub use crate::core::epistemic::ShotOutcome;
pub use crate::core::events::CanonEvent;
pub use crate::core::events::CanonMeta;
pub use crate::core::events::Position;
pub use crate::core::events::PossessionFrame;
pub use crate::core::events::QuarantineItem;
pub use crate::core::events::QuarantineReason;
pub use crate::core::time::compact_utc_stamp;
pub use crate::core::time::format_utc_seconds;
pub use crate::hashing::HashError;
pub use crate::hashing::canonical_json_string;
pub use crate::hashing::deterministic_json_bytes;
pub use crate::hashing::sha256_hex;
pub use crate::hashing::sha256_hex_of_canonical;
pub use crate::hashing::sha256_hex_of_file;
pub use crate::runtime::nas::NasDetector;
pub use crate::runtime::nas::NasResult;
pub use crate::runtime::nas::NasSequence;
pub use crate::runtime::nas::NasStatus;
pub use crate::runtime::rings::ContextRing;
pub use crate::runtime::rings::PhysicsRing;
pub use crate::runtime::rings::RingError;
pub use crate::runtime::rings::validate_dead_ball;
pub use crate::runtime::state_machine::LOGIC_VERSION;
pub use crate::runtime::state_machine::PossessionStateMachine;
pub use crate::runtime::state_machine::StateMachineConfig;
pub use crate::runtime::state_machine::annotate_event;
