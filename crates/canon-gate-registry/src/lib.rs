// crates/canon-gate-registry/src/lib.rs
// ============================================================================
// Module: Canon Gate Registry
// Description: Canonical action catalog, integrity gates, and drift checks.
// Purpose: Own the canonical action vocabulary and detect divergence between
//          declarations and code.
// Dependencies: canon-gate-core, regex, serde, serde_json, serde_yaml, thiserror
// ============================================================================

//! ## Overview
//! The registry crate loads the declarative canonical action catalog,
//! enforces alias uniqueness as a hard failure, resolves raw provider actions
//! onto canonical identifiers, and audits the registry against both its own
//! constitution and the code-side enumerations. Nothing here repairs input:
//! unknown actions resolve to `UNKNOWN` with an `UNVALIDATED` status, and
//! every structural violation is surfaced, never patched.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod catalog;
pub mod drift;
pub mod integrity;

// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use crate::catalog::ActionRegistry;
pub use crate::catalog::CanonicalAction;
pub use crate::catalog::RegistryError;
pub use crate::catalog::Resolution;
pub use crate::catalog::normalize_alias;
pub use crate::drift::DriftReport;
pub use crate::drift::check_drift;
pub use crate::drift::render_markdown;
pub use crate::integrity::IntegrityError;
pub use crate::integrity::check_registry_constitution;
