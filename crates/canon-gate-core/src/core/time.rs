// crates/canon-gate-core/src/core/time.rs
// ============================================================================
// Module: Canon Gate Time Rendering
// Description: Deterministic UTC timestamp rendering for artifacts.
// Purpose: Keep generation-time fields reproducible under host-supplied time.
// Dependencies: thiserror, time
// ============================================================================

//! ## Overview
//! The core never reads wall-clock time. Hosts supply an [`OffsetDateTime`]
//! explicitly wherever a generation timestamp is recorded, and tests
//! substitute fixed instants to keep artifacts byte-stable. Rendering is
//! truncated to whole seconds with a `Z` suffix.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Timestamp rendering errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum TimeError {
    /// The instant could not be rendered in the requested form.
    #[error("timestamp formatting error: {0}")]
    Format(String),
}

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// Renders an instant as RFC 3339 UTC with seconds precision and `Z` suffix.
///
/// # Errors
///
/// Returns [`TimeError`] when the instant cannot be represented.
pub fn format_utc_seconds(instant: OffsetDateTime) -> Result<String, TimeError> {
    let truncated = instant
        .to_offset(time::UtcOffset::UTC)
        .replace_nanosecond(0)
        .map_err(|err| TimeError::Format(err.to_string()))?;
    truncated.format(&Rfc3339).map_err(|err| TimeError::Format(err.to_string()))
}

/// Renders an instant as a compact `YYYYMMDDTHHMMSSZ` UTC stamp.
///
/// Used in quarantine side-stream filenames, where path-safe characters are
/// required.
#[must_use]
pub fn compact_utc_stamp(instant: OffsetDateTime) -> String {
    let utc = instant.to_offset(time::UtcOffset::UTC);
    format!(
        "{:04}{:02}{:02}T{:02}{:02}{:02}Z",
        utc.year(),
        u8::from(utc.month()),
        utc.day(),
        utc.hour(),
        utc.minute(),
        utc.second()
    )
}
