// crates/canon-gate-registry/src/catalog.rs
// ============================================================================
// Module: Action Catalog
// Description: Declarative canonical action registry with alias resolution.
// Purpose: Map provider vocabulary onto canonical actions, zero drift.
// Dependencies: canon-gate-core, serde_json, serde_yaml, thiserror
// ============================================================================

//! ## Overview
//! The catalog is a YAML sequence of canonical action records. Loading is
//! fail-closed: a missing `canonical_action`, a malformed field, or a
//! normalized alias claimed by two canonical actions aborts the load with a
//! [`RegistryError`]. Resolution is total: unknown raw actions resolve to
//! `UNKNOWN` with an `UNVALIDATED` status instead of erroring, so callers can
//! quarantine rather than crash.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use canon_gate_core::EpistemicVerdict;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Canonical identifier returned for unresolvable raw actions.
pub const UNKNOWN_ACTION: &str = "UNKNOWN";

/// Canonical action carrying the goalkeeper-save qualifier contract.
const GK_SAVE_ACTION: &str = "GK_SAVE";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Registry loading errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling; every load failure is
///   terminal for the catalog.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The source could not be read.
    #[error("registry source io error: {0}")]
    Io(String),
    /// The source was not parseable YAML.
    #[error("registry parse error: {0}")]
    Parse(String),
    /// The document root was not a sequence of records.
    #[error("registry source must be a sequence of records")]
    NotASequence,
    /// A record was not a mapping.
    #[error("invalid registry record at index {0}")]
    InvalidRecord(usize),
    /// A record carried no canonical action identifier.
    #[error("missing canonical_action at index {0}")]
    MissingCanonicalAction(usize),
    /// `aliases` was present but not a sequence of scalars.
    #[error("aliases must be a sequence of scalars at canonical_action={0}")]
    AliasesNotASequence(String),
    /// `allowed_states` was present but not a sequence.
    #[error("allowed_states must be a sequence at canonical_action={0}")]
    AllowedStatesNotASequence(String),
    /// `qualifiers` was present but not a mapping.
    #[error("qualifiers must be a mapping at canonical_action={0}")]
    QualifiersNotAMapping(String),
    /// A qualifier value list was not a sequence.
    #[error("qualifier '{name}' must be a sequence at canonical_action={action}")]
    QualifierNotASequence {
        /// Qualifier name.
        name: String,
        /// Canonical action identifier.
        action: String,
    },
    /// A normalized alias is claimed by two canonical actions.
    #[error("duplicate alias '{alias}' found in both {first} and {second}")]
    DuplicateAlias {
        /// The normalized alias token.
        alias: String,
        /// Canonical action that claimed the alias first.
        first: String,
        /// Canonical action attempting to claim it again.
        second: String,
    },
}

// ============================================================================
// SECTION: Alias Normalization
// ============================================================================

/// Normalizes a raw alias into its canonical matching token.
///
/// Case-fold, trim, collapse whitespace, map `-` `/` and spaces to `_`, strip
/// non-word characters (Unicode-aware), collapse consecutive underscores,
/// and trim leading/trailing underscores. Pure and deterministic; independent
/// of process locale.
#[must_use]
pub fn normalize_alias(raw: &str) -> String {
    let folded = raw.to_lowercase();
    let collapsed: String = folded.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut out = String::with_capacity(collapsed.len());
    let mut last_was_underscore = false;
    for ch in collapsed.chars() {
        let mapped = match ch {
            '-' | '/' | ' ' => Some('_'),
            c if c.is_alphanumeric() || c == '_' => Some(c),
            _ => None,
        };
        if let Some(c) = mapped {
            if c == '_' {
                if !last_was_underscore {
                    out.push('_');
                }
                last_was_underscore = true;
            } else {
                out.push(c);
                last_was_underscore = false;
            }
        }
    }
    out.trim_matches('_').to_string()
}

// ============================================================================
// SECTION: Catalog Records
// ============================================================================

/// One canonical action, immutable after load.
///
/// # Invariants
/// - `canonical_action` is uppercase.
/// - Normalized aliases are unique across the whole catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalAction {
    /// Canonical action identifier (UPPER_SNAKE_CASE).
    pub canonical_action: String,
    /// Possession effect token declared for the action.
    pub possession_effect: String,
    /// States in which the action is legal.
    pub allowed_states: Vec<String>,
    /// State the pipeline falls back to when validation fails.
    pub fail_closed_default: String,
    /// Raw alias spellings as declared.
    pub aliases: Vec<String>,
    /// Qualifier names mapped to their allowed values.
    pub qualifiers: BTreeMap<String, Vec<Value>>,
}

/// Outcome of resolving one raw provider action.
///
/// # Invariants
/// - `status` is `UNVALIDATED` exactly when `canonical_action` is `UNKNOWN`.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Resolved canonical action identifier, or `UNKNOWN`.
    pub canonical_action: String,
    /// Qualifier values derived from the resolution.
    pub qualifiers: BTreeMap<String, Value>,
    /// Resolution status.
    pub status: EpistemicVerdict,
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Loaded canonical action catalog.
///
/// # Invariants
/// - Immutable for the life of the process once loaded.
/// - `alias_map` keys are normalized and collision-free.
#[derive(Debug, Clone)]
pub struct ActionRegistry {
    /// Catalog records in declaration order.
    items: Vec<CanonicalAction>,
    /// Normalized alias to record index.
    alias_map: BTreeMap<String, usize>,
}

impl ActionRegistry {
    /// Loads a catalog from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] on I/O, parse, or validation failure.
    pub fn from_yaml_file(path: &Path) -> Result<Self, RegistryError> {
        let raw = fs::read_to_string(path).map_err(|err| RegistryError::Io(err.to_string()))?;
        Self::from_yaml_str(&raw)
    }

    /// Loads a catalog from YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] on parse or validation failure, including
    /// the hard alias-uniqueness failure.
    pub fn from_yaml_str(raw: &str) -> Result<Self, RegistryError> {
        let document: Value =
            serde_yaml::from_str(raw).map_err(|err| RegistryError::Parse(err.to_string()))?;
        let Value::Array(records) = document else {
            return Err(RegistryError::NotASequence);
        };

        let mut items: Vec<CanonicalAction> = Vec::with_capacity(records.len());
        let mut alias_map: BTreeMap<String, usize> = BTreeMap::new();
        let mut seen_aliases: BTreeMap<String, String> = BTreeMap::new();

        for (index, record) in records.iter().enumerate() {
            let Value::Object(fields) = record else {
                return Err(RegistryError::InvalidRecord(index));
            };

            let canonical_action = fields
                .get("canonical_action")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .ok_or(RegistryError::MissingCanonicalAction(index))?
                .to_uppercase();

            let aliases = parse_aliases(fields.get("aliases"), &canonical_action)?;
            let allowed_states = parse_allowed_states(fields.get("allowed_states"), &canonical_action)?;
            let qualifiers = parse_qualifiers(fields.get("qualifiers"), &canonical_action)?;

            let possession_effect = fields
                .get("possession_effect")
                .and_then(Value::as_str)
                .map_or_else(String::new, |token| token.trim().to_uppercase());
            let fail_closed_default = fields
                .get("fail_closed_default")
                .and_then(Value::as_str)
                .map_or_else(|| "UNVALIDATED".to_string(), |token| token.trim().to_uppercase());

            let item = CanonicalAction {
                canonical_action,
                possession_effect,
                allowed_states,
                fail_closed_default,
                aliases,
                qualifiers,
            };

            for raw_alias in &item.aliases {
                let normalized = normalize_alias(raw_alias);
                if normalized.is_empty() {
                    continue;
                }
                if let Some(first) = seen_aliases.get(&normalized) {
                    return Err(RegistryError::DuplicateAlias {
                        alias: normalized,
                        first: first.clone(),
                        second: item.canonical_action.clone(),
                    });
                }
                seen_aliases.insert(normalized.clone(), item.canonical_action.clone());
                alias_map.insert(normalized, items.len());
            }

            items.push(item);
        }

        Ok(Self {
            items,
            alias_map,
        })
    }

    /// Returns the catalog records in declaration order.
    #[must_use]
    pub fn items(&self) -> &[CanonicalAction] {
        &self.items
    }

    /// Resolves a raw provider action onto a canonical action.
    ///
    /// Unknown input never errors: it resolves to `UNKNOWN` with an
    /// `UNVALIDATED` status. Goalkeeper saves carry a conservative
    /// `gk_holds=false` default when no hint is given, preventing false
    /// control establishment downstream.
    #[must_use]
    pub fn resolve(&self, raw_action: &str, hint_gk_holds: Option<bool>) -> Resolution {
        let key = normalize_alias(raw_action);
        let item = if key.is_empty() {
            None
        } else {
            self.alias_map.get(&key).and_then(|index| self.items.get(*index))
        };
        let Some(item) = item else {
            return Resolution {
                canonical_action: UNKNOWN_ACTION.to_string(),
                qualifiers: BTreeMap::new(),
                status: EpistemicVerdict::Unvalidated,
            };
        };

        let mut qualifiers = BTreeMap::new();
        if item.canonical_action == GK_SAVE_ACTION {
            qualifiers.insert("gk_holds".to_string(), json!(hint_gk_holds.unwrap_or(false)));
        }

        Resolution {
            canonical_action: item.canonical_action.clone(),
            qualifiers,
            status: EpistemicVerdict::Valid,
        }
    }
}

// ============================================================================
// SECTION: Field Parsing
// ============================================================================

/// Parses the alias list, accepting scalar spellings.
fn parse_aliases(field: Option<&Value>, action: &str) -> Result<Vec<String>, RegistryError> {
    let Some(value) = field else {
        return Ok(Vec::new());
    };
    let Value::Array(entries) = value else {
        return Err(RegistryError::AliasesNotASequence(action.to_string()));
    };
    let mut out = Vec::with_capacity(entries.len());
    for entry in entries {
        match entry {
            Value::String(token) => out.push(token.clone()),
            Value::Number(number) => out.push(number.to_string()),
            _ => return Err(RegistryError::AliasesNotASequence(action.to_string())),
        }
    }
    Ok(out)
}

/// Parses the allowed-states list, uppercasing tokens.
fn parse_allowed_states(
    field: Option<&Value>,
    action: &str,
) -> Result<Vec<String>, RegistryError> {
    let Some(value) = field else {
        return Ok(Vec::new());
    };
    let Value::Array(entries) = value else {
        return Err(RegistryError::AllowedStatesNotASequence(action.to_string()));
    };
    Ok(entries
        .iter()
        .map(|entry| match entry {
            Value::String(token) => token.trim().to_uppercase(),
            other => other.to_string().to_uppercase(),
        })
        .collect())
}

/// Parses the qualifier mapping; every value must be a sequence.
fn parse_qualifiers(
    field: Option<&Value>,
    action: &str,
) -> Result<BTreeMap<String, Vec<Value>>, RegistryError> {
    let Some(value) = field else {
        return Ok(BTreeMap::new());
    };
    let Value::Object(entries) = value else {
        return Err(RegistryError::QualifiersNotAMapping(action.to_string()));
    };
    let mut out = BTreeMap::new();
    for (name, values) in entries {
        let Value::Array(list) = values else {
            return Err(RegistryError::QualifierNotASequence {
                name: name.clone(),
                action: action.to_string(),
            });
        };
        out.insert(name.trim().to_string(), list.clone());
    }
    Ok(out)
}
