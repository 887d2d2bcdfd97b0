// crates/canon-gate-cli/src/main.rs
// ============================================================================
// Module: Canon Gate CLI Entry Point
// Description: Command dispatcher for drift, baseline, hash, and gate tools.
// Purpose: Expose the Canon Gate gates with stable exit codes for CI.
// Dependencies: canon-gate-core, canon-gate-registry, canon-gate-reports,
//               clap, serde_json, thiserror, time
// ============================================================================

//! ## Overview
//! The `canon-gate` binary wraps the library gates for CI use. Every
//! subcommand prints a one-line summary and writes its detailed JSON
//! artifact; exit codes are reserved: `0` clean, `1` drift or violation
//! detected, `2` input or parse error. Wall-clock time is read only here, at
//! the host edge, and handed to the libraries explicitly.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use canon_gate_core::PossessionEffect;
use canon_gate_core::PossessionState;
use canon_gate_core::deterministic_json_bytes;
use canon_gate_core::format_utc_seconds;
use canon_gate_registry::check_registry_constitution;
use canon_gate_registry::drift::check_drift;
use canon_gate_registry::drift::load_code_enums;
use canon_gate_registry::drift::load_registry_decls;
use canon_gate_registry::drift::render_markdown;
use canon_gate_reports::baseline::check_baseline;
use canon_gate_reports::engine_gate::GateAction;
use canon_gate_reports::engine_gate::evaluate_run_dir;
use canon_gate_reports::fingerprint::collect_fingerprint;
use canon_gate_reports::fingerprint::diff_fingerprints;
use canon_gate_reports::fingerprint::fingerprints_match;
use canon_gate_reports::fingerprint::load_fingerprint;
use canon_gate_reports::fingerprint::write_fingerprint;
use canon_gate_reports::hash_gate::HashCheckStatus;
use canon_gate_reports::hash_gate::verify_manifest;
use clap::Parser;
use clap::Subcommand;
use serde_json::json;
use thiserror::Error;
use time::OffsetDateTime;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default artifacts watched by the fingerprint command.
const DEFAULT_WATCH: [&str; 3] =
    ["engine_seq_possessions.json", "engine_xt01_grid.json", "engine_meta.json"];

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "canon-gate", version, about = "Canon Gate pipeline gates")]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Compare the action registry against a code-enums export.
    DriftCheck {
        /// Canonical action registry YAML.
        #[arg(long = "canon-action-registry")]
        registry: PathBuf,
        /// Code enums JSON export.
        #[arg(long = "code-enums")]
        code_enums: PathBuf,
        /// Drift report JSON output path.
        #[arg(long = "out-json", default_value = "drift_report.json")]
        out_json: PathBuf,
        /// Drift report markdown output path.
        #[arg(long = "out-md", default_value = "drift_report.md")]
        out_md: PathBuf,
    },
    /// Gate the unmapped-actions report against its baseline.
    BaselineGate {
        /// Current unmapped-actions report path.
        #[arg(long)]
        report: PathBuf,
        /// Baseline JSON path.
        #[arg(long)]
        baseline: PathBuf,
    },
    /// Verify the canon hash manifest.
    HashGate {
        /// Manifest JSON path.
        #[arg(long)]
        manifest: PathBuf,
        /// Root directory manifest paths resolve against.
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
    /// Evaluate one engine run directory.
    EngineGate {
        /// Run directory containing the engine artifacts.
        out_dir: PathBuf,
    },
    /// Check the action registry constitution.
    RegistryCheck {
        /// Registry JSON path.
        #[arg(long)]
        registry: PathBuf,
    },
    /// Fingerprint run artifacts and compare against a baseline.
    Fingerprint {
        /// Run directory to fingerprint.
        run_dir: PathBuf,
        /// Artifact basenames to watch.
        #[arg(long)]
        watch: Vec<String>,
        /// Baseline fingerprint path.
        #[arg(long)]
        baseline: PathBuf,
        /// Write the baseline instead of comparing.
        #[arg(long = "write-baseline")]
        write_baseline: bool,
        /// Fail when any watched artifact is missing.
        #[arg(long)]
        strict: bool,
    },
    /// Export the code-side enumerations for drift checking.
    ExportEnums {
        /// Output JSON path.
        #[arg(long)]
        out: PathBuf,
        /// Registry YAML whose actions and aliases are included.
        #[arg(long = "canon-action-registry")]
        registry: Option<PathBuf>,
    },
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI-level error carrying a printable message.
///
/// # Invariants
/// - Every variant maps to exit code 2.
#[derive(Debug, Error)]
#[error("{0}")]
struct CliError(String);

impl CliError {
    /// Wraps any displayable error.
    fn from_err(err: impl std::fmt::Display) -> Self {
        Self(err.to_string())
    }
}

/// Result alias for CLI operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// Process entry point mapping errors to exit code 2.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            let _ = write_stderr_line(&format!("ERROR: {err}"));
            ExitCode::from(2)
        }
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::DriftCheck {
            registry,
            code_enums,
            out_json,
            out_md,
        } => command_drift_check(&registry, &code_enums, &out_json, &out_md),
        Commands::BaselineGate {
            report,
            baseline,
        } => command_baseline_gate(&report, &baseline),
        Commands::HashGate {
            manifest,
            root,
        } => command_hash_gate(&manifest, &root),
        Commands::EngineGate {
            out_dir,
        } => command_engine_gate(&out_dir),
        Commands::RegistryCheck {
            registry,
        } => command_registry_check(&registry),
        Commands::Fingerprint {
            run_dir,
            watch,
            baseline,
            write_baseline,
            strict,
        } => command_fingerprint(&run_dir, &watch, &baseline, write_baseline, strict),
        Commands::ExportEnums {
            out,
            registry,
        } => command_export_enums(&out, registry.as_deref()),
    }
}

// ============================================================================
// SECTION: Drift Check Command
// ============================================================================

/// Executes the `drift-check` command.
fn command_drift_check(
    registry: &std::path::Path,
    code_enums: &std::path::Path,
    out_json: &std::path::Path,
    out_md: &std::path::Path,
) -> CliResult<ExitCode> {
    let decls = load_registry_decls(registry).map_err(CliError::from_err)?;
    let code = load_code_enums(code_enums).map_err(CliError::from_err)?;
    let report = check_drift(&decls, &code);

    let bytes = deterministic_json_bytes(&report).map_err(CliError::from_err)?;
    fs::write(out_json, bytes).map_err(CliError::from_err)?;
    fs::write(out_md, render_markdown(&report)).map_err(CliError::from_err)?;

    if report.has_drift() {
        write_stdout_line(&format!(
            "FAIL drift detected (doc_only={}, code_only={}, alias_collisions={})",
            report.summary.doc_only_count,
            report.summary.code_only_count,
            report.summary.alias_collision_count
        ))?;
        return Ok(ExitCode::from(1));
    }
    write_stdout_line("PASS no drift")?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Baseline Gate Command
// ============================================================================

/// Executes the `baseline-gate` command.
fn command_baseline_gate(
    report: &std::path::Path,
    baseline: &std::path::Path,
) -> CliResult<ExitCode> {
    let outcome = check_baseline(report, baseline).map_err(CliError::from_err)?;
    if outcome.is_clean() {
        write_stdout_line("PASS no new unmapped provider actions")?;
        return Ok(ExitCode::SUCCESS);
    }
    write_stdout_line("FAIL new provider action(s) not in baseline:")?;
    for action in &outcome.novel {
        write_stdout_line(&format!("- {action}"))?;
    }
    Ok(ExitCode::from(1))
}

// ============================================================================
// SECTION: Hash Gate Command
// ============================================================================

/// Executes the `hash-gate` command.
fn command_hash_gate(manifest: &std::path::Path, root: &std::path::Path) -> CliResult<ExitCode> {
    let result = verify_manifest(manifest, root).map_err(CliError::from_err)?;
    write_stdout_line("== CANON HASH GATE ==")?;
    for check in &result.checks {
        match &check.status {
            HashCheckStatus::Pass => write_stdout_line(&format!("PASS {}", check.path))?,
            HashCheckStatus::InvalidEntry => {
                write_stdout_line(&format!("FAIL invalid entry: {}", check.path))?;
            }
            HashCheckStatus::Missing => {
                write_stdout_line(&format!("FAIL missing file: {}", check.path))?;
            }
            HashCheckStatus::Mismatch {
                expected,
                actual,
            } => {
                write_stdout_line(&format!("FAIL hash mismatch: {}", check.path))?;
                write_stdout_line(&format!("  expected: {expected}"))?;
                write_stdout_line(&format!("  actual  : {actual}"))?;
            }
            HashCheckStatus::Unreadable {
                message,
            } => {
                write_stdout_line(&format!("FAIL unreadable file: {} ({message})", check.path))?;
            }
        }
    }
    if result.passed {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(1))
    }
}

// ============================================================================
// SECTION: Engine Gate Command
// ============================================================================

/// Executes the `engine-gate` command.
fn command_engine_gate(out_dir: &std::path::Path) -> CliResult<ExitCode> {
    let (report, out_path) = evaluate_run_dir(out_dir).map_err(CliError::from_err)?;
    write_stdout_line(&format!("action: {}", report.action))?;
    write_stdout_line(&format!("wrote: {}", out_path.display()))?;
    match report.action {
        GateAction::Pass | GateAction::Warn => Ok(ExitCode::SUCCESS),
        GateAction::Quarantine => Ok(ExitCode::from(1)),
    }
}

// ============================================================================
// SECTION: Registry Check Command
// ============================================================================

/// Executes the `registry-check` command.
fn command_registry_check(registry: &std::path::Path) -> CliResult<ExitCode> {
    let raw = fs::read_to_string(registry).map_err(CliError::from_err)?;
    match check_registry_constitution(&raw) {
        Ok(()) => {
            write_stdout_line("PASS registry constitution")?;
            Ok(ExitCode::SUCCESS)
        }
        Err(canon_gate_registry::IntegrityError::Parse(message)) => {
            Err(CliError(format!("invalid registry json: {message}")))
        }
        Err(err) => {
            write_stdout_line(&format!("FAIL {err}"))?;
            Ok(ExitCode::from(1))
        }
    }
}

// ============================================================================
// SECTION: Fingerprint Command
// ============================================================================

/// Executes the `fingerprint` command.
fn command_fingerprint(
    run_dir: &std::path::Path,
    watch: &[String],
    baseline: &std::path::Path,
    write_baseline: bool,
    strict: bool,
) -> CliResult<ExitCode> {
    let watch: Vec<String> = if watch.is_empty() {
        DEFAULT_WATCH.into_iter().map(str::to_string).collect()
    } else {
        watch.to_vec()
    };
    let created_at =
        format_utc_seconds(OffsetDateTime::now_utc()).map_err(CliError::from_err)?;
    let current =
        collect_fingerprint(run_dir, &watch, &created_at).map_err(CliError::from_err)?;

    if strict {
        let missing: Vec<&str> = current
            .files
            .iter()
            .filter(|file| !file.present)
            .map(|file| file.name.as_str())
            .collect();
        if !missing.is_empty() {
            write_stdout_line("FAIL missing watched artifacts:")?;
            for name in missing {
                write_stdout_line(&format!("- {name}"))?;
            }
            return Ok(ExitCode::from(1));
        }
    }

    if write_baseline {
        write_fingerprint(baseline, &current).map_err(CliError::from_err)?;
        write_stdout_line(&format!("baseline written: {}", baseline.display()))?;
        return Ok(ExitCode::SUCCESS);
    }

    let baseline_fp = load_fingerprint(baseline).map_err(CliError::from_err)?;
    if fingerprints_match(&baseline_fp, &current) {
        write_stdout_line("PASS artifact fingerprint: MATCH")?;
        return Ok(ExitCode::SUCCESS);
    }

    write_stdout_line("FAIL artifact fingerprint: DRIFT")?;
    for line in diff_fingerprints(&baseline_fp, &current) {
        write_stdout_line(&line)?;
    }
    Ok(ExitCode::from(1))
}

// ============================================================================
// SECTION: Export Enums Command
// ============================================================================

/// Executes the `export-enums` command.
fn command_export_enums(
    out: &std::path::Path,
    registry: Option<&std::path::Path>,
) -> CliResult<ExitCode> {
    let mut export: BTreeMap<String, Vec<String>> = BTreeMap::new();
    export.insert(
        "possession_effects".to_string(),
        PossessionEffect::ALL.iter().map(|effect| effect.as_str().to_string()).collect(),
    );
    export.insert(
        "allowed_states".to_string(),
        PossessionState::ALL.iter().map(|state| state.as_str().to_string()).collect(),
    );
    export.insert(
        "fail_closed_defaults".to_string(),
        vec![PossessionState::Unvalidated.as_str().to_string()],
    );

    if let Some(registry) = registry {
        let decls = load_registry_decls(registry).map_err(CliError::from_err)?;
        export.insert("canonical_actions".to_string(), decls.canonical_actions);
        export.insert("aliases".to_string(), decls.aliases);
    }

    let bytes = deterministic_json_bytes(&json!(export)).map_err(CliError::from_err)?;
    fs::write(out, bytes).map_err(CliError::from_err)?;
    write_stdout_line(&format!("wrote: {}", out.display()))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes one line to stdout.
fn write_stdout_line(message: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}").map_err(CliError::from_err)
}

/// Writes one line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}
