//! # savania-cli — SAVANIA Operator Command-Line Interface
//!
//! Offline tooling over a JSON store snapshot (the same
//! `{"<collection>": {"<id>": {...}}}` format the API server seeds from).
//!
//! ## Subcommands
//!
//! - `export` — contacts in a range of local days as a semicolon CSV
//! - `stats` — the dashboard stat cards for a given day
//! - `scan` — run the advisory input guard over text
//! - `check-snapshot` — decode every known document and report failures
//!
//! ## Exit Codes
//!
//! 0 success, 1 error, 2 guard match or invalid documents.
//!
//! ## Crate Policy
//!
//! - CLI construction (argument parsing) is separated from business logic.
//! - Handler functions delegate to the back-office crate.

pub mod check;
pub mod export;
pub mod scan;
pub mod stats;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use savania_core::LocalCalendar;
use savania_store::MemoryStore;

/// Exit code for a guard match or invalid documents.
pub const EXIT_FINDINGS: u8 = 2;

/// Resolve a path relative to the current working directory.
pub fn resolve_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

/// Parse `--utc-offset` values such as `+00:00`, `-05:30` or `Z`.
pub fn parse_calendar(raw: &str) -> Result<LocalCalendar, String> {
    LocalCalendar::parse_offset(raw).map_err(|e| e.to_string())
}

/// Load a snapshot file into an in-memory store.
pub fn load_snapshot(path: &Path) -> Result<MemoryStore> {
    let path = resolve_path(path);
    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read snapshot: {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse snapshot JSON: {}", path.display()))?;
    let store = MemoryStore::from_snapshot(value)
        .with_context(|| format!("invalid snapshot: {}", path.display()))?;
    tracing::debug!(path = %path.display(), "snapshot loaded");
    Ok(store)
}

/// Single-threaded runtime for driving the async store traits.
pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")
}
