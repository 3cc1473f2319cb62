//! # Export Subcommand
//!
//! Writes the contact CSV for a range of local days from a snapshot. With
//! no `--out`, the file is named like the admin download and written to
//! the current directory; `--out -` writes to stdout.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::Args;
use savania_backoffice::export::{export_contacts, ExportRange};
use savania_core::LocalCalendar;

use crate::{load_snapshot, parse_calendar, resolve_path, runtime};

/// Arguments for the `savania export` subcommand.
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// JSON store snapshot.
    #[arg(long)]
    pub snapshot: PathBuf,

    /// First local day, inclusive. Defaults to the first of the month.
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Last local day, inclusive. Defaults to today.
    #[arg(long)]
    pub to: Option<NaiveDate>,

    /// Output file, or `-` for stdout.
    #[arg(long, short)]
    pub out: Option<PathBuf>,

    /// Venue's UTC offset.
    #[arg(long, default_value = "+00:00", value_parser = parse_calendar)]
    pub utc_offset: LocalCalendar,
}

/// Execute the export subcommand.
pub fn run_export(args: &ExportArgs) -> Result<u8> {
    let store = load_snapshot(&args.snapshot)?;
    let calendar = args.utc_offset;
    let today = calendar.local_date(Utc::now());
    let range = ExportRange::resolve(args.from, args.to, today)?;

    let csv = runtime()?.block_on(export_contacts(&store, &calendar, range, today))?;

    match args.out.as_deref() {
        Some(path) if path.as_os_str() == "-" => print!("{}", csv.body),
        out => {
            let path = resolve_path(out.unwrap_or_else(|| Path::new(&csv.file_name)));
            std::fs::write(&path, csv.body.as_bytes())
                .with_context(|| format!("failed to write export: {}", path.display()))?;
            println!(
                "{} contact(s) from {} to {} written to {}",
                csv.rows,
                range.from(),
                range.to(),
                path.display()
            );
        }
    }
    Ok(0)
}
