//! # Stats Subcommand
//!
//! Prints the dashboard stat cards computed from a snapshot, as the admin
//! dashboard would show them on `--today`.

use std::path::PathBuf;

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use clap::Args;
use savania_backoffice::render::NOT_AVAILABLE;
use savania_backoffice::{compute_stats, DashboardStats};
use savania_core::format::{format_growth, format_xof};
use savania_core::LocalCalendar;

use crate::{load_snapshot, parse_calendar, runtime};

/// Arguments for the `savania stats` subcommand.
#[derive(Args, Debug)]
pub struct StatsArgs {
    /// JSON store snapshot.
    #[arg(long)]
    pub snapshot: PathBuf,

    /// Local day to compute for. Defaults to today.
    #[arg(long)]
    pub today: Option<NaiveDate>,

    /// Venue's UTC offset.
    #[arg(long, default_value = "+00:00", value_parser = parse_calendar)]
    pub utc_offset: LocalCalendar,

    /// Print the raw figures as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Execute the stats subcommand.
pub fn run_stats(args: &StatsArgs) -> Result<u8> {
    let store = load_snapshot(&args.snapshot)?;
    let calendar = args.utc_offset;
    let now = match args.today {
        Some(day) => calendar.midnight(day)?,
        None => Utc::now(),
    };

    let stats = runtime()?.block_on(compute_stats(&store, &calendar, now))?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print!("{}", summary(&stats));
    }
    Ok(0)
}

fn rate(value: Option<f64>) -> String {
    value.map_or_else(|| NOT_AVAILABLE.to_string(), |v| format!("{v:.1}%"))
}

/// Plain-text rendering of the stat cards.
pub fn summary(stats: &DashboardStats) -> String {
    format!(
        concat!(
            "Jour                 {}\n",
            "Nouveaux contacts    {}\n",
            "Contacts semaine     {}\n",
            "Réservations du jour {}\n",
            "Revenus du mois      {} ({})\n",
            "Taux de conversion   {}\n",
            "Taux d'occupation    {}\n",
        ),
        stats.day,
        stats.new_contacts_today,
        stats.week_contacts,
        stats.bookings_today,
        format_xof(stats.current_month_revenue),
        format_growth(stats.revenue_growth),
        rate(stats.conversion_rate),
        rate(stats.occupancy_rate),
    )
}
