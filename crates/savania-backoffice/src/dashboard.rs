//! # Dashboard Aggregator
//!
//! Four figures, one store query each, folded with a plain accumulator:
//!
//! | Figure | Query |
//! |---|---|
//! | New contacts today | `date_soumission` in today's local window, `statut == nouveau` |
//! | Contacts this week | `date_soumission >= ` local Sunday 00:00, any status |
//! | Bookings today | `date_reservation == today`, `statut in [confirme, en_cours]` |
//! | Revenue | sum of `total_ttc` over `statut in [confirme, termine, paye]`, this month vs last |
//!
//! Revenue growth is `(current - previous) / previous * 100` at one decimal,
//! and exactly `100` when the previous month is zero. Conversion and
//! occupancy rates have no data source and are reported as absent.

use chrono::{DateTime, NaiveDate, Utc};
use savania_core::contact::{self, ContactStatus};
use savania_core::reservation::{self, ReservationStatus};
use savania_core::{LocalCalendar, SavaniaError};
use savania_store::query::timestamp;
use savania_store::{Document, DocumentStore, Query};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::BackofficeError;

/// Growth reported when the previous month had no revenue.
pub const GROWTH_FROM_ZERO: f64 = 100.0;

/// Snapshot of the dashboard figures.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DashboardStats {
    /// Local calendar day the figures were computed for.
    #[schema(value_type = String, format = Date)]
    pub day: NaiveDate,
    pub new_contacts_today: usize,
    pub week_contacts: usize,
    pub bookings_today: usize,
    pub current_month_revenue: f64,
    pub previous_month_revenue: f64,
    /// Percent change of revenue against the previous month.
    pub revenue_growth: f64,
    /// Not computed: no data source yet.
    pub conversion_rate: Option<f64>,
    /// Not computed: no capacity data yet.
    pub occupancy_rate: Option<f64>,
    pub computed_at: DateTime<Utc>,
}

/// Percent change from `previous` to `current`, one decimal place.
pub fn revenue_growth(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        return GROWTH_FROM_ZERO;
    }
    ((current - previous) / previous * 100.0 * 10.0).round() / 10.0
}

/// Sum of `total_ttc` over reservation documents. Missing or non-numeric
/// totals count as zero.
pub fn sum_revenue(documents: &[Document]) -> f64 {
    documents
        .iter()
        .map(|d| {
            d.field(reservation::field::TOTAL_INCL_TAX)
                .and_then(serde_json::Value::as_f64)
                .unwrap_or(0.0)
        })
        .sum()
}

fn day_key(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

fn status_values<const N: usize>(statuses: [ReservationStatus; N]) -> Vec<&'static str> {
    statuses.iter().map(ReservationStatus::as_str).collect()
}

/// The five queries behind the figures, for local day `today`.
#[derive(Debug, Clone, PartialEq)]
pub struct StatQueries {
    pub new_contacts_today: Query,
    pub week_contacts: Query,
    pub bookings_today: Query,
    pub current_month_revenue: Query,
    pub previous_month_revenue: Query,
}

impl StatQueries {
    pub fn for_day(calendar: &LocalCalendar, today: NaiveDate) -> Result<Self, SavaniaError> {
        let today_window = calendar.day_window(today)?;
        let week_start = calendar.midnight(calendar.week_start(today))?;
        let month_start = calendar.month_start(today);
        let previous_month_start = calendar.previous_month_start(today);

        Ok(Self {
            new_contacts_today: Query::collection(contact::COLLECTION)
                .where_gte(contact::field::SUBMITTED_AT, timestamp(today_window.start))
                .where_lt(contact::field::SUBMITTED_AT, timestamp(today_window.end))
                .where_eq(contact::field::STATUS, ContactStatus::Nouveau.as_str()),
            week_contacts: Query::collection(contact::COLLECTION)
                .where_gte(contact::field::SUBMITTED_AT, timestamp(week_start)),
            bookings_today: Query::collection(reservation::COLLECTION)
                .where_eq(reservation::field::DATE, day_key(today))
                .where_in(
                    reservation::field::STATUS,
                    status_values(ReservationStatus::ACTIVE),
                ),
            current_month_revenue: Query::collection(reservation::COLLECTION)
                .where_gte(reservation::field::DATE, day_key(month_start))
                .where_in(
                    reservation::field::STATUS,
                    status_values(ReservationStatus::REVENUE),
                ),
            previous_month_revenue: Query::collection(reservation::COLLECTION)
                .where_gte(reservation::field::DATE, day_key(previous_month_start))
                .where_lt(reservation::field::DATE, day_key(month_start))
                .where_in(
                    reservation::field::STATUS,
                    status_values(ReservationStatus::REVENUE),
                ),
        })
    }
}

/// Run the stat queries and fold them into [`DashboardStats`].
pub async fn compute_stats(
    store: &dyn DocumentStore,
    calendar: &LocalCalendar,
    now: DateTime<Utc>,
) -> Result<DashboardStats, BackofficeError> {
    let today = calendar.local_date(now);
    let queries = StatQueries::for_day(calendar, today)?;

    let new_contacts_today = store.count(&queries.new_contacts_today).await?;
    let week_contacts = store.count(&queries.week_contacts).await?;
    let bookings_today = store.count(&queries.bookings_today).await?;
    let current_month_revenue =
        sum_revenue(&store.query(&queries.current_month_revenue).await?);
    let previous_month_revenue =
        sum_revenue(&store.query(&queries.previous_month_revenue).await?);

    Ok(DashboardStats {
        day: today,
        new_contacts_today,
        week_contacts,
        bookings_today,
        current_month_revenue,
        previous_month_revenue,
        revenue_growth: revenue_growth(current_month_revenue, previous_month_revenue),
        conversion_rate: None,
        occupancy_rate: None,
        computed_at: now,
    })
}
