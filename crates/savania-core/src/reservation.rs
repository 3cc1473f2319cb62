//! # Reservation — Bookings Consumed by the Dashboard
//!
//! Reservations are created outside the back-office. The dashboard only
//! reads them, for the "bookings today" and revenue figures.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::identity::ReservationId;

/// Collection holding reservation documents.
pub const COLLECTION: &str = "reservations";

/// Persisted field names, for building queries.
pub mod field {
    pub const CLIENT_NAME: &str = "client_nom";
    pub const DATE: &str = "date_reservation";
    pub const STATUS: &str = "statut";
    pub const TOTAL_INCL_TAX: &str = "total_ttc";
    pub const CREATED_AT: &str = "created_at";
}

/// Booking status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Confirme,
    EnCours,
    Termine,
    Paye,
    Annule,
}

impl ReservationStatus {
    /// Statuses whose totals count as revenue.
    pub const REVENUE: [ReservationStatus; 3] = [Self::Confirme, Self::Termine, Self::Paye];

    /// Statuses counted as "bookings today".
    pub const ACTIVE: [ReservationStatus; 2] = [Self::Confirme, Self::EnCours];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirme => "confirme",
            Self::EnCours => "en_cours",
            Self::Termine => "termine",
            Self::Paye => "paye",
            Self::Annule => "annule",
        }
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reservation document as stored in the `reservations` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Reservation {
    #[serde(rename = "client_nom")]
    pub client_name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "date_reservation")]
    pub date: NaiveDate,
    #[serde(rename = "statut")]
    pub status: ReservationStatus,
    #[serde(rename = "total_ttc", default)]
    pub total_incl_tax: f64,
    pub created_at: DateTime<Utc>,
}

/// A reservation together with its document id.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ReservationRecord {
    #[schema(value_type = String)]
    pub id: ReservationId,
    #[serde(flatten)]
    pub reservation: Reservation,
}
