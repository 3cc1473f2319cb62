//! # Recent Activity and Search
//!
//! The dashboard's "recent activity" panel (latest contacts by submission
//! time, latest reservations by creation time) and the admin header's
//! prefix search over contact names and reservation client names.

use savania_core::{contact, reservation, ContactRecord, Reservation, ReservationRecord};
use savania_store::query::prefix_upper_bound;
use savania_store::{Direction, Document, DocumentStore, Query, StoreError};
use serde::Serialize;
use utoipa::ToSchema;

use crate::contacts::decode_contacts;

/// Entries per list in the activity panel.
pub const RECENT_LIMIT: usize = 5;

/// Shorter search terms return nothing.
pub const MIN_SEARCH_LEN: usize = 2;

/// Hits per collection.
pub const SEARCH_LIMIT: usize = 5;

/// Latest contacts and reservations.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct RecentActivity {
    pub contacts: Vec<ContactRecord>,
    pub reservations: Vec<ReservationRecord>,
}

/// Prefix search hits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct SearchResults {
    pub term: String,
    pub contacts: Vec<ContactRecord>,
    pub reservations: Vec<ReservationRecord>,
}

/// Decode reservation documents, skipping malformed ones.
pub fn decode_reservations(documents: Vec<Document>) -> Vec<ReservationRecord> {
    documents
        .into_iter()
        .filter_map(|doc| match doc.decode::<Reservation>() {
            Ok(reservation) => Some(ReservationRecord {
                id: doc.id.into(),
                reservation,
            }),
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed reservation");
                None
            }
        })
        .collect()
}

pub async fn recent_activity(
    store: &dyn DocumentStore,
    limit: usize,
) -> Result<RecentActivity, StoreError> {
    let contacts = store
        .query(
            &Query::collection(contact::COLLECTION)
                .order_by(contact::field::SUBMITTED_AT, Direction::Desc)
                .limit(limit),
        )
        .await?;
    let reservations = store
        .query(
            &Query::collection(reservation::COLLECTION)
                .order_by(reservation::field::CREATED_AT, Direction::Desc)
                .limit(limit),
        )
        .await?;
    Ok(RecentActivity {
        contacts: decode_contacts(contacts),
        reservations: decode_reservations(reservations),
    })
}

fn prefix_query(collection: &str, field: &str, term: &str) -> Query {
    Query::collection(collection)
        .where_gte(field, term)
        .where_lte(field, prefix_upper_bound(term))
        .order_by(field, Direction::Asc)
        .limit(SEARCH_LIMIT)
}

/// Case-sensitive prefix search on contact `nom` and reservation
/// `client_nom`.
pub async fn search(store: &dyn DocumentStore, term: &str) -> Result<SearchResults, StoreError> {
    let term = term.trim();
    if term.chars().count() < MIN_SEARCH_LEN {
        return Ok(SearchResults {
            term: term.to_string(),
            ..SearchResults::default()
        });
    }
    let contacts = store
        .query(&prefix_query(contact::COLLECTION, contact::field::NAME, term))
        .await?;
    let reservations = store
        .query(&prefix_query(
            reservation::COLLECTION,
            reservation::field::CLIENT_NAME,
            term,
        ))
        .await?;
    tracing::debug!(
        term,
        contacts = contacts.len(),
        reservations = reservations.len(),
        "search"
    );
    Ok(SearchResults {
        term: term.to_string(),
        contacts: decode_contacts(contacts),
        reservations: decode_reservations(reservations),
    })
}
