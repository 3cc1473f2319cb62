//! # Contact Manager
//!
//! Paged, filtered listing of contact records plus the two single-document
//! mutations the back-office offers (status change, delete).
//!
//! Listing is newest first by `date_soumission`. Filters are status,
//! service, and a single local day (`[day 00:00, day+1 00:00)` in the
//! venue's offset). The full filtered result is fetched and sliced into
//! pages; the total count drives the page bar.
//!
//! [`ContactListView`] holds the admin's view state. Any filter change
//! resets to page 1 and bumps a generation counter, and results carrying an
//! older generation are discarded when they arrive.

use chrono::{DateTime, NaiveDate, Utc};
use savania_core::contact::{field, COLLECTION};
use savania_core::{
    Contact, ContactId, ContactRecord, ContactStatus, LocalCalendar, SavaniaError,
    ServiceCategory,
};
use savania_store::query::timestamp;
use savania_store::{Direction, Document, DocumentStore, Query, StoreError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::error::BackofficeError;

/// Contacts per page unless configured otherwise.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Filters offered on the contact list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ContactFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statut: Option<ContactStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<ServiceCategory>,
    /// Local calendar day of submission.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, format = Date)]
    pub date: Option<NaiveDate>,
}

/// One page of the contact list.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ContactPage {
    pub contacts: Vec<ContactRecord>,
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
    pub total_pages: usize,
}

/// `ceil(total / page_size)`; zero for an empty list.
pub fn total_pages(total: usize, page_size: usize) -> usize {
    if page_size == 0 {
        0
    } else {
        total.div_ceil(page_size)
    }
}

/// Items of the 1-based `page`. Pages past the end are empty.
pub fn page_slice<T>(items: Vec<T>, page: usize, page_size: usize) -> Vec<T> {
    let start = page.saturating_sub(1).saturating_mul(page_size);
    items.into_iter().skip(start).take(page_size).collect()
}

/// The store query behind the list.
pub fn contacts_query(
    filters: &ContactFilters,
    calendar: &LocalCalendar,
) -> Result<Query, SavaniaError> {
    let mut query = Query::collection(COLLECTION).order_by(field::SUBMITTED_AT, Direction::Desc);
    if let Some(status) = filters.statut {
        query = query.where_eq(field::STATUS, status.as_str());
    }
    if let Some(service) = filters.service {
        query = query.where_eq(field::SERVICE, service.as_str());
    }
    if let Some(day) = filters.date {
        let window = calendar.day_window(day)?;
        query = query
            .where_gte(field::SUBMITTED_AT, timestamp(window.start))
            .where_lt(field::SUBMITTED_AT, timestamp(window.end));
    }
    Ok(query)
}

/// Decode contact documents, skipping (and logging) malformed ones.
pub fn decode_contacts(documents: Vec<Document>) -> Vec<ContactRecord> {
    documents
        .into_iter()
        .filter_map(|doc| match doc.decode::<Contact>() {
            Ok(contact) => Some(ContactRecord {
                id: ContactId::new(doc.id),
                contact,
            }),
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed contact");
                None
            }
        })
        .collect()
}

/// One page of contacts matching `filters`.
pub async fn list_contacts(
    store: &dyn DocumentStore,
    calendar: &LocalCalendar,
    filters: &ContactFilters,
    page: usize,
    page_size: usize,
) -> Result<ContactPage, BackofficeError> {
    let page = page.max(1);
    let documents = store.query(&contacts_query(filters, calendar)?).await?;
    let records = decode_contacts(documents);
    let total = records.len();
    Ok(ContactPage {
        contacts: page_slice(records, page, page_size),
        page,
        page_size,
        total,
        total_pages: total_pages(total, page_size),
    })
}

/// A single contact for the detail view.
pub async fn get_contact(
    store: &dyn DocumentStore,
    id: &ContactId,
) -> Result<ContactRecord, BackofficeError> {
    let doc = store
        .get(COLLECTION, id.as_str())
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(ContactRecord {
        id: id.clone(),
        contact: doc.decode()?,
    })
}

/// The patch written by a status change: `statut` and
/// `date_dernier_suivi`, nothing else.
pub fn status_patch(status: ContactStatus, now: DateTime<Utc>) -> Map<String, Value> {
    let mut patch = Map::new();
    patch.insert(field::STATUS.into(), Value::from(status.as_str()));
    patch.insert(field::LAST_FOLLOWED_UP.into(), timestamp(now));
    patch
}

/// Set a contact's status. Any status may follow any other.
pub async fn update_status(
    store: &dyn DocumentStore,
    id: &ContactId,
    status: ContactStatus,
    now: DateTime<Utc>,
) -> Result<(), BackofficeError> {
    match store
        .update(COLLECTION, id.as_str(), status_patch(status, now))
        .await
    {
        Ok(()) => {
            tracing::info!(contact = %id, status = %status, "contact status updated");
            Ok(())
        }
        Err(StoreError::NotFound { .. }) => Err(not_found(id)),
        Err(e) => Err(e.into()),
    }
}

/// Hard-delete a contact.
pub async fn delete_contact(store: &dyn DocumentStore, id: &ContactId) -> Result<(), BackofficeError> {
    if store.get(COLLECTION, id.as_str()).await?.is_none() {
        return Err(not_found(id));
    }
    store.delete(COLLECTION, id.as_str()).await?;
    tracing::info!(contact = %id, "contact deleted");
    Ok(())
}

fn not_found(id: &ContactId) -> BackofficeError {
    BackofficeError::NotFound {
        kind: "contact",
        id: id.as_str().to_string(),
    }
}

/// What a list load was issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    pub generation: u64,
    pub filters: ContactFilters,
    pub page: usize,
}

/// View state of the admin contact list.
#[derive(Debug, Clone)]
pub struct ContactListView {
    page_size: usize,
    page: usize,
    filters: ContactFilters,
    generation: u64,
    shown: Option<ContactPage>,
}

impl ContactListView {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            page: 1,
            filters: ContactFilters::default(),
            generation: 0,
            shown: None,
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn filters(&self) -> &ContactFilters {
        &self.filters
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The page currently displayed.
    pub fn shown(&self) -> Option<&ContactPage> {
        self.shown.as_ref()
    }

    pub fn set_status_filter(&mut self, status: Option<ContactStatus>) {
        self.filters.statut = status;
        self.filters_changed();
    }

    pub fn set_service_filter(&mut self, service: Option<ServiceCategory>) {
        self.filters.service = service;
        self.filters_changed();
    }

    pub fn set_date_filter(&mut self, date: Option<NaiveDate>) {
        self.filters.date = date;
        self.filters_changed();
    }

    pub fn set_filters(&mut self, filters: ContactFilters) {
        self.filters = filters;
        self.filters_changed();
    }

    pub fn go_to_page(&mut self, page: usize) {
        self.page = page.max(1);
        self.generation += 1;
    }

    fn filters_changed(&mut self) {
        self.page = 1;
        self.generation += 1;
    }

    /// Start a load for the current state.
    pub fn begin_load(&self) -> LoadTicket {
        LoadTicket {
            generation: self.generation,
            filters: self.filters.clone(),
            page: self.page,
        }
    }

    /// Accept a finished load unless the state moved on since it began.
    /// Returns whether the result is now shown.
    pub fn complete_load(&mut self, ticket: &LoadTicket, result: ContactPage) -> bool {
        if ticket.generation != self.generation {
            tracing::debug!(
                stale = ticket.generation,
                current = self.generation,
                "discarding stale contact list result"
            );
            return false;
        }
        self.shown = Some(result);
        true
    }

    /// Issue and complete a load against `store`.
    pub async fn reload(
        &mut self,
        store: &dyn DocumentStore,
        calendar: &LocalCalendar,
    ) -> Result<bool, BackofficeError> {
        let ticket = self.begin_load();
        let page = list_contacts(store, calendar, &ticket.filters, ticket.page, self.page_size).await?;
        Ok(self.complete_load(&ticket, page))
    }
}
