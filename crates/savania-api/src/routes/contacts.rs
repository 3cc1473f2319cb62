//! # Contact Management Routes
//!
//! Admin-only: paged list, detail, status change, delete, CSV export, and
//! prefix search.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::NaiveDate;
use savania_backoffice::contacts::{self, ContactFilters, ContactPage};
use savania_backoffice::export::{export_contacts, ExportRange};
use savania_backoffice::{search, SearchResults};
use savania_core::{ContactId, ContactRecord, ContactStatus, ServiceCategory};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::auth::Admin;
use crate::error::AppError;
use crate::extractors::{extract_json, extract_query};
use crate::state::AppState;

/// Filters and page of the contact list.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ContactListQuery {
    pub statut: Option<ContactStatus>,
    pub service: Option<ServiceCategory>,
    /// Local submission day, `YYYY-MM-DD`.
    #[param(value_type = Option<String>, format = Date)]
    pub date: Option<NaiveDate>,
    /// 1-based page.
    pub page: Option<usize>,
}

impl ContactListQuery {
    pub fn filters(&self) -> ContactFilters {
        ContactFilters {
            statut: self.statut,
            service: self.service,
            date: self.date,
        }
    }

    pub fn page(&self) -> usize {
        self.page.unwrap_or(1).max(1)
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StatusChange {
    pub statut: ContactStatus,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ExportQuery {
    /// First local day, inclusive. Defaults to the first of the month.
    #[param(value_type = Option<String>, format = Date)]
    pub from: Option<NaiveDate>,
    /// Last local day, inclusive. Defaults to today.
    #[param(value_type = Option<String>, format = Date)]
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/v1/admin/contacts", get(list_contacts))
        .route(
            "/v1/admin/contacts/:id",
            get(get_contact).delete(delete_contact),
        )
        .route("/v1/admin/contacts/:id/status", put(update_status))
        .route("/v1/admin/export/contacts", get(export))
        .route("/v1/admin/search", get(search_all))
}

/// GET /v1/admin/contacts — Filtered, paged contact list.
#[utoipa::path(
    get,
    path = "/v1/admin/contacts",
    params(ContactListQuery),
    responses(
        (status = 200, description = "One page of contacts", body = ContactPage),
        (status = 400, description = "Malformed filter", body = crate::error::ErrorBody),
        (status = 401, description = "No session", body = crate::error::ErrorBody),
    ),
    tag = "admin"
)]
pub async fn list_contacts(
    State(state): State<AppState>,
    _admin: Admin,
    query: Result<Query<ContactListQuery>, QueryRejection>,
) -> Result<Json<ContactPage>, AppError> {
    let query = extract_query(query)?;
    let page = contacts::list_contacts(
        state.store.as_ref(),
        state.calendar(),
        &query.filters(),
        query.page(),
        state.config.page_size,
    )
    .await?;
    Ok(Json(page))
}

/// GET /v1/admin/contacts/{id} — Contact detail.
#[utoipa::path(
    get,
    path = "/v1/admin/contacts/{id}",
    params(("id" = String, Path, description = "Contact document id")),
    responses(
        (status = 200, description = "The contact", body = ContactRecord),
        (status = 404, description = "No such contact", body = crate::error::ErrorBody),
    ),
    tag = "admin"
)]
pub async fn get_contact(
    State(state): State<AppState>,
    _admin: Admin,
    Path(id): Path<String>,
) -> Result<Json<ContactRecord>, AppError> {
    let record = contacts::get_contact(state.store.as_ref(), &ContactId::new(id)).await?;
    Ok(Json(record))
}

/// PUT /v1/admin/contacts/{id}/status — Change a contact's status.
#[utoipa::path(
    put,
    path = "/v1/admin/contacts/{id}/status",
    params(("id" = String, Path, description = "Contact document id")),
    request_body = StatusChange,
    responses(
        (status = 200, description = "Updated contact", body = ContactRecord),
        (status = 404, description = "No such contact", body = crate::error::ErrorBody),
    ),
    tag = "admin"
)]
pub async fn update_status(
    State(state): State<AppState>,
    Admin(admin): Admin,
    Path(id): Path<String>,
    body: Result<Json<StatusChange>, JsonRejection>,
) -> Result<Json<ContactRecord>, AppError> {
    let change = extract_json(body)?;
    let id = ContactId::new(id);
    contacts::update_status(state.store.as_ref(), &id, change.statut, state.now()).await?;
    tracing::info!(contact = %id, by = %admin.uid, status = %change.statut, "status changed by admin");
    let record = contacts::get_contact(state.store.as_ref(), &id).await?;
    Ok(Json(record))
}

/// DELETE /v1/admin/contacts/{id} — Delete a contact.
#[utoipa::path(
    delete,
    path = "/v1/admin/contacts/{id}",
    params(("id" = String, Path, description = "Contact document id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "No such contact", body = crate::error::ErrorBody),
    ),
    tag = "admin"
)]
pub async fn delete_contact(
    State(state): State<AppState>,
    Admin(admin): Admin,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = ContactId::new(id);
    contacts::delete_contact(state.store.as_ref(), &id).await?;
    tracing::info!(contact = %id, by = %admin.uid, "contact deleted by admin");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /v1/admin/export/contacts — Semicolon-delimited export.
#[utoipa::path(
    get,
    path = "/v1/admin/export/contacts",
    params(ExportQuery),
    responses(
        (status = 200, description = "CSV attachment", content_type = "text/csv"),
        (status = 400, description = "Invalid range", body = crate::error::ErrorBody),
        (status = 503, description = "Store unavailable; no file produced", body = crate::error::ErrorBody),
    ),
    tag = "admin"
)]
pub async fn export(
    State(state): State<AppState>,
    _admin: Admin,
    query: Result<Query<ExportQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let query = extract_query(query)?;
    let today = state.today();
    let range = ExportRange::resolve(query.from, query.to, today)?;
    let csv = export_contacts(state.store.as_ref(), state.calendar(), range, today).await?;

    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", csv.file_name))
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok((
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/csv; charset=utf-8"),
            ),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv.body,
    )
        .into_response())
}

/// GET /v1/admin/search — Prefix search on contact and client names.
#[utoipa::path(
    get,
    path = "/v1/admin/search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Hits", body = SearchResults),
    ),
    tag = "admin"
)]
pub async fn search_all(
    State(state): State<AppState>,
    _admin: Admin,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<SearchResults>, AppError> {
    let query = extract_query(query)?;
    Ok(Json(search(state.store.as_ref(), &query.q).await?))
}
