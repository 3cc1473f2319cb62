//! # Dashboard Routes
//!
//! Admin-only. JSON endpoints for the stat cards, the recent activity panel
//! and the live long-poll, plus HTML fragments the admin pages swap in
//! directly.
//!
//! The live endpoint answers at once when the caller's `after` generation
//! is behind the current one; otherwise it waits up to the configured poll
//! interval and answers with whatever is current then.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::Html;
use axum::routing::get;
use axum::{Json, Router};
use savania_backoffice::activity::RECENT_LIMIT;
use savania_backoffice::contacts;
use savania_backoffice::render;
use savania_backoffice::{compute_stats, recent_activity, DashboardStats, LiveUpdate, RecentActivity};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::auth::Admin;
use crate::error::AppError;
use crate::extractors::extract_query;
use crate::routes::contacts::ContactListQuery;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LiveQuery {
    /// Last generation the caller has seen. Omit for the current state.
    pub after: Option<u64>,
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/v1/admin/dashboard/stats", get(stats))
        .route("/v1/admin/dashboard/activity", get(activity))
        .route("/v1/admin/dashboard/live", get(live))
        .route("/v1/admin/fragments/stats", get(stats_fragment))
        .route("/v1/admin/fragments/contacts", get(contacts_fragment))
        .route("/v1/admin/fragments/activity", get(activity_fragment))
}

/// GET /v1/admin/dashboard/stats — Today's stat cards.
#[utoipa::path(
    get,
    path = "/v1/admin/dashboard/stats",
    responses(
        (status = 200, description = "Current statistics", body = DashboardStats),
        (status = 503, description = "Store unavailable", body = crate::error::ErrorBody),
    ),
    tag = "admin"
)]
pub async fn stats(
    State(state): State<AppState>,
    _admin: Admin,
) -> Result<Json<DashboardStats>, AppError> {
    let stats = compute_stats(state.store.as_ref(), state.calendar(), state.now()).await?;
    Ok(Json(stats))
}

/// GET /v1/admin/dashboard/activity — Latest contacts and reservations.
#[utoipa::path(
    get,
    path = "/v1/admin/dashboard/activity",
    responses(
        (status = 200, description = "Recent activity", body = RecentActivity),
    ),
    tag = "admin"
)]
pub async fn activity(
    State(state): State<AppState>,
    _admin: Admin,
) -> Result<Json<RecentActivity>, AppError> {
    Ok(Json(recent_activity(state.store.as_ref(), RECENT_LIMIT).await?))
}

/// GET /v1/admin/dashboard/live — Long-poll for the next live update.
#[utoipa::path(
    get,
    path = "/v1/admin/dashboard/live",
    params(LiveQuery),
    responses(
        (status = 200, description = "Latest live update", body = LiveUpdate),
    ),
    tag = "admin"
)]
pub async fn live(
    State(state): State<AppState>,
    _admin: Admin,
    query: Result<Query<LiveQuery>, QueryRejection>,
) -> Result<Json<LiveUpdate>, AppError> {
    let query = extract_query(query)?;
    let ctx = state.live_dashboard().await?;
    let update = match query.after {
        Some(after) if ctx.latest().generation <= after => {
            ctx.wait_newer(after, state.config.live_poll).await
        }
        _ => ctx.latest(),
    };
    Ok(Json(update))
}

/// GET /v1/admin/fragments/stats — Stat cards as HTML.
#[utoipa::path(
    get,
    path = "/v1/admin/fragments/stats",
    responses((status = 200, description = "Stat card markup", content_type = "text/html")),
    tag = "admin"
)]
pub async fn stats_fragment(
    State(state): State<AppState>,
    _admin: Admin,
) -> Result<Html<String>, AppError> {
    let stats = compute_stats(state.store.as_ref(), state.calendar(), state.now()).await?;
    Ok(Html(render::stat_cards(&stats)))
}

/// GET /v1/admin/fragments/contacts — Contact table rows and pagination.
#[utoipa::path(
    get,
    path = "/v1/admin/fragments/contacts",
    params(ContactListQuery),
    responses((status = 200, description = "Table body and pager markup", content_type = "text/html")),
    tag = "admin"
)]
pub async fn contacts_fragment(
    State(state): State<AppState>,
    _admin: Admin,
    query: Result<Query<ContactListQuery>, QueryRejection>,
) -> Result<Html<String>, AppError> {
    let query = extract_query(query)?;
    let page = contacts::list_contacts(
        state.store.as_ref(),
        state.calendar(),
        &query.filters(),
        query.page(),
        state.config.page_size,
    )
    .await?;
    let mut html = render::contact_rows(&page.contacts, state.calendar());
    html.push_str(&render::pagination(page.page, page.total_pages));
    Ok(Html(html))
}

/// GET /v1/admin/fragments/activity — Recent activity as HTML.
#[utoipa::path(
    get,
    path = "/v1/admin/fragments/activity",
    responses((status = 200, description = "Activity list markup", content_type = "text/html")),
    tag = "admin"
)]
pub async fn activity_fragment(
    State(state): State<AppState>,
    _admin: Admin,
) -> Result<Html<String>, AppError> {
    let activity = recent_activity(state.store.as_ref(), RECENT_LIMIT).await?;
    Ok(Html(render::activity_list(
        &activity,
        state.now(),
        state.calendar(),
    )))
}
