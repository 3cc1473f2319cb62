//! # Advisory Security Routes
//!
//! Reports from the public site's client-side checks. These are
//! heuristics and logging only; nothing here grants or denies access.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use savania_backoffice::guard::{
    self, is_suspicious_domain, rapid_click_run, recent_security_logs, SecurityLogRecord,
    Viewport,
};
use savania_core::SecurityEventKind;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::auth::Admin;
use crate::error::AppError;
use crate::extractors::{extract_json, extract_query, Client};
use crate::state::AppState;

/// Default page of the security log.
pub const DEFAULT_LOG_LIMIT: usize = 50;

/// An event observed by the browser.
///
/// `suspicious_request_blocked` reports carry the blocked `url` in `data`;
/// `rapid_clicks_detected` reports may carry `clickTimes`, the click
/// timestamps in milliseconds, which are replayed server-side.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SecurityReport {
    #[serde(rename = "type")]
    pub kind: SecurityEventKind,
    #[serde(default)]
    pub data: serde_json::Value,
    /// Page the event happened on.
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReportAccepted {
    pub id: String,
}

/// Answer to a viewport report.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ViewportVerdict {
    pub devtools_suspected: bool,
    /// Where the page should navigate, when suspected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LogQuery {
    pub limit: Option<usize>,
}

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/v1/security/events", post(report_event))
        .route("/v1/security/viewport", post(report_viewport))
}

pub fn admin_router() -> Router<AppState> {
    Router::new().route("/v1/admin/security/logs", get(list_logs))
}

/// POST /v1/security/events — Record an advisory client report.
#[utoipa::path(
    post,
    path = "/v1/security/events",
    request_body = SecurityReport,
    responses(
        (status = 202, description = "Report logged", body = ReportAccepted),
        (status = 400, description = "Malformed report", body = crate::error::ErrorBody),
    ),
    tag = "public"
)]
pub async fn report_event(
    State(state): State<AppState>,
    Client(mut client): Client,
    body: Result<Json<SecurityReport>, JsonRejection>,
) -> Result<(StatusCode, Json<ReportAccepted>), AppError> {
    let mut report = extract_json(body)?;
    if report.url.is_some() {
        client.url = report.url.take();
    }
    match report.kind {
        SecurityEventKind::SuspiciousRequestBlocked => {
            let known = report
                .data
                .get("url")
                .and_then(|v| v.as_str())
                .is_some_and(is_suspicious_domain);
            if let Some(data) = report.data.as_object_mut() {
                data.insert("known_domain".into(), known.into());
            }
        }
        SecurityEventKind::RapidClicksDetected => {
            let run = report
                .data
                .get("clickTimes")
                .and_then(|v| v.as_array())
                .and_then(|times| rapid_click_run(times.iter().filter_map(|t| t.as_i64())));
            if let Some(data) = report.data.as_object_mut() {
                data.insert("confirmed_run".into(), run.into());
            }
        }
        _ => {}
    }
    let id = guard::log_security_event(
        state.store.as_ref(),
        report.kind,
        report.data,
        &client,
        state.now(),
    )
    .await?;
    Ok((StatusCode::ACCEPTED, Json(ReportAccepted { id })))
}

/// POST /v1/security/viewport — Developer-tools window heuristic.
#[utoipa::path(
    post,
    path = "/v1/security/viewport",
    request_body = Viewport,
    responses(
        (status = 200, description = "Verdict", body = ViewportVerdict),
    ),
    tag = "public"
)]
pub async fn report_viewport(
    State(state): State<AppState>,
    Client(client): Client,
    body: Result<Json<Viewport>, JsonRejection>,
) -> Result<Json<ViewportVerdict>, AppError> {
    let viewport = extract_json(body)?;
    if !viewport.devtools_suspected() {
        return Ok(Json(ViewportVerdict {
            devtools_suspected: false,
            redirect: None,
        }));
    }
    guard::record_security_event(
        state.store.as_ref(),
        SecurityEventKind::DevToolsDetected,
        serde_json::json!({
            "outerWidth": viewport.outer_width,
            "innerWidth": viewport.inner_width,
            "outerHeight": viewport.outer_height,
            "innerHeight": viewport.inner_height,
        }),
        &client,
        state.now(),
    )
    .await;
    Ok(Json(ViewportVerdict {
        devtools_suspected: true,
        redirect: Some("/".to_string()),
    }))
}

/// GET /v1/admin/security/logs — Newest security log entries.
#[utoipa::path(
    get,
    path = "/v1/admin/security/logs",
    params(LogQuery),
    responses(
        (status = 200, description = "Log entries, newest first", body = Vec<SecurityLogRecord>),
    ),
    tag = "admin"
)]
pub async fn list_logs(
    State(state): State<AppState>,
    _admin: Admin,
    query: Result<Query<LogQuery>, QueryRejection>,
) -> Result<Json<Vec<SecurityLogRecord>>, AppError> {
    let query = extract_query(query)?;
    let logs = recent_security_logs(
        state.store.as_ref(),
        query.limit.unwrap_or(DEFAULT_LOG_LIMIT),
    )
    .await?;
    Ok(Json(logs))
}
