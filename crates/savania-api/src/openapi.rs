//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI document,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "SAVANIA Back-Office API",
        version = "0.1.0",
        description = "Public contact intake, administrator sessions, contact management, live dashboard, CSV export and advisory security reporting for the SAVANIA leisure venue.",
        license(name = "AGPL-3.0-or-later")
    ),
    paths(
        // Public
        crate::routes::intake::submit_contact,
        crate::routes::security::report_event,
        crate::routes::security::report_viewport,
        // Session
        crate::routes::session::login,
        crate::routes::session::logout,
        crate::routes::session::password_reset,
        // Setup
        crate::routes::session::setup_status,
        crate::routes::session::setup_admin,
        // Admin
        crate::routes::session::me,
        crate::routes::contacts::list_contacts,
        crate::routes::contacts::get_contact,
        crate::routes::contacts::update_status,
        crate::routes::contacts::delete_contact,
        crate::routes::contacts::export,
        crate::routes::contacts::search_all,
        crate::routes::dashboard::stats,
        crate::routes::dashboard::activity,
        crate::routes::dashboard::live,
        crate::routes::dashboard::stats_fragment,
        crate::routes::dashboard::contacts_fragment,
        crate::routes::dashboard::activity_fragment,
        crate::routes::security::list_logs,
    ),
    components(schemas(
        // Domain records
        savania_core::Contact,
        savania_core::ContactRecord,
        savania_core::ContactStatus,
        savania_core::Priority,
        savania_core::ServiceCategory,
        savania_core::Reservation,
        savania_core::ReservationRecord,
        savania_core::ReservationStatus,
        savania_core::AdminAccount,
        savania_core::SecurityEventKind,
        savania_core::SecurityLogEntry,
        // Back-office views
        savania_backoffice::ContactSubmission,
        savania_backoffice::LoginRequest,
        savania_backoffice::SetupRequest,
        savania_backoffice::AdminPrincipal,
        savania_backoffice::ContactFilters,
        savania_backoffice::ContactPage,
        savania_backoffice::DashboardStats,
        savania_backoffice::RecentActivity,
        savania_backoffice::SearchResults,
        savania_backoffice::LiveUpdate,
        savania_backoffice::live::ContactNotification,
        savania_backoffice::GuardFinding,
        savania_backoffice::guard::Viewport,
        savania_backoffice::guard::SecurityLogRecord,
        // Error types
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        // Request and response DTOs
        crate::routes::intake::SubmissionAccepted,
        crate::routes::security::SecurityReport,
        crate::routes::security::ReportAccepted,
        crate::routes::security::ViewportVerdict,
        crate::routes::session::LoginResponse,
        crate::routes::session::PasswordResetRequest,
        crate::routes::session::Notice,
        crate::routes::session::SetupStatus,
        crate::routes::session::AdminCreated,
        crate::routes::contacts::StatusChange,
        crate::middleware::metrics::MetricsSnapshot,
    )),
    tags(
        (name = "public", description = "Public site: contact form and advisory security reports"),
        (name = "session", description = "Administrator sign-in, sign-out and password reset"),
        (name = "setup", description = "One-time creation of the first administrator"),
        (name = "admin", description = "Back-office behind the identity gate"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json — Return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
