//! # savania-api — Axum HTTP Service
//!
//! The HTTP surface of the SAVANIA back-office. Assembles the public
//! routers (contact form, security reports, session, setup) and the admin
//! routers (contacts, dashboard, export, security log) into one
//! application, with shared middleware for the identity gate, rate
//! limiting, metrics and tracing.
//!
//! ## Public Routes
//!
//! - `POST /v1/contacts` — contact form
//! - `POST /v1/security/events`, `POST /v1/security/viewport` — advisory reports
//! - `POST /v1/session/login`, `/logout`, `/password-reset`
//! - `GET /v1/setup/status`, `POST /v1/setup/admin`
//!
//! ## Admin Routes (identity gate)
//!
//! - `/v1/admin/contacts[/:id[/status]]`, `/v1/admin/export/contacts`, `/v1/admin/search`
//! - `/v1/admin/dashboard/{stats,activity,live}`, `/v1/admin/fragments/*`
//! - `/v1/admin/security/logs`, `/v1/admin/me`
//!
//! ## Unauthenticated Infrastructure
//!
//! `/health/liveness`, `/health/readiness`, `/metrics`, `/openapi.json`.
//!
//! ## Middleware Stack (Tower)
//!
//! Cors → Extensions → TraceLayer → Metrics → (RateLimit | AdminGate)
//!
//! Rate limiting applies to public routes only; the admin gate to admin
//! routes only. Both are route layers, so unknown paths answer 404.

pub mod auth;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use std::time::Duration;

use axum::http::{header, HeaderValue, Method};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::get;
use axum::{Extension, Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::metrics::{ApiMetrics, MetricsSnapshot};
use crate::middleware::rate_limit::{RateLimitConfig, RateLimiter};

pub use error::AppError;
pub use state::{AppConfig, AppState};

/// Assemble the full application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let metrics = ApiMetrics::new();
    let limiter = RateLimiter::new(RateLimitConfig {
        max_requests: state.config.rate_limit,
        window: Duration::from_secs(60),
    });
    let cors = cors_layer(state.config.allowed_origin.as_deref());

    let public = Router::new()
        .merge(routes::intake::public_router())
        .merge(routes::security::public_router())
        .merge(routes::session::public_router())
        .route_layer(from_fn(middleware::rate_limit::rate_limit_middleware));

    let admin = Router::new()
        .merge(routes::session::admin_router())
        .merge(routes::contacts::admin_router())
        .merge(routes::dashboard::admin_router())
        .merge(routes::security::admin_router())
        .route_layer(from_fn_with_state(state.clone(), auth::admin_gate));

    let api = Router::new()
        .merge(public)
        .merge(admin)
        .merge(openapi::router())
        .route("/metrics", get(metrics_snapshot))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(metrics))
        .layer(Extension(limiter))
        .with_state(state);

    // Unauthenticated health probes.
    let health = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness));

    let router = Router::new().merge(health).merge(api);
    match cors {
        Some(cors) => router.layer(cors),
        None => router,
    }
}

/// CORS for the public site's origin. An unparsable origin disables CORS.
fn cors_layer(origin: Option<&str>) -> Option<CorsLayer> {
    let origin = origin?;
    match HeaderValue::from_str(origin) {
        Ok(value) => Some(
            CorsLayer::new()
                .allow_origin(value)
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
        ),
        Err(_) => {
            tracing::warn!(origin, "ignoring unparsable CORS origin");
            None
        }
    }
}

/// GET /metrics — Request counters.
async fn metrics_snapshot(Extension(metrics): Extension<ApiMetrics>) -> Json<MetricsSnapshot> {
    Json(metrics.snapshot())
}

/// Liveness probe — always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe — returns 200 when the application is ready to serve.
async fn readiness() -> &'static str {
    "ready"
}
