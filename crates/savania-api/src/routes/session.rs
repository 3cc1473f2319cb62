//! # Session and Setup Routes
//!
//! Public: login, logout, password reset, setup status, one-time admin
//! setup. Admin: the signed-in administrator's profile.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use savania_backoffice::session::{self, LoginRequest, SetupRequest};
use savania_backoffice::AdminPrincipal;
use savania_store::SessionToken;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::Admin;
use crate::error::AppError;
use crate::extractors::{bearer_token, extract_json, extract_validated_json};
use crate::state::AppState;

/// A new admin session. The token goes in `Authorization: Bearer`.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub uid: String,
    pub email: String,
    pub role: String,
    pub last_login: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for LoginResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginResponse")
            .field("token", &"[REDACTED]")
            .field("uid", &self.uid)
            .field("email", &self.email)
            .field("role", &self.role)
            .finish()
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PasswordResetRequest {
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Notice {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SetupStatus {
    pub completed: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AdminCreated {
    pub uid: String,
    pub email: String,
}

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/v1/session/login", post(login))
        .route("/v1/session/logout", post(logout))
        .route("/v1/session/password-reset", post(password_reset))
        .route("/v1/setup/status", get(setup_status))
        .route("/v1/setup/admin", post(setup_admin))
}

pub fn admin_router() -> Router<AppState> {
    Router::new().route("/v1/admin/me", get(me))
}

/// POST /v1/session/login — Sign in as an administrator.
#[utoipa::path(
    post,
    path = "/v1/session/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = LoginResponse),
        (status = 401, description = "Unknown account or wrong password", body = crate::error::ErrorBody),
        (status = 403, description = "Not an administrator", body = crate::error::ErrorBody),
        (status = 422, description = "Form validation failed", body = crate::error::ErrorBody),
        (status = 429, description = "Too many failed attempts", body = crate::error::ErrorBody),
    ),
    tag = "session"
)]
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AppError> {
    let request = extract_validated_json(body)?;
    let signed_in = session::login(
        state.identity.as_ref(),
        state.store.as_ref(),
        &request,
        state.now(),
    )
    .await?;
    Ok(Json(LoginResponse {
        token: signed_in.session.token.as_str().to_string(),
        uid: signed_in.session.user.uid.as_str().to_string(),
        email: signed_in.session.user.email.clone(),
        role: signed_in.admin.role.clone(),
        last_login: signed_in.admin.last_login,
    }))
}

/// POST /v1/session/logout — End the bearer's session. Idempotent.
#[utoipa::path(
    post,
    path = "/v1/session/logout",
    responses(
        (status = 204, description = "Signed out"),
    ),
    tag = "session"
)]
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    if let Some(token) = bearer_token(&headers) {
        session::logout(state.identity.as_ref(), &SessionToken::new(token)).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}

/// POST /v1/session/password-reset — Send a password-reset email.
#[utoipa::path(
    post,
    path = "/v1/session/password-reset",
    request_body = PasswordResetRequest,
    responses(
        (status = 202, description = "Reset email sent", body = Notice),
        (status = 401, description = "Unknown account", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid email", body = crate::error::ErrorBody),
    ),
    tag = "session"
)]
pub async fn password_reset(
    State(state): State<AppState>,
    body: Result<Json<PasswordResetRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Notice>), AppError> {
    let request = extract_json(body)?;
    session::request_password_reset(state.identity.as_ref(), &request.email).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(Notice {
            message: "Un email de réinitialisation a été envoyé.".to_string(),
        }),
    ))
}

/// GET /v1/setup/status — Whether an administrator already exists.
#[utoipa::path(
    get,
    path = "/v1/setup/status",
    responses(
        (status = 200, description = "Setup state", body = SetupStatus),
    ),
    tag = "setup"
)]
pub async fn setup_status(State(state): State<AppState>) -> Result<Json<SetupStatus>, AppError> {
    let completed = session::setup_completed(state.store.as_ref()).await?;
    Ok(Json(SetupStatus { completed }))
}

/// POST /v1/setup/admin — Create the first administrator.
#[utoipa::path(
    post,
    path = "/v1/setup/admin",
    request_body = SetupRequest,
    responses(
        (status = 201, description = "Administrator created", body = AdminCreated),
        (status = 409, description = "An administrator already exists", body = crate::error::ErrorBody),
        (status = 422, description = "Form validation failed", body = crate::error::ErrorBody),
    ),
    tag = "setup"
)]
pub async fn setup_admin(
    State(state): State<AppState>,
    body: Result<Json<SetupRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AdminCreated>), AppError> {
    let request = extract_validated_json(body)?;
    let user = session::setup_admin(
        state.identity.as_ref(),
        state.store.as_ref(),
        &request,
        state.now(),
    )
    .await?;
    Ok((
        StatusCode::CREATED,
        Json(AdminCreated {
            uid: user.uid.as_str().to_string(),
            email: user.email,
        }),
    ))
}

/// GET /v1/admin/me — The signed-in administrator.
#[utoipa::path(
    get,
    path = "/v1/admin/me",
    responses(
        (status = 200, description = "Current administrator", body = AdminPrincipal),
        (status = 401, description = "No session", body = crate::error::ErrorBody),
    ),
    tag = "admin"
)]
pub async fn me(Admin(principal): Admin) -> Json<AdminPrincipal> {
    Json(principal)
}
