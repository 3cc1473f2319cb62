//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps back-office, store and identity errors to HTTP status codes with a
//! JSON body `{"error": {"code", "message", "details?"}}`. Internal error
//! details never reach the client.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use savania_backoffice::{BackofficeError, ExportError, GateError, GuardFinding, IntakeError};
use savania_core::FieldErrors;
use savania_store::{IdentityError, StoreError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g. "NOT_FOUND", "VALIDATION_ERROR").
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Field errors, redirect target, or identity code. Absent on 5xx.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// 404.
    #[error("not found: {0}")]
    NotFound(String),

    /// One or more fields failed validation (422).
    #[error("validation error: {0}")]
    Validation(FieldErrors),

    /// Malformed request (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The advisory guard matched (400).
    #[error("input blocked in field '{}'", .0.field)]
    Blocked(GuardFinding),

    /// No usable session (401). `redirect` is sent as `Location`.
    #[error("unauthorized: {message}")]
    Unauthorized {
        message: String,
        redirect: Option<&'static str>,
    },

    /// Authenticated but not allowed (403).
    #[error("forbidden: {message}")]
    Forbidden {
        message: String,
        redirect: Option<&'static str>,
    },

    /// Identity-service rejection with its stable code (400/401/409).
    #[error("identity: {0}")]
    Identity(IdentityError),

    /// Conflict with current state (409).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Too many requests (429).
    #[error("rate limit exceeded")]
    RateLimited,

    /// The document store or identity service could not be reached (503).
    /// Transient; the client may try again.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// 500. Logged, never returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status and machine-readable code.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Blocked(_) => (StatusCode::BAD_REQUEST, "INPUT_BLOCKED"),
            Self::Unauthorized { .. } => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Forbidden { .. } => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::Identity(e) => match e {
                IdentityError::EmailAlreadyInUse => (StatusCode::CONFLICT, "IDENTITY_ERROR"),
                IdentityError::InvalidEmail | IdentityError::WeakPassword => {
                    (StatusCode::BAD_REQUEST, "IDENTITY_ERROR")
                }
                IdentityError::UserNotFound | IdentityError::WrongPassword => {
                    (StatusCode::UNAUTHORIZED, "IDENTITY_ERROR")
                }
                IdentityError::TooManyRequests => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED"),
                IdentityError::Unavailable(_) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE")
                }
            },
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED"),
            Self::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    fn redirect(&self) -> Option<&'static str> {
        match self {
            Self::Unauthorized { redirect, .. } | Self::Forbidden { redirect, .. } => *redirect,
            _ => None,
        }
    }

    fn message_and_details(&self) -> (String, Option<serde_json::Value>) {
        match self {
            Self::Validation(errors) => (
                "validation failed".to_string(),
                serde_json::to_value(errors).ok(),
            ),
            Self::Blocked(finding) => (
                "Contenu suspect détecté".to_string(),
                Some(serde_json::json!({ "field": finding.field })),
            ),
            Self::Unauthorized { message, redirect } | Self::Forbidden { message, redirect } => (
                message.clone(),
                redirect.map(|r| serde_json::json!({ "redirect": r })),
            ),
            Self::Identity(e) => (
                e.user_message().to_string(),
                Some(serde_json::json!({ "identity_code": e.code() })),
            ),
            Self::Unavailable(_) => ("Service temporairement indisponible".to_string(), None),
            Self::Internal(_) => ("An internal error occurred".to_string(), None),
            other => (other.to_string(), None),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        match &self {
            Self::Internal(_) => tracing::error!(error = %self, "internal server error"),
            Self::Unavailable(_) => tracing::warn!(error = %self, "dependency unavailable"),
            _ => {}
        }

        let (message, details) = self.message_and_details();
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details,
            },
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(location) = self.redirect() {
            response
                .headers_mut()
                .insert(header::LOCATION, HeaderValue::from_static(location));
        }
        response
    }
}

impl From<GateError> for AppError {
    fn from(err: GateError) -> Self {
        let redirect = Some(err.redirect());
        match err {
            GateError::NoSession => Self::Unauthorized {
                message: err.to_string(),
                redirect,
            },
            GateError::NotPrivileged => Self::Forbidden {
                message: err.to_string(),
                redirect,
            },
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { collection, id } => Self::NotFound(format!("{collection}/{id}")),
            StoreError::Unavailable(msg) => Self::Unavailable(msg),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<IdentityError> for AppError {
    fn from(err: IdentityError) -> Self {
        Self::Identity(err)
    }
}

impl From<IntakeError> for AppError {
    fn from(err: IntakeError) -> Self {
        match err {
            IntakeError::Invalid(errors) => Self::Validation(errors),
            IntakeError::Blocked(finding) => Self::Blocked(finding),
            IntakeError::Store(e) => e.into(),
        }
    }
}

impl From<ExportError> for AppError {
    fn from(err: ExportError) -> Self {
        match err {
            ExportError::InvalidRange { .. } | ExportError::Date(_) => {
                Self::BadRequest(err.to_string())
            }
            ExportError::Store(e) => e.into(),
        }
    }
}

impl From<BackofficeError> for AppError {
    fn from(err: BackofficeError) -> Self {
        match err {
            BackofficeError::Invalid(errors) => Self::Validation(errors),
            BackofficeError::NotFound { kind, id } => Self::NotFound(format!("{kind} {id}")),
            BackofficeError::NotAdmin => Self::Forbidden {
                message: "Accès non autorisé. Vous devez être administrateur.".to_string(),
                redirect: None,
            },
            BackofficeError::SetupClosed => Self::Conflict(err.to_string()),
            BackofficeError::Identity(e) => e.into(),
            BackofficeError::Store(e) => e.into(),
            BackofficeError::Core(e) => Self::BadRequest(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn response_parts(err: AppError) -> (StatusCode, Option<String>, ErrorBody) {
        let response = err.into_response();
        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        (status, location, body)
    }

    #[test]
    fn status_codes() {
        let cases = [
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::Validation(FieldErrors::new()), StatusCode::UNPROCESSABLE_ENTITY),
            (AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (AppError::Conflict("x".into()), StatusCode::CONFLICT),
            (AppError::RateLimited, StatusCode::TOO_MANY_REQUESTS),
            (AppError::Unavailable("x".into()), StatusCode::SERVICE_UNAVAILABLE),
            (AppError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (
                AppError::Identity(IdentityError::WrongPassword),
                StatusCode::UNAUTHORIZED,
            ),
            (
                AppError::Identity(IdentityError::TooManyRequests),
                StatusCode::TOO_MANY_REQUESTS,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.status_and_code().0, status, "{err}");
        }
    }

    #[tokio::test]
    async fn gate_rejections_carry_redirects() {
        let (status, location, body) = response_parts(GateError::NoSession.into()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(location.as_deref(), Some("admin-login.html"));
        assert_eq!(body.error.details.unwrap()["redirect"], "admin-login.html");

        let (status, location, _) = response_parts(GateError::NotPrivileged.into()).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(location.as_deref(), Some("admin-login.html?error=unauthorized"));
    }

    #[tokio::test]
    async fn validation_lists_fields() {
        let mut errors = FieldErrors::new();
        errors.push("email", "Veuillez entrer une adresse email valide");
        let (status, _, body) = response_parts(AppError::Validation(errors)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let details = body.error.details.unwrap();
        assert_eq!(details[0]["field"], "email");
    }

    #[tokio::test]
    async fn internal_hides_details() {
        let (status, _, body) = response_parts(AppError::Internal("db password=x".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error.message, "An internal error occurred");
        assert!(body.error.details.is_none());
    }

    #[tokio::test]
    async fn store_outage_is_transient() {
        let err: AppError = StoreError::Unavailable("offline".into()).into();
        let (status, _, body) = response_parts(err).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(!body.error.message.contains("offline"));
    }

    #[tokio::test]
    async fn identity_errors_expose_their_code() {
        let (_, _, body) = response_parts(IdentityError::EmailAlreadyInUse.into()).await;
        assert_eq!(
            body.error.details.unwrap()["identity_code"],
            "auth/email-already-in-use"
        );
    }

    #[test]
    fn export_range_is_bad_request() {
        let d = chrono::NaiveDate::from_ymd_opt(2026, 10, 2).unwrap();
        let err: AppError = ExportError::InvalidRange {
            from: d,
            to: d.pred_opt().unwrap(),
        }
        .into();
        assert_eq!(err.status_and_code().0, StatusCode::BAD_REQUEST);
    }
}
