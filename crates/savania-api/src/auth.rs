//! # Admin Authentication Middleware
//!
//! Every `/v1/admin/*` request passes the identity gate: the bearer token
//! must name a live session whose user has an active admin document.
//! The resolved [`AdminPrincipal`] is injected into the request extensions
//! and handlers take it with the [`Admin`] extractor.
//!
//! Rejections are 401 (no session) or 403 (not an admin) with a `Location`
//! header naming the login page. They are never retried.

use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use savania_backoffice::{authorize, AdminPrincipal, GateError};

use crate::error::AppError;
use crate::extractors::bearer_token;
use crate::state::AppState;

/// The authenticated administrator behind the current request.
#[derive(Debug, Clone)]
pub struct Admin(pub AdminPrincipal);

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Admin {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AdminPrincipal>()
            .cloned()
            .map(Admin)
            .ok_or_else(|| GateError::NoSession.into())
    }
}

/// Identity gate middleware.
pub async fn admin_gate(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let token = bearer_token(request.headers()).map(str::to_string);
    match authorize(
        state.identity.as_ref(),
        state.store.as_ref(),
        token.as_deref(),
    )
    .await
    {
        Ok(principal) => {
            tracing::debug!(uid = %principal.uid, "admin request authorized");
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Err(err) => {
            tracing::warn!(reason = %err, path = %request.uri().path(), "admin request rejected");
            AppError::from(err).into_response()
        }
    }
}
