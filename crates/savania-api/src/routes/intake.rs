//! # Contact Intake Route
//!
//! `POST /v1/contacts` — the public contact form.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use savania_backoffice::{intake, ContactSubmission};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::{extract_json, Client};
use crate::state::AppState;

/// Confirmation shown by the contact form.
pub const ACCEPTED_MESSAGE: &str =
    "Merci ! Votre message a été envoyé avec succès. Nous vous contacterons bientôt.";

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubmissionAccepted {
    pub id: String,
    pub message: String,
}

pub fn public_router() -> Router<AppState> {
    Router::new().route("/v1/contacts", post(submit_contact))
}

/// POST /v1/contacts — Submit the public contact form.
#[utoipa::path(
    post,
    path = "/v1/contacts",
    request_body = ContactSubmission,
    responses(
        (status = 201, description = "Contact recorded", body = SubmissionAccepted),
        (status = 400, description = "Malformed body or blocked input", body = crate::error::ErrorBody),
        (status = 422, description = "Field validation failed", body = crate::error::ErrorBody),
        (status = 503, description = "Store unavailable", body = crate::error::ErrorBody),
    ),
    tag = "public"
)]
pub async fn submit_contact(
    State(state): State<AppState>,
    Client(client): Client,
    body: Result<Json<ContactSubmission>, JsonRejection>,
) -> Result<(StatusCode, Json<SubmissionAccepted>), AppError> {
    let submission = extract_json(body)?;
    let id = intake::submit(state.store.as_ref(), submission, &client, state.now()).await?;
    Ok((
        StatusCode::CREATED,
        Json(SubmissionAccepted {
            id: id.as_str().to_string(),
            message: ACCEPTED_MESSAGE.to_string(),
        }),
    ))
}
