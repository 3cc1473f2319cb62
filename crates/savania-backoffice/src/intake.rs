//! # Contact Intake
//!
//! Accepts a submission from the public contact form and appends it to the
//! `contacts` collection as a `nouveau` record.
//!
//! Order of checks: the advisory guard first (a match is logged and
//! blocks), then field validation (every failing field is reported). No
//! document is written unless both pass.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use savania_core::contact::COLLECTION;
use savania_core::{
    Contact, ContactId, ContactStatus, FieldErrors, SecurityEventKind, ServiceCategory,
};
use savania_store::{document, DocumentStore};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::IntakeError;
use crate::guard::{self, ClientInfo};

const REQUIRED: &str = "Ce champ est obligatoire";

fn email_pattern() -> Option<&'static Regex> {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL
        .get_or_init(|| guard::compile_pattern(r"^[^\s@]+@[^\s@]+\.[^\s@]+$"))
        .as_ref()
}

fn phone_pattern() -> Option<&'static Regex> {
    static PHONE: OnceLock<Option<Regex>> = OnceLock::new();
    PHONE
        .get_or_init(|| guard::compile_pattern(r"^\+?[0-9\s\-()]{10,}$"))
        .as_ref()
}

/// `local@domain.tld` with no whitespace and a single `@` per part.
pub fn is_valid_email(email: &str) -> bool {
    email_pattern().is_some_and(|re| re.is_match(email))
}

/// Optional leading `+`, then at least ten digits, spaces, dashes or
/// parentheses.
pub fn is_valid_phone(phone: &str) -> bool {
    phone_pattern().is_some_and(|re| re.is_match(phone))
}

/// A public contact-form submission.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ContactSubmission {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub newsletter: bool,
}

impl ContactSubmission {
    /// Field names and values as the form labels them, in form order.
    pub fn fields(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("name", self.name.as_str()),
            ("email", self.email.as_str()),
            ("phone", self.phone.as_deref().unwrap_or("")),
            ("service", self.service.as_str()),
            ("subject", self.subject.as_str()),
            ("message", self.message.as_str()),
        ]
    }

    /// Check every field and return the parsed service.
    pub fn validate(&self) -> Result<ServiceCategory, FieldErrors> {
        let mut errors = FieldErrors::new();

        if self.name.trim().is_empty() {
            errors.push("name", REQUIRED);
        }

        let email = self.email.trim();
        if email.is_empty() {
            errors.push("email", REQUIRED);
        } else if !is_valid_email(email) {
            errors.push("email", "Veuillez entrer une adresse email valide");
        }

        if let Some(phone) = self.phone.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
            if !is_valid_phone(phone) {
                errors.push("phone", "Veuillez entrer un numéro de téléphone valide");
            }
        }

        let service = match self.service.trim() {
            "" => {
                errors.push("service", REQUIRED);
                None
            }
            raw => match raw.parse::<ServiceCategory>() {
                Ok(service) => Some(service),
                Err(_) => {
                    errors.push("service", "Veuillez choisir un service proposé");
                    None
                }
            },
        };

        if self.subject.trim().is_empty() {
            errors.push("subject", REQUIRED);
        }
        if self.message.trim().is_empty() {
            errors.push("message", REQUIRED);
        }

        match service {
            Some(service) if errors.is_empty() => Ok(service),
            _ => Err(errors),
        }
    }

    /// The record written for a valid submission.
    pub fn into_contact(
        self,
        service: ServiceCategory,
        client: &ClientInfo,
        now: DateTime<Utc>,
    ) -> Contact {
        Contact {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: self
                .phone
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty()),
            service,
            subject: self.subject.trim().to_string(),
            message: self.message.trim().to_string(),
            submitted_at: now,
            status: ContactStatus::Nouveau,
            priority: service.priority(),
            source: "site_web".to_string(),
            newsletter: self.newsletter,
            read: false,
            user_agent: client.user_agent.clone(),
            ip_address: client.ip.clone(),
            last_followed_up: None,
        }
    }
}

/// Validate, guard and store a submission. Returns the new contact's id.
pub async fn submit(
    store: &dyn DocumentStore,
    submission: ContactSubmission,
    client: &ClientInfo,
    now: DateTime<Utc>,
) -> Result<ContactId, IntakeError> {
    if let Some(finding) = guard::scan_fields(submission.fields()) {
        guard::record_security_event(
            store,
            SecurityEventKind::MaliciousInputBlocked,
            serde_json::json!({"field": finding.field, "value": finding.excerpt}),
            client,
            now,
        )
        .await;
        tracing::warn!(field = %finding.field, "contact submission blocked by input guard");
        return Err(IntakeError::Blocked(finding));
    }

    let service = submission.validate().map_err(IntakeError::Invalid)?;

    if client.user_agent.as_deref().map_or(true, str::is_empty) {
        guard::record_security_event(
            store,
            SecurityEventKind::BotDetected,
            serde_json::json!({"type": "no_user_agent"}),
            client,
            now,
        )
        .await;
    }

    let contact = submission.into_contact(service, client, now);
    let id = store.add(COLLECTION, document::to_body(&contact)?).await?;
    tracing::info!(
        contact = %id,
        service = %service,
        priority = contact.priority.as_str(),
        "contact submitted"
    );
    Ok(ContactId::new(id))
}
