//! # Error Types — Structured Error Hierarchy
//!
//! Errors shared by every SAVANIA crate. All errors use `thiserror` for
//! derive-based `Display` and `Error` implementations.
//!
//! Form validation is reported field by field ([`FieldErrors`]) so callers
//! can attach each message to the offending input instead of failing on the
//! first problem.

use serde::Serialize;
use thiserror::Error;

/// Top-level error type for the core crate.
#[derive(Error, Debug)]
pub enum SavaniaError {
    /// A value failed a domain rule.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A calendar date could not be parsed.
    #[error("invalid date {value:?}: expected YYYY-MM-DD")]
    InvalidDate {
        /// The rejected input.
        value: String,
    },

    /// A calendar date has no representable day window.
    #[error("date {value} is outside the supported calendar")]
    DateOutOfRange {
        /// The rejected date.
        value: chrono::NaiveDate,
    },

    /// A timezone offset could not be parsed.
    #[error("invalid UTC offset {value:?}: expected +HH:MM, -HH:MM or Z")]
    InvalidOffset {
        /// The rejected input.
        value: String,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A single domain-rule violation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A string did not name any variant of a closed enum.
    #[error("unknown {kind}: {value:?}")]
    UnknownVariant {
        /// Which enum was being parsed ("status", "service", ...).
        kind: &'static str,
        /// The rejected input.
        value: String,
    },

    /// One or more form fields were rejected.
    #[error("{0}")]
    Fields(FieldErrors),
}

/// A message attached to one named input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Ordered collection of per-field messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message for `field`.
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Message recorded for `field`, if any.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    /// `Ok(())` when nothing was recorded, otherwise the collected errors.
    pub fn into_result(self) -> Result<(), ValidationError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::Fields(self))
        }
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for e in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", e.field, e.message)?;
            first = false;
        }
        Ok(())
    }
}
