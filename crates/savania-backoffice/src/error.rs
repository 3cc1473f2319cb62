//! # Back-Office Errors
//!
//! One enum per component boundary. The HTTP layer maps each variant to a
//! status code; nothing here decides presentation.

use savania_core::{FieldErrors, SavaniaError};
use savania_store::{IdentityError, StoreError};
use thiserror::Error;

use crate::guard::GuardFinding;

/// Login page, relative to the admin pages.
pub const LOGIN_PAGE: &str = "admin-login.html";

/// Login page with the "not an admin" banner.
pub const LOGIN_PAGE_UNAUTHORIZED: &str = "admin-login.html?error=unauthorized";

/// Rejection by the identity gate. Never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    /// No session, or the token names no session.
    #[error("no active session")]
    NoSession,

    /// Signed in, but not an active admin (or the admin lookup failed).
    /// The session has been signed out.
    #[error("account is not an active administrator")]
    NotPrivileged,
}

impl GateError {
    /// Where the client is sent.
    pub fn redirect(&self) -> &'static str {
        match self {
            Self::NoSession => LOGIN_PAGE,
            Self::NotPrivileged => LOGIN_PAGE_UNAUTHORIZED,
        }
    }
}

/// Rejection of a public contact submission.
#[derive(Error, Debug)]
pub enum IntakeError {
    /// One or more fields failed validation. Nothing was written.
    #[error("invalid submission: {0}")]
    Invalid(FieldErrors),

    /// The advisory guard matched a known-bad pattern. Nothing was written.
    #[error("suspicious input in field '{}'", .0.field)]
    Blocked(GuardFinding),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failure of a CSV export. No partial file is ever produced.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("invalid export range: {from} is after {to}")]
    InvalidRange {
        from: chrono::NaiveDate,
        to: chrono::NaiveDate,
    },

    /// A bound has no representable day window.
    #[error(transparent)]
    Date(#[from] SavaniaError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failure of any other back-office operation.
#[derive(Error, Debug)]
pub enum BackofficeError {
    #[error("validation failed: {0}")]
    Invalid(FieldErrors),

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    /// Signed in successfully but the account is not an active admin.
    #[error("account is not an administrator")]
    NotAdmin,

    /// The one-time admin setup has already been completed.
    #[error("an administrator account already exists")]
    SetupClosed,

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Core(#[from] SavaniaError),
}
