//! # Store and Identity Errors
//!
//! Failures reported by the external collaborators. Callers catch these at
//! the call site, log them, and surface a transient error. Nothing here is
//! retried.

use thiserror::Error;

/// Failure of a document store operation.
#[derive(Error, Debug)]
pub enum StoreError {
    /// `update` targeted a document that does not exist.
    #[error("document {collection}/{id} not found")]
    NotFound { collection: String, id: String },

    /// The store could not be reached.
    #[error("document store unavailable: {0}")]
    Unavailable(String),

    /// A stored document does not have the expected shape.
    #[error("malformed document {collection}/{id}: {source}")]
    Decode {
        collection: String,
        id: String,
        #[source]
        source: serde_json::Error,
    },

    /// A typed value could not be turned into a document body.
    #[error("failed to serialize document: {0}")]
    Serialize(#[source] serde_json::Error),

    /// A write carried something other than a JSON object.
    #[error("document body must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    /// A store snapshot could not be loaded.
    #[error("invalid store snapshot: {0}")]
    InvalidSnapshot(String),
}

/// Failure reported by the identity service.
///
/// Each variant carries a stable machine-readable code, the same strings the
/// login and setup screens map to user-facing messages.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("an account already exists for this email")]
    EmailAlreadyInUse,

    #[error("invalid email address")]
    InvalidEmail,

    #[error("password is too weak")]
    WeakPassword,

    #[error("no account for this email")]
    UserNotFound,

    #[error("wrong password")]
    WrongPassword,

    #[error("too many failed attempts, try again later")]
    TooManyRequests,

    #[error("identity service unavailable: {0}")]
    Unavailable(String),
}

impl IdentityError {
    /// Stable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmailAlreadyInUse => "auth/email-already-in-use",
            Self::InvalidEmail => "auth/invalid-email",
            Self::WeakPassword => "auth/weak-password",
            Self::UserNotFound => "auth/user-not-found",
            Self::WrongPassword => "auth/wrong-password",
            Self::TooManyRequests => "auth/too-many-requests",
            Self::Unavailable(_) => "auth/unavailable",
        }
    }

    /// French message shown on the login screen.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::EmailAlreadyInUse => "Cette adresse email est déjà utilisée.",
            Self::InvalidEmail => "Adresse email invalide.",
            Self::WeakPassword => "Le mot de passe est trop faible.",
            Self::UserNotFound => "Aucun compte trouvé avec cette adresse email.",
            Self::WrongPassword => "Mot de passe incorrect.",
            Self::TooManyRequests => "Trop de tentatives. Veuillez réessayer plus tard.",
            Self::Unavailable(_) => "Erreur de connexion. Veuillez réessayer.",
        }
    }
}
