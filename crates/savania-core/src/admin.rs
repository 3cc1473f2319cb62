//! # Admin Accounts
//!
//! An admin document in the `admins` collection, keyed by the identity
//! service's user id, is what makes a signed-in user privileged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Collection holding admin documents.
pub const COLLECTION: &str = "admins";

/// Role given to the account created by the setup flow.
pub const ROLE_SUPERADMIN: &str = "superadmin";

/// Permission granting every back-office action.
pub const PERMISSION_ALL: &str = "all";

/// Persisted field names, for building queries.
pub mod field {
    pub const ACTIVE: &str = "active";
    pub const LAST_LOGIN: &str = "last_login";
}

/// A privileged back-office account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AdminAccount {
    pub email: String,
    pub role: String,
    pub active: bool,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
}

impl AdminAccount {
    /// The account written by the one-time setup flow.
    pub fn superadmin(email: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            email: email.into(),
            role: ROLE_SUPERADMIN.to_string(),
            active: true,
            permissions: vec![PERMISSION_ALL.to_string()],
            created_at: Some(now),
            last_login: None,
        }
    }

    /// Whether the account holds `permission` (or the catch-all).
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions
            .iter()
            .any(|p| p == PERMISSION_ALL || p == permission)
    }
}
