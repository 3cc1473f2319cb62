//! # Identity Gate
//!
//! Runs in front of every admin operation:
//!
//! 1. Resolve the bearer token with the identity service. No token, an
//!    unknown token, or an identity-service failure is [`GateError::NoSession`].
//! 2. Read `admins/{uid}`. An absent document, `active == false`, an
//!    undecodable document, or a failed read is [`GateError::NotPrivileged`],
//!    and the session is signed out before rejecting.
//!
//! Rejections are final; the caller redirects to [`GateError::redirect`].

use savania_core::admin::COLLECTION;
use savania_core::{AdminAccount, UserId};
use savania_store::{DocumentStore, IdentityService};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::GateError;

/// An authenticated, active administrator.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AdminPrincipal {
    #[schema(value_type = String)]
    pub uid: UserId,
    pub email: String,
    pub account: AdminAccount,
}

/// Authorize the session named by `token`.
pub async fn authorize(
    identity: &dyn IdentityService,
    store: &dyn DocumentStore,
    token: Option<&str>,
) -> Result<AdminPrincipal, GateError> {
    let Some(token) = token.filter(|t| !t.is_empty()) else {
        return Err(GateError::NoSession);
    };

    let user = match identity.current_user(token).await {
        Ok(Some(user)) => user,
        Ok(None) => return Err(GateError::NoSession),
        Err(e) => {
            tracing::warn!(error = %e, "session lookup failed");
            return Err(GateError::NoSession);
        }
    };

    let account = match store.get(COLLECTION, user.uid.as_str()).await {
        Ok(Some(doc)) => match doc.decode::<AdminAccount>() {
            Ok(account) if account.active => Some(account),
            Ok(_) => {
                tracing::info!(uid = %user.uid, "inactive admin account");
                None
            }
            Err(e) => {
                tracing::warn!(uid = %user.uid, error = %e, "malformed admin document");
                None
            }
        },
        Ok(None) => {
            tracing::info!(uid = %user.uid, "signed-in user has no admin document");
            None
        }
        Err(e) => {
            tracing::error!(uid = %user.uid, error = %e, "admin lookup failed");
            None
        }
    };

    match account {
        Some(account) => Ok(AdminPrincipal {
            uid: user.uid,
            email: user.email,
            account,
        }),
        None => {
            if let Err(e) = identity.sign_out(token).await {
                tracing::warn!(error = %e, "sign-out after gate rejection failed");
            }
            Err(GateError::NotPrivileged)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use savania_store::{document, MemoryIdentity, MemoryStore};

    async fn signed_in(identity: &MemoryIdentity) -> (String, UserId) {
        identity.create_user("admin@savania.tg", "secret123").await.unwrap();
        let session = identity.sign_in("admin@savania.tg", "secret123").await.unwrap();
        (session.token.as_str().to_string(), session.user.uid)
    }

    async fn put_admin(store: &MemoryStore, uid: &UserId, active: bool) {
        let mut account = AdminAccount::superadmin("admin@savania.tg", Utc::now());
        account.active = active;
        store
            .set(COLLECTION, uid.as_str(), document::to_body(&account).unwrap())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn missing_or_unknown_token_is_no_session() {
        let identity = MemoryIdentity::new();
        let store = MemoryStore::new();
        assert_eq!(
            authorize(&identity, &store, None).await.unwrap_err(),
            GateError::NoSession
        );
        assert_eq!(
            authorize(&identity, &store, Some("bogus")).await.unwrap_err(),
            GateError::NoSession
        );
    }

    #[tokio::test]
    async fn active_admin_is_authorized() {
        let identity = MemoryIdentity::new();
        let store = MemoryStore::new();
        let (token, uid) = signed_in(&identity).await;
        put_admin(&store, &uid, true).await;

        let principal = authorize(&identity, &store, Some(&token)).await.unwrap();
        assert_eq!(principal.uid, uid);
        assert_eq!(principal.account.role, "superadmin");
        assert_eq!(identity.session_count(), 1);
    }

    #[tokio::test]
    async fn non_admin_is_rejected_and_signed_out() {
        let identity = MemoryIdentity::new();
        let store = MemoryStore::new();
        let (token, _) = signed_in(&identity).await;

        let err = authorize(&identity, &store, Some(&token)).await.unwrap_err();
        assert_eq!(err, GateError::NotPrivileged);
        assert_eq!(err.redirect(), "admin-login.html?error=unauthorized");
        assert_eq!(identity.session_count(), 0);
    }

    #[tokio::test]
    async fn inactive_admin_is_rejected() {
        let identity = MemoryIdentity::new();
        let store = MemoryStore::new();
        let (token, uid) = signed_in(&identity).await;
        put_admin(&store, &uid, false).await;
        assert_eq!(
            authorize(&identity, &store, Some(&token)).await.unwrap_err(),
            GateError::NotPrivileged
        );
    }

    #[tokio::test]
    async fn lookup_failure_is_treated_as_unprivileged() {
        let identity = MemoryIdentity::new();
        let store = MemoryStore::new();
        let (token, uid) = signed_in(&identity).await;
        put_admin(&store, &uid, true).await;
        store.set_offline(true);
        assert_eq!(
            authorize(&identity, &store, Some(&token)).await.unwrap_err(),
            GateError::NotPrivileged
        );
        assert_eq!(identity.session_count(), 0);
    }
}
