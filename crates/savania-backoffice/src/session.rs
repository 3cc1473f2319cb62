//! # Admin Sessions and One-Time Setup
//!
//! Login signs in with the identity service and then checks the admin
//! document, so a valid account that is not an active admin never keeps a
//! session. Setup creates the first administrator and is refused once any
//! admin document exists.

use chrono::{DateTime, Utc};
use savania_core::admin::{field, COLLECTION};
use savania_core::{AdminAccount, FieldErrors};
use savania_store::{
    document, DocumentStore, IdentityService, Query, Session, SessionToken, UserRecord,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::error::BackofficeError;
use crate::intake::is_valid_email;

/// Minimum password length on the login form.
pub const LOGIN_MIN_PASSWORD_LEN: usize = 6;

/// Minimum password length for the setup form.
pub const SETUP_MIN_PASSWORD_LEN: usize = 8;

/// Login form.
#[derive(Clone, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        let email = self.email.trim();
        if email.is_empty() {
            errors.push("email", "L'email est requis");
        } else if !is_valid_email(email) {
            errors.push("email", "Format d'email invalide");
        }
        if self.password.is_empty() {
            errors.push("password", "Le mot de passe est requis");
        } else if self.password.chars().count() < LOGIN_MIN_PASSWORD_LEN {
            errors.push(
                "password",
                "Le mot de passe doit contenir au moins 6 caractères",
            );
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Setup form: first administrator account.
#[derive(Clone, Deserialize, ToSchema)]
pub struct SetupRequest {
    pub email: String,
    pub password: String,
    pub confirmation: String,
}

impl std::fmt::Debug for SetupRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SetupRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("confirmation", &"[REDACTED]")
            .finish()
    }
}

impl SetupRequest {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if !is_valid_email(self.email.trim()) {
            errors.push("email", "Format d'email invalide");
        }
        if self.password != self.confirmation {
            errors.push("confirmation", "Les mots de passe ne correspondent pas");
        } else if self.password.chars().count() < SETUP_MIN_PASSWORD_LEN {
            errors.push(
                "password",
                "Le mot de passe doit faire au moins 8 caractères",
            );
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// A signed-in administrator.
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub session: Session,
    pub admin: AdminAccount,
}

/// Sign in and confirm the account is an active admin.
///
/// Non-admins are signed out again before the error is returned. The admin
/// document's `last_login` is refreshed; failing to write it does not fail
/// the login.
pub async fn login(
    identity: &dyn IdentityService,
    store: &dyn DocumentStore,
    request: &LoginRequest,
    now: DateTime<Utc>,
) -> Result<AdminSession, BackofficeError> {
    request.validate().map_err(BackofficeError::Invalid)?;
    let session = identity
        .sign_in(request.email.trim(), &request.password)
        .await?;
    let uid = session.user.uid.clone();

    let admin = match store.get(COLLECTION, uid.as_str()).await {
        Ok(Some(doc)) => doc.decode::<AdminAccount>().ok().filter(|a| a.active),
        Ok(None) => None,
        Err(e) => {
            tracing::error!(uid = %uid, error = %e, "admin lookup failed during login");
            None
        }
    };
    let Some(mut admin) = admin else {
        identity.sign_out(session.token.as_str()).await?;
        tracing::warn!(uid = %uid, "login refused: not an active admin");
        return Err(BackofficeError::NotAdmin);
    };

    let mut patch = Map::new();
    patch.insert(field::LAST_LOGIN.into(), savania_store::query::timestamp(now));
    if let Err(e) = store.update(COLLECTION, uid.as_str(), patch).await {
        tracing::warn!(uid = %uid, error = %e, "failed to record last login");
    } else {
        admin.last_login = Some(now);
    }
    tracing::info!(uid = %uid, "admin signed in");
    Ok(AdminSession { session, admin })
}

/// End a session.
pub async fn logout(identity: &dyn IdentityService, token: &SessionToken) -> Result<(), BackofficeError> {
    identity.sign_out(token.as_str()).await?;
    Ok(())
}

/// Ask the identity service to send a password-reset email.
pub async fn request_password_reset(
    identity: &dyn IdentityService,
    email: &str,
) -> Result<(), BackofficeError> {
    let email = email.trim();
    if !is_valid_email(email) {
        let mut errors = FieldErrors::new();
        errors.push("email", "Format d'email invalide");
        return Err(BackofficeError::Invalid(errors));
    }
    identity.send_password_reset(email).await?;
    Ok(())
}

/// Whether any admin document exists.
pub async fn setup_completed(store: &dyn DocumentStore) -> Result<bool, BackofficeError> {
    let any = store.query(&Query::collection(COLLECTION).limit(1)).await?;
    Ok(!any.is_empty())
}

/// Create the first administrator: an identity account plus a superadmin
/// document keyed by its uid.
pub async fn setup_admin(
    identity: &dyn IdentityService,
    store: &dyn DocumentStore,
    request: &SetupRequest,
    now: DateTime<Utc>,
) -> Result<UserRecord, BackofficeError> {
    request.validate().map_err(BackofficeError::Invalid)?;
    if setup_completed(store).await? {
        return Err(BackofficeError::SetupClosed);
    }
    let user = identity
        .create_user(request.email.trim(), &request.password)
        .await?;
    let account = AdminAccount::superadmin(user.email.clone(), now);
    let body: Value = document::to_body(&account)?;
    store.set(COLLECTION, user.uid.as_str(), body).await?;
    tracing::info!(uid = %user.uid, "superadmin created");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use savania_store::{IdentityError, MemoryIdentity, MemoryStore};

    fn setup_request(password: &str, confirmation: &str) -> SetupRequest {
        SetupRequest {
            email: "admin@savania.tg".into(),
            password: password.into(),
            confirmation: confirmation.into(),
        }
    }

    fn login_request(password: &str) -> LoginRequest {
        LoginRequest {
            email: "admin@savania.tg".into(),
            password: password.into(),
        }
    }

    #[tokio::test]
    async fn setup_then_login() {
        let identity = MemoryIdentity::new();
        let store = MemoryStore::new();
        let now = Utc::now();

        let user = setup_admin(&identity, &store, &setup_request("longpass1", "longpass1"), now)
            .await
            .unwrap();
        let doc = store.get(COLLECTION, user.uid.as_str()).await.unwrap().unwrap();
        let account: AdminAccount = doc.decode().unwrap();
        assert_eq!(account.role, "superadmin");
        assert_eq!(account.permissions, ["all"]);

        let session = login(&identity, &store, &login_request("longpass1"), now)
            .await
            .unwrap();
        assert_eq!(session.admin.last_login, Some(now));
        let stored: AdminAccount = store
            .get(COLLECTION, user.uid.as_str())
            .await
            .unwrap()
            .unwrap()
            .decode()
            .unwrap();
        assert!(stored.last_login.is_some());
    }

    #[tokio::test]
    async fn setup_is_refused_once_an_admin_exists() {
        let identity = MemoryIdentity::new();
        let store = MemoryStore::new();
        setup_admin(&identity, &store, &setup_request("longpass1", "longpass1"), Utc::now())
            .await
            .unwrap();
        let mut second = setup_request("longpass2", "longpass2");
        second.email = "other@savania.tg".into();
        assert!(matches!(
            setup_admin(&identity, &store, &second, Utc::now()).await,
            Err(BackofficeError::SetupClosed)
        ));
    }

    #[test]
    fn setup_validation() {
        let errs = setup_request("longpass1", "longpass2").validate().unwrap_err();
        assert!(errs.get("confirmation").is_some());
        let errs = setup_request("short", "short").validate().unwrap_err();
        assert!(errs.get("password").is_some());
    }

    #[tokio::test]
    async fn non_admin_login_is_signed_out() {
        let identity = MemoryIdentity::new();
        let store = MemoryStore::new();
        identity.create_user("admin@savania.tg", "longpass1").await.unwrap();

        let err = login(&identity, &store, &login_request("longpass1"), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, BackofficeError::NotAdmin));
        assert_eq!(identity.session_count(), 0);
    }

    #[tokio::test]
    async fn login_validates_before_calling_identity() {
        let identity = MemoryIdentity::new();
        let store = MemoryStore::new();
        let err = login(&identity, &store, &login_request("12345"), Utc::now())
            .await
            .unwrap_err();
        match err {
            BackofficeError::Invalid(errs) => assert!(errs.get("password").is_some()),
            other => panic!("unexpected {other:?}"),
        }

        let err = login(&identity, &store, &login_request("123456"), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BackofficeError::Identity(IdentityError::UserNotFound)
        ));
    }

    #[test]
    fn credentials_are_redacted_in_debug() {
        let rendered = format!("{:?}", login_request("hunter22"));
        assert!(!rendered.contains("hunter22"));
    }
}
