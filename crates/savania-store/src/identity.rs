//! # Identity Service
//!
//! Accounts, sign-in and sessions are owned by a hosted identity service.
//! The back-office only asks it three questions: who holds this session,
//! can this email/password pair sign in, and please end this session.
//!
//! [`MemoryIdentity`] keeps salted SHA-256 password digests, compares them
//! in constant time, and throttles an account after repeated failed
//! sign-ins the way the hosted service does.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::RngCore;
use savania_core::UserId;
use serde::Serialize;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::IdentityError;

/// Minimum password length accepted by the identity service.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Consecutive failed sign-ins after which an account is throttled.
pub const MAX_FAILED_SIGN_INS: u32 = 5;

/// A signed-up user as the identity service reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRecord {
    pub uid: UserId,
    pub email: String,
}

/// Opaque bearer token naming a session.
///
/// Zeroized on drop. `Debug` is redacted so a token never reaches a log.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionToken([REDACTED])")
    }
}

/// Result of a successful sign-in.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: SessionToken,
    pub user: UserRecord,
}

/// Hosted identity service.
#[async_trait]
pub trait IdentityService: Send + Sync + 'static {
    /// Register a new email/password account.
    async fn create_user(&self, email: &str, password: &str) -> Result<UserRecord, IdentityError>;

    /// Open a session for an email/password pair.
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, IdentityError>;

    /// The user holding `token`, or `None` for an unknown or ended session.
    async fn current_user(&self, token: &str) -> Result<Option<UserRecord>, IdentityError>;

    /// End the session. Ending an unknown session succeeds.
    async fn sign_out(&self, token: &str) -> Result<(), IdentityError>;

    /// Ask the service to email a password-reset link.
    async fn send_password_reset(&self, email: &str) -> Result<(), IdentityError>;
}

struct Account {
    uid: UserId,
    email: String,
    salt: [u8; 16],
    digest: [u8; 32],
    failed_sign_ins: u32,
}

#[derive(Default)]
struct IdentityState {
    /// Keyed by lowercased email.
    accounts: HashMap<String, Account>,
    sessions: HashMap<String, UserId>,
    reset_requests: Vec<String>,
}

/// In-process identity service.
#[derive(Clone, Default)]
pub struct MemoryIdentity {
    state: Arc<Mutex<IdentityState>>,
}

impl std::fmt::Debug for MemoryIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MemoryIdentity")
            .field("accounts", &state.accounts.len())
            .field("sessions", &state.sessions.len())
            .finish()
    }
}

impl MemoryIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emails for which a password reset was requested, oldest first.
    pub fn reset_requests(&self) -> Vec<String> {
        self.state.lock().reset_requests.clone()
    }

    pub fn session_count(&self) -> usize {
        self.state.lock().sessions.len()
    }
}

fn password_digest(salt: &[u8; 16], password: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hasher.finalize().into()
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

fn new_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[async_trait]
impl IdentityService for MemoryIdentity {
    async fn create_user(&self, email: &str, password: &str) -> Result<UserRecord, IdentityError> {
        let email = email.trim();
        if !is_plausible_email(email) {
            return Err(IdentityError::InvalidEmail);
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(IdentityError::WeakPassword);
        }
        let key = email.to_lowercase();
        let mut state = self.state.lock();
        if state.accounts.contains_key(&key) {
            return Err(IdentityError::EmailAlreadyInUse);
        }

        let mut salt = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut salt);
        let uid = UserId::new(uuid::Uuid::new_v4().simple().to_string());
        state.accounts.insert(
            key,
            Account {
                uid: uid.clone(),
                email: email.to_string(),
                salt,
                digest: password_digest(&salt, password),
                failed_sign_ins: 0,
            },
        );
        tracing::info!(uid = %uid, "identity account created");
        Ok(UserRecord {
            uid,
            email: email.to_string(),
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, IdentityError> {
        let email = email.trim();
        if !is_plausible_email(email) {
            return Err(IdentityError::InvalidEmail);
        }
        let mut state = self.state.lock();
        let account = state
            .accounts
            .get_mut(&email.to_lowercase())
            .ok_or(IdentityError::UserNotFound)?;
        if account.failed_sign_ins >= MAX_FAILED_SIGN_INS {
            return Err(IdentityError::TooManyRequests);
        }
        let candidate = password_digest(&account.salt, password);
        if !bool::from(candidate.ct_eq(&account.digest)) {
            account.failed_sign_ins += 1;
            tracing::warn!(uid = %account.uid, attempts = account.failed_sign_ins, "failed sign-in");
            return Err(IdentityError::WrongPassword);
        }
        account.failed_sign_ins = 0;
        let user = UserRecord {
            uid: account.uid.clone(),
            email: account.email.clone(),
        };
        let token = new_token();
        state.sessions.insert(token.clone(), user.uid.clone());
        Ok(Session {
            token: SessionToken::new(token),
            user,
        })
    }

    async fn current_user(&self, token: &str) -> Result<Option<UserRecord>, IdentityError> {
        let state = self.state.lock();
        let Some(uid) = state.sessions.get(token) else {
            return Ok(None);
        };
        Ok(state
            .accounts
            .values()
            .find(|a| &a.uid == uid)
            .map(|a| UserRecord {
                uid: a.uid.clone(),
                email: a.email.clone(),
            }))
    }

    async fn sign_out(&self, token: &str) -> Result<(), IdentityError> {
        self.state.lock().sessions.remove(token);
        Ok(())
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), IdentityError> {
        let email = email.trim();
        if !is_plausible_email(email) {
            return Err(IdentityError::InvalidEmail);
        }
        let mut state = self.state.lock();
        if !state.accounts.contains_key(&email.to_lowercase()) {
            return Err(IdentityError::UserNotFound);
        }
        state.reset_requests.push(email.to_string());
        Ok(())
    }
}
