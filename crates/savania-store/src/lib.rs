//! # savania-store — External Store and Identity Service Contracts
//!
//! The back-office keeps no data of its own. Contacts, reservations, admin
//! accounts and security logs live in a hosted document database; sign-in
//! and sessions live in a hosted identity service. This crate defines the
//! two contracts the rest of the workspace programs against:
//!
//! - [`DocumentStore`]: collection queries, single-document reads and
//!   writes, and live subscriptions.
//! - [`IdentityService`]: account creation, sign-in, session lookup,
//!   sign-out and password reset.
//!
//! [`MemoryStore`] and [`MemoryIdentity`] implement both contracts in
//! process. They back the test suites, local development, and the CLI's
//! offline tooling (a store snapshot loaded from a JSON file).
//!
//! ## Crate Policy
//!
//! - Depends only on `savania-core` internally.
//! - Locks are `parking_lot` and are never held across `.await`.
//! - Writes are last-write-wins; no transactions.

pub mod document;
pub mod error;
pub mod identity;
pub mod memory;
pub mod query;
pub mod subscription;

pub use document::Document;
pub use error::{IdentityError, StoreError};
pub use identity::{IdentityService, MemoryIdentity, Session, SessionToken, UserRecord};
pub use memory::MemoryStore;
pub use query::{Direction, Filter, FilterOp, Query};
pub use subscription::{ChangeKind, Disposer, DocumentChange, Snapshot, Subscription};

use async_trait::async_trait;
use serde_json::{Map, Value};

/// Hosted document database.
///
/// Every operation is a single request. Nothing is retried and nothing is
/// cached between calls.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Documents matching `query`, filtered, ordered and limited.
    async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError>;

    /// Number of documents matching `query`.
    async fn count(&self, query: &Query) -> Result<usize, StoreError> {
        Ok(self.query(query).await?.len())
    }

    /// Single document by id; `None` when absent.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Create a document under a generated id and return the id.
    async fn add(&self, collection: &str, data: Value) -> Result<String, StoreError>;

    /// Create or replace the document `id`.
    async fn set(&self, collection: &str, id: &str, data: Value) -> Result<(), StoreError>;

    /// Merge top-level fields of `patch` into an existing document. Fields
    /// not named in `patch` are left untouched.
    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Map<String, Value>,
    ) -> Result<(), StoreError>;

    /// Remove the document `id`. Removing an absent document succeeds.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    /// Listen to the result of `query`. The first snapshot is delivered
    /// immediately.
    async fn subscribe(&self, query: Query) -> Result<Subscription, StoreError>;
}
