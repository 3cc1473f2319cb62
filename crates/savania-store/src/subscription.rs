//! # Live Subscriptions
//!
//! A subscription delivers a [`Snapshot`] of a query's result every time
//! that result changes, starting with the current result. Delivery is
//! at-least-once and eventually consistent; consumers recompute from the
//! snapshot rather than applying deltas.
//!
//! Each subscription carries a [`Disposer`]. Dropping the disposer (or the
//! subscription holding it) detaches the listener from the store.

use std::fmt;

use serde::Serialize;
use tokio::sync::mpsc;

use crate::document::Document;

/// How a document's presence in a result changed between two snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentChange {
    pub kind: ChangeKind,
    pub document: Document,
}

/// Result of a subscribed query at one point in time.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Snapshot {
    pub documents: Vec<Document>,
    /// Changes relative to the previous snapshot. On the first snapshot
    /// every document is reported as added.
    pub changes: Vec<DocumentChange>,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Documents that entered the result with this snapshot.
    pub fn added(&self) -> impl Iterator<Item = &Document> {
        self.changes
            .iter()
            .filter(|c| c.kind == ChangeKind::Added)
            .map(|c| &c.document)
    }
}

/// Changes turning `previous` into `current`, matched by document id.
pub fn diff(previous: &[Document], current: &[Document]) -> Vec<DocumentChange> {
    let mut changes = Vec::new();
    for doc in current {
        match previous.iter().find(|p| p.id == doc.id) {
            None => changes.push(DocumentChange {
                kind: ChangeKind::Added,
                document: doc.clone(),
            }),
            Some(old) if old.data != doc.data => changes.push(DocumentChange {
                kind: ChangeKind::Modified,
                document: doc.clone(),
            }),
            Some(_) => {}
        }
    }
    for old in previous {
        if !current.iter().any(|d| d.id == old.id) {
            changes.push(DocumentChange {
                kind: ChangeKind::Removed,
                document: old.clone(),
            });
        }
    }
    changes
}

/// Detaches a listener when dropped or disposed.
pub struct Disposer(Option<Box<dyn FnOnce() + Send + Sync>>);

impl Disposer {
    pub fn new(release: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self(Some(Box::new(release)))
    }

    /// A disposer with nothing to release.
    pub fn noop() -> Self {
        Self(None)
    }

    /// Release now instead of on drop.
    pub fn dispose(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(release) = self.0.take() {
            release();
        }
    }
}

impl Drop for Disposer {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Disposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disposer")
            .field("armed", &self.0.is_some())
            .finish()
    }
}

/// A stream of snapshots plus the handle that ends it.
#[derive(Debug)]
pub struct Subscription {
    snapshots: mpsc::UnboundedReceiver<Snapshot>,
    disposer: Disposer,
}

impl Subscription {
    pub fn new(snapshots: mpsc::UnboundedReceiver<Snapshot>, disposer: Disposer) -> Self {
        Self {
            snapshots,
            disposer,
        }
    }

    /// Wait for the next snapshot. `None` once the store has dropped the
    /// listener.
    pub async fn next(&mut self) -> Option<Snapshot> {
        self.snapshots.recv().await
    }

    /// Split into the receiver and the disposer, so the disposer can be
    /// owned by a resource scope while a task drains the receiver.
    pub fn into_parts(self) -> (mpsc::UnboundedReceiver<Snapshot>, Disposer) {
        (self.snapshots, self.disposer)
    }
}
