//! # In-Memory Document Store
//!
//! A process-local [`DocumentStore`] with live subscriptions. Collections
//! are `BTreeMap`s keyed by document id, so unordered queries return
//! documents in id order.
//!
//! Listeners are re-evaluated after every write to their collection and
//! receive a snapshot only when their result actually changed. Listeners
//! whose receiver is gone are pruned on the next write.
//!
//! Lock order is listeners, then collections. Writers take the collections
//! lock alone, release it, then notify.
//!
//! ## Snapshot format
//!
//! [`MemoryStore::from_snapshot`] and [`MemoryStore::snapshot`] use
//! `{"<collection>": {"<id>": { ...document... }}}`.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use tokio::sync::mpsc;

use crate::document::{json_kind, Document};
use crate::error::StoreError;
use crate::query::Query;
use crate::subscription::{diff, Disposer, Snapshot, Subscription};
use crate::DocumentStore;

type Collections = BTreeMap<String, BTreeMap<String, Value>>;

struct Listener {
    query: Query,
    last: Vec<Document>,
    tx: mpsc::UnboundedSender<Snapshot>,
}

#[derive(Default)]
struct Inner {
    collections: RwLock<Collections>,
    listeners: Mutex<HashMap<u64, Listener>>,
    next_listener: AtomicU64,
    offline: AtomicBool,
}

impl Inner {
    fn documents(collections: &Collections, collection: &str) -> Vec<Document> {
        collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, data)| Document::new(collection, id.clone(), data.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn notify(&self, collection: &str) {
        let mut listeners = self.listeners.lock();
        let collections = self.collections.read();
        listeners.retain(|id, listener| {
            if listener.tx.is_closed() {
                tracing::debug!(listener = id, "pruning closed listener");
                return false;
            }
            if listener.query.collection != collection {
                return true;
            }
            let current = listener
                .query
                .evaluate(Self::documents(&collections, collection));
            if current == listener.last {
                return true;
            }
            let changes = diff(&listener.last, &current);
            listener.last = current.clone();
            listener
                .tx
                .send(Snapshot {
                    documents: current,
                    changes,
                })
                .is_ok()
        });
    }
}

/// In-process document store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let listeners = self.listener_count();
        let collections = self.inner.collections.read();
        let sizes: BTreeMap<&str, usize> = collections
            .iter()
            .map(|(name, docs)| (name.as_str(), docs.len()))
            .collect();
        f.debug_struct("MemoryStore")
            .field("collections", &sizes)
            .field("listeners", &listeners)
            .finish()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a store from its JSON snapshot form.
    pub fn from_snapshot(snapshot: Value) -> Result<Self, StoreError> {
        let Value::Object(collections) = snapshot else {
            return Err(StoreError::InvalidSnapshot(format!(
                "top level must be an object of collections, got {}",
                json_kind(&snapshot)
            )));
        };
        let mut loaded = Collections::new();
        for (name, docs) in collections {
            let Value::Object(docs) = docs else {
                return Err(StoreError::InvalidSnapshot(format!(
                    "collection '{name}' must be an object of documents, got {}",
                    json_kind(&docs)
                )));
            };
            let mut entries = BTreeMap::new();
            for (id, body) in docs {
                if !body.is_object() {
                    return Err(StoreError::InvalidSnapshot(format!(
                        "document '{name}/{id}' must be an object, got {}",
                        json_kind(&body)
                    )));
                }
                entries.insert(id, body);
            }
            loaded.insert(name, entries);
        }
        let store = Self::new();
        *store.inner.collections.write() = loaded;
        Ok(store)
    }

    /// Current contents in snapshot form.
    pub fn snapshot(&self) -> Value {
        let collections = self.inner.collections.read();
        let mut out = Map::new();
        for (name, docs) in collections.iter() {
            let docs: Map<String, Value> = docs
                .iter()
                .map(|(id, body)| (id.clone(), body.clone()))
                .collect();
            out.insert(name.clone(), Value::Object(docs));
        }
        Value::Object(out)
    }

    /// Simulate losing the connection: every operation fails with
    /// [`StoreError::Unavailable`] until switched back.
    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of attached listeners, including ones not yet pruned.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().len()
    }

    fn ensure_online(&self) -> Result<(), StoreError> {
        if self.inner.offline.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("in-memory store is offline".into()))
        } else {
            Ok(())
        }
    }

    fn write(
        &self,
        collection: &str,
        f: impl FnOnce(&mut Collections) -> Result<(), StoreError>,
    ) -> Result<(), StoreError> {
        self.ensure_online()?;
        f(&mut self.inner.collections.write())?;
        self.inner.notify(collection);
        Ok(())
    }
}

fn require_object(data: &Value) -> Result<(), StoreError> {
    if data.is_object() {
        Ok(())
    } else {
        Err(StoreError::NotAnObject(json_kind(data)))
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        self.ensure_online()?;
        let collections = self.inner.collections.read();
        Ok(query.evaluate(Inner::documents(&collections, &query.collection)))
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.ensure_online()?;
        let collections = self.inner.collections.read();
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|data| Document::new(collection, id, data.clone())))
    }

    async fn add(&self, collection: &str, data: Value) -> Result<String, StoreError> {
        require_object(&data)?;
        let id = uuid::Uuid::new_v4().simple().to_string();
        let key = id.clone();
        self.write(collection, |c| {
            c.entry(collection.to_string()).or_default().insert(key, data);
            Ok(())
        })?;
        Ok(id)
    }

    async fn set(&self, collection: &str, id: &str, data: Value) -> Result<(), StoreError> {
        require_object(&data)?;
        self.write(collection, |c| {
            c.entry(collection.to_string())
                .or_default()
                .insert(id.to_string(), data);
            Ok(())
        })
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Map<String, Value>,
    ) -> Result<(), StoreError> {
        self.write(collection, |c| {
            let target = c
                .get_mut(collection)
                .and_then(|docs| docs.get_mut(id))
                .and_then(Value::as_object_mut)
                .ok_or_else(|| StoreError::NotFound {
                    collection: collection.to_string(),
                    id: id.to_string(),
                })?;
            for (key, value) in patch {
                target.insert(key, value);
            }
            Ok(())
        })
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.write(collection, |c| {
            if let Some(docs) = c.get_mut(collection) {
                docs.remove(id);
            }
            Ok(())
        })
    }

    async fn subscribe(&self, query: Query) -> Result<Subscription, StoreError> {
        self.ensure_online()?;
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.inner.next_listener.fetch_add(1, Ordering::Relaxed);
        {
            let mut listeners = self.inner.listeners.lock();
            let collections = self.inner.collections.read();
            let current = query.evaluate(Inner::documents(&collections, &query.collection));
            let changes = diff(&[], &current);
            // The receiver is still in hand, so this send cannot fail.
            let _ = tx.send(Snapshot {
                documents: current.clone(),
                changes,
            });
            listeners.insert(
                id,
                Listener {
                    query,
                    last: current,
                    tx,
                },
            );
        }

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let disposer = Disposer::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.listeners.lock().remove(&id);
            }
        });
        Ok(Subscription::new(rx, disposer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Direction;
    use serde_json::json;

    fn seeded() -> MemoryStore {
        MemoryStore::from_snapshot(json!({
            "contacts": {
                "a": {"nom": "Afi", "statut": "nouveau"},
                "b": {"nom": "Kofi", "statut": "traite"}
            }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn crud_round_trip() {
        let store = MemoryStore::new();
        let id = store.add("contacts", json!({"nom": "Ama"})).await.unwrap();
        let doc = store.get("contacts", &id).await.unwrap().unwrap();
        assert_eq!(doc.data["nom"], "Ama");

        let mut patch = Map::new();
        patch.insert("statut".into(), json!("en_cours"));
        store.update("contacts", &id, patch).await.unwrap();
        let doc = store.get("contacts", &id).await.unwrap().unwrap();
        assert_eq!(doc.data, json!({"nom": "Ama", "statut": "en_cours"}));

        store.delete("contacts", &id).await.unwrap();
        assert!(store.get("contacts", &id).await.unwrap().is_none());
        store.delete("contacts", &id).await.unwrap();
    }

    #[tokio::test]
    async fn update_of_missing_document_is_not_found() {
        let store = MemoryStore::new();
        let err = store.update("contacts", "nope", Map::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn writes_must_be_objects() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.add("contacts", json!([1, 2])).await,
            Err(StoreError::NotAnObject("an array"))
        ));
    }

    #[tokio::test]
    async fn offline_store_fails_every_operation() {
        let store = seeded();
        store.set_offline(true);
        assert!(matches!(
            store.query(&Query::collection("contacts")).await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(store.get("contacts", "a").await.is_err());
        assert!(store.subscribe(Query::collection("contacts")).await.is_err());
        store.set_offline(false);
        assert_eq!(store.count(&Query::collection("contacts")).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn subscription_delivers_initial_then_changed_results() {
        let store = seeded();
        let mut sub = store
            .subscribe(Query::collection("contacts").where_eq("statut", "nouveau"))
            .await
            .unwrap();

        let first = sub.next().await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first.added().count(), 1);

        // A write outside the result does not produce a snapshot.
        store
            .set("contacts", "b", json!({"nom": "Kofi", "statut": "annule"}))
            .await
            .unwrap();
        store
            .add("contacts", json!({"nom": "Yao", "statut": "nouveau"}))
            .await
            .unwrap();

        let second = sub.next().await.unwrap();
        assert_eq!(second.len(), 2);
        let added: Vec<_> = second.added().map(|d| d.data["nom"].clone()).collect();
        assert_eq!(added, [json!("Yao")]);

        let mut patch = Map::new();
        patch.insert("statut".into(), json!("traite"));
        store.update("contacts", "a", patch).await.unwrap();
        let third = sub.next().await.unwrap();
        assert_eq!(third.len(), 1);
        assert_eq!(third.changes[0].kind, crate::ChangeKind::Removed);
    }

    #[tokio::test]
    async fn dropping_the_subscription_detaches_the_listener() {
        let store = seeded();
        let sub = store.subscribe(Query::collection("contacts")).await.unwrap();
        assert_eq!(store.listener_count(), 1);
        drop(sub);
        assert_eq!(store.listener_count(), 0);
    }

    #[tokio::test]
    async fn closed_receivers_are_pruned_on_write() {
        let store = seeded();
        let (rx, disposer) = store
            .subscribe(Query::collection("contacts"))
            .await
            .unwrap()
            .into_parts();
        drop(rx);
        store.add("contacts", json!({"nom": "Esi"})).await.unwrap();
        assert_eq!(store.listener_count(), 0);
        drop(disposer);
    }

    #[tokio::test]
    async fn snapshot_round_trips_contents() {
        let store = seeded();
        let again = MemoryStore::from_snapshot(store.snapshot()).unwrap();
        let q = Query::collection("contacts").order_by("nom", Direction::Asc);
        assert_eq!(
            store.query(&q).await.unwrap(),
            again.query(&q).await.unwrap()
        );
    }

    #[test]
    fn malformed_snapshots_are_rejected() {
        assert!(MemoryStore::from_snapshot(json!([])).is_err());
        assert!(MemoryStore::from_snapshot(json!({"contacts": []})).is_err());
        assert!(MemoryStore::from_snapshot(json!({"contacts": {"a": 1}})).is_err());
    }
}
