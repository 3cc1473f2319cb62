//! # Live Dashboard Context
//!
//! Owns the dashboard's standing subscriptions and republishes the figures
//! whenever either one reports a change:
//!
//! - contacts with `statut == nouveau`: drives the badge counter and the
//!   "new contact" notifications;
//! - reservations dated today.
//!
//! Every change triggers a full recomputation. Each recomputation takes a
//! generation number when it starts and is published only if nothing newer
//! has been published meanwhile, so a slow recomputation can never
//! overwrite a faster, later one.
//!
//! Subscriptions and their listener tasks are held in [`ScopedResources`].
//! Dropping the [`DashboardContext`] (or calling [`DashboardContext::close`])
//! aborts the tasks and detaches the listeners. The reservations listener
//! is bound to the day the context was opened; callers replace the context
//! when [`DashboardContext::is_current`] turns false.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::Mutex;
use savania_core::contact::{self, ContactStatus};
use savania_core::{reservation, LocalCalendar, ServiceCategory};
use savania_store::{Disposer, DocumentStore, Query, Snapshot};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use utoipa::ToSchema;

use crate::dashboard::{compute_stats, DashboardStats};
use crate::error::BackofficeError;

/// Source of "now". Injected so tests can pin the calendar day.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// The wall clock.
pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

/// Notifications kept for late pollers.
pub const MAX_NOTIFICATIONS: usize = 20;

/// A contact that just arrived with status `nouveau`.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ContactNotification {
    pub contact_id: String,
    pub title: String,
    pub service: String,
    pub received_at: DateTime<Utc>,
}

/// What the live dashboard shows.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct LiveUpdate {
    /// Increases with every published recomputation.
    pub generation: u64,
    pub stats: DashboardStats,
    /// Number of contacts with status `nouveau`.
    pub new_contacts_badge: usize,
    /// Most recent arrivals, oldest first.
    pub notifications: Vec<ContactNotification>,
}

/// Disposers and tasks released together.
#[derive(Debug, Default)]
pub struct ScopedResources {
    disposers: Vec<Disposer>,
    tasks: Vec<JoinHandle<()>>,
}

impl ScopedResources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn adopt(&mut self, disposer: Disposer) {
        self.disposers.push(disposer);
    }

    /// Spawn `task` on the current runtime and keep its handle.
    pub fn spawn(&mut self, task: impl Future<Output = ()> + Send + 'static) {
        self.tasks.push(tokio::spawn(task));
    }

    pub fn len(&self) -> usize {
        self.disposers.len() + self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Abort every task and run every disposer.
    pub fn release(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
        for disposer in self.disposers.drain(..) {
            disposer.dispose();
        }
    }
}

impl Drop for ScopedResources {
    fn drop(&mut self) {
        self.release();
    }
}

struct LiveShared {
    store: Arc<dyn DocumentStore>,
    calendar: LocalCalendar,
    clock: Clock,
    updates: watch::Sender<LiveUpdate>,
    next_generation: AtomicU64,
    badge: AtomicUsize,
    notifications: Mutex<VecDeque<ContactNotification>>,
}

impl LiveShared {
    fn note_arrivals(&self, snapshot: &Snapshot) {
        let now = (self.clock)();
        let mut notifications = self.notifications.lock();
        for doc in snapshot.added() {
            let name = doc
                .field(contact::field::NAME)
                .and_then(|v| v.as_str())
                .unwrap_or("?");
            let service = doc
                .field(contact::field::SERVICE)
                .and_then(|v| v.as_str())
                .unwrap_or("");
            let service = service
                .parse::<ServiceCategory>()
                .map(|s| s.label().to_string())
                .unwrap_or_else(|_| service.to_string());
            tracing::info!(contact = %doc.id, "new contact notification");
            notifications.push_back(ContactNotification {
                contact_id: doc.id.clone(),
                title: format!("Nouveau contact: {name}"),
                service,
                received_at: now,
            });
            while notifications.len() > MAX_NOTIFICATIONS {
                notifications.pop_front();
            }
        }
    }

    async fn recompute(&self) {
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst) + 1;
        match compute_stats(self.store.as_ref(), &self.calendar, (self.clock)()).await {
            Ok(stats) => {
                let update = LiveUpdate {
                    generation,
                    stats,
                    new_contacts_badge: self.badge.load(Ordering::SeqCst),
                    notifications: self.notifications.lock().iter().cloned().collect(),
                };
                if !self.publish(update) {
                    tracing::debug!(generation, "superseded dashboard recomputation dropped");
                }
            }
            Err(e) => {
                tracing::warn!(generation, error = %e, "dashboard recomputation failed");
            }
        }
    }

    /// Publish `update` unless an equal or newer generation is already out.
    fn publish(&self, update: LiveUpdate) -> bool {
        self.updates.send_if_modified(|current| {
            if update.generation > current.generation {
                *current = update;
                true
            } else {
                false
            }
        })
    }
}

async fn follow_contacts(shared: Arc<LiveShared>, mut snapshots: mpsc::UnboundedReceiver<Snapshot>) {
    while let Some(snapshot) = snapshots.recv().await {
        shared.badge.store(snapshot.len(), Ordering::SeqCst);
        shared.note_arrivals(&snapshot);
        shared.recompute().await;
    }
    tracing::debug!("contact listener closed");
}

async fn follow_reservations(
    shared: Arc<LiveShared>,
    mut snapshots: mpsc::UnboundedReceiver<Snapshot>,
) {
    while snapshots.recv().await.is_some() {
        shared.recompute().await;
    }
    tracing::debug!("reservation listener closed");
}

/// Live dashboard state for one admin page session.
pub struct DashboardContext {
    shared: Arc<LiveShared>,
    opened_on: NaiveDate,
    resources: Mutex<ScopedResources>,
}

impl std::fmt::Debug for DashboardContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashboardContext")
            .field("opened_on", &self.opened_on)
            .field("generation", &self.shared.updates.borrow().generation)
            .field("resources", &self.resources.lock().len())
            .finish()
    }
}

impl DashboardContext {
    /// Subscribe, compute the first figures, and start following changes.
    pub async fn open(
        store: Arc<dyn DocumentStore>,
        calendar: LocalCalendar,
        clock: Clock,
    ) -> Result<Self, BackofficeError> {
        Self::start(store, calendar, clock, 0).await
    }

    /// Like [`DashboardContext::open`], numbering publications after
    /// `generation`. A context replacing an older one continues its
    /// numbering so pollers holding the old generation resume at once.
    pub async fn open_after(
        store: Arc<dyn DocumentStore>,
        calendar: LocalCalendar,
        clock: Clock,
        generation: u64,
    ) -> Result<Self, BackofficeError> {
        Self::start(store, calendar, clock, generation.saturating_add(1)).await
    }

    async fn start(
        store: Arc<dyn DocumentStore>,
        calendar: LocalCalendar,
        clock: Clock,
        first: u64,
    ) -> Result<Self, BackofficeError> {
        let now = clock();
        let today = calendar.local_date(now);

        let contacts = store
            .subscribe(
                Query::collection(contact::COLLECTION)
                    .where_eq(contact::field::STATUS, ContactStatus::Nouveau.as_str()),
            )
            .await?;
        let reservations = store
            .subscribe(
                Query::collection(reservation::COLLECTION)
                    .where_eq(reservation::field::DATE, today.format("%Y-%m-%d").to_string()),
            )
            .await?;

        let mut resources = ScopedResources::new();
        let (mut contacts_rx, contacts_disposer) = contacts.into_parts();
        let (mut reservations_rx, reservations_disposer) = reservations.into_parts();
        resources.adopt(contacts_disposer);
        resources.adopt(reservations_disposer);

        // The first snapshots describe the current state; they set the
        // badge but raise no notifications.
        let badge = contacts_rx.recv().await.map_or(0, |s| s.len());
        let _ = reservations_rx.recv().await;

        let stats = compute_stats(store.as_ref(), &calendar, now).await?;
        let (updates, _) = watch::channel(LiveUpdate {
            generation: first,
            stats,
            new_contacts_badge: badge,
            notifications: Vec::new(),
        });

        let shared = Arc::new(LiveShared {
            store,
            calendar,
            clock,
            updates,
            next_generation: AtomicU64::new(first),
            badge: AtomicUsize::new(badge),
            notifications: Mutex::new(VecDeque::new()),
        });
        resources.spawn(follow_contacts(Arc::clone(&shared), contacts_rx));
        resources.spawn(follow_reservations(Arc::clone(&shared), reservations_rx));

        tracing::info!(day = %today, generation = first, "live dashboard opened");
        Ok(Self {
            shared,
            opened_on: today,
            resources: Mutex::new(resources),
        })
    }

    /// Local day the context was opened on.
    pub fn opened_on(&self) -> NaiveDate {
        self.opened_on
    }

    /// Whether the context still tracks `today`'s reservations.
    pub fn is_current(&self, today: NaiveDate) -> bool {
        self.opened_on == today
    }

    /// Local day according to the context's clock and calendar.
    pub fn today(&self) -> NaiveDate {
        self.shared.calendar.local_date((self.shared.clock)())
    }

    /// Latest published update.
    pub fn latest(&self) -> LiveUpdate {
        self.shared.updates.borrow().clone()
    }

    /// Receiver that observes every publication.
    pub fn updates(&self) -> watch::Receiver<LiveUpdate> {
        self.shared.updates.subscribe()
    }

    /// Wait until a generation newer than `after` is published, or until
    /// `timeout` elapses; either way return the latest update.
    pub async fn wait_newer(&self, after: u64, timeout: Duration) -> LiveUpdate {
        let mut rx = self.updates();
        let waited = tokio::time::timeout(timeout, rx.wait_for(|u| u.generation > after)).await;
        match waited {
            Ok(Ok(update)) => update.clone(),
            _ => self.latest(),
        }
    }

    /// Number of held disposers and tasks.
    pub fn resource_count(&self) -> usize {
        self.resources.lock().len()
    }

    /// Detach listeners and stop following changes.
    pub fn close(&self) {
        self.resources.lock().release();
        tracing::info!(day = %self.opened_on, "live dashboard closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use savania_core::ContactId;
    use savania_store::MemoryStore;
    use serde_json::json;

    use crate::contacts::update_status;

    const WAIT: Duration = Duration::from_secs(5);

    fn fixed_clock() -> Clock {
        let now = Utc.with_ymd_and_hms(2026, 10, 21, 15, 0, 0).unwrap();
        Arc::new(move || now)
    }

    async fn put_contact(store: &MemoryStore, id: &str, name: &str, statut: &str) {
        store
            .set(
                contact::COLLECTION,
                id,
                json!({"nom": name, "email": "x@y.tg", "service": "piscine", "sujet": "s",
                       "message": "m", "date_soumission": "2026-10-21T09:00:00Z", "statut": statut}),
            )
            .await
            .unwrap();
    }

    async fn open(store: &MemoryStore) -> DashboardContext {
        let shared: Arc<dyn DocumentStore> = Arc::new(store.clone());
        DashboardContext::open(shared, LocalCalendar::utc(), fixed_clock())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn handling_a_new_contact_lowers_the_live_count() {
        let store = MemoryStore::new();
        put_contact(&store, "a", "Afi", "nouveau").await;
        put_contact(&store, "b", "Kofi", "nouveau").await;
        put_contact(&store, "c", "Ama", "traite").await;

        let ctx = open(&store).await;
        let first = ctx.latest();
        assert_eq!(first.stats.new_contacts_today, 2);
        assert_eq!(first.new_contacts_badge, 2);
        assert!(first.notifications.is_empty());

        update_status(&store, &ContactId::new("a"), ContactStatus::Traite, Utc::now())
            .await
            .unwrap();

        let mut rx = ctx.updates();
        let next = tokio::time::timeout(
            WAIT,
            rx.wait_for(|u| u.stats.new_contacts_today == 1 && u.new_contacts_badge == 1),
        )
        .await
        .expect("live recompute")
        .unwrap()
        .clone();
        assert!(next.generation > first.generation);
    }

    #[tokio::test]
    async fn arrivals_raise_notifications() {
        let store = MemoryStore::new();
        let ctx = open(&store).await;
        put_contact(&store, "y", "Yao", "nouveau").await;

        let update = ctx.wait_newer(0, WAIT).await;
        let mut rx = ctx.updates();
        let update = if update.notifications.is_empty() {
            tokio::time::timeout(WAIT, rx.wait_for(|u| !u.notifications.is_empty()))
                .await
                .expect("notification")
                .unwrap()
                .clone()
        } else {
            update
        };
        assert_eq!(update.notifications[0].title, "Nouveau contact: Yao");
        assert_eq!(update.notifications[0].service, "Piscine");
    }

    #[tokio::test]
    async fn reservations_today_trigger_recompute() {
        let store = MemoryStore::new();
        let ctx = open(&store).await;
        store
            .set(
                reservation::COLLECTION,
                "r1",
                json!({"client_nom": "X", "type": "piscine", "date_reservation": "2026-10-21",
                       "statut": "confirme", "total_ttc": 5000, "created_at": "2026-10-20T10:00:00Z"}),
            )
            .await
            .unwrap();
        let mut rx = ctx.updates();
        let update = tokio::time::timeout(WAIT, rx.wait_for(|u| u.stats.bookings_today == 1))
            .await
            .expect("bookings recompute")
            .unwrap()
            .clone();
        assert_eq!(update.stats.current_month_revenue, 5000.0);
    }

    #[tokio::test]
    async fn older_generations_are_never_published() {
        let store = MemoryStore::new();
        let ctx = open(&store).await;
        let base = ctx.latest();

        let newer = LiveUpdate {
            generation: 10,
            ..base.clone()
        };
        let older = LiveUpdate {
            generation: 7,
            new_contacts_badge: 99,
            ..base
        };
        assert!(ctx.shared.publish(newer));
        assert!(!ctx.shared.publish(older));
        assert_eq!(ctx.latest().generation, 10);
        assert_ne!(ctx.latest().new_contacts_badge, 99);
    }

    #[tokio::test]
    async fn teardown_detaches_listeners() {
        let store = MemoryStore::new();
        let ctx = open(&store).await;
        assert_eq!(store.listener_count(), 2);
        assert_eq!(ctx.resource_count(), 4);
        drop(ctx);
        assert_eq!(store.listener_count(), 0);

        let ctx = open(&store).await;
        ctx.close();
        assert_eq!(ctx.resource_count(), 0);
        assert_eq!(store.listener_count(), 0);
    }

    #[tokio::test]
    async fn context_is_bound_to_its_day() {
        let store = MemoryStore::new();
        let ctx = open(&store).await;
        let day = NaiveDate::from_ymd_opt(2026, 10, 21).unwrap();
        assert_eq!(ctx.opened_on(), day);
        assert!(ctx.is_current(day));
        assert!(!ctx.is_current(day.succ_opt().unwrap()));
    }

    #[tokio::test]
    async fn reopened_context_continues_numbering() {
        let store = MemoryStore::new();
        let old = open(&store).await;
        let held = old.latest().generation;
        old.close();

        let shared: Arc<dyn DocumentStore> = Arc::new(store.clone());
        let ctx = DashboardContext::open_after(shared, LocalCalendar::utc(), fixed_clock(), held)
            .await
            .unwrap();
        assert!(ctx.latest().generation > held);
        let update = ctx.wait_newer(held, Duration::from_millis(20)).await;
        assert!(update.generation > held);
    }

    #[tokio::test]
    async fn wait_newer_times_out_with_latest() {
        let store = MemoryStore::new();
        let ctx = open(&store).await;
        let update = ctx.wait_newer(1_000, Duration::from_millis(20)).await;
        assert_eq!(update, ctx.latest());
    }
}
