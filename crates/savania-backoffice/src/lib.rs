//! # savania-backoffice — Back-Office Components
//!
//! The logic behind the SAVANIA admin pages and the public contact form,
//! written against the [`DocumentStore`](savania_store::DocumentStore) and
//! [`IdentityService`](savania_store::IdentityService) contracts so it runs
//! the same over the in-memory store and a hosted one.
//!
//! | Module | Component |
//! |---|---|
//! | [`gate`] | Identity gate: session + active admin document |
//! | [`session`] | Login, logout, password reset, one-time admin setup |
//! | [`intake`] | Public contact form submission |
//! | [`contacts`] | Paged contact list, detail, status update, delete |
//! | [`dashboard`] | The four dashboard figures |
//! | [`live`] | Live dashboard context with generation-tagged updates |
//! | [`export`] | Semicolon-delimited contact export |
//! | [`activity`] | Recent activity and prefix search |
//! | [`guard`] | Advisory input guard and security log |
//! | [`render`] | Escaped HTML fragments |
//!
//! ## Crate Policy
//!
//! - No HTTP types here; `savania-api` maps these results to responses.
//! - Time is always passed in (`now`, `today`) or injected as a clock.
//! - Store failures are logged at the call site and returned, never retried.
//! - No `.unwrap()` outside tests.

pub mod activity;
pub mod contacts;
pub mod dashboard;
pub mod error;
pub mod export;
pub mod gate;
pub mod guard;
pub mod intake;
pub mod live;
pub mod render;
pub mod session;

pub use activity::{recent_activity, search, RecentActivity, SearchResults};
pub use contacts::{ContactFilters, ContactListView, ContactPage, DEFAULT_PAGE_SIZE};
pub use dashboard::{compute_stats, DashboardStats};
pub use error::{BackofficeError, ExportError, GateError, IntakeError};
pub use export::{export_contacts, CsvExport, ExportRange};
pub use gate::{authorize, AdminPrincipal};
pub use guard::{ClientInfo, GuardFinding};
pub use intake::{submit, ContactSubmission};
pub use live::{system_clock, Clock, DashboardContext, LiveUpdate};
pub use session::{AdminSession, LoginRequest, SetupRequest};
