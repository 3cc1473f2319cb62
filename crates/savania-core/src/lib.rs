//! # savania-core — Foundational Types for the SAVANIA Back-Office
//!
//! Defines the document shapes the back-office reads from and writes to the
//! external document store, plus the small amount of pure logic that sits
//! on top of them. Every other crate in the workspace depends on
//! `savania-core`; it depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Persisted field names stay French.** The external store holds
//!    `nom`, `sujet`, `date_soumission`, `statut`... Rust field names are
//!    English; `serde(rename)` maps between the two. Field-name constants
//!    used to build queries live next to each type (`contact::field`).
//!
//! 2. **Closed enums for statuses.** `ContactStatus`, `Priority`,
//!    `ServiceCategory`, `ReservationStatus` serialize to the exact strings
//!    stored in the documents. No bare strings for statuses.
//!
//! 3. **Local calendar, UTC instants.** Instants are `DateTime<Utc>`. Day,
//!    week and month boundaries are computed in the venue's local offset by
//!    [`LocalCalendar`] and converted back to UTC half-open windows.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `savania-*` crates (leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod admin;
pub mod contact;
pub mod error;
pub mod format;
pub mod identity;
pub mod reservation;
pub mod security;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use admin::AdminAccount;
pub use contact::{Contact, ContactRecord, ContactStatus, Priority, ServiceCategory};
pub use error::{FieldError, FieldErrors, SavaniaError, ValidationError};
pub use identity::{ContactId, ReservationId, UserId};
pub use reservation::{Reservation, ReservationRecord, ReservationStatus};
pub use security::{SecurityEventKind, SecurityLogEntry};
pub use temporal::{parse_day, LocalCalendar, TimeWindow};
