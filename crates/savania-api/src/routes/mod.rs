//! # API Route Modules
//!
//! - `intake` — public contact form submission.
//! - `security` — advisory client reports and the admin security log.
//! - `session` — login, logout, password reset, one-time admin setup, and
//!   the signed-in admin's profile.
//! - `contacts` — admin contact list, detail, status, delete, export,
//!   and search.
//! - `dashboard` — figures, recent activity, the live long-poll, and the
//!   HTML fragments.
//!
//! Each module exposes `public_router()` and/or `admin_router()`; the
//! admin routers are mounted behind the identity gate.

pub mod contacts;
pub mod dashboard;
pub mod intake;
pub mod security;
pub mod session;
