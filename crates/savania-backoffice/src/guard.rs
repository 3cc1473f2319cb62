//! # Advisory Input Guard
//!
//! Heuristics carried over from the public site's client-side protection:
//! a known-bad pattern scan on form input, a window-size check for open
//! developer tools, a rapid-click counter, and a suspicious-domain list.
//!
//! **Advisory only.** None of this is a trust boundary. Every pattern here
//! is trivially bypassed; access control is the identity gate's job and
//! output safety is the renderer's (every interpolated value is escaped).
//! A match blocks the submission and leaves a `security-logs` entry.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use savania_core::security::{field, COLLECTION};
use savania_core::{SecurityEventKind, SecurityLogEntry};
use savania_store::{document, Direction, DocumentStore, Query, StoreError};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Outer-minus-inner window size above which developer tools are assumed open.
pub const DEVTOOLS_THRESHOLD_PX: i64 = 160;

/// Characters of a blocked value kept in the log entry.
pub const EXCERPT_CHARS: usize = 50;

/// Clicks closer together than this count as rapid.
pub const RAPID_CLICK_INTERVAL_MS: i64 = 100;

/// Consecutive rapid clicks above which the behaviour is reported.
pub const RAPID_CLICK_LIMIT: u32 = 10;

/// Hosts of known in-browser miners.
pub const SUSPICIOUS_DOMAINS: [&str; 3] = ["coin-hive.com", "crypto-loot.com", "miner.pr0gramm.com"];

const MALICIOUS_PATTERNS: [&str; 8] = [
    r"(?is)<script\b.*?</script>",
    r"(?i)javascript:",
    r"(?i)vbscript:",
    r"(?i)onload\s*=|onerror\s*=|onclick\s*=",
    r"(?i)eval\s*\(",
    r"(?i)document\.cookie",
    r"(?i)alert\s*\(",
    r"(?i)fromCharCode",
];

/// Compile a built-in pattern. A failure is logged and the pattern skipped.
pub(crate) fn compile_pattern(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::error!(pattern, error = %e, "built-in pattern failed to compile");
            None
        }
    }
}

fn malicious_patterns() -> &'static [Regex] {
    static COMPILED: OnceLock<Vec<Regex>> = OnceLock::new();
    COMPILED.get_or_init(|| {
        MALICIOUS_PATTERNS
            .iter()
            .filter_map(|p| compile_pattern(p))
            .collect()
    })
}

/// A field whose value matched a known-bad pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct GuardFinding {
    pub field: String,
    /// First [`EXCERPT_CHARS`] characters of the value.
    pub excerpt: String,
}

/// Who sent a request, as far as the server can tell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub user_agent: Option<String>,
    pub ip: Option<String>,
    pub url: Option<String>,
}

/// Whether `text` contains any known-bad pattern.
pub fn contains_malicious_code(text: &str) -> bool {
    malicious_patterns().iter().any(|p| p.is_match(text))
}

/// First [`EXCERPT_CHARS`] characters of `text`.
pub fn excerpt(text: &str) -> String {
    text.chars().take(EXCERPT_CHARS).collect()
}

/// Scan `(field, value)` pairs in order and report the first match.
pub fn scan_fields<'a>(fields: impl IntoIterator<Item = (&'a str, &'a str)>) -> Option<GuardFinding> {
    fields
        .into_iter()
        .find(|(_, value)| contains_malicious_code(value))
        .map(|(field, value)| GuardFinding {
            field: field.to_string(),
            excerpt: excerpt(value),
        })
}

/// Entity-encode characters that are significant in HTML, attribute values
/// and URLs.
pub fn sanitize_input(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\'' => out.push_str("&#x27;"),
            '"' => out.push_str("&quot;"),
            '/' => out.push_str("&#x2F;"),
            '\\' => out.push_str("&#x5C;"),
            '`' => out.push_str("&#x60;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Window dimensions reported by a browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub outer_width: i64,
    pub inner_width: i64,
    pub outer_height: i64,
    pub inner_height: i64,
}

impl Viewport {
    /// Docked developer tools shrink the inner window by more than the
    /// threshold in one direction.
    pub fn devtools_suspected(&self) -> bool {
        self.outer_width.saturating_sub(self.inner_width) > DEVTOOLS_THRESHOLD_PX
            || self.outer_height.saturating_sub(self.inner_height) > DEVTOOLS_THRESHOLD_PX
    }
}

/// Whether `url` points at a known miner host.
pub fn is_suspicious_domain(url: &str) -> bool {
    SUSPICIOUS_DOMAINS.iter().any(|d| url.contains(d))
}

/// Counts consecutive clicks closer than [`RAPID_CLICK_INTERVAL_MS`].
#[derive(Debug, Clone, Default)]
pub struct ClickTracker {
    rapid: u32,
    last_ms: Option<i64>,
}

impl ClickTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a click at `at_ms` (milliseconds). Returns the rapid-click
    /// count when it exceeds [`RAPID_CLICK_LIMIT`].
    pub fn record(&mut self, at_ms: i64) -> Option<u32> {
        match self.last_ms {
            Some(last) if at_ms.saturating_sub(last) < RAPID_CLICK_INTERVAL_MS => {
                self.rapid = self.rapid.saturating_add(1)
            }
            _ => self.rapid = 0,
        }
        self.last_ms = Some(at_ms);
        (self.rapid > RAPID_CLICK_LIMIT).then_some(self.rapid)
    }
}

/// Replay click times (milliseconds) and return the longest rapid run that
/// went past [`RAPID_CLICK_LIMIT`], if any.
pub fn rapid_click_run(times: impl IntoIterator<Item = i64>) -> Option<u32> {
    let mut tracker = ClickTracker::new();
    times.into_iter().filter_map(|t| tracker.record(t)).max()
}

/// Append an entry to `security-logs`.
pub async fn log_security_event(
    store: &dyn DocumentStore,
    kind: SecurityEventKind,
    data: serde_json::Value,
    client: &ClientInfo,
    now: DateTime<Utc>,
) -> Result<String, StoreError> {
    let entry = SecurityLogEntry {
        kind,
        data,
        user_agent: client.user_agent.clone(),
        url: client.url.clone(),
        ip: client.ip.clone(),
        timestamp: now,
    };
    let id = store.add(COLLECTION, document::to_body(&entry)?).await?;
    tracing::info!(event = %kind, id = %id, "security event logged");
    Ok(id)
}

/// [`log_security_event`] for callers that must not fail because logging
/// did: store errors are reported with `tracing` and swallowed.
pub async fn record_security_event(
    store: &dyn DocumentStore,
    kind: SecurityEventKind,
    data: serde_json::Value,
    client: &ClientInfo,
    now: DateTime<Utc>,
) {
    if let Err(e) = log_security_event(store, kind, data, client, now).await {
        tracing::warn!(event = %kind, error = %e, "failed to write security log");
    }
}

/// Most entries returned by [`recent_security_logs`].
pub const MAX_LOG_PAGE: usize = 200;

/// A stored security log entry.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SecurityLogRecord {
    pub id: String,
    #[serde(flatten)]
    pub entry: SecurityLogEntry,
}

/// Newest entries first. `limit` is clamped to `1..=MAX_LOG_PAGE`; entries
/// that fail to decode are skipped.
pub async fn recent_security_logs(
    store: &dyn DocumentStore,
    limit: usize,
) -> Result<Vec<SecurityLogRecord>, StoreError> {
    let query = Query::collection(COLLECTION)
        .order_by(field::TIMESTAMP, Direction::Desc)
        .limit(limit.clamp(1, MAX_LOG_PAGE));
    let documents = store.query(&query).await?;
    Ok(documents
        .into_iter()
        .filter_map(|doc| match doc.decode::<SecurityLogEntry>() {
            Ok(entry) => Some(SecurityLogRecord { id: doc.id, entry }),
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed security log");
                None
            }
        })
        .collect())
}
