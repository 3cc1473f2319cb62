//! # Security Log Entries
//!
//! Entries appended to the `security-logs` collection when an advisory
//! heuristic fires. They are informational: nothing reads them to make an
//! access decision.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Collection holding security log entries.
pub const COLLECTION: &str = "security-logs";

/// Persisted field names, for building queries.
pub mod field {
    pub const TIMESTAMP: &str = "timestamp";
}

/// Kind of heuristic trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SecurityEventKind {
    MaliciousInputBlocked,
    DevToolsDetected,
    BotDetected,
    RapidClicksDetected,
    SuspiciousRequestBlocked,
    JavascriptError,
    PromiseRejection,
}

impl SecurityEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MaliciousInputBlocked => "malicious_input_blocked",
            Self::DevToolsDetected => "dev_tools_detected",
            Self::BotDetected => "bot_detected",
            Self::RapidClicksDetected => "rapid_clicks_detected",
            Self::SuspiciousRequestBlocked => "suspicious_request_blocked",
            Self::JavascriptError => "javascript_error",
            Self::PromiseRejection => "promise_rejection",
        }
    }
}

impl std::fmt::Display for SecurityEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the `security-logs` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SecurityLogEntry {
    #[serde(rename = "type")]
    pub kind: SecurityEventKind,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub data: serde_json::Value,
    #[serde(rename = "userAgent", default)]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    pub timestamp: DateTime<Utc>,
}
