//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers via
//! the `State` extractor. Holds the two external collaborators behind their
//! traits, the venue's calendar, the clock, and the live dashboard context.
//!
//! The live context is created on first use and replaced when the local day
//! changes; the replaced context is closed, which detaches its listeners.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use savania_backoffice::{
    system_clock, BackofficeError, Clock, DashboardContext, DEFAULT_PAGE_SIZE,
};
use savania_core::LocalCalendar;
use savania_store::{DocumentStore, IdentityService, MemoryIdentity, MemoryStore};
use thiserror::Error;

/// How long a live long-poll waits for a newer generation.
pub const DEFAULT_LIVE_POLL: Duration = Duration::from_secs(25);

/// Public submissions per minute per client.
pub const DEFAULT_RATE_LIMIT: u64 = 30;

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Malformed environment configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: invalid value '{value}'")]
    Invalid { var: &'static str, value: String },
}

/// Application configuration.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Venue's local calendar (fixed UTC offset).
    pub calendar: LocalCalendar,
    /// Contacts per page.
    pub page_size: usize,
    /// JSON store snapshot loaded at startup.
    pub seed: Option<PathBuf>,
    /// CORS origin of the public site.
    pub allowed_origin: Option<String>,
    /// Public submissions per minute per client.
    pub rate_limit: u64,
    pub log_format: LogFormat,
    /// Long-poll wait on the live dashboard.
    pub live_poll: Duration,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("utc_offset", &self.calendar.offset().to_string())
            .field("page_size", &self.page_size)
            .field("seed", &self.seed)
            .field("allowed_origin", &self.allowed_origin)
            .field("rate_limit", &self.rate_limit)
            .field("log_format", &self.log_format)
            .field("live_poll", &self.live_poll)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            calendar: LocalCalendar::utc(),
            page_size: DEFAULT_PAGE_SIZE,
            seed: None,
            allowed_origin: None,
            rate_limit: DEFAULT_RATE_LIMIT,
            log_format: LogFormat::Text,
            live_poll: DEFAULT_LIVE_POLL,
        }
    }
}

fn parse<T: std::str::FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { var, value })
}

impl AppConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read the configuration through `lookup`; unset variables keep their
    /// defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(v) = lookup("PORT") {
            config.port = parse("PORT", v)?;
        }
        if let Some(v) = lookup("SAVANIA_UTC_OFFSET") {
            config.calendar = LocalCalendar::parse_offset(v.trim()).map_err(|_| {
                ConfigError::Invalid {
                    var: "SAVANIA_UTC_OFFSET",
                    value: v,
                }
            })?;
        }
        if let Some(v) = lookup("SAVANIA_PAGE_SIZE") {
            let size: usize = parse("SAVANIA_PAGE_SIZE", v.clone())?;
            if size == 0 {
                return Err(ConfigError::Invalid {
                    var: "SAVANIA_PAGE_SIZE",
                    value: v,
                });
            }
            config.page_size = size;
        }
        config.seed = lookup("SAVANIA_SEED")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);
        config.allowed_origin = lookup("SAVANIA_ALLOWED_ORIGIN").filter(|v| !v.trim().is_empty());
        if let Some(v) = lookup("SAVANIA_RATE_LIMIT") {
            config.rate_limit = parse("SAVANIA_RATE_LIMIT", v)?;
        }
        if let Some(v) = lookup("SAVANIA_LIVE_POLL_SECS") {
            config.live_poll = Duration::from_secs(parse("SAVANIA_LIVE_POLL_SECS", v)?);
        }
        if let Some(v) = lookup("SAVANIA_LOG_FORMAT") {
            config.log_format = match v.trim() {
                "json" => LogFormat::Json,
                "text" | "" => LogFormat::Text,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "SAVANIA_LOG_FORMAT",
                        value: v,
                    })
                }
            };
        }
        Ok(config)
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub identity: Arc<dyn IdentityService>,
    pub config: AppConfig,
    pub clock: Clock,
    live: Arc<tokio::sync::Mutex<Option<Arc<DashboardContext>>>>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// In-memory store and identity service with the default configuration.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    /// In-memory store and identity service.
    pub fn with_config(config: AppConfig) -> Self {
        Self::from_parts(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryIdentity::new()),
            config,
        )
    }

    pub fn from_parts(
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityService>,
        config: AppConfig,
    ) -> Self {
        Self {
            store,
            identity,
            config,
            clock: system_clock(),
            live: Arc::new(tokio::sync::Mutex::new(None)),
        }
    }

    /// Replace the clock.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn calendar(&self) -> &LocalCalendar {
        &self.config.calendar
    }

    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        (self.clock)()
    }

    pub fn today(&self) -> chrono::NaiveDate {
        self.config.calendar.local_date(self.now())
    }

    /// The live dashboard context for today, opening or replacing it as
    /// needed.
    pub async fn live_dashboard(&self) -> Result<Arc<DashboardContext>, BackofficeError> {
        let today = self.today();
        let mut slot = self.live.lock().await;
        if let Some(ctx) = slot.as_ref() {
            if ctx.is_current(today) {
                return Ok(Arc::clone(ctx));
            }
        }
        let mut after = None;
        if let Some(stale) = slot.take() {
            tracing::info!(opened_on = %stale.opened_on(), today = %today, "replacing live dashboard for the new day");
            after = Some(stale.latest().generation);
            stale.close();
        }
        let store = Arc::clone(&self.store);
        let clock = Arc::clone(&self.clock);
        let ctx = match after {
            Some(generation) => {
                DashboardContext::open_after(store, self.config.calendar, clock, generation).await?
            }
            None => DashboardContext::open(store, self.config.calendar, clock).await?,
        };
        let ctx = Arc::new(ctx);
        *slot = Some(Arc::clone(&ctx));
        Ok(ctx)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
