//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::ListingSelectors;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP and crawling behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Site-specific selectors and markers
    #[serde(default)]
    pub selectors: ListingSelectors,

    /// Periodic run settings
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Outbound channels
    #[serde(default)]
    pub notify: NotifyConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if !self.crawler.base_url.contains("{page}") {
            return Err(AppError::validation(
                "crawler.base_url must contain a {page} placeholder",
            ));
        }
        url::Url::parse(&self.crawler.page_url(self.crawler.first_page))?;
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.detail_batch_size == 0 {
            return Err(AppError::validation(
                "crawler.detail_batch_size must be > 0",
            ));
        }
        if self.crawler.max_pages == 0 {
            return Err(AppError::validation("crawler.max_pages must be > 0"));
        }
        if self.schedule.interval_minutes == 0 {
            return Err(AppError::validation(
                "schedule.interval_minutes must be > 0",
            ));
        }
        if self.schedule.quiet_hours.start > 23 || self.schedule.quiet_hours.end > 23 {
            return Err(AppError::validation("schedule.quiet_hours must be 0-23"));
        }
        if self.schedule.summary_hour > 23 {
            return Err(AppError::validation("schedule.summary_hour must be 0-23"));
        }
        if self.notify.max_concurrent_sends == 0 {
            return Err(AppError::validation(
                "notify.max_concurrent_sends must be > 0",
            ));
        }
        if self.notify.email.enabled && self.notify.email.endpoint.trim().is_empty() {
            return Err(AppError::validation(
                "notify.email.endpoint is required when email is enabled",
            ));
        }
        if self.notify.sms.enabled && self.notify.sms.endpoint.trim().is_empty() {
            return Err(AppError::validation(
                "notify.sms.endpoint is required when sms is enabled",
            ));
        }
        Ok(())
    }
}

/// HTTP client and crawling behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Index page URL with a `{page}` placeholder
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// Page number the walk starts at
    #[serde(default = "defaults::first_page")]
    pub first_page: u32,

    /// Upper bound on pages walked in one run
    #[serde(default = "defaults::max_pages")]
    pub max_pages: u32,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Detail pages fetched concurrently per batch
    #[serde(default = "defaults::detail_batch_size")]
    pub detail_batch_size: usize,

    /// Delay between index page requests in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,
}

impl CrawlerConfig {
    /// Index page URL for a page number.
    pub fn page_url(&self, page: u32) -> String {
        self.base_url.replace("{page}", &page.to_string())
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            first_page: defaults::first_page(),
            max_pages: defaults::max_pages(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            detail_batch_size: defaults::detail_batch_size(),
            request_delay_ms: defaults::request_delay(),
        }
    }
}

/// Local-time window in which scheduled runs are skipped.
///
/// Half-open `[start, end)`; `start > end` wraps past midnight and
/// `start == end` disables the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuietHours {
    pub start: u32,
    pub end: u32,
}

impl QuietHours {
    pub fn contains(&self, hour: u32) -> bool {
        if self.start <= self.end {
            self.start <= hour && hour < self.end
        } else {
            hour >= self.start || hour < self.end
        }
    }
}

impl Default for QuietHours {
    fn default() -> Self {
        Self { start: 1, end: 6 }
    }
}

/// Scheduler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Kill switch for all scheduled runs
    #[serde(default = "defaults::enabled")]
    pub enabled: bool,

    #[serde(default = "defaults::interval_minutes")]
    pub interval_minutes: u64,

    #[serde(default = "defaults::startup_delay")]
    pub startup_delay_secs: u64,

    #[serde(default)]
    pub quiet_hours: QuietHours,

    /// Local hour of the daily summary run
    #[serde(default = "defaults::summary_hour")]
    pub summary_hour: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::enabled(),
            interval_minutes: defaults::interval_minutes(),
            startup_delay_secs: defaults::startup_delay(),
            quiet_hours: QuietHours::default(),
            summary_hour: defaults::summary_hour(),
        }
    }
}

/// Outbound notification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    #[serde(default)]
    pub email: EmailConfig,

    #[serde(default)]
    pub sms: SmsConfig,

    /// URL shortener; links are sent unshortened when absent
    #[serde(default)]
    pub shortener: Option<ShortenerConfig>,

    #[serde(default = "defaults::max_concurrent_sends")]
    pub max_concurrent_sends: usize,

    /// How far back un-notified records are still picked up
    #[serde(default = "defaults::notify_window_hours")]
    pub notify_window_hours: i64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            email: EmailConfig::default(),
            sms: SmsConfig::default(),
            shortener: None,
            max_concurrent_sends: defaults::max_concurrent_sends(),
            notify_window_hours: defaults::notify_window_hours(),
        }
    }
}

/// Transactional email provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// When false, sends are logged and reported as successful
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub endpoint: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "defaults::email_from")]
    pub from_email: String,

    #[serde(default = "defaults::sender_name")]
    pub from_name: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: String::new(),
            api_key: String::new(),
            from_email: defaults::email_from(),
            from_name: defaults::sender_name(),
        }
    }
}

/// SMS gateway settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsConfig {
    /// When false, sends are logged and reported as successful
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub endpoint: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    #[serde(default = "defaults::sender_name")]
    pub originator: String,
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: String::new(),
            username: String::new(),
            password: String::new(),
            originator: defaults::sender_name(),
        }
    }
}

/// URL shortener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortenerConfig {
    #[serde(default = "defaults::shortener_endpoint")]
    pub endpoint: String,

    pub access_token: String,
}

/// Record store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "defaults::storage_dir")]
    pub dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: defaults::storage_dir(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    // Crawler defaults
    pub fn base_url() -> String {
        "https://www.blocket.se/bostad/uthyres/stockholm?o={page}&f=p&f=c&f=b".into()
    }
    pub fn first_page() -> u32 {
        1
    }
    pub fn max_pages() -> u32 {
        200
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; rentwatch/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn detail_batch_size() -> usize {
        50
    }
    pub fn request_delay() -> u64 {
        0
    }

    // Schedule defaults
    pub fn enabled() -> bool {
        true
    }
    pub fn interval_minutes() -> u64 {
        15
    }
    pub fn startup_delay() -> u64 {
        10
    }
    pub fn summary_hour() -> u32 {
        6
    }

    // Notify defaults
    pub fn max_concurrent_sends() -> usize {
        10
    }
    pub fn notify_window_hours() -> i64 {
        48
    }
    pub fn email_from() -> String {
        "info@example.com".into()
    }
    pub fn sender_name() -> String {
        "Rentwatch".into()
    }
    pub fn shortener_endpoint() -> String {
        "https://api-ssl.bitly.com/v3/shorten".into()
    }

    pub fn storage_dir() -> String {
        "storage".into()
    }
    pub fn log_level() -> String {
        "info".into()
    }
}
