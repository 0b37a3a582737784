use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for the harvester
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub markup: MarkupConfig,
}

/// Source archive configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveConfig {
    /// Base URL shared by the listing pages and the detail views
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Number of letters requested per listing page
    #[serde(rename = "page-size", default = "default_page_size")]
    pub page_size: u32,

    /// Number of stored letters at which a run stops
    #[serde(rename = "target-count")]
    pub target_count: u64,
}

/// Which rendering backend turns a URL into HTML
///
/// Detail views are addressed by a `#letter-<id>` fragment that only the
/// archive's scripts resolve. A plain HTTP GET never sends the fragment, so
/// against the live archive every detail fetch returns the same listing
/// markup: use `renderer = "browser"` there. `http` suits archives that
/// serve the letter markup directly, and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    /// Plain HTTP GET through reqwest
    #[default]
    Http,
    /// Headless Chrome (requires the `browser` feature)
    Browser,
}

impl RendererKind {
    /// Whether pages are rendered with their scripts, resolving the
    /// `#letter-<id>` fragment of detail views
    pub fn runs_scripts(&self) -> bool {
        matches!(self, Self::Browser)
    }
}

/// Page fetcher behavior
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    /// Total attempts per URL, including the first one
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Wait before the second attempt (milliseconds)
    #[serde(rename = "initial-backoff-ms", default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Upper bound for any wait between attempts (milliseconds)
    #[serde(rename = "max-backoff-ms", default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Timeout for a single navigation attempt (milliseconds)
    #[serde(rename = "navigation-timeout-ms", default = "default_navigation_timeout_ms")]
    pub navigation_timeout_ms: u64,

    /// User agent sent by the renderer
    #[serde(rename = "user-agent", default)]
    pub user_agent: Option<String>,

    #[serde(default)]
    pub renderer: RendererKind,
}

impl FetcherConfig {
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            navigation_timeout_ms: default_navigation_timeout_ms(),
            user_agent: None,
            renderer: RendererKind::Http,
        }
    }
}

/// Crawl orchestration configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of detail fetches in flight at once
    #[serde(
        rename = "max-concurrent-fetches",
        default = "default_max_concurrent_fetches"
    )]
    pub max_concurrent_fetches: u32,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: default_max_concurrent_fetches(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Periodic trigger configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    /// Hours between two scheduled harvests
    #[serde(rename = "interval-hours", default = "default_interval_hours")]
    pub interval_hours: u64,

    /// Whether to harvest immediately at startup
    #[serde(rename = "run-on-start", default = "default_run_on_start")]
    pub run_on_start: bool,
}

impl ScheduleConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_hours.saturating_mul(3600))
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_hours: default_interval_hours(),
            run_on_start: default_run_on_start(),
        }
    }
}

/// Archive-specific markup: CSS selectors and the inline field labels
#[derive(Debug, Clone, Deserialize)]
pub struct MarkupConfig {
    #[serde(rename = "container-selector", default = "default_container_selector")]
    pub container_selector: String,

    #[serde(rename = "text-selector", default = "default_text_selector")]
    pub text_selector: String,

    #[serde(rename = "listing-selector", default = "default_listing_selector")]
    pub listing_selector: String,

    #[serde(rename = "id-attribute", default = "default_id_attribute")]
    pub id_attribute: String,

    #[serde(rename = "author-label", default = "default_author_label")]
    pub author_label: String,

    #[serde(rename = "sender-label", default = "default_sender_label")]
    pub sender_label: String,

    #[serde(rename = "recipient-label", default = "default_recipient_label")]
    pub recipient_label: String,

    #[serde(rename = "destination-label", default = "default_destination_label")]
    pub destination_label: String,
}

impl Default for MarkupConfig {
    fn default() -> Self {
        Self {
            container_selector: default_container_selector(),
            text_selector: default_text_selector(),
            listing_selector: default_listing_selector(),
            id_attribute: default_id_attribute(),
            author_label: default_author_label(),
            sender_label: default_sender_label(),
            recipient_label: default_recipient_label(),
            destination_label: default_destination_label(),
        }
    }
}

fn default_page_size() -> u32 {
    24
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    2_000
}

fn default_max_backoff_ms() -> u64 {
    10_000
}

fn default_navigation_timeout_ms() -> u64 {
    60_000
}

fn default_max_concurrent_fetches() -> u32 {
    5
}

fn default_interval_hours() -> u64 {
    12
}

fn default_run_on_start() -> bool {
    true
}

fn default_container_selector() -> String {
    "div.b-letter-text".to_string()
}

fn default_text_selector() -> String {
    "div.text".to_string()
}

fn default_listing_selector() -> String {
    "a.js-open_letter".to_string()
}

fn default_id_attribute() -> String {
    "data-letter_id".to_string()
}

fn default_author_label() -> String {
    "От кого:".to_string()
}

fn default_sender_label() -> String {
    "Откуда:".to_string()
}

fn default_recipient_label() -> String {
    "Кому:".to_string()
}

fn default_destination_label() -> String {
    "Куда:".to_string()
}
