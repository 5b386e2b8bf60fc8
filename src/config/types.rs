use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Default soundboard listing
pub const DEFAULT_LISTING_URL: &str = "https://www.realmofdarkness.net/sb/";

/// Main configuration structure for sb-harvest
///
/// Every section is optional in the TOML file; missing keys fall back to the
/// defaults below.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub http: HttpConfig,
    pub download: DownloadConfig,
    pub output: OutputConfig,
}

/// Crawl loop configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// First page of the paginated listing
    #[serde(rename = "listing-url")]
    pub listing_url: String,

    /// Maximum number of newly discovered items to crawl per run
    #[serde(rename = "max-new-items")]
    pub max_new_items: usize,

    /// Delay between listing pages (milliseconds)
    #[serde(rename = "page-delay-ms")]
    pub page_delay_ms: u64,

    /// Crawl a single detail page instead of paginating
    #[serde(rename = "target-url")]
    pub target_url: Option<String>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            listing_url: DEFAULT_LISTING_URL.to_string(),
            max_new_items: 5,
            page_delay_ms: 1000,
            target_url: None,
        }
    }
}

impl CrawlerConfig {
    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "SbHarvest".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: "https://github.com/sb-harvest/sb-harvest".to_string(),
        }
    }
}

impl UserAgentConfig {
    /// Formats the `User-Agent` header value
    pub fn header_value(&self) -> String {
        format!(
            "Mozilla/5.0 (compatible; {}/{}; +{})",
            self.crawler_name, self.crawler_version, self.contact_url
        )
    }
}

/// Request timeouts
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Timeout for listing, detail and script fetches (seconds)
    #[serde(rename = "page-timeout-secs")]
    pub page_timeout_secs: u64,

    /// Timeout for audio asset fetches (seconds)
    #[serde(rename = "asset-timeout-secs")]
    pub asset_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            page_timeout_secs: 10,
            asset_timeout_secs: 30,
        }
    }
}

impl HttpConfig {
    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }

    pub fn asset_timeout(&self) -> Duration {
        Duration::from_secs(self.asset_timeout_secs)
    }
}

/// Asset download behaviour
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Number of assets fetched concurrently
    #[serde(rename = "batch-size")]
    pub batch_size: usize,

    /// Total attempts per asset before it is dropped
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// Retry delay unit; attempt n waits `n * retry-base-delay-ms`
    #[serde(rename = "retry-base-delay-ms")]
    pub retry_base_delay_ms: u64,

    /// Pause between batches (milliseconds)
    #[serde(rename = "batch-delay-ms")]
    pub batch_delay_ms: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            batch_size: 2,
            max_attempts: 3,
            retry_base_delay_ms: 1000,
            batch_delay_ms: 500,
        }
    }
}

impl DownloadConfig {
    /// Delay to wait after the given failed attempt (1-based)
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms.saturating_mul(attempt as u64))
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Root directory for per-item metadata and audio files
    #[serde(rename = "output-dir")]
    pub output_dir: PathBuf,

    /// Path to the JSON snapshot store
    #[serde(rename = "database-path")]
    pub database_path: PathBuf,

    /// Number of store mutations between snapshot writes (1 = write-through)
    #[serde(rename = "flush-every")]
    pub flush_every: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            database_path: PathBuf::from("data/posts.json"),
            flush_every: 1,
        }
    }
}
