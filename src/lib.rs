//! sb-harvest: an incremental soundboard harvester
//!
//! This crate walks a paginated soundboard listing, deduplicates the boards it finds
//! against a JSON snapshot store, crawls each new board's detail page, and downloads
//! the referenced audio clips with retry and integrity checks.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for sb-harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Network error for {url}: {message}")]
    Network {
        url: String,
        status: Option<u16>,
        message: String,
    },

    #[error("Parse error for {url}: {message}")]
    Parse { url: String, message: String },

    #[error("Integrity error for {}: {message}", path.display())]
    Integrity { path: PathBuf, message: String },

    #[error("Store error: {0}")]
    Store(#[from] storage::StoreError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarvestError {
    /// Returns true for errors raised by the network layer
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    /// Returns true for zero-length responses or files
    pub fn is_integrity(&self) -> bool {
        matches!(self, Self::Integrity { .. })
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("URL has no usable path segment: {0}")]
    MissingSegment(String),
}

/// Result type alias for sb-harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, CrawlStats};
pub use state::AssetState;
pub use storage::{ItemStore, PersistedItem, SnapshotStore};
