//! Configuration module for sb-harvest
//!
//! Configuration is layered: built-in defaults, an optional TOML file, then
//! environment/CLI overrides applied through [`Overrides`].
//!
//! # Example
//!
//! ```no_run
//! use sb_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Quota per run: {}", config.crawler.max_new_items);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, DownloadConfig, HttpConfig, OutputConfig, UserAgentConfig,
    DEFAULT_LISTING_URL,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, Overrides};
pub use validation::validate;
