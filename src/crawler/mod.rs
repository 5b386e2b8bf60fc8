//! Crawler module for listing walks, detail pages and asset downloads
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching behind the `Fetcher` trait
//! - Listing and detail parsing behind the `PageParser` trait
//! - Batched asset downloads with retry and integrity checks
//! - Overall crawl coordination

mod coordinator;
mod detail;
mod downloader;
mod fetcher;
mod parser;
mod records;

#[cfg(test)]
pub(crate) mod testing;

pub use coordinator::{run_crawl, Coordinator, CrawlStats};
pub use detail::parse_detail;
pub use downloader::{AssetDownloader, DownloadSummary};
pub use fetcher::{build_http_client, FetchOptions, Fetcher, HttpFetcher};
pub use parser::{extract_base_path, DetailResources, PageParser, SoundboardParser, DEFAULT_BASE_PATH};
pub use records::{
    is_safe_asset_name, AssetRef, Author, Category, DetailRecord, ListingRecord, Thumbnail,
    TitleLink, ASSET_DIR, ASSET_EXTENSION,
};

use crate::config::Config;
use crate::HarvestError;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Open (and lock) the item store
/// 2. Build the HTTP client and the site parser
/// 3. Crawl the single target, or walk the listing up to the new-item quota
/// 4. Flush the store and return the run counters
///
/// # Arguments
///
/// * `config` - The crawler configuration
///
/// # Returns
///
/// * `Ok(CrawlStats)` - Crawl completed
/// * `Err(HarvestError)` - Store, client or single-target failure
pub async fn crawl(config: Config) -> Result<CrawlStats, HarvestError> {
    run_crawl(config).await
}
