//! Statistics from the item store and from a finished run
//!
//! This module provides functionality for summarizing stored items and
//! displaying run counters.

use crate::crawler::CrawlStats;
use crate::storage::{ItemStore, PersistedItem};
use chrono::{DateTime, Utc};

/// Summary of everything in the store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStatistics {
    /// Number of stored items
    pub total_items: usize,

    /// Items that went through a detail crawl
    pub crawled_items: usize,

    /// Assets across all items
    pub total_assets: usize,

    /// Assets with a verified local file
    pub downloaded_assets: usize,

    /// Most recent `updated_at` across items
    pub last_updated: Option<DateTime<Utc>>,
}

/// Loads statistics from a store
///
/// # Arguments
///
/// * `store` - The store to summarize
pub fn load_statistics(store: &dyn ItemStore) -> StoreStatistics {
    summarize_items(&store.get_all())
}

/// Summarizes items read without opening a store, e.g. by [`crate::storage::read_snapshot`]
pub fn summarize_items(items: &[PersistedItem]) -> StoreStatistics {
    StoreStatistics {
        total_items: items.len(),
        crawled_items: items.iter().filter(|i| i.base_path.is_some()).count(),
        total_assets: items.iter().map(|i| i.assets.len()).sum(),
        downloaded_assets: items.iter().map(|i| i.downloaded_assets()).sum(),
        last_updated: items.iter().map(|i| i.updated_at).max(),
    }
}

/// Prints store statistics to stdout in a formatted manner
pub fn print_statistics(stats: &StoreStatistics) {
    println!("=== Store Statistics ===\n");

    println!("Items:");
    println!("  Total items: {}", stats.total_items);
    println!("  Detail-crawled items: {}", stats.crawled_items);
    println!(
        "  Listing-only items: {}",
        stats.total_items - stats.crawled_items
    );
    println!();

    println!("Assets:");
    println!("  Total assets: {}", stats.total_assets);
    println!("  Downloaded assets: {}", stats.downloaded_assets);
    println!();

    match stats.last_updated {
        Some(ts) => println!("Last updated: {}", ts.to_rfc3339()),
        None => println!("Last updated: never"),
    }
}

/// Prints the counters of a finished run
pub fn print_crawl_stats(stats: &CrawlStats) {
    println!("=== Crawl Results ===\n");
    println!("  Records seen: {}", stats.total);
    println!("  New items: {}", stats.new);
    println!("  Updated items: {}", stats.updated);
    println!("  Errors: {}", stats.errors);
    println!("  Detail pages crawled: {}", stats.details_crawled);
    println!("  Listing pages scanned: {}", stats.pages_scanned);
}
