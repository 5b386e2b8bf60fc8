//! Output module for on-disk item files and reports
//!
//! This module handles:
//! - Per-item directories and their `metadata.json`
//! - Store statistics for `--stats`
//! - Printing run counters

mod metadata;
pub mod stats;

pub use metadata::{item_directory, read_metadata, write_metadata, METADATA_FILE};
pub use stats::{
    load_statistics, print_crawl_stats, print_statistics, summarize_items, StoreStatistics,
};
