//! Storage module for persisting crawled items
//!
//! This module handles everything the crawler remembers between runs:
//! - The `id → PersistedItem` snapshot file and its upsert semantics
//! - Atomic snapshot replacement and the write policy
//! - The single-writer lock guarding a store path

mod lock;
mod snapshot;
mod traits;

pub use lock::{lock_path, StoreLock};
pub use snapshot::{read_snapshot, SnapshotStore, WritePolicy};
pub use traits::{ItemStore, StoreError, StoreResult};

use crate::config::OutputConfig;
use crate::crawler::{AssetRef, Author, Category, DetailRecord, ListingRecord, Thumbnail, TitleLink};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opens the store described by the output configuration
///
/// # Arguments
///
/// * `config` - Output section; supplies the path and `flush-every`
///
/// # Returns
///
/// * `Ok(SnapshotStore)` - Store loaded (or created) and locked
/// * `Err(StoreError)` - Lock held elsewhere, unreadable or corrupt snapshot
pub fn open_store(config: &OutputConfig) -> StoreResult<SnapshotStore> {
    SnapshotStore::open(
        &config.database_path,
        WritePolicy::from_flush_every(config.flush_every),
    )
}

/// An item as stored in the snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedItem {
    pub id: String,
    #[serde(default)]
    pub title: TitleLink,
    #[serde(default)]
    pub detail_url: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub author: Author,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub thumbnail: Option<Thumbnail>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub base_path: Option<String>,
    #[serde(default)]
    pub assets: Vec<AssetRef>,
    /// Set on first insert, never changed afterwards
    pub crawled_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PersistedItem {
    /// A fresh item built from an update
    fn create(id: &str, update: ItemUpdate, now: DateTime<Utc>) -> Self {
        let mut item = Self {
            id: id.to_string(),
            title: TitleLink::default(),
            detail_url: None,
            date: None,
            author: Author::default(),
            categories: Vec::new(),
            thumbnail: None,
            excerpt: None,
            base_path: None,
            assets: Vec::new(),
            crawled_at: now,
            updated_at: now,
        };
        item.merge(update, now);
        item
    }

    /// Overwrites every field the update carries and refreshes `updated_at`
    fn merge(&mut self, update: ItemUpdate, now: DateTime<Utc>) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(detail_url) = update.detail_url {
            self.detail_url = Some(detail_url);
        }
        if let Some(date) = update.date {
            self.date = Some(date);
        }
        if let Some(author) = update.author {
            self.author = author;
        }
        if let Some(categories) = update.categories {
            self.categories = categories;
        }
        if let Some(thumbnail) = update.thumbnail {
            self.thumbnail = Some(thumbnail);
        }
        if let Some(excerpt) = update.excerpt {
            self.excerpt = Some(excerpt);
        }
        if let Some(base_path) = update.base_path {
            self.base_path = Some(base_path);
        }
        if let Some(assets) = update.assets {
            self.assets = assets;
        }
        self.updated_at = now.max(self.crawled_at);
    }

    /// Number of assets with a verified local file
    pub fn downloaded_assets(&self) -> usize {
        self.assets
            .iter()
            .filter(|a| a.local_relative_path.is_some())
            .count()
    }
}

/// Partial item passed to [`ItemStore::upsert`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemUpdate {
    pub title: Option<TitleLink>,
    pub detail_url: Option<String>,
    pub date: Option<String>,
    pub author: Option<Author>,
    pub categories: Option<Vec<Category>>,
    pub thumbnail: Option<Thumbnail>,
    pub excerpt: Option<String>,
    pub base_path: Option<String>,
    pub assets: Option<Vec<AssetRef>>,
}

impl ItemUpdate {
    /// Listing fields of a record; absent optional fields leave stored values alone
    pub fn from_listing(record: &ListingRecord) -> Self {
        Self {
            title: Some(record.title.clone()),
            detail_url: record.detail_url.clone(),
            date: record.date.clone(),
            author: Some(record.author.clone()),
            categories: Some(record.categories.clone()),
            thumbnail: record.thumbnail.clone(),
            excerpt: record.excerpt.clone(),
            base_path: None,
            assets: None,
        }
    }

    /// Adds the detail crawl result
    ///
    /// The detail title and URL only fill in when the update has none of its own.
    pub fn with_detail(mut self, detail: &DetailRecord) -> Self {
        if self.title.is_none() {
            self.title = Some(TitleLink {
                text: Some(detail.title.clone()),
                url: Some(detail.source_url.clone()),
            });
        }
        if self.detail_url.is_none() {
            self.detail_url = Some(detail.source_url.clone());
        }
        self.base_path = Some(detail.base_path.clone());
        self.assets = Some(detail.assets.clone());
        self
    }
}
