//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop that ties everything together:
//! - Opening the item store
//! - Walking listing pages until the new-item quota or the end of the listing
//! - Classifying each listing record as new or already known
//! - Crawling detail pages, writing metadata and downloading assets
//! - Single-target runs for one detail page

use crate::config::Config;
use crate::crawler::detail::parse_detail;
use crate::crawler::downloader::AssetDownloader;
use crate::crawler::fetcher::{FetchOptions, Fetcher, HttpFetcher};
use crate::crawler::parser::{PageParser, SoundboardParser};
use crate::crawler::records::ListingRecord;
use crate::output::{item_directory, write_metadata};
use crate::storage::{open_store, ItemStore, ItemUpdate, SnapshotStore};
use crate::url::{identity_from_url, listing_page_url, resolve_resource_url, site_origin};
use crate::HarvestError;
use std::sync::Arc;
use tracing::Instrument;
use url::Url;

/// Counters for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlStats {
    /// Listing records seen (or 1 in single-target mode)
    pub total: usize,
    /// Items stored for the first time
    pub new: usize,
    /// Items already known and refreshed
    pub updated: usize,
    /// Item-level failures
    pub errors: usize,
    pub details_crawled: usize,
    pub pages_scanned: usize,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    store: SnapshotStore,
    fetcher: Arc<dyn Fetcher>,
    parser: Arc<dyn PageParser>,
    downloader: AssetDownloader,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The validated configuration
    /// * `fetcher` - Network capability shared with the downloader
    /// * `parser` - Site parser
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Store opened and locked
    /// * `Err(HarvestError)` - Failed to open the store
    pub fn new(
        config: Config,
        fetcher: Arc<dyn Fetcher>,
        parser: Arc<dyn PageParser>,
    ) -> Result<Self, HarvestError> {
        let store = open_store(&config.output)?;
        tracing::info!(
            "Store {} holds {} items",
            store.path().display(),
            store.len()
        );

        let downloader = AssetDownloader::new(
            fetcher.clone(),
            config.http.clone(),
            config.download.clone(),
        );

        Ok(Self {
            config: Arc::new(config),
            store,
            fetcher,
            parser,
            downloader,
        })
    }

    /// Creates a coordinator with the HTTP fetcher and the soundboard parser
    pub fn from_config(config: Config) -> Result<Self, HarvestError> {
        let fetcher = Arc::new(HttpFetcher::new(&config.user_agent)?);

        let origin_source = config
            .crawler
            .target_url
            .as_deref()
            .unwrap_or(&config.crawler.listing_url);
        let parser = Arc::new(SoundboardParser::new(site_origin(origin_source)?));

        Self::new(config, fetcher, parser)
    }

    /// Read access to the store, mainly for reporting
    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Runs one crawl
    ///
    /// Single-target mode when `target-url` is set, paginated otherwise. The store
    /// is flushed whether or not the run succeeds.
    pub async fn run(&mut self) -> Result<CrawlStats, HarvestError> {
        let target = self.config.crawler.target_url.clone();
        let mode = if target.is_some() { "single" } else { "paginated" };
        let span = tracing::info_span!("crawl", mode);

        let result = async {
            match target.as_deref() {
                Some(url) => self.run_single(url).await,
                None => self.run_paginated().await,
            }
        }
        .instrument(span)
        .await;

        let flushed = self.store.flush();
        let stats = result?;
        flushed?;

        tracing::info!(
            "Crawl finished: {} total, {} new, {} updated, {} errors, {} details, {} pages",
            stats.total,
            stats.new,
            stats.updated,
            stats.errors,
            stats.details_crawled,
            stats.pages_scanned
        );
        Ok(stats)
    }

    /// Crawls exactly one detail page
    ///
    /// The id is the URL's last path segment and the title is derived from it.
    async fn run_single(&mut self, url: &str) -> Result<CrawlStats, HarvestError> {
        let (id, title) = identity_from_url(url)?;
        tracing::info!("Crawling single target {} ({})", url, id);

        let is_new = self.crawl_item(None, &id, &title, url).await?;

        Ok(CrawlStats {
            total: 1,
            new: usize::from(is_new),
            updated: usize::from(!is_new),
            errors: 0,
            details_crawled: 1,
            pages_scanned: 0,
        })
    }

    /// Walks listing pages until an empty page, a fetch failure or the quota
    async fn run_paginated(&mut self) -> Result<CrawlStats, HarvestError> {
        let listing_url = self.config.crawler.listing_url.clone();
        let listing_origin = site_origin(&listing_url)?;
        let quota = self.config.crawler.max_new_items;
        let options = FetchOptions::page(&self.config.http);

        let mut stats = CrawlStats::default();
        let mut new_items_found = 0usize;
        let mut page = 1u32;

        tracing::info!(
            "Starting paginated crawl of {} (quota {} new items)",
            listing_url,
            quota
        );

        'pages: loop {
            let page_url = listing_page_url(&listing_url, page);
            tracing::info!("Scanning listing page {}: {}", page, page_url);

            let html = match self.fetcher.fetch_text(&page_url, &options).await {
                Ok(html) => html,
                Err(e) => {
                    tracing::error!("Failed to fetch listing page {}: {}", page_url, e);
                    break;
                }
            };
            stats.pages_scanned += 1;

            let records = self.parser.parse_listing(&html);
            if records.is_empty() {
                tracing::info!("Listing page {} has no records, stopping", page);
                break;
            }
            tracing::debug!("Listing page {} has {} records", page, records.len());

            for record in &records {
                stats.total += 1;

                let Some(id) = record.id.as_deref() else {
                    tracing::warn!(
                        "Skipping listing record without id: {:?}",
                        record.display_title()
                    );
                    continue;
                };

                if self.store.has(id) {
                    match self.store.upsert(id, ItemUpdate::from_listing(record)) {
                        Ok(_) => {
                            stats.updated += 1;
                            tracing::debug!("Refreshed known item {}", id);
                        }
                        Err(e) => {
                            stats.errors += 1;
                            tracing::error!("Failed to refresh item {}: {}", id, e);
                        }
                    }
                    continue;
                }

                if new_items_found >= quota {
                    tracing::debug!("Deferring new item {}: quota reached", id);
                    continue;
                }
                new_items_found += 1;

                match self.crawl_listing_record(record, id, &listing_origin).await {
                    Ok(is_new) => {
                        stats.details_crawled += 1;
                        if is_new {
                            stats.new += 1;
                        } else {
                            stats.updated += 1;
                        }
                    }
                    Err(e) => {
                        stats.errors += 1;
                        tracing::error!("Failed to crawl item {}: {}", id, e);
                    }
                }

                if new_items_found >= quota {
                    tracing::info!("Reached quota of {} new items", quota);
                    break 'pages;
                }
            }

            if new_items_found >= quota {
                break;
            }

            page += 1;
            tokio::time::sleep(self.config.crawler.page_delay()).await;
        }

        Ok(stats)
    }

    /// Crawls a new listing record through its detail page
    async fn crawl_listing_record(
        &mut self,
        record: &ListingRecord,
        id: &str,
        listing_origin: &Url,
    ) -> Result<bool, HarvestError> {
        let href = record
            .detail_url
            .as_deref()
            .or(record.title.url.as_deref())
            .ok_or_else(|| HarvestError::Parse {
                url: self.config.crawler.listing_url.clone(),
                message: format!("record {} has no detail link", id),
            })?;
        let detail_url = resolve_resource_url(href, listing_origin)?;
        let title = record.display_title();

        tracing::info!("New item {}: {}", id, title);
        self.crawl_item(Some(record), id, &title, detail_url.as_str())
            .await
    }

    /// Detail crawl, metadata file, asset download, then upsert
    ///
    /// # Returns
    ///
    /// Whether the item was new to the store
    async fn crawl_item(
        &mut self,
        listing: Option<&ListingRecord>,
        id: &str,
        title: &str,
        detail_url: &str,
    ) -> Result<bool, HarvestError> {
        let options = FetchOptions::page(&self.config.http);
        let html = self.fetcher.fetch_text(detail_url, &options).await?;

        let mut detail = parse_detail(
            self.fetcher.as_ref(),
            self.parser.as_ref(),
            &options,
            &html,
            detail_url,
            id,
            title,
        )
        .await?;

        let item_dir = item_directory(&self.config.output.output_dir, title, id);
        write_metadata(&item_dir, &detail).await?;

        let summary = self
            .downloader
            .download_assets(&mut detail, &item_dir)
            .await?;

        let update = listing
            .map(ItemUpdate::from_listing)
            .unwrap_or_default()
            .with_detail(&detail);
        let is_new = self.store.upsert(id, update)?;

        tracing::info!(
            "Stored {} ({}): {} of {} assets on disk",
            id,
            if is_new { "new" } else { "updated" },
            summary.downloaded + summary.already_present,
            summary.total
        );
        Ok(is_new)
    }
}

/// Builds a coordinator from configuration and runs it
pub async fn run_crawl(config: Config) -> Result<CrawlStats, HarvestError> {
    let mut coordinator = Coordinator::from_config(config)?;
    coordinator.run().await
}
