//! Asset downloader
//!
//! Downloads the audio clips of one detail record into `<item_dir>/assets/`.
//!
//! # Per-asset flow
//!
//! | Condition | Action |
//! |-----------|--------|
//! | Name is not a plain file name | FailedPermanent, no request |
//! | Non-empty file already on disk | AlreadyPresent, no request |
//! | Empty file on disk | Delete, then download |
//! | Empty response body | Integrity failure, retry |
//! | Empty file after write | Integrity failure, retry |
//! | Network error | Retry |
//! | All attempts failed | FailedPermanent, dropped from the record |
//!
//! Attempt n is followed by a `n * retry_base_delay` pause. Assets are processed in
//! batches of `batch_size` running concurrently, with `batch_delay` between batches.

use crate::config::{DownloadConfig, HttpConfig};
use crate::crawler::fetcher::{FetchOptions, Fetcher};
use crate::crawler::records::{AssetRef, DetailRecord, ASSET_DIR};
use crate::output::write_metadata;
use crate::state::AssetState;
use crate::url::{resolve_resource_url, site_origin};
use crate::HarvestError;
use futures::future::join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;

/// Counts from one download pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadSummary {
    /// Satisfied by a file already on disk
    pub already_present: usize,
    /// Fetched and verified during this pass
    pub downloaded: usize,
    /// Dropped after exhausting every attempt
    pub failed: usize,
    pub total: usize,
}

/// Downloads assets with skip-if-present, retry and integrity checks
pub struct AssetDownloader {
    fetcher: Arc<dyn Fetcher>,
    http: HttpConfig,
    config: DownloadConfig,
}

impl AssetDownloader {
    pub fn new(fetcher: Arc<dyn Fetcher>, http: HttpConfig, config: DownloadConfig) -> Self {
        Self {
            fetcher,
            http,
            config,
        }
    }

    /// Downloads every asset of `detail` into `item_dir`
    ///
    /// On return, surviving assets have `local_relative_path` set and assets that
    /// failed every attempt have been removed from `detail.assets`. When anything
    /// was removed, `<item_dir>/metadata.json` is rewritten to match.
    pub async fn download_assets(
        &self,
        detail: &mut DetailRecord,
        item_dir: &Path,
    ) -> Result<DownloadSummary, HarvestError> {
        let total = detail.assets.len();
        let mut summary = DownloadSummary {
            total,
            ..Default::default()
        };

        if total == 0 {
            return Ok(summary);
        }

        tokio::fs::create_dir_all(item_dir.join(ASSET_DIR)).await?;

        let origin = site_origin(&detail.source_url)?;
        let options = FetchOptions::asset(&self.http, &detail.source_url);
        let batch_size = self.config.batch_size.max(1);

        let mut outcomes = Vec::with_capacity(total);
        for (index, batch) in detail.assets.chunks(batch_size).enumerate() {
            if index > 0 {
                tokio::time::sleep(self.config.batch_delay()).await;
            }

            let results = join_all(
                batch
                    .iter()
                    .map(|asset| self.process_asset(asset, item_dir, &origin, &options)),
            )
            .await;
            outcomes.extend(results);
        }

        let mut kept = Vec::with_capacity(total);
        for (mut asset, state) in detail.assets.drain(..).zip(outcomes) {
            match state {
                AssetState::AlreadyPresent | AssetState::Downloaded => {
                    if state == AssetState::AlreadyPresent {
                        summary.already_present += 1;
                    } else {
                        summary.downloaded += 1;
                    }
                    asset.local_relative_path = Some(asset.relative_path());
                    kept.push(asset);
                }
                _ => {
                    summary.failed += 1;
                    tracing::warn!(
                        "Dropping asset {} ({}) from {}",
                        asset.remote_name,
                        asset.label,
                        detail.id
                    );
                }
            }
        }
        detail.assets = kept;

        if summary.failed > 0 {
            write_metadata(item_dir, detail).await?;
        }

        tracing::info!(
            "Assets for {}: {} downloaded, {} already present, {} failed, {} total",
            detail.id,
            summary.downloaded,
            summary.already_present,
            summary.failed,
            summary.total
        );

        Ok(summary)
    }

    /// Runs one asset to a terminal state
    async fn process_asset(
        &self,
        asset: &AssetRef,
        item_dir: &Path,
        origin: &Url,
        options: &FetchOptions,
    ) -> AssetState {
        let mut state = AssetState::Pending;

        if !asset.has_safe_name() {
            tracing::warn!("Refusing asset with unusable name {:?}", asset.remote_name);
            advance(&mut state, AssetState::FailedPermanent, &asset.remote_name);
            return state;
        }

        let path = item_dir.join(asset.relative_path());

        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.len() > 0 => {
                advance(&mut state, AssetState::AlreadyPresent, &asset.remote_name);
                return state;
            }
            Ok(_) => {
                tracing::debug!("Removing empty file {}", path.display());
                if let Err(e) = tokio::fs::remove_file(&path).await {
                    tracing::warn!("Failed to remove empty file {}: {}", path.display(), e);
                }
            }
            Err(_) => {}
        }

        advance(&mut state, AssetState::Downloading, &asset.remote_name);

        let url = match resolve_resource_url(&asset.remote_path, origin) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("Unusable asset path {}: {}", asset.remote_path, e);
                advance(&mut state, AssetState::FailedPermanent, &asset.remote_name);
                return state;
            }
        };

        let max_attempts = self.config.max_attempts.max(1);
        for attempt in 1..=max_attempts {
            match self.fetch_and_write(url.as_str(), &path, options).await {
                Ok(bytes) => {
                    tracing::debug!("Downloaded {} ({} bytes)", url, bytes);
                    advance(&mut state, AssetState::Downloaded, &asset.remote_name);
                    return state;
                }
                Err(e) => {
                    tracing::warn!(
                        "Attempt {}/{} for {} failed: {}",
                        attempt,
                        max_attempts,
                        url,
                        e
                    );
                    if attempt < max_attempts {
                        advance(&mut state, AssetState::Retrying(attempt), &asset.remote_name);
                        tokio::time::sleep(self.config.retry_delay(attempt)).await;
                        advance(&mut state, AssetState::Downloading, &asset.remote_name);
                    }
                }
            }
        }

        advance(&mut state, AssetState::FailedPermanent, &asset.remote_name);
        state
    }

    /// One attempt: fetch, write to a partial file, verify, move into place
    async fn fetch_and_write(
        &self,
        url: &str,
        path: &Path,
        options: &FetchOptions,
    ) -> Result<u64, HarvestError> {
        let body = self.fetcher.fetch(url, options).await?;
        if body.is_empty() {
            return Err(HarvestError::Integrity {
                path: path.to_path_buf(),
                message: "empty response body".to_string(),
            });
        }

        let partial = partial_path(path);
        tokio::fs::write(&partial, &body).await?;

        let written = tokio::fs::metadata(&partial).await?.len();
        if written == 0 {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(HarvestError::Integrity {
                path: path.to_path_buf(),
                message: "file is empty after write".to_string(),
            });
        }

        tokio::fs::rename(&partial, path).await?;
        Ok(written)
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}

fn advance(state: &mut AssetState, next: AssetState, name: &str) {
    debug_assert!(
        state.can_transition_to(next),
        "illegal asset transition {} -> {}",
        state,
        next
    );
    tracing::trace!("Asset {}: {} -> {}", name, state, next);
    *state = next;
}
