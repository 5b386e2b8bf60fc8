//! Detail page crawl: markup plus the two scripts it references

use crate::crawler::fetcher::{FetchOptions, Fetcher};
use crate::crawler::parser::PageParser;
use crate::crawler::records::DetailRecord;
use crate::HarvestError;

/// Parses a detail page into a [`DetailRecord`]
///
/// 1. Locates the sounds and behavior scripts (missing either is a parse error)
/// 2. Fetches both scripts concurrently
/// 3. Extracts the audio base path from the behavior script, falling back to the
///    default when it cannot be found
/// 4. Turns the page's buttons into assets
///
/// # Arguments
///
/// * `fetcher` - Used for the two script fetches
/// * `parser` - Site parser
/// * `options` - Request options for the script fetches
/// * `html` - Detail page markup
/// * `source_url` - URL the markup came from
/// * `id` / `title` - Identity of the item being crawled
pub async fn parse_detail(
    fetcher: &dyn Fetcher,
    parser: &dyn PageParser,
    options: &FetchOptions,
    html: &str,
    source_url: &str,
    id: &str,
    title: &str,
) -> Result<DetailRecord, HarvestError> {
    let parse_error = |message: String| HarvestError::Parse {
        url: source_url.to_string(),
        message,
    };

    let resources = parser.detail_resources(html).map_err(parse_error)?;
    tracing::debug!(
        "Detail resources for {}: sounds={} behavior={}",
        id,
        resources.sounds_url,
        resources.behavior_url
    );

    let (sounds, behavior) = tokio::try_join!(
        fetcher.fetch_text(resources.sounds_url.as_str(), options),
        fetcher.fetch_text(resources.behavior_url.as_str(), options),
    )?;
    tracing::debug!(
        "Fetched scripts for {} ({} + {} bytes)",
        id,
        sounds.len(),
        behavior.len()
    );

    let base_path = parser.extract_base_path(&behavior);
    let assets = parser.parse_assets(html, &base_path).map_err(parse_error)?;

    Ok(DetailRecord {
        id: id.to_string(),
        title: title.to_string(),
        source_url: source_url.to_string(),
        base_path,
        assets,
    })
}
