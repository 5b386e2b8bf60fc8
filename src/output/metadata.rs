//! Per-item metadata files
//!
//! Each crawled item gets a directory under the output root, named after its
//! slugified title, holding `metadata.json` and an `assets/` folder.

use crate::crawler::DetailRecord;
use crate::url::slugify;
use crate::HarvestError;
use std::path::{Path, PathBuf};

/// File name of the per-item metadata document
pub const METADATA_FILE: &str = "metadata.json";

/// Directory for one item: `<output_dir>/<slug(title)>`, or the slugified id when
/// the title has no usable characters
pub fn item_directory(output_dir: &Path, title: &str, id: &str) -> PathBuf {
    let slug = slugify(title);
    let name = if slug.is_empty() { slugify(id) } else { slug };
    output_dir.join(name)
}

/// Writes `<item_dir>/metadata.json` atomically (temp file + rename)
pub async fn write_metadata(item_dir: &Path, detail: &DetailRecord) -> Result<PathBuf, HarvestError> {
    tokio::fs::create_dir_all(item_dir).await?;

    let path = item_dir.join(METADATA_FILE);
    let tmp = path.with_extension("json.tmp");
    let payload = serde_json::to_vec_pretty(detail)?;

    tokio::fs::write(&tmp, &payload).await?;
    tokio::fs::rename(&tmp, &path).await?;

    tracing::debug!(
        "Wrote metadata for {} ({} assets) to {}",
        detail.id,
        detail.assets.len(),
        path.display()
    );
    Ok(path)
}

/// Reads a metadata document back
pub async fn read_metadata(item_dir: &Path) -> Result<DetailRecord, HarvestError> {
    let content = tokio::fs::read(item_dir.join(METADATA_FILE)).await?;
    Ok(serde_json::from_slice(&content)?)
}
