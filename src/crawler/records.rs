//! Records produced by the listing and detail parsers

use serde::{Deserialize, Serialize};

/// Audio file extension appended to every remote asset name
pub const ASSET_EXTENSION: &str = "mp3";

/// Directory (inside an item directory) holding downloaded assets
pub const ASSET_DIR: &str = "assets";

/// Linked text, used for titles
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleLink {
    pub text: Option<String>,
    pub url: Option<String>,
}

impl TitleLink {
    /// A title with text only
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            url: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: Option<String>,
    pub url: Option<String>,
}

/// Attribute values are kept verbatim, including width/height
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thumbnail {
    pub url: Option<String>,
    pub alt: Option<String>,
    pub width: Option<String>,
    pub height: Option<String>,
}

/// One content block from a listing page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingRecord {
    /// `None` when the block has no `post-` prefixed id; such records cannot be deduplicated
    pub id: Option<String>,
    pub title: TitleLink,
    pub detail_url: Option<String>,
    pub date: Option<String>,
    pub author: Author,
    pub categories: Vec<Category>,
    pub thumbnail: Option<Thumbnail>,
    pub excerpt: Option<String>,
}

impl ListingRecord {
    /// Title text, falling back to the id
    pub fn display_title(&self) -> String {
        self.title
            .text
            .clone()
            .or_else(|| self.id.clone())
            .unwrap_or_default()
    }
}

/// A downloadable clip referenced by a detail page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRef {
    /// 1-based scan position; only unique within one parse
    pub position_id: u32,
    pub label: String,
    pub remote_name: String,
    pub remote_path: String,
    /// Set once the file is written and verified, relative to the item directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_relative_path: Option<String>,
}

impl AssetRef {
    /// Whether the remote name can be used as a single file name under [`ASSET_DIR`]
    pub fn has_safe_name(&self) -> bool {
        is_safe_asset_name(&self.remote_name)
    }

    /// Local path of this asset relative to its item directory
    ///
    /// Derived from the remote name rather than the position, so re-ordered buttons
    /// map to the same files.
    pub fn relative_path(&self) -> String {
        format!("{}/{}.{}", ASSET_DIR, self.remote_name, ASSET_EXTENSION)
    }
}

/// Checks that an asset name stays inside the asset directory
///
/// Accepts ASCII letters, digits, `-`, `_` and `.`, but not `.` or `..` on their own.
pub fn is_safe_asset_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Parsed detail page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailRecord {
    pub id: String,
    pub title: String,
    /// Detail page URL, sent as `Referer` when fetching assets
    pub source_url: String,
    pub base_path: String,
    pub assets: Vec<AssetRef>,
}
