//! URL handling module for sb-harvest
//!
//! This module provides resource URL resolution, listing pagination URLs, and
//! the slug/title helpers used to name per-item directories.

mod normalize;
mod slug;

// Re-export main functions
pub use normalize::{listing_page_url, resolve_resource_url, site_origin};
pub use slug::{identity_from_url, slugify};
