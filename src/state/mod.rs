//! State module for tracking download progress
//!
//! # Components
//!
//! - `AssetState`: Tracks one asset through a download pass (pending, downloading,
//!   retrying, downloaded, already present, failed)

mod asset_state;

// Re-export main types
pub use asset_state::AssetState;
