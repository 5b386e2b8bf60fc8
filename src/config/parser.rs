use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Values supplied on the command line or through the environment
///
/// `None` leaves the file/default value untouched.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub max_new_items: Option<usize>,
    pub target_url: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub database_path: Option<PathBuf>,
}

impl Overrides {
    /// Applies the overrides on top of `config`
    pub fn apply(self, config: &mut Config) {
        if let Some(max) = self.max_new_items {
            config.crawler.max_new_items = max;
        }
        if let Some(target) = self.target_url.filter(|t| !t.trim().is_empty()) {
            config.crawler.target_url = Some(target);
        }
        if let Some(dir) = self.output_dir {
            config.output.output_dir = dir;
        }
        if let Some(path) = self.database_path {
            config.output.database_path = path;
        }
    }
}

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so runs can be matched to the configuration they used.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}
