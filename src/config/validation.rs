use crate::config::types::{
    Config, CrawlerConfig, DownloadConfig, HttpConfig, OutputConfig, UserAgentConfig,
};
use crate::ConfigError;
use url::Url;

/// Upper bound on concurrent asset fetches
const MAX_BATCH_SIZE: usize = 16;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_http_config(&config.http)?;
    validate_download_config(&config.download)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
///
/// `max_new_items = 0` is allowed and turns the run into a refresh of known items.
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    validate_http_url("listing_url", &config.listing_url)?;

    if let Some(target) = &config.target_url {
        validate_http_url("target_url", target)?;
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    Ok(())
}

fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.page_timeout_secs < 1 || config.asset_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeouts must be >= 1s, got page={}s asset={}s",
            config.page_timeout_secs, config.asset_timeout_secs
        )));
    }

    Ok(())
}

fn validate_download_config(config: &DownloadConfig) -> Result<(), ConfigError> {
    if config.batch_size < 1 || config.batch_size > MAX_BATCH_SIZE {
        return Err(ConfigError::Validation(format!(
            "batch_size must be between 1 and {}, got {}",
            MAX_BATCH_SIZE, config.batch_size
        )));
    }

    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.output_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "output_dir cannot be empty".to_string(),
        ));
    }

    if config.database_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.flush_every < 1 {
        return Err(ConfigError::Validation(format!(
            "flush_every must be >= 1, got {}",
            config.flush_every
        )));
    }

    Ok(())
}

/// Requires an absolute http(s) URL
fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "{} '{}' must use http or https",
            field, value
        )));
    }

    Ok(())
}
