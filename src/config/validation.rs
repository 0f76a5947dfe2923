use crate::config::types::{Config, CrawlerConfig, OutputConfig, SourceConfig, UserAgentConfig};
use crate::ConfigError;
use regex::Regex;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_source_config(&config.source)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_outstanding < 1 || config.max_outstanding > 256 {
        return Err(ConfigError::Validation(format!(
            "max_outstanding must be between 1 and 256, got {}",
            config.max_outstanding
        )));
    }

    if config.fetch_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "fetch_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.content_types.is_empty() {
        return Err(ConfigError::Validation(
            "content_types must list at least one accepted type".to_string(),
        ));
    }

    for filter in &config.url_filters {
        Regex::new(filter)
            .map_err(|e| ConfigError::InvalidFilter(format!("'{}': {}", filter, e)))?;
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

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates the crawl source
fn validate_source_config(config: &SourceConfig) -> Result<(), ConfigError> {
    let origin = Url::parse(&config.origin).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid origin '{}': {}", config.origin, e))
    })?;

    if origin.scheme() != "http" && origin.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "Origin '{}' must use HTTP or HTTPS",
            config.origin
        )));
    }

    if let Some(path) = &config.path {
        if !path.starts_with('/') {
            return Err(ConfigError::Validation(format!(
                "Source path '{}' must start with '/'",
                path
            )));
        }
    }

    for url in &config.blacklist {
        Url::parse(url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid blacklist URL '{}': {}", url, e))
        })?;
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
