use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigResult;
use sha2::{Digest, Sha256};
use std::path::Path;

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
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use refindex::config::load_config;
///
/// let config = load_config(Path::new("refindex.toml")).unwrap();
/// println!("Origin: {}", config.source.origin);
/// ```
pub fn load_config(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration text
pub fn parse_config(content: &str) -> ConfigResult<Config> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Hex-encoded SHA-256 digest of configuration text
fn digest(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// Computes a SHA-256 hash of the configuration file content
///
/// The digest is recorded with every committed index build.
pub fn compute_config_hash(path: &Path) -> ConfigResult<String> {
    let content = std::fs::read_to_string(path)?;
    Ok(digest(&content))
}

/// Loads a configuration together with the hash of the exact text parsed
///
/// The file is read once, so the hash always describes the loaded config.
pub fn load_config_with_hash(path: &Path) -> ConfigResult<(Config, String)> {
    let content = std::fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    Ok((config, digest(&content)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::url::FollowMode;
    use crate::ConfigError;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    const VALID_CONFIG: &str = r#"
[crawler]
max-depth = 4
max-outstanding = 8
follow-mode = "same-path"

[user-agent]
crawler-name = "TestIndexer"
crawler-version = "1.0"
contact-url = "https://example.com/about"
contact-email = "admin@example.com"

[source]
origin = "https://en.cppreference.com/w/cpp"
path = "/w/cpp"

[output]
database-path = "./index.db"
"#;

    #[test]
    fn test_load_valid_config() {
        let file = create_temp_config(VALID_CONFIG);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.crawler.max_depth, 4);
        assert_eq!(config.crawler.max_outstanding, 8);
        assert_eq!(config.crawler.follow_mode, FollowMode::SamePath);
        assert_eq!(config.source.path.as_deref(), Some("/w/cpp"));
        assert_eq!(config.user_agent.crawler_name, "TestIndexer");
    }

    #[test]
    fn test_crawler_defaults_apply() {
        let content = VALID_CONFIG.replace(
            "max-depth = 4\nmax-outstanding = 8\nfollow-mode = \"same-path\"\n",
            "",
        );
        let file = create_temp_config(&content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.crawler.max_depth, 0);
        assert_eq!(config.crawler.max_outstanding, 16);
        assert_eq!(config.crawler.max_failed_retries, 3);
        assert_eq!(config.crawler.retry_backoff_ms, 2000);
        assert_eq!(config.crawler.content_types, vec!["text/html".to_string()]);
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/refindex.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let config_content = "this is not valid TOML {{{";
        let file = create_temp_config(config_content);
        let result = load_config(file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let content = VALID_CONFIG.replace("max-outstanding = 8", "max-outstanding = 0");
        let file = create_temp_config(&content);
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_compute_config_hash() {
        let config_content = "test content";
        let file = create_temp_config(config_content);

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        // Same content should produce same hash
        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64); // SHA-256 produces 64 hex characters
    }

    #[test]
    fn test_hash_matches_loaded_text() {
        let file = create_temp_config(VALID_CONFIG);
        let (config, hash) = load_config_with_hash(file.path()).unwrap();

        assert_eq!(config.crawler.max_depth, 4);
        assert_eq!(hash, digest(VALID_CONFIG));
        assert_eq!(hash, compute_config_hash(file.path()).unwrap());
    }

    #[test]
    fn test_different_content_different_hash() {
        let file1 = create_temp_config("content 1");
        let file2 = create_temp_config("content 2");

        let hash1 = compute_config_hash(file1.path()).unwrap();
        let hash2 = compute_config_hash(file2.path()).unwrap();

        assert_ne!(hash1, hash2);
    }
}
