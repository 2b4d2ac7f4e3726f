//! Configuration loader

use config::{Config, Environment, File};
use std::path::{Path, PathBuf};

use super::types::{AppConfig, CardmarketConfig, PollingConfig, StorageConfig};
use crate::common::errors::{Result, TrackerError};

/// Load configuration from file and environment variables
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with APP__, e.g. APP__POLLING__INTERVAL_SECONDS)
/// 2. Configuration file (TOML format)
/// 3. Default values
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let mut builder = Config::builder();

    if let Some(path) = config_path {
        if Path::new(path).exists() {
            builder = builder.add_source(File::with_name(path).required(false));
        }
    }

    builder = builder.add_source(
        Environment::with_prefix("APP")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder
        .build()
        .map_err(|e| TrackerError::Configuration(e.to_string()))?;

    let app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| TrackerError::Configuration(e.to_string()))?;

    validate(&app_config)?;
    Ok(app_config)
}

/// Load configuration from CARDMARKET_* environment variables only
pub fn load_from_env() -> Result<AppConfig> {
    // Try to load from .env file
    dotenvy::dotenv().ok();

    let defaults = CardmarketConfig::default();
    let cardmarket = CardmarketConfig {
        api_base_url: std::env::var("CARDMARKET_API_BASE_URL").unwrap_or(defaults.api_base_url),
        app_token: std::env::var("CARDMARKET_APP_TOKEN").ok(),
        app_secret: std::env::var("CARDMARKET_APP_SECRET").ok(),
        request_timeout_seconds: env_number("CARDMARKET_REQUEST_TIMEOUT_SECONDS")?
            .unwrap_or(defaults.request_timeout_seconds),
        health_check_timeout_seconds: env_number("CARDMARKET_HEALTH_CHECK_TIMEOUT_SECONDS")?
            .unwrap_or(defaults.health_check_timeout_seconds),
    };

    let polling_defaults = PollingConfig::default();
    let polling = PollingConfig {
        interval_seconds: env_number("CARDMARKET_POLL_INTERVAL_SECONDS")?
            .unwrap_or(polling_defaults.interval_seconds),
        max_concurrent_requests: polling_defaults.max_concurrent_requests,
    };

    let storage = match std::env::var("CARDMARKET_DATA_DIRECTORY") {
        Ok(dir) => StorageConfig {
            data_directory: PathBuf::from(dir),
            exports_directory: None,
        },
        Err(_) => StorageConfig::default(),
    };

    let app_config = AppConfig {
        cardmarket,
        polling,
        storage,
        ..AppConfig::default()
    };
    validate(&app_config)?;
    Ok(app_config)
}

fn env_number(key: &str) -> Result<Option<u64>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| TrackerError::Configuration(format!("{}: {}", key, e))),
        Err(_) => Ok(None),
    }
}

fn validate(config: &AppConfig) -> Result<()> {
    if config.polling.interval_seconds == 0 {
        return Err(TrackerError::Configuration(
            "polling.interval_seconds must be greater than zero".to_string(),
        ));
    }
    if config.cardmarket.request_timeout_seconds == 0
        || config.cardmarket.health_check_timeout_seconds == 0
    {
        return Err(TrackerError::Configuration(
            "cardmarket timeouts must be greater than zero".to_string(),
        ));
    }
    url::Url::parse(&config.cardmarket.api_base_url)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_config_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[cardmarket]
api_base_url = "https://example.com/api"

[polling]
interval_seconds = 60

[storage]
data_directory = "/tmp/cardmarket-data"

[[watchlist]]
product_id = "abc"
product_name = "Alpha"
product_url = "https://example.com/card"
condition = "NM"
"#
        )
        .unwrap();

        let config = load_config(path.to_str()).unwrap();
        assert_eq!(config.cardmarket.api_base_url, "https://example.com/api");
        assert_eq!(config.cardmarket.request_timeout_seconds, 10);
        assert_eq!(config.polling.interval_seconds, 60);
        assert_eq!(
            config.storage.data_directory,
            PathBuf::from("/tmp/cardmarket-data")
        );
        assert_eq!(config.watchlist.len(), 1);
        assert_eq!(config.watchlist[0].condition.as_deref(), Some("NM"));
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = load_config(Some("does-not-exist.toml")).unwrap();
        assert_eq!(config.polling.interval_seconds, 900);
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let mut config = AppConfig::default();
        config.polling.interval_seconds = 0;
        assert!(matches!(
            validate(&config),
            Err(TrackerError::Configuration(_))
        ));
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let mut config = AppConfig::default();
        config.cardmarket.api_base_url = "not a url".to_string();
        assert!(matches!(validate(&config), Err(TrackerError::InvalidUrl(_))));
    }
}
