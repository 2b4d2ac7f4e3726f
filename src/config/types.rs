//! Configuration types

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::common::types::{ProductFilter, WatchItem};

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Cardmarket API configuration
    #[serde(default)]
    pub cardmarket: CardmarketConfig,
    /// Polling schedule
    #[serde(default)]
    pub polling: PollingConfig,
    /// Where price records and exports live
    #[serde(default)]
    pub storage: StorageConfig,
    /// General application settings
    #[serde(default)]
    pub settings: AppSettings,
    /// Products tracked on startup
    #[serde(default)]
    pub watchlist: Vec<WatchItemConfig>,
}

impl AppConfig {
    /// Watch items declared in the configuration
    pub fn watch_items(&self) -> Vec<WatchItem> {
        self.watchlist.iter().map(WatchItemConfig::to_watch_item).collect()
    }
}

/// Cardmarket platform configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardmarketConfig {
    /// Base URL of the marketplace API
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// App token for signed requests (not sent yet)
    #[serde(default)]
    pub app_token: Option<String>,
    /// App secret for signed requests (not sent yet)
    #[serde(default)]
    pub app_secret: Option<String>,
    /// Per-product fetch timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// Health probe timeout in seconds
    #[serde(default = "default_health_check_timeout")]
    pub health_check_timeout_seconds: u64,
}

impl Default for CardmarketConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            app_token: None,
            app_secret: None,
            request_timeout_seconds: default_request_timeout(),
            health_check_timeout_seconds: default_health_check_timeout(),
        }
    }
}

fn default_api_base_url() -> String {
    "https://api.cardmarket.com/ws/v2.0/output.json".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_health_check_timeout() -> u64 {
    5
}

/// Settings related to polling the API for price updates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Seconds between polling runs
    #[serde(default = "default_interval")]
    pub interval_seconds: u64,
    /// Upper bound on concurrent API calls. Reserved: fetches run sequentially.
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval(),
            max_concurrent_requests: default_max_concurrent_requests(),
        }
    }
}

fn default_interval() -> u64 {
    900
}

fn default_max_concurrent_requests() -> usize {
    4
}

/// Price record storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding one CSV record per product
    #[serde(default = "default_data_directory")]
    pub data_directory: PathBuf,
    /// Directory receiving exported copies, defaults to `<data_directory>/exports`
    #[serde(default)]
    pub exports_directory: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_directory: default_data_directory(),
            exports_directory: None,
        }
    }
}

impl StorageConfig {
    pub fn exports_directory(&self) -> PathBuf {
        self.exports_directory
            .clone()
            .unwrap_or_else(|| self.data_directory.join("exports"))
    }

    /// Create the data and export directories
    pub fn ensure_data_directories(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.data_directory)?;
        std::fs::create_dir_all(self.exports_directory())?;
        Ok(())
    }

    pub fn data_directory(&self) -> &Path {
        &self.data_directory
    }
}

fn default_data_directory() -> PathBuf {
    PathBuf::from("data")
}

/// Deployment environment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub environment: Environment,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            environment: Environment::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Watch list entry as written in the configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchItemConfig {
    pub product_id: String,
    pub product_name: String,
    pub product_url: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub min_quantity: Option<u32>,
}

impl WatchItemConfig {
    pub fn to_watch_item(&self) -> WatchItem {
        let mut filters = ProductFilter::new(&self.product_url)
            .with_min_quantity(self.min_quantity.unwrap_or(1));
        filters.language = self.language.clone();
        filters.condition = self.condition.clone();
        WatchItem::new(&self.product_id, &self.product_name, filters)
    }
}
