//! CardmarketWatch Library
//!
//! Polls Cardmarket listings for watched products, keeps an append-only
//! price history per product and raises alerts on price movements.

pub mod cardmarket;
pub mod common;
pub mod config;
pub mod notifications;
pub mod pricing;
pub mod scheduler;
pub mod storage;
pub mod watchlist;

// Re-export commonly used types
pub use cardmarket::CardmarketRestClient;
pub use common::errors::{Result, TrackerError};
pub use common::traits::{Notifier, SnapshotSource};
pub use common::types::{
    HealthStatus, PriceAlert, PriceEntry, PriceHistory, ProductFilter, WatchItem,
};
pub use config::types::AppConfig;
pub use notifications::{ChannelNotifier, LogNotifier, NullNotifier};
pub use pricing::{ExportInfo, MovementDetector, PollReport, PricingService, WatchlistRow};
pub use scheduler::{PollingScheduler, SchedulerState, SharedWatchItems};
pub use storage::CsvPriceRepository;
pub use watchlist::WatchlistService;
