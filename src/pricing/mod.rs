pub mod detector;
pub mod service;

pub use detector::MovementDetector;
pub use service::{ExportInfo, PollReport, PricingService, WatchlistRow};
