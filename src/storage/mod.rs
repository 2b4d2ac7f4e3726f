//! Durable price history storage

pub mod repository;

pub use repository::{CsvPriceRepository, CSV_HEADER};
