//! Trait definitions for the pluggable edges of the polling pipeline

use std::collections::HashMap;

use async_trait::async_trait;

use super::errors::Result;
use super::types::{PriceAlert, PriceEntry, WatchItem};

/// Source of price snapshots for watched products
///
/// Implementations never fail the caller: a product whose fetch failed maps
/// to an empty snapshot.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Fetch the current snapshot for a single watch item
    async fn fetch_product_snapshot(&self, watch_item: &WatchItem) -> Vec<PriceEntry>;

    /// Fetch snapshots for several watch items, keyed by product id
    ///
    /// Product ids are expected to be unique; when they are not, the last
    /// item with a given id wins.
    async fn fetch_bulk_snapshots(
        &self,
        watch_items: &[WatchItem],
    ) -> HashMap<String, Vec<PriceEntry>> {
        let mut snapshots = HashMap::with_capacity(watch_items.len());
        for item in watch_items {
            let entries = self.fetch_product_snapshot(item).await;
            snapshots.insert(item.product_id.clone(), entries);
        }
        snapshots
    }
}

/// Delivery sink for price alerts (popup, email, push, ...)
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Dispatch the provided alerts
    async fn send(&self, alerts: &[PriceAlert]) -> Result<()>;

    /// Name used in logs
    fn name(&self) -> &'static str;
}
