//! Poll pipeline and the read API used by presentation layers

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::detector::MovementDetector;
use crate::common::errors::{Result, TrackerError};
use crate::common::traits::{Notifier, SnapshotSource};
use crate::common::types::{PriceAlert, PriceEntry, WatchItem};
use crate::storage::CsvPriceRepository;

/// Outcome of one poll run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollReport {
    /// Items that returned a non-empty snapshot and were stored
    pub polled: usize,
    /// Entries appended across all items
    pub stored_entries: usize,
    /// Alerts handed to the notifier
    pub alerts: Vec<PriceAlert>,
}

/// Display row for one watched product
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatchlistRow {
    pub item: WatchItem,
    pub latest_entry: Option<PriceEntry>,
    pub latest_price: Option<Decimal>,
    pub last_updated: Option<DateTime<Utc>>,
    pub has_history: bool,
    pub entry_count: usize,
}

/// Metadata for one exported record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportInfo {
    /// File stem, i.e. the sanitised product id
    pub id: String,
    pub path: PathBuf,
    pub filename: String,
    pub modified: DateTime<Utc>,
    /// Size in KiB, one decimal place
    pub size_kb: Decimal,
}

/// Wires fetch, storage, detection and delivery together
pub struct PricingService {
    source: Arc<dyn SnapshotSource>,
    repository: Arc<CsvPriceRepository>,
    notifier: Arc<dyn Notifier>,
    detector: MovementDetector,
}

impl PricingService {
    pub fn new(
        source: Arc<dyn SnapshotSource>,
        repository: Arc<CsvPriceRepository>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self::with_detector(source, repository, notifier, MovementDetector::default())
    }

    pub fn with_detector(
        source: Arc<dyn SnapshotSource>,
        repository: Arc<CsvPriceRepository>,
        notifier: Arc<dyn Notifier>,
        detector: MovementDetector,
    ) -> Self {
        Self {
            source,
            repository,
            notifier,
            detector,
        }
    }

    pub fn repository(&self) -> &CsvPriceRepository {
        &self.repository
    }

    /// Fetch, store and diff every item, then deliver the collected alerts
    /// in one notifier call.
    ///
    /// A storage failure skips only the affected item. A notifier failure is
    /// returned after all items have been stored.
    #[instrument(skip_all, fields(items = watch_items.len()))]
    pub async fn poll_watch_items(&self, watch_items: &[WatchItem]) -> Result<PollReport> {
        let mut report = PollReport::default();
        if watch_items.is_empty() {
            debug!("No watch items, skipping poll");
            return Ok(report);
        }

        let snapshots = self.source.fetch_bulk_snapshots(watch_items).await;

        for item in watch_items {
            let Some(entries) = snapshots.get(&item.product_id) else {
                continue;
            };
            if entries.is_empty() {
                debug!("Empty snapshot for {}", item.product_id);
                continue;
            }

            match self.store_and_detect(item, entries).await {
                Ok(alert) => {
                    report.polled += 1;
                    report.stored_entries += entries.len();
                    report.alerts.extend(alert);
                }
                Err(e) => {
                    warn!("Skipping {} after storage error: {}", item.product_id, e);
                }
            }
        }

        if !report.alerts.is_empty() {
            info!(
                "Sending {} alerts via {} notifier",
                report.alerts.len(),
                self.notifier.name()
            );
            self.notifier.send(&report.alerts).await?;
        }

        Ok(report)
    }

    /// Read the previous entry, append the snapshot and diff, on the blocking pool
    async fn store_and_detect(
        &self,
        item: &WatchItem,
        entries: &[PriceEntry],
    ) -> Result<Option<PriceAlert>> {
        let repository = Arc::clone(&self.repository);
        let detector = self.detector;
        let item = item.clone();
        let entries = entries.to_vec();

        tokio::task::spawn_blocking(move || -> Result<Option<PriceAlert>> {
            let previous = repository.latest_entry(&item)?;
            repository.append_entries(&item, &entries)?;
            Ok(detector.detect(&item, &entries, previous.as_ref()))
        })
        .await
        .map_err(|e| TrackerError::Internal(format!("storage task failed: {}", e)))?
    }

    /// Latest price, freshness and history size for each item, in input order
    pub fn watchlist_snapshot(&self, watch_items: &[WatchItem]) -> Result<Vec<WatchlistRow>> {
        watch_items
            .iter()
            .map(|item| {
                let latest_entry = self.repository.latest_entry(item)?;
                let entry_count = self.repository.entry_count(item)?;
                Ok(WatchlistRow {
                    item: item.clone(),
                    latest_price: latest_entry.as_ref().map(|entry| entry.price_eur),
                    last_updated: latest_entry.as_ref().map(|entry| entry.fetched_at),
                    latest_entry,
                    has_history: entry_count > 0,
                    entry_count,
                })
            })
            .collect()
    }

    /// Full chronological history of one item
    pub fn history_for(&self, watch_item: &WatchItem) -> Result<Vec<PriceEntry>> {
        self.repository.load_history(watch_item, None)
    }

    pub fn export_watch_item(
        &self,
        watch_item: &WatchItem,
        destination: Option<&Path>,
    ) -> Result<PathBuf> {
        self.repository.export(watch_item, destination)
    }

    /// Exported records, most recently modified first
    pub fn export_snapshot(&self) -> Result<Vec<ExportInfo>> {
        let mut exports = Vec::new();
        for path in self.repository.list_exports()? {
            let metadata = match fs::metadata(&path) {
                Ok(metadata) => metadata,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            let modified = DateTime::<Utc>::from(metadata.modified()?);
            let size_kb = (Decimal::from(metadata.len()) / Decimal::from(1024u32)).round_dp(1);

            exports.push(ExportInfo {
                id: file_component(path.file_stem()),
                filename: file_component(path.file_name()),
                path,
                modified,
                size_kb,
            });
        }
        exports.sort_by(|a, b| b.modified.cmp(&a.modified));
        Ok(exports)
    }
}

fn file_component(component: Option<&std::ffi::OsStr>) -> String {
    component
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
