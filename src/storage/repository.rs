//! CSV-backed, append-only price history
//!
//! One file per product:
//!
//! ```text
//! fetched_at,price_eur,available_quantity,seller
//! 2024-05-01T12:00:00Z,12.50,4,SomeShop
//! ```
//!
//! Rows are only ever appended. Readers do not take a lock; a row that is cut
//! off or otherwise unreadable is skipped.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use tracing::{debug, trace};

use crate::common::errors::{Result, TrackerError};
use crate::common::types::{PriceEntry, WatchItem};

/// Header row written at the top of every record
pub const CSV_HEADER: &str = "fetched_at,price_eur,available_quantity,seller";

/// Appended to a row that was cut off before its newline. Whatever the
/// fragment holds, the closed line ends in an unquoted seller with a comma
/// or an empty quantity, so it never parses.
const TORN_ROW_MARKER: &str = ",,";

/// Persists price snapshots to per-product CSV files
#[derive(Debug)]
pub struct CsvPriceRepository {
    base_path: PathBuf,
    exports_path: PathBuf,
    /// Serialises appenders within this process
    write_lock: Mutex<()>,
}

impl CsvPriceRepository {
    /// Open a repository rooted at `base_path`, exporting to `base_path/exports`
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        let exports_path = base_path.join("exports");
        Self::with_exports_dir(base_path, exports_path)
    }

    /// Open a repository with an explicit export directory
    pub fn with_exports_dir(
        base_path: impl Into<PathBuf>,
        exports_path: impl Into<PathBuf>,
    ) -> Result<Self> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path)?;
        Ok(Self {
            base_path,
            exports_path: exports_path.into(),
            write_lock: Mutex::new(()),
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn exports_path(&self) -> &Path {
        &self.exports_path
    }

    /// Path of the CSV record for a watch item
    pub fn file_path_for(&self, watch_item: &WatchItem) -> PathBuf {
        self.base_path.join(Self::file_name_for(watch_item))
    }

    fn file_name_for(watch_item: &WatchItem) -> String {
        format!("{}.csv", watch_item.history().product_id.replace('/', "_"))
    }

    /// Append entries, in order, to the item's record.
    ///
    /// The header and all rows go out in a single write. A record that is
    /// empty gets its header; a record whose last row was cut off is closed
    /// as an unreadable line first so the new rows start on a fresh line.
    pub fn append_entries(&self, watch_item: &WatchItem, entries: &[PriceEntry]) -> Result<()> {
        let path = self.file_path_for(watch_item);
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let mut file = match OpenOptions::new()
            .read(true)
            .append(true)
            .create_new(true)
            .open(&path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                OpenOptions::new().read(true).append(true).open(&path)?
            }
            Err(e) => return Err(e.into()),
        };

        let mut buffer = String::new();
        match last_byte(&mut file)? {
            None => {
                buffer.push_str(CSV_HEADER);
                buffer.push('\n');
            }
            Some(b'\n') => {}
            Some(_) => {
                buffer.push_str(TORN_ROW_MARKER);
                buffer.push('\n');
            }
        }
        for entry in entries {
            buffer.push_str(&format_row(entry));
            buffer.push('\n');
        }

        file.write_all(buffer.as_bytes())?;
        file.sync_data()?;
        debug!(
            "Appended {} entries to {}",
            entries.len(),
            path.display()
        );
        Ok(())
    }

    /// Most recently appended readable entry
    pub fn latest_entry(&self, watch_item: &WatchItem) -> Result<Option<PriceEntry>> {
        let Some(contents) = self.read_record(watch_item)? else {
            return Ok(None);
        };
        let latest = data_lines(&contents).rev().find_map(parse_row);
        Ok(latest)
    }

    /// Fetch time of the most recent entry
    pub fn last_updated(&self, watch_item: &WatchItem) -> Result<Option<DateTime<Utc>>> {
        Ok(self.latest_entry(watch_item)?.map(|entry| entry.fetched_at))
    }

    /// Stored entries in chronological order; only the newest `limit` when given
    pub fn load_history(
        &self,
        watch_item: &WatchItem,
        limit: Option<usize>,
    ) -> Result<Vec<PriceEntry>> {
        let Some(contents) = self.read_record(watch_item)? else {
            return Ok(Vec::new());
        };
        let mut entries: Vec<PriceEntry> = data_lines(&contents).filter_map(parse_row).collect();
        if let Some(limit) = limit {
            let skip = entries.len().saturating_sub(limit);
            entries.drain(..skip);
        }
        Ok(entries)
    }

    /// Number of readable entries, header excluded
    pub fn entry_count(&self, watch_item: &WatchItem) -> Result<usize> {
        let Some(contents) = self.read_record(watch_item)? else {
            return Ok(0);
        };
        Ok(data_lines(&contents).filter_map(parse_row).count())
    }

    /// Copy the item's record byte-for-byte to `destination`, or into the
    /// export directory when no destination is given.
    pub fn export(&self, watch_item: &WatchItem, destination: Option<&Path>) -> Result<PathBuf> {
        let source = self.file_path_for(watch_item);
        let bytes = match fs::read(&source) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(TrackerError::RecordNotFound {
                    product_id: watch_item.product_id.clone(),
                    path: source,
                })
            }
            Err(e) => return Err(e.into()),
        };

        let destination = match destination {
            Some(path) => path.to_path_buf(),
            None => self.exports_path.join(Self::file_name_for(watch_item)),
        };
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&destination, bytes)?;
        debug!("Exported {} to {}", source.display(), destination.display());
        Ok(destination)
    }

    /// CSV files in the export directory, sorted by path
    pub fn list_exports(&self) -> Result<Vec<PathBuf>> {
        let dir = match fs::read_dir(&self.exports_path) {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut exports = Vec::new();
        for entry in dir {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "csv") {
                exports.push(path);
            }
        }
        exports.sort();
        Ok(exports)
    }

    fn read_record(&self, watch_item: &WatchItem) -> Result<Option<String>> {
        match fs::read(self.file_path_for(watch_item)) {
            Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn last_byte(file: &mut File) -> std::io::Result<Option<u8>> {
    if file.metadata()?.len() == 0 {
        return Ok(None);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut byte = [0u8; 1];
    file.read_exact(&mut byte)?;
    Ok(Some(byte[0]))
}

/// Non-empty, newline-terminated lines after the header.
///
/// A final segment without a newline is a row being written or one that was
/// cut off, and is never returned.
fn data_lines(contents: &str) -> impl DoubleEndedIterator<Item = &str> + '_ {
    let complete = contents.rfind('\n').map_or("", |end| &contents[..=end]);
    complete
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.is_empty() && *line != CSV_HEADER)
}

fn format_row(entry: &PriceEntry) -> String {
    format!(
        "{},{},{},{}",
        entry.fetched_at.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        entry.price_eur,
        entry.available_quantity,
        entry.seller.as_deref().map(escape_field).unwrap_or_default()
    )
}

/// Quote a field holding separators; line breaks become spaces so one entry
/// always stays on one line.
fn escape_field(value: &str) -> String {
    let value = value.replace(['\r', '\n'], " ");
    if value.contains(',') || value.contains('"') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value
    }
}

/// Inverse of `escape_field`; `None` for a field `escape_field` cannot produce
fn unescape_field(raw: &str) -> Option<String> {
    match raw.strip_prefix('"') {
        Some(rest) => {
            let inner = rest.strip_suffix('"')?;
            if inner.replace("\"\"", "").contains('"') {
                return None;
            }
            Some(inner.replace("\"\"", "\""))
        }
        None if raw.contains([',', '"']) => None,
        None => Some(raw.to_string()),
    }
}

fn parse_row(line: &str) -> Option<PriceEntry> {
    let mut fields = line.splitn(4, ',');
    let fetched_at = parse_timestamp(fields.next()?.trim())?;
    let price_eur = Decimal::from_str(fields.next()?.trim())
        .ok()
        .filter(|price| !price.is_sign_negative() || price.is_zero())?;
    let available_quantity = fields.next()?.trim().parse::<u32>().ok()?;
    let seller = match fields.next()? {
        "" => None,
        raw => Some(unescape_field(raw)?),
    };

    let entry = PriceEntry {
        fetched_at,
        price_eur,
        available_quantity,
        seller: seller.filter(|s| !s.is_empty()),
    };
    trace!("Parsed row: {:?}", entry);
    Some(entry)
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    // Rows without an offset are taken as UTC
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
