//! Snapshot normalisation
//!
//! Turns a loosely structured articles payload into validated
//! [`PriceEntry`] values for one product. Nothing in here fails: listings that
//! cannot be read or do not match the filter are dropped with a trace log.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;
use thiserror::Error;
use tracing::trace;

use super::messages::{ArticlesResponse, Listing};
use crate::common::types::{PriceEntry, ProductFilter};

/// Quantity fields, probed in this order
const QUANTITY_FIELDS: [&str; 4] = ["count", "quantity", "available", "stock"];

/// Seller name fields inside a nested seller object, probed in this order
const SELLER_FIELDS: [&str; 3] = ["username", "name", "user"];

/// Why a single listing was left out of a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListingRejection {
    #[error("language does not match {wanted}")]
    LanguageMismatch { wanted: String },
    #[error("condition does not match {wanted}")]
    ConditionMismatch { wanted: String },
    #[error("quantity {quantity} below minimum {minimum}")]
    BelowMinQuantity { quantity: u32, minimum: u32 },
    #[error("price missing or unparseable")]
    MissingPrice,
}

/// Normalise a payload fetched just now
pub fn normalize(payload: &Value, filter: &ProductFilter) -> Vec<PriceEntry> {
    normalize_at(payload, filter, Utc::now())
}

/// Normalise a payload, stamping every entry with `fetched_at`.
///
/// The result is sorted by ascending price.
pub fn normalize_at(
    payload: &Value,
    filter: &ProductFilter,
    fetched_at: DateTime<Utc>,
) -> Vec<PriceEntry> {
    let listings = ArticlesResponse::from_payload(payload).into_listings();

    let mut entries: Vec<PriceEntry> = listings
        .iter()
        .filter_map(|listing| match parse_listing(listing, filter, fetched_at) {
            Ok(entry) => Some(entry),
            Err(reason) => {
                trace!("Dropping listing: {}", reason);
                None
            }
        })
        .collect();

    entries.sort_by(|a, b| a.price_eur.cmp(&b.price_eur));
    entries
}

/// Validate one listing against `filter` and convert it into a price entry
pub fn parse_listing(
    listing: &Listing,
    filter: &ProductFilter,
    fetched_at: DateTime<Utc>,
) -> Result<PriceEntry, ListingRejection> {
    if let Some(wanted) = filter.language() {
        if !language_matches(listing, wanted) {
            return Err(ListingRejection::LanguageMismatch {
                wanted: wanted.to_string(),
            });
        }
    }

    if let Some(wanted) = filter.condition() {
        let matches = listing
            .get("condition")
            .and_then(scalar_text)
            .map(|condition| condition.to_lowercase() == wanted.to_lowercase())
            .unwrap_or(false);
        if !matches {
            return Err(ListingRejection::ConditionMismatch {
                wanted: wanted.to_string(),
            });
        }
    }

    // The minimum is at least 1, so this also drops listings with no stock
    let quantity = extract_quantity(listing);
    let minimum = filter.effective_min_quantity();
    if quantity < minimum {
        return Err(ListingRejection::BelowMinQuantity { quantity, minimum });
    }

    let price = extract_price(listing).ok_or(ListingRejection::MissingPrice)?;

    Ok(PriceEntry {
        fetched_at,
        price_eur: price,
        available_quantity: quantity,
        seller: extract_seller(listing),
    })
}

/// Price from `{"price": {"value"|"eur": n}}` or a bare `{"price": n}`
pub fn extract_price(listing: &Listing) -> Option<Decimal> {
    let raw = match listing.get("price")? {
        Value::Object(nested) => nested
            .get("value")
            .filter(|v| !v.is_null())
            .or_else(|| nested.get("eur"))?,
        bare => bare,
    };

    let price = match raw {
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .ok()
            .or_else(|| n.as_f64().and_then(Decimal::from_f64)),
        Value::String(s) => parse_decimal(s.trim()),
        _ => None,
    }?;

    if price.is_sign_negative() && !price.is_zero() {
        return None;
    }
    Some(price)
}

/// First quantity field that coerces to an integer, clamped at zero
pub fn extract_quantity(listing: &Listing) -> u32 {
    for key in QUANTITY_FIELDS {
        let Some(value) = listing.get(key).filter(|v| !v.is_null()) else {
            continue;
        };
        if let Some(quantity) = coerce_integer(value) {
            return quantity.clamp(0, i64::from(u32::MAX)) as u32;
        }
    }
    0
}

/// Seller from a nested object (`username`, `name`, `user`), else the bare
/// value as text. Empty, zero and `false` values mean no seller.
pub fn extract_seller(listing: &Listing) -> Option<String> {
    match listing.get("seller")? {
        Value::Object(seller) => SELLER_FIELDS
            .iter()
            .filter_map(|key| seller.get(*key).and_then(scalar_text))
            .find(|name| !name.is_empty()),
        Value::Null | Value::Bool(false) => None,
        Value::Array(values) if values.is_empty() => None,
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        array @ Value::Array(_) => Some(array.to_string()),
        other => scalar_text(other).filter(|name| !name.is_empty()),
    }
}

fn language_matches(listing: &Listing, wanted: &str) -> bool {
    let wanted = wanted.to_lowercase();
    match listing.get("language") {
        Some(Value::Object(info)) => ["abbreviation", "languageName"]
            .iter()
            .filter_map(|key| info.get(*key).and_then(scalar_text))
            .any(|candidate| candidate.to_lowercase() == wanted),
        Some(other) => scalar_text(other)
            .map(|candidate| candidate.to_lowercase() == wanted)
            .unwrap_or(false),
        None => false,
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn coerce_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|u| i64::try_from(u).unwrap_or(i64::MAX)))
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}
