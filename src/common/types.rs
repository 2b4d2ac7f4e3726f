//! Domain types shared by the fetch, storage and alerting layers

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Criteria used to select listings for a product on Cardmarket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFilter {
    /// Product page URL or identifier as entered by the user
    pub product_url: String,
    /// Language abbreviation or full name (e.g. "EN", "English")
    #[serde(default)]
    pub language: Option<String>,
    /// Card condition (e.g. "NM", "EX")
    #[serde(default)]
    pub condition: Option<String>,
    /// Minimum available quantity a listing must offer
    #[serde(default = "default_min_quantity")]
    pub min_quantity: u32,
}

fn default_min_quantity() -> u32 {
    1
}

impl ProductFilter {
    /// Create a filter with no language/condition restriction
    pub fn new(product_url: impl Into<String>) -> Self {
        Self {
            product_url: product_url.into(),
            language: None,
            condition: None,
            min_quantity: 1,
        }
    }

    /// Restrict matches to a language
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Restrict matches to a condition
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    /// Set the minimum quantity, coerced to at least 1
    pub fn with_min_quantity(mut self, min_quantity: u32) -> Self {
        self.min_quantity = min_quantity.max(1);
        self
    }

    /// Minimum quantity actually enforced when matching listings
    pub fn effective_min_quantity(&self) -> u32 {
        self.min_quantity.max(1)
    }

    /// Language filter, treating an empty string as unset
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref().filter(|l| !l.is_empty())
    }

    /// Condition filter, treating an empty string as unset
    pub fn condition(&self) -> Option<&str> {
        self.condition.as_deref().filter(|c| !c.is_empty())
    }
}

/// Identity of the durable price record backing a watch item
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceHistory {
    pub product_id: String,
}

impl PriceHistory {
    pub fn new(product_id: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
        }
    }
}

/// A product tracked by the application
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatchItem {
    /// Stable product identifier used in API calls and record names
    pub product_id: String,
    /// Human-readable product name
    pub product_name: String,
    /// Listing filters
    pub filters: ProductFilter,
    /// Price record this item is bound to
    history: PriceHistory,
}

impl WatchItem {
    /// Create a watch item bound to the price record of the same product
    pub fn new(
        product_id: impl Into<String>,
        product_name: impl Into<String>,
        filters: ProductFilter,
    ) -> Self {
        Self::with_history(product_id, product_name, filters, PriceHistory::default())
    }

    /// Create a watch item with an explicit history handle.
    ///
    /// The history is always rebound to the item's product id.
    pub fn with_history(
        product_id: impl Into<String>,
        product_name: impl Into<String>,
        filters: ProductFilter,
        mut history: PriceHistory,
    ) -> Self {
        let product_id = product_id.into();
        if history.product_id != product_id {
            history.product_id = product_id.clone();
        }
        Self {
            product_id,
            product_name: product_name.into(),
            filters,
            history,
        }
    }

    pub fn history(&self) -> &PriceHistory {
        &self.history
    }
}

/// Single price observation for a product
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceEntry {
    /// When the snapshot containing this listing was fetched
    pub fetched_at: DateTime<Utc>,
    /// Listing price in EUR
    pub price_eur: Decimal,
    /// Copies available at this price
    pub available_quantity: u32,
    /// Seller name, if the listing carried one
    #[serde(default)]
    pub seller: Option<String>,
}

impl PriceEntry {
    pub fn new(
        fetched_at: DateTime<Utc>,
        price_eur: Decimal,
        available_quantity: u32,
        seller: Option<String>,
    ) -> Self {
        Self {
            fetched_at,
            price_eur,
            available_quantity,
            seller,
        }
    }
}

/// A price movement worth telling the user about
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceAlert {
    pub watch_item: WatchItem,
    pub message: String,
}

/// Result of an upstream reachability probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub checked_at: DateTime<Utc>,
}
