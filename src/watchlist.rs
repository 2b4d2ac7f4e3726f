//! In-memory watch list

use crate::common::errors::{Result, TrackerError};
use crate::common::types::{ProductFilter, WatchItem};

/// Ordered collection of watched products keyed by product id
#[derive(Debug, Clone, Default)]
pub struct WatchlistService {
    items: Vec<WatchItem>,
}

impl WatchlistService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a watch list from existing items; later duplicates replace earlier ones
    pub fn from_items(items: impl IntoIterator<Item = WatchItem>) -> Self {
        let mut service = Self::new();
        service.load(items);
        service
    }

    /// Add a product, replacing an existing item with the same id in place
    pub fn add_item(
        &mut self,
        product_id: impl Into<String>,
        product_name: impl Into<String>,
        filters: ProductFilter,
    ) -> WatchItem {
        let item = WatchItem::new(product_id, product_name, filters);
        self.upsert(item.clone());
        item
    }

    /// Remove a product; unknown ids are ignored
    pub fn remove_item(&mut self, product_id: &str) -> Option<WatchItem> {
        let index = self.position(product_id)?;
        Some(self.items.remove(index))
    }

    /// All items in insertion order
    pub fn all_items(&self) -> Vec<WatchItem> {
        self.items.clone()
    }

    pub fn get(&self, product_id: &str) -> Option<&WatchItem> {
        self.items.iter().find(|item| item.product_id == product_id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Replace the filters of a tracked product
    pub fn update_filters(&mut self, product_id: &str, filters: ProductFilter) -> Result<WatchItem> {
        let index = self
            .position(product_id)
            .ok_or_else(|| TrackerError::UnknownProduct(product_id.to_string()))?;
        let current = &self.items[index];
        let updated = WatchItem::with_history(
            current.product_id.clone(),
            current.product_name.clone(),
            filters,
            current.history().clone(),
        );
        self.items[index] = updated.clone();
        Ok(updated)
    }

    /// Replace the whole watch list
    pub fn load(&mut self, items: impl IntoIterator<Item = WatchItem>) {
        self.items.clear();
        for item in items {
            self.upsert(item);
        }
    }

    fn upsert(&mut self, item: WatchItem) {
        match self.position(&item.product_id) {
            Some(index) => self.items[index] = item,
            None => self.items.push(item),
        }
    }

    fn position(&self, product_id: &str) -> Option<usize> {
        self.items
            .iter()
            .position(|item| item.product_id == product_id)
    }
}
