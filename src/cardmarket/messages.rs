//! Cardmarket wire shapes
//!
//! The articles endpoint is loose about how it wraps listings. Depending on
//! the documentation revision a response may look like any of:
//!
//! ```text
//! {"article": {...}}
//! {"article": [{...}, {...}]}
//! {"articles": {"article": {...}}}
//! {"articles": {"article": [{...}]}}
//! {"articles": [{...}, [{...}]]}
//! ```
//!
//! Each container is modelled as an untagged enum so that every shape is a
//! named variant and anything else lands in a catch-all.

use serde::Deserialize;
use serde_json::{Map, Value};

/// A raw listing: the field map of one article
pub type Listing = Map<String, Value>;

/// Value of an `article` key: one listing or a list of candidates
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ArticleSlot {
    One(Listing),
    Many(Vec<Value>),
    Other(Value),
}

impl ArticleSlot {
    /// Append every mapping held by this slot, skipping anything else
    fn collect_into(self, out: &mut Vec<Listing>) {
        match self {
            ArticleSlot::One(listing) => out.push(listing),
            ArticleSlot::Many(values) => out.extend(values.into_iter().filter_map(as_listing)),
            ArticleSlot::Other(_) => {}
        }
    }
}

/// Value of an `articles` key
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ArticlesContainer {
    /// `{"articles": {"article": ...}}`
    Nested { article: ArticleSlot },
    /// `{"articles": [...]}`, each element being a listing or a list of listings
    List(Vec<Value>),
    Other(Value),
}

/// Top-level response from `GET /products/{id}/articles`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArticlesResponse {
    #[serde(default)]
    pub article: Option<ArticleSlot>,
    #[serde(default)]
    pub articles: Option<ArticlesContainer>,
}

impl ArticlesResponse {
    /// Interpret an arbitrary JSON payload. Non-object payloads yield no listings.
    pub fn from_payload(payload: &Value) -> Self {
        if !payload.is_object() {
            return Self::default();
        }
        serde_json::from_value(payload.clone()).unwrap_or_default()
    }

    /// Collect listings from all recognised shapes, flat `article` first
    pub fn into_listings(self) -> Vec<Listing> {
        let mut listings = Vec::new();

        if let Some(slot) = self.article {
            slot.collect_into(&mut listings);
        }

        match self.articles {
            Some(ArticlesContainer::Nested { article }) => article.collect_into(&mut listings),
            Some(ArticlesContainer::List(values)) => {
                for value in values {
                    match value {
                        Value::Object(listing) => listings.push(listing),
                        Value::Array(inner) => {
                            listings.extend(inner.into_iter().filter_map(as_listing))
                        }
                        _ => {}
                    }
                }
            }
            Some(ArticlesContainer::Other(_)) | None => {}
        }

        listings
    }
}

fn as_listing(value: Value) -> Option<Listing> {
    match value {
        Value::Object(listing) => Some(listing),
        _ => None,
    }
}
