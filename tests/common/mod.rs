//! Common test utilities and fixtures

#![allow(dead_code)]

use cardmarket_watch::common::types::{ProductFilter, WatchItem};
use serde_json::{json, Value};

/// Product id used by the fixtures
pub const PRODUCT_ID: &str = "265535";

/// Watch item without language or condition restrictions
pub fn sample_watch_item() -> WatchItem {
    WatchItem::new(
        PRODUCT_ID,
        "Black Lotus",
        ProductFilter::new("https://www.cardmarket.com/en/Magic/Products/Singles/Alpha/Black-Lotus"),
    )
}

/// Watch item restricted to English near-mint copies, at least two available
pub fn filtered_watch_item() -> WatchItem {
    WatchItem::new(
        PRODUCT_ID,
        "Black Lotus",
        ProductFilter::new("https://www.cardmarket.com/en/Magic/Products/Singles/Alpha/Black-Lotus")
            .with_language("EN")
            .with_condition("NM")
            .with_min_quantity(2),
    )
}

/// Sample articles payloads as returned by the API
pub mod payloads {
    use super::*;

    /// One listing under a bare `article` mapping
    pub fn single_article() -> Value {
        json!({
            "article": {
                "idArticle": 1001,
                "price": 12.5,
                "count": 4,
                "condition": "NM",
                "language": {"idLanguage": 1, "languageName": "English", "abbreviation": "EN"},
                "seller": {"idUser": 7, "username": "LotusDealer"}
            }
        })
    }

    /// Several listings nested under `articles.article`
    pub fn nested_articles() -> Value {
        json!({
            "articles": {
                "article": [
                    {
                        "price": {"value": 15.0},
                        "count": 3,
                        "condition": "NM",
                        "language": {"abbreviation": "EN", "languageName": "English"},
                        "seller": {"username": "CardCastle"}
                    },
                    {
                        "price": "9.99",
                        "count": 2,
                        "condition": "nm",
                        "language": "en",
                        "seller": "Bargains"
                    },
                    {
                        "price": 7.0,
                        "count": 5,
                        "condition": "EX",
                        "language": {"abbreviation": "EN", "languageName": "English"}
                    },
                    {
                        "price": 6.0,
                        "count": 1,
                        "condition": "NM",
                        "language": {"abbreviation": "EN", "languageName": "English"}
                    },
                    {
                        "price": 5.0,
                        "count": 9,
                        "condition": "NM",
                        "language": {"abbreviation": "DE", "languageName": "German"}
                    },
                    "not a listing"
                ]
            }
        })
    }
}
