//! REST API client for the Cardmarket articles endpoint

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::HeaderMap;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, instrument, warn};
use url::Url;

use super::parser;
use crate::common::errors::{Result, TrackerError};
use crate::common::traits::SnapshotSource;
use crate::common::types::{HealthStatus, PriceEntry, WatchItem};
use crate::config::types::CardmarketConfig;

/// Default per-product fetch timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default health probe timeout
pub const DEFAULT_HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// REST API client for Cardmarket product listings
#[derive(Debug, Clone)]
pub struct CardmarketRestClient {
    /// HTTP client
    client: Client,
    /// Base URL of the API
    base_url: Url,
    /// Timeout applied to each product fetch
    request_timeout: Duration,
    /// Timeout applied to the health probe
    health_check_timeout: Duration,
}

impl CardmarketRestClient {
    /// Create a new client with the default timeouts
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeouts(base_url, DEFAULT_REQUEST_TIMEOUT, DEFAULT_HEALTH_CHECK_TIMEOUT)
    }

    /// Create a new client with custom timeouts
    pub fn with_timeouts(
        base_url: &str,
        request_timeout: Duration,
        health_check_timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| TrackerError::Internal(e.to_string()))?;

        let base_url = Url::parse(base_url.trim_end_matches('/'))?;
        if base_url.cannot_be_a_base() {
            return Err(TrackerError::InvalidUrl(format!(
                "{} cannot be used as a base URL",
                base_url
            )));
        }

        Ok(Self {
            client,
            base_url,
            request_timeout,
            health_check_timeout,
        })
    }

    /// Create a client from configuration
    pub fn from_config(config: &CardmarketConfig) -> Result<Self> {
        Self::with_timeouts(
            &config.api_base_url,
            Duration::from_secs(config.request_timeout_seconds),
            Duration::from_secs(config.health_check_timeout_seconds),
        )
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Headers for API calls.
    ///
    /// Cardmarket signs requests with OAuth 1.0a; no credentials are sent yet.
    pub fn build_headers(&self) -> HeaderMap {
        HeaderMap::new()
    }

    /// `{base}/products/{product_id}/articles`, with the id as one path segment
    pub fn articles_url(&self, product_id: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| TrackerError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["products", product_id, "articles"]);
        Ok(url)
    }

    /// Query parameters derived from the item's filters
    fn query_params(watch_item: &WatchItem) -> Vec<(&'static str, String)> {
        let filters = &watch_item.filters;
        let mut params = vec![("minQuantity", filters.effective_min_quantity().to_string())];
        if let Some(language) = filters.language() {
            params.push(("language", language.to_string()));
        }
        if let Some(condition) = filters.condition() {
            params.push(("condition", condition.to_string()));
        }
        params
    }

    /// Fetch the raw articles payload for one product
    #[instrument(skip(self, watch_item), fields(product_id = %watch_item.product_id))]
    pub async fn try_fetch_articles(&self, watch_item: &WatchItem) -> Result<Value> {
        let url = self.articles_url(&watch_item.product_id)?;
        debug!("Fetching articles from: {}", url);

        let response = self
            .client
            .get(url)
            .headers(self.build_headers())
            .query(&Self::query_params(watch_item))
            .timeout(self.request_timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TrackerError::InvalidResponse(format!(
                "Server returned status {}: {}",
                status, body
            )));
        }

        let payload: Value = response.json().await?;
        Ok(payload)
    }

    /// Fetch and normalise a fresh snapshot for one product.
    ///
    /// Network errors, timeouts, non-2xx statuses and malformed bodies all
    /// produce an empty snapshot.
    pub async fn fetch_product_snapshot(&self, watch_item: &WatchItem) -> Vec<PriceEntry> {
        match self.try_fetch_articles(watch_item).await {
            Ok(payload) => {
                let entries = parser::normalize(&payload, &watch_item.filters);
                debug!(
                    "Snapshot for {}: {} matching listings",
                    watch_item.product_id,
                    entries.len()
                );
                entries
            }
            Err(e) => {
                warn!("Fetch failed for {}: {}", watch_item.product_id, e);
                Vec::new()
            }
        }
    }

    /// Probe the base URL with the short health timeout
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> HealthStatus {
        let result = self
            .client
            .get(self.base_url.clone())
            .timeout(self.health_check_timeout)
            .send()
            .await
            .and_then(|response| response.error_for_status());

        match result {
            Ok(_) => HealthStatus {
                ok: true,
                error: None,
                checked_at: Utc::now(),
            },
            Err(e) => {
                warn!("Health check failed: {}", e);
                HealthStatus {
                    ok: false,
                    error: Some(e.to_string()),
                    checked_at: Utc::now(),
                }
            }
        }
    }
}

#[async_trait]
impl SnapshotSource for CardmarketRestClient {
    async fn fetch_product_snapshot(&self, watch_item: &WatchItem) -> Vec<PriceEntry> {
        CardmarketRestClient::fetch_product_snapshot(self, watch_item).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::ProductFilter;

    #[test]
    fn test_client_creation() {
        let client = CardmarketRestClient::new("https://api.cardmarket.com/ws/v2.0/output.json");
        assert!(client.is_ok());
    }

    #[test]
    fn test_invalid_base_url() {
        let client = CardmarketRestClient::new("not a url");
        assert!(matches!(client, Err(TrackerError::InvalidUrl(_))));
    }

    #[test]
    fn test_articles_url() {
        let client = CardmarketRestClient::new("https://example.com/api/").unwrap();
        let url = client.articles_url("265535").unwrap();
        assert_eq!(url.as_str(), "https://example.com/api/products/265535/articles");

        let url = client.articles_url("set/card 1").unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.com/api/products/set%2Fcard%201/articles"
        );
    }

    #[test]
    fn test_build_headers_is_empty() {
        let client = CardmarketRestClient::new("https://example.com").unwrap();
        assert!(client.build_headers().is_empty());
    }

    #[test]
    fn test_query_params() {
        let filters = ProductFilter::new("https://example.com/card")
            .with_language("EN")
            .with_condition("NM")
            .with_min_quantity(2);
        let item = WatchItem::new("abc", "Alpha", filters);

        let params = CardmarketRestClient::query_params(&item);
        assert_eq!(
            params,
            vec![
                ("minQuantity", "2".to_string()),
                ("language", "EN".to_string()),
                ("condition", "NM".to_string()),
            ]
        );

        let bare = WatchItem::new("abc", "Alpha", ProductFilter::new("x"));
        assert_eq!(
            CardmarketRestClient::query_params(&bare),
            vec![("minQuantity", "1".to_string())]
        );
    }
}
