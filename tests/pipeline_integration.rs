//! End-to-end tests: mock Cardmarket API -> CSV history -> alerts

mod common;

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use cardmarket_watch::common::errors::TrackerError;
use cardmarket_watch::storage::CSV_HEADER;
use cardmarket_watch::{
    CardmarketRestClient, ChannelNotifier, CsvPriceRepository, PollingScheduler, PriceAlert,
    PricingService,
};
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{payloads, sample_watch_item, PRODUCT_ID};

const ARTICLES_PATH: &str = "/products/265535/articles";

struct Pipeline {
    service: Arc<PricingService>,
    alerts: tokio::sync::mpsc::Receiver<PriceAlert>,
    _dir: TempDir,
}

fn build_pipeline(server: &MockServer) -> Pipeline {
    let dir = TempDir::new().expect("temp dir");
    let client = CardmarketRestClient::new(&server.uri()).expect("client");
    let repository = CsvPriceRepository::new(dir.path().join("history")).expect("repository");
    let (notifier, alerts) = ChannelNotifier::channel();
    let service = PricingService::new(Arc::new(client), Arc::new(repository), Arc::new(notifier));
    Pipeline {
        service: Arc::new(service),
        alerts,
        _dir: dir,
    }
}

async fn mount_articles(server: &MockServer, body: serde_json::Value) {
    server.reset().await;
    Mock::given(method("GET"))
        .and(path(ARTICLES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

fn price_payload(price: f64) -> serde_json::Value {
    json!({"article": {"price": price, "count": 2, "seller": {"username": "Shop"}}})
}

#[test_log::test(tokio::test)]
async fn test_first_poll_writes_header_row_and_one_alert() {
    let server = MockServer::start().await;
    mount_articles(&server, payloads::single_article()).await;
    let mut pipeline = build_pipeline(&server);
    let item = sample_watch_item();

    let report = pipeline
        .service
        .poll_watch_items(&[item.clone()])
        .await
        .expect("poll");

    let record = pipeline.service.repository().file_path_for(&item);
    let contents = fs::read_to_string(record).expect("record");
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], CSV_HEADER);
    assert!(lines[1].ends_with(",12.5,4,LotusDealer"), "row: {}", lines[1]);

    assert_eq!(report.alerts.len(), 1);
    let alert = pipeline.alerts.try_recv().expect("one alert");
    assert_eq!(alert.watch_item.product_id, PRODUCT_ID);
    assert_eq!(
        alert.message,
        "Started tracking Black Lotus: 12.50€ with 4 available copies."
    );
    assert!(pipeline.alerts.try_recv().is_err());
}

#[test_log::test(tokio::test)]
async fn test_price_movement_across_polls() {
    let server = MockServer::start().await;
    let mut pipeline = build_pipeline(&server);
    let item = sample_watch_item();

    mount_articles(&server, price_payload(10.0)).await;
    pipeline.service.poll_watch_items(&[item.clone()]).await.expect("poll");
    assert!(pipeline.alerts.try_recv().is_ok());

    // Same price again is noise
    pipeline.service.poll_watch_items(&[item.clone()]).await.expect("poll");
    assert!(pipeline.alerts.try_recv().is_err());

    mount_articles(&server, price_payload(10.5)).await;
    pipeline.service.poll_watch_items(&[item.clone()]).await.expect("poll");
    let alert = pipeline.alerts.try_recv().expect("movement alert");
    assert_eq!(
        alert.message,
        "Black Lotus price increased to 10.50€ (+5.0%) with 2 copies available."
    );

    let history = pipeline.service.history_for(&item).expect("history");
    let prices: Vec<_> = history.iter().map(|entry| entry.price_eur).collect();
    assert_eq!(prices, vec![dec!(10.0), dec!(10.0), dec!(10.5)]);

    let rows = pipeline.service.watchlist_snapshot(&[item]).expect("rows");
    assert_eq!(rows[0].entry_count, 3);
    assert_eq!(rows[0].latest_price, Some(dec!(10.5)));
}

#[test_log::test(tokio::test)]
async fn test_failed_fetch_leaves_history_untouched() {
    let server = MockServer::start().await;
    let mut pipeline = build_pipeline(&server);
    let item = sample_watch_item();

    mount_articles(&server, price_payload(3.0)).await;
    pipeline.service.poll_watch_items(&[item.clone()]).await.expect("poll");
    let _ = pipeline.alerts.try_recv();

    server.reset().await;
    Mock::given(method("GET"))
        .and(path(ARTICLES_PATH))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let report = pipeline
        .service
        .poll_watch_items(&[item.clone()])
        .await
        .expect("poll");

    assert_eq!(report.polled, 0);
    assert!(pipeline.alerts.try_recv().is_err());
    assert_eq!(pipeline.service.repository().entry_count(&item).unwrap(), 1);
}

#[test_log::test(tokio::test)]
async fn test_export_roundtrip() {
    let server = MockServer::start().await;
    mount_articles(&server, payloads::nested_articles()).await;
    let pipeline = build_pipeline(&server);
    let item = sample_watch_item();

    let missing = pipeline.service.export_watch_item(&item, None);
    assert!(matches!(missing, Err(TrackerError::RecordNotFound { .. })));

    pipeline.service.poll_watch_items(&[item.clone()]).await.expect("poll");
    let exported = pipeline.service.export_watch_item(&item, None).expect("export");

    let original = fs::read(pipeline.service.repository().file_path_for(&item)).unwrap();
    assert_eq!(fs::read(&exported).unwrap(), original);

    let exports = pipeline.service.export_snapshot().expect("exports");
    assert_eq!(exports.len(), 1);
    assert_eq!(exports[0].id, PRODUCT_ID);
}

#[test_log::test(tokio::test)]
async fn test_scheduler_drives_pipeline() {
    let server = MockServer::start().await;
    mount_articles(&server, payloads::single_article()).await;
    let mut pipeline = build_pipeline(&server);

    let mut scheduler = PollingScheduler::new(Duration::from_millis(100));
    let service = Arc::clone(&pipeline.service);
    scheduler.start(vec![sample_watch_item()], move |items| {
        let service = Arc::clone(&service);
        async move {
            service.poll_watch_items(&items).await?;
            anyhow::Ok(())
        }
    });

    let alert = tokio::time::timeout(Duration::from_secs(5), pipeline.alerts.recv())
        .await
        .expect("alert before timeout")
        .expect("channel open");
    assert!(alert.message.starts_with("Started tracking Black Lotus"));

    scheduler.shutdown().await;
    let stored = pipeline
        .service
        .repository()
        .entry_count(&sample_watch_item())
        .unwrap();
    assert!(stored >= 1);
}
