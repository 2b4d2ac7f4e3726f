//! CardmarketWatch - Main Entry Point
//!
//! Polls Cardmarket for the configured watch list, records price history
//! and logs price movement alerts.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

use cardmarket_watch::config::types::Environment;
use cardmarket_watch::{
    config, CardmarketRestClient, CsvPriceRepository, LogNotifier, PollingScheduler,
    PricingService, WatchlistService,
};

/// CLI arguments for the application
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, env = "LOG_LEVEL")]
    log_level: Option<String>,

    /// Run a single poll immediately and exit
    #[arg(long)]
    once: bool,

    /// Probe the Cardmarket API, print the result and exit
    #[arg(long, conflicts_with = "once")]
    health_check: bool,
}

fn init_logging(log_level: &str, environment: Environment) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    match environment {
        Environment::Production => {
            tracing::subscriber::set_global_default(builder.json().finish())?
        }
        Environment::Development => tracing::subscriber::set_global_default(builder.finish())?,
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    let app_config = config::load_config(Some(&args.config))?;
    let log_level = args
        .log_level
        .clone()
        .unwrap_or_else(|| app_config.settings.log_level.clone());
    init_logging(&log_level, app_config.settings.environment)?;

    info!("Starting CardmarketWatch application");
    info!("Configuration file: {}", args.config);

    let client = Arc::new(CardmarketRestClient::from_config(&app_config.cardmarket)?);

    if args.health_check {
        let status = client.health_check().await;
        println!("{}", serde_json::to_string_pretty(&status)?);
        if !status.ok {
            bail!(
                "Cardmarket API unreachable: {}",
                status.error.unwrap_or_default()
            );
        }
        return Ok(());
    }

    let storage = &app_config.storage;
    storage.ensure_data_directories()?;
    let repository = Arc::new(CsvPriceRepository::with_exports_dir(
        storage.data_directory(),
        storage.exports_directory(),
    )?);

    let watchlist = WatchlistService::from_items(app_config.watch_items());
    info!("Watching {} products", watchlist.len());

    let service = Arc::new(PricingService::new(
        client,
        repository,
        Arc::new(LogNotifier),
    ));

    if args.once {
        let report = service.poll_watch_items(&watchlist.all_items()).await?;
        info!(
            "Poll finished: {} products updated, {} entries stored, {} alerts",
            report.polled,
            report.stored_entries,
            report.alerts.len()
        );
        return Ok(());
    }

    let mut scheduler =
        PollingScheduler::new(Duration::from_secs(app_config.polling.interval_seconds));
    let poll_service = Arc::clone(&service);
    scheduler.start(watchlist.all_items(), move |items| {
        let service = Arc::clone(&poll_service);
        async move {
            let report = service.poll_watch_items(&items).await?;
            debug!(
                "Stored {} entries for {} products",
                report.stored_entries, report.polled
            );
            anyhow::Ok(())
        }
    });

    info!("Application initialized successfully");

    // Keep the application running
    tokio::signal::ctrl_c().await?;
    info!("Received shutdown signal, cleaning up...");
    scheduler.shutdown().await;

    Ok(())
}
