//! Alert delivery sinks

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::info;

use crate::common::errors::{Result, TrackerError};
use crate::common::traits::Notifier;
use crate::common::types::PriceAlert;

/// Default alert channel buffer size
pub const DEFAULT_ALERT_CHANNEL_SIZE: usize = 100;

/// Discards every alert
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn send(&self, _alerts: &[PriceAlert]) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "null"
    }
}

/// Writes alerts to the log; stands in for a desktop popup
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, alerts: &[PriceAlert]) -> Result<()> {
        for alert in alerts {
            info!(product_id = %alert.watch_item.product_id, "Price alert: {}", alert.message);
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// Forwards alerts to an in-process consumer
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: mpsc::Sender<PriceAlert>,
}

impl ChannelNotifier {
    pub fn new(sender: mpsc::Sender<PriceAlert>) -> Self {
        Self { sender }
    }

    /// Create a notifier together with the receiving end of its channel
    pub fn channel() -> (Self, mpsc::Receiver<PriceAlert>) {
        let (sender, receiver) = mpsc::channel(DEFAULT_ALERT_CHANNEL_SIZE);
        (Self::new(sender), receiver)
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn send(&self, alerts: &[PriceAlert]) -> Result<()> {
        for alert in alerts {
            self.sender
                .send(alert.clone())
                .await
                .map_err(|e| TrackerError::Notification(e.to_string()))?;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "channel"
    }
}
