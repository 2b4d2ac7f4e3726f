//! Fixed-interval background poller

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::common::types::WatchItem;

/// Watch items shared between the poll loop and its callers.
///
/// The lock is only held to copy or swap the list.
#[derive(Debug, Clone, Default)]
pub struct SharedWatchItems {
    inner: Arc<Mutex<Vec<WatchItem>>>,
}

impl SharedWatchItems {
    pub fn new(items: Vec<WatchItem>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(items)),
        }
    }

    /// Swap in a new item set
    pub fn replace(&self, items: Vec<WatchItem>) {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = items;
    }

    /// Copy of the current item set
    pub fn snapshot(&self) -> Vec<WatchItem> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
}

struct PollLoop {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Runs a task every `interval` with the current watch items until stopped.
///
/// Each wait is armed after the previous run finishes. A run that fails or
/// panics is logged and the next wait is armed as usual.
pub struct PollingScheduler {
    interval: Duration,
    items: SharedWatchItems,
    poll_loop: Option<PollLoop>,
}

impl PollingScheduler {
    pub fn new(interval: Duration) -> Self {
        Self::with_items(interval, SharedWatchItems::default())
    }

    /// Create a scheduler reading from an existing shared item set
    pub fn with_items(interval: Duration, items: SharedWatchItems) -> Self {
        Self {
            interval,
            items,
            poll_loop: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn state(&self) -> SchedulerState {
        match self.poll_loop {
            Some(_) => SchedulerState::Running,
            None => SchedulerState::Idle,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state() == SchedulerState::Running
    }

    /// Handle to the item set read by the next run
    pub fn items(&self) -> SharedWatchItems {
        self.items.clone()
    }

    /// Replace the items passed to the next run; the pending wait is untouched
    pub fn update_items(&self, items: Vec<WatchItem>) {
        debug!("Updating scheduler items ({} items)", items.len());
        self.items.replace(items);
    }

    /// Store `items` and start the loop; the first run happens one interval
    /// from now.
    ///
    /// When already running only the items are replaced.
    pub fn start<F, Fut>(&mut self, items: Vec<WatchItem>, task: F)
    where
        F: Fn(Vec<WatchItem>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.items.replace(items);
        if self.poll_loop.is_some() {
            warn!("Scheduler already running, items replaced");
            return;
        }

        let (shutdown, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(run_loop(
            self.interval,
            self.items.clone(),
            Arc::new(task),
            shutdown_rx,
        ));
        info!("Scheduler started with {:?} interval", self.interval);
        self.poll_loop = Some(PollLoop { shutdown, handle });
    }

    /// Cancel the pending wait. A run already in progress is not interrupted
    /// but no further run starts.
    pub fn stop(&mut self) {
        if let Some(poll_loop) = self.poll_loop.take() {
            let _ = poll_loop.shutdown.send(true);
            info!("Scheduler stopped");
        }
    }

    /// Stop and wait for an in-progress run to finish
    pub async fn shutdown(&mut self) {
        if let Some(poll_loop) = self.poll_loop.take() {
            let _ = poll_loop.shutdown.send(true);
            if let Err(e) = poll_loop.handle.await {
                error!("Scheduler loop ended abnormally: {}", e);
            }
            info!("Scheduler shut down");
        }
    }
}

impl Drop for PollingScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_loop<F, Fut>(
    interval: Duration,
    items: SharedWatchItems,
    task: Arc<F>,
    mut shutdown: watch::Receiver<bool>,
) where
    F: Fn(Vec<WatchItem>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    loop {
        let stopped = *shutdown.borrow();
        if stopped {
            break;
        }

        // Shutdown wins over an elapsed wait
        tokio::select! {
            biased;
            _ = shutdown.changed() => {
                debug!("Shutdown signal received");
                break;
            }
            _ = tokio::time::sleep(interval) => {}
        }
        let stopped = *shutdown.borrow();
        if stopped {
            break;
        }

        let snapshot = items.snapshot();
        debug!("Running scheduled poll for {} items", snapshot.len());

        let task = Arc::clone(&task);
        let run = tokio::spawn(async move { task(snapshot).await });
        match run.await {
            Ok(Ok(())) => debug!("Scheduled poll finished"),
            Ok(Err(e)) => error!("Scheduled poll failed: {:#}", e),
            Err(e) => error!("Scheduled poll panicked: {}", e),
        }
    }
}
