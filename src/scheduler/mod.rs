//! Background polling

pub mod poller;

pub use poller::{PollingScheduler, SchedulerState, SharedWatchItems};
