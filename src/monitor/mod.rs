//! Log monitor: drives the tailer, parser and aggregator and publishes
//! snapshots to subscribers.

mod error;
mod oneshot;
mod runner;
mod state;
mod subscribers;

pub use error::MonitorError;
pub use oneshot::read_log;
pub use runner::{LogMonitor, MonitorOptions, DEFAULT_DEBOUNCE, DEFAULT_POLL_INTERVAL};
pub use state::{MonitorState, MonitorStatus};
pub use subscribers::{StatsCallback, SubscriptionId};
