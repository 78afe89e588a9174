//! Watcher module for the tailed game log.
//!
//! Provides the incremental file tailer, filesystem change notifications and
//! discovery of the game log.

mod discovery;
mod error;
mod identity;
mod notifier;
mod tailer;

pub use discovery::{default_log_candidates, discover_log, find_log_file, LOG_FILE_NAME};
pub use error::WatcherError;
pub use identity::{FileIdentity, LogPosition, DEFAULT_FINGERPRINT_BYTES};
pub use notifier::{ChangeNotifier, ChangeSignal};
pub use tailer::{
    LogTailer, PollBatch, RawLine, ResetReason, StartPosition, TailOptions, DEFAULT_MAX_READ_BYTES,
};
