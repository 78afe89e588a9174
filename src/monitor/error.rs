//! Monitor error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::watcher::WatcherError;

/// Errors reported by the monitor control surface.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Log file not found: {0}")]
    NotFound(PathBuf),

    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    #[error("Monitor is already running")]
    AlreadyRunning,

    #[error("Monitor is not running")]
    NotMonitoring,

    #[error(transparent)]
    Watcher(WatcherError),
}

impl From<WatcherError> for MonitorError {
    fn from(err: WatcherError) -> Self {
        match err {
            WatcherError::NotFound(path) => Self::NotFound(path),
            WatcherError::PermissionDenied(path) => Self::PermissionDenied(path),
            other => Self::Watcher(other),
        }
    }
}
