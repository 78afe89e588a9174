//! Filesystem change notifications for a tailed log file.
//!
//! Watches the log's parent directory so that replacement of the file is
//! seen as well as in-place growth, and bridges debounced events into a
//! tokio channel.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify_debouncer_full::{
    new_debouncer,
    notify::{self, EventKind, RecommendedWatcher, RecursiveMode},
    DebounceEventResult, Debouncer, RecommendedCache,
};
use tokio::sync::mpsc;

use super::error::WatcherError;

/// Signals delivered to the monitor loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeSignal {
    /// The log file (or its directory entry) changed.
    Changed,
    /// The underlying watcher reported an error.
    Error(String),
}

/// Debounced change notifier for a single log file.
///
/// Dropping the notifier stops the underlying watcher.
pub struct ChangeNotifier {
    watch_dir: PathBuf,
    _debouncer: Debouncer<RecommendedWatcher, RecommendedCache>,
}

impl std::fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("watch_dir", &self.watch_dir)
            .finish_non_exhaustive()
    }
}

impl ChangeNotifier {
    /// Start watching `log_path`.
    ///
    /// Returns the notifier and a receiver of change signals.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform watcher cannot be created or the
    /// parent directory cannot be watched.
    pub fn watch(
        log_path: &Path,
        debounce: Duration,
    ) -> Result<(Self, mpsc::UnboundedReceiver<ChangeSignal>), WatcherError> {
        let (tx, rx) = mpsc::unbounded_channel();

        let watch_dir = match log_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name: OsString = log_path
            .file_name()
            .map_or_else(OsString::new, OsStr::to_os_string);

        let mut debouncer = new_debouncer(debounce, None, move |result: DebounceEventResult| {
            match result {
                Ok(events) => {
                    if events.iter().any(|e| affects_target(e, &file_name)) {
                        let _ = tx.send(ChangeSignal::Changed);
                    }
                }
                Err(errors) => {
                    for error in errors {
                        let _ = tx.send(ChangeSignal::Error(error.to_string()));
                    }
                }
            }
        })?;

        debouncer.watch(&watch_dir, RecursiveMode::NonRecursive)?;

        tracing::debug!(dir = %watch_dir.display(), "Watching log directory");

        Ok((
            Self {
                watch_dir,
                _debouncer: debouncer,
            },
            rx,
        ))
    }

    /// Directory being watched.
    #[must_use]
    pub fn watch_dir(&self) -> &Path {
        &self.watch_dir
    }
}

/// Whether `event` touches the file named `file_name`.
fn affects_target(event: &notify::Event, file_name: &OsStr) -> bool {
    if matches!(event.kind, EventKind::Access(_)) {
        return false;
    }
    if event.paths.is_empty() {
        return true;
    }
    event
        .paths
        .iter()
        .any(|p| p.file_name().is_some_and(|name| name == file_name))
}
