//! Monitor state machine.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a [`LogMonitor`](super::LogMonitor).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorState {
    #[default]
    Idle,
    Monitoring,
    Stopped,
}

/// Point-in-time view of the monitor.
///
/// Fault counters describe the current run; a tailer fault never changes
/// `state`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorStatus {
    pub state: MonitorState,
    /// Log file of the current or last run.
    pub path: Option<PathBuf>,
    /// Faults since the last successful poll.
    pub consecutive_faults: u32,
    pub total_faults: u64,
    pub last_fault: Option<String>,
    pub last_fault_at: Option<DateTime<Utc>>,
    /// Complete lines read during the current run.
    pub lines_read: u64,
    /// Events applied to the aggregate during the current run.
    pub events_applied: u64,
}

impl MonitorStatus {
    /// Whether the last poll failed.
    #[must_use]
    pub fn is_faulted(&self) -> bool {
        self.consecutive_faults > 0
    }

    pub(crate) fn transition(&mut self, new_state: MonitorState) {
        tracing::debug!(from = ?self.state, to = ?new_state, "Monitor state transition");
        self.state = new_state;
    }

    /// Clear per-run counters for a run on `path`.
    pub(crate) fn begin_run(&mut self, path: PathBuf) {
        *self = Self {
            state: self.state,
            path: Some(path),
            ..Self::default()
        };
    }

    /// Count a failed poll. Returns true for the first fault of a streak.
    pub(crate) fn record_fault(&mut self, message: String) -> bool {
        self.consecutive_faults = self.consecutive_faults.saturating_add(1);
        self.total_faults = self.total_faults.saturating_add(1);
        self.last_fault = Some(message);
        self.last_fault_at = Some(Utc::now());
        self.consecutive_faults == 1
    }

    /// Count a successful poll. Returns the length of the streak it ended.
    pub(crate) fn record_success(&mut self, lines: usize, events: usize) -> u32 {
        self.lines_read = self.lines_read.saturating_add(lines as u64);
        self.events_applied = self.events_applied.saturating_add(events as u64);
        std::mem::take(&mut self.consecutive_faults)
    }
}
