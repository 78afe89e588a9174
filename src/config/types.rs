//! Configuration types.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::monitor::{MonitorOptions, DEFAULT_DEBOUNCE, DEFAULT_POLL_INTERVAL};
use crate::parser::{PatternError, PatternSpec, PatternTable};
use crate::stats::DEFAULT_HISTORY_LIMIT;
use crate::watcher::{StartPosition, TailOptions, DEFAULT_FINGERPRINT_BYTES, DEFAULT_MAX_READ_BYTES};

/// Monitor loop settings (`[monitor]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Interval between polls in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Debounce window for filesystem notifications in milliseconds.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Wake on filesystem notifications as well as the timer.
    #[serde(default = "default_true")]
    pub use_notifications: bool,
    /// Read the whole file on start instead of only new lines.
    #[serde(default)]
    pub replay_existing: bool,
    /// Maximum bytes consumed per poll.
    #[serde(default = "default_max_read_bytes")]
    pub max_read_bytes: u64,
}

fn default_poll_interval_ms() -> u64 {
    u64::try_from(DEFAULT_POLL_INTERVAL.as_millis()).unwrap_or(1000)
}

fn default_debounce_ms() -> u64 {
    u64::try_from(DEFAULT_DEBOUNCE.as_millis()).unwrap_or(200)
}

fn default_true() -> bool {
    true
}

fn default_max_read_bytes() -> u64 {
    DEFAULT_MAX_READ_BYTES
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            debounce_ms: default_debounce_ms(),
            use_notifications: true,
            replay_existing: false,
            max_read_bytes: default_max_read_bytes(),
        }
    }
}

/// Tailer settings (`[tailer]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TailerConfig {
    /// Leading bytes used to recognize a replaced file.
    #[serde(default = "default_fingerprint_bytes")]
    pub fingerprint_bytes: usize,
}

fn default_fingerprint_bytes() -> usize {
    DEFAULT_FINGERPRINT_BYTES
}

impl Default for TailerConfig {
    fn default() -> Self {
        Self {
            fingerprint_bytes: default_fingerprint_bytes(),
        }
    }
}

/// Aggregate settings (`[stats]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Recent transactions and missions kept in each snapshot.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
        }
    }
}

/// Complete configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub tailer: TailerConfig,
    #[serde(default)]
    pub stats: StatsConfig,
    /// Line patterns added to the built-in table.
    #[serde(default)]
    pub patterns: Vec<PatternSpec>,
}

impl AppConfig {
    /// Tailer options described by this configuration.
    #[must_use]
    pub fn tail_options(&self) -> TailOptions {
        TailOptions {
            start: if self.monitor.replay_existing {
                StartPosition::Beginning
            } else {
                StartPosition::End
            },
            fingerprint_bytes: self.tailer.fingerprint_bytes,
            max_read_bytes: self.monitor.max_read_bytes.max(1),
        }
    }

    /// Pattern table with the configured patterns merged in.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured pattern is invalid.
    pub fn pattern_table(&self) -> Result<PatternTable, PatternError> {
        if self.patterns.is_empty() {
            Ok(PatternTable::with_default_patterns())
        } else {
            PatternTable::with_extra(&self.patterns)
        }
    }

    /// Monitor options described by this configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured pattern is invalid.
    pub fn monitor_options(&self) -> Result<MonitorOptions, PatternError> {
        Ok(MonitorOptions {
            poll_interval: Duration::from_millis(self.monitor.poll_interval_ms.max(1)),
            debounce: Duration::from_millis(self.monitor.debounce_ms),
            use_notifications: self.monitor.use_notifications,
            tail: self.tail_options(),
            history_limit: self.stats.history_limit,
            patterns: self.pattern_table()?,
        })
    }
}
