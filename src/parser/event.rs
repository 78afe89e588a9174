//! Typed events extracted from log lines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Direction of an inventory transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Purchase,
    Sale,
}

impl TransactionKind {
    /// Sign applied to the transaction quantity.
    #[must_use]
    pub fn sign(self) -> i64 {
        match self {
            Self::Purchase => 1,
            Self::Sale => -1,
        }
    }
}

/// How a mission ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionOutcome {
    Completed,
    Abandoned,
    Failed,
}

impl MissionOutcome {
    /// Map the game's completion type; anything unrecognized counts as failed.
    #[must_use]
    pub fn from_completion_type(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "complete" | "completed" => Self::Completed,
            "abandon" | "abandoned" => Self::Abandoned,
            _ => Self::Failed,
        }
    }
}

/// A recognized log line.
///
/// Every variant carries the timestamp found at the start of the line, if
/// any.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A player joined a game channel.
    SessionStarted {
        player: String,
        player_id: Option<String>,
        session_id: String,
        map: Option<String>,
        game_version: Option<String>,
        timestamp: Option<DateTime<Utc>>,
    },
    /// The game channel was disconnected.
    SessionEnded {
        uptime_secs: Option<f64>,
        timestamp: Option<DateTime<Utc>>,
    },
    /// Game build version banner.
    VersionDetected {
        version: String,
        timestamp: Option<DateTime<Utc>>,
    },
    /// Game branch banner.
    BranchDetected {
        branch: String,
        timestamp: Option<DateTime<Utc>>,
    },
    /// Items bought or sold; `quantity` is positive for purchases and
    /// negative for sales.
    InventoryTransaction {
        item_id: String,
        quantity: i64,
        container_id: String,
        price: f64,
        kind: TransactionKind,
        timestamp: Option<DateTime<Utc>>,
    },
    /// A mission was completed, abandoned or failed.
    MissionEnded {
        mission_id: String,
        player: String,
        outcome: MissionOutcome,
        reason: String,
        timestamp: Option<DateTime<Utc>>,
    },
}

impl Event {
    /// Timestamp of the originating line.
    #[must_use]
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::SessionStarted { timestamp, .. }
            | Self::SessionEnded { timestamp, .. }
            | Self::VersionDetected { timestamp, .. }
            | Self::BranchDetected { timestamp, .. }
            | Self::InventoryTransaction { timestamp, .. }
            | Self::MissionEnded { timestamp, .. } => *timestamp,
        }
    }

    /// Short name of the event kind, for logging.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::SessionStarted { .. } => "session_started",
            Self::SessionEnded { .. } => "session_ended",
            Self::VersionDetected { .. } => "version_detected",
            Self::BranchDetected { .. } => "branch_detected",
            Self::InventoryTransaction { .. } => "inventory_transaction",
            Self::MissionEnded { .. } => "mission_ended",
        }
    }
}
