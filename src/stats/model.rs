//! Session statistics model.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::parser::{MissionOutcome, TransactionKind};

/// Per-shop (container) activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerInfo {
    pub container_id: String,
    /// Transactions seen for this container.
    pub transactions: u64,
    /// Signed sum of quantities moved through this container.
    pub net_quantity: i64,
    pub last_item: Option<String>,
    pub last_activity: Option<DateTime<Utc>>,
}

impl ContainerInfo {
    #[must_use]
    pub fn new(container_id: impl Into<String>) -> Self {
        Self {
            container_id: container_id.into(),
            ..Self::default()
        }
    }
}

/// Money and item totals across all transactions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeTotals {
    pub money_spent: f64,
    pub money_earned: f64,
    pub net_profit: f64,
    pub items_purchased: u64,
    pub items_sold: u64,
}

/// Mission outcome counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionTotals {
    pub completed: u64,
    pub abandoned: u64,
    pub failed: u64,
}

impl MissionTotals {
    #[must_use]
    pub fn total(&self) -> u64 {
        self.completed + self.abandoned + self.failed
    }
}

/// A recorded inventory transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub item_id: String,
    pub quantity: i64,
    pub container_id: String,
    /// Total price of the transaction.
    pub price: f64,
    pub kind: TransactionKind,
    pub timestamp: Option<DateTime<Utc>>,
}

/// A recorded mission result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionRecord {
    pub mission_id: String,
    pub player: String,
    pub outcome: MissionOutcome,
    pub reason: String,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Running aggregate for the current session.
///
/// Only the aggregator mutates this; readers receive snapshots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub player: Option<String>,
    pub player_id: Option<String>,
    pub session_id: Option<String>,
    pub game_version: Option<String>,
    pub branch: Option<String>,
    pub map: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub uptime_secs: Option<f64>,
    /// Signed sum of all transaction quantities.
    pub inventory_capacity_used: i64,
    /// Number of inventory transactions applied.
    pub items_moved_count: u64,
    pub containers: BTreeMap<String, ContainerInfo>,
    pub trade: TradeTotals,
    pub missions: MissionTotals,
    /// Most recent transactions, oldest first.
    pub recent_transactions: VecDeque<TransactionRecord>,
    /// Most recent missions, oldest first.
    pub recent_missions: VecDeque<MissionRecord>,
}

impl SessionStats {
    /// Whether nothing has been applied yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
