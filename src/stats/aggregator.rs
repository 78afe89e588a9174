//! Stats aggregator.
//!
//! Applies parsed events to the running [`SessionStats`] with fixed
//! merge/overwrite rules.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use super::model::{ContainerInfo, MissionRecord, SessionStats, TransactionRecord};
use crate::parser::{Event, MissionOutcome, TransactionKind};

/// Default number of recent transactions and missions kept.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Single owner of the running session aggregate.
#[derive(Debug)]
pub struct StatsAggregator {
    stats: SessionStats,
    history_limit: usize,
    /// The file was replaced; the next session start begins a new session
    /// even when its id repeats.
    file_reset_pending: bool,
}

impl Default for StatsAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsAggregator {
    #[must_use]
    pub fn new() -> Self {
        Self::with_history_limit(DEFAULT_HISTORY_LIMIT)
    }

    #[must_use]
    pub fn with_history_limit(history_limit: usize) -> Self {
        Self {
            stats: SessionStats::default(),
            history_limit,
            file_reset_pending: false,
        }
    }

    /// Borrow the current aggregate.
    #[must_use]
    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Immutable copy of the current aggregate.
    #[must_use]
    pub fn snapshot(&self) -> SessionStats {
        self.stats.clone()
    }

    /// Discard everything, including build metadata.
    pub fn reset(&mut self) {
        tracing::debug!("Resetting session stats");
        self.stats = SessionStats::default();
        self.file_reset_pending = false;
    }

    /// Record that the tailed file was rotated or truncated.
    pub fn note_file_reset(&mut self) {
        self.file_reset_pending = true;
    }

    /// Apply one event.
    ///
    /// `last_updated_at` never moves backwards within a session: an event
    /// stamped earlier than it starts a new session, and an event without a
    /// timestamp keeps the current value, using the wall clock only when
    /// nothing has been stamped yet.
    pub fn apply(&mut self, event: &Event) {
        let timestamp = event.timestamp();

        if let (Some(ts), Some(last)) = (timestamp, self.stats.last_updated_at) {
            if ts < last {
                tracing::info!(%ts, %last, "Log clock went backwards, starting a new session");
                self.begin_new_session();
            }
        }

        match event {
            Event::SessionStarted {
                player,
                player_id,
                session_id,
                map,
                game_version,
                ..
            } => {
                let is_new = self.file_reset_pending
                    || self.stats.session_id.as_deref() != Some(session_id.as_str());
                if is_new {
                    tracing::info!(session_id = %session_id, player = %player, "New session started");
                    self.begin_new_session();
                    self.stats.started_at = timestamp;
                }
                self.file_reset_pending = false;

                self.stats.session_id = Some(session_id.clone());
                self.stats.player = Some(player.clone());
                if player_id.is_some() {
                    self.stats.player_id.clone_from(player_id);
                }
                if map.is_some() {
                    self.stats.map.clone_from(map);
                }
                if game_version.is_some() {
                    self.stats.game_version.clone_from(game_version);
                }
            }
            Event::SessionEnded { uptime_secs, .. } => {
                self.stats.ended_at = timestamp.or(self.stats.ended_at);
                if uptime_secs.is_some() {
                    self.stats.uptime_secs = *uptime_secs;
                }
            }
            Event::VersionDetected { version, .. } => {
                if self.stats.game_version.is_none() || self.file_reset_pending {
                    self.stats.game_version = Some(version.clone());
                }
            }
            Event::BranchDetected { branch, .. } => {
                if self.stats.branch.is_none() || self.file_reset_pending {
                    self.stats.branch = Some(branch.clone());
                }
            }
            Event::InventoryTransaction {
                item_id,
                quantity,
                container_id,
                price,
                kind,
                ..
            } => self.apply_transaction(TransactionRecord {
                item_id: item_id.clone(),
                quantity: *quantity,
                container_id: container_id.clone(),
                price: *price,
                kind: *kind,
                timestamp,
            }),
            Event::MissionEnded {
                mission_id,
                player,
                outcome,
                reason,
                ..
            } => self.apply_mission(MissionRecord {
                mission_id: mission_id.clone(),
                player: player.clone(),
                outcome: *outcome,
                reason: reason.clone(),
                timestamp,
            }),
        }

        match timestamp {
            Some(ts) => {
                if self.stats.started_at.is_none() {
                    self.stats.started_at = Some(ts);
                }
                self.stats.last_updated_at = Some(ts);
            }
            None => {
                self.stats.last_updated_at.get_or_insert_with(Utc::now);
            }
        }
    }

    /// Drop per-session counters, keeping the build metadata logged before
    /// the session began.
    fn begin_new_session(&mut self) {
        let game_version = self.stats.game_version.take();
        let branch = self.stats.branch.take();
        self.stats = SessionStats {
            game_version,
            branch,
            ..SessionStats::default()
        };
    }

    fn apply_transaction(&mut self, record: TransactionRecord) {
        let stats = &mut self.stats;
        stats.items_moved_count = stats.items_moved_count.saturating_add(1);
        stats.inventory_capacity_used = stats.inventory_capacity_used.saturating_add(record.quantity);

        let container = stats
            .containers
            .entry(record.container_id.clone())
            .or_insert_with(|| ContainerInfo::new(record.container_id.clone()));
        container.transactions = container.transactions.saturating_add(1);
        container.net_quantity = container.net_quantity.saturating_add(record.quantity);
        container.last_item = Some(record.item_id.clone());
        container.last_activity = record.timestamp.or(container.last_activity);

        let moved = record.quantity.unsigned_abs();
        match record.kind {
            TransactionKind::Purchase => {
                stats.trade.money_spent += record.price;
                stats.trade.items_purchased = stats.trade.items_purchased.saturating_add(moved);
            }
            TransactionKind::Sale => {
                stats.trade.money_earned += record.price;
                stats.trade.items_sold = stats.trade.items_sold.saturating_add(moved);
            }
        }
        stats.trade.net_profit = stats.trade.money_earned - stats.trade.money_spent;

        push_bounded(&mut stats.recent_transactions, record, self.history_limit);
    }

    fn apply_mission(&mut self, record: MissionRecord) {
        let missions = &mut self.stats.missions;
        match record.outcome {
            MissionOutcome::Completed => missions.completed += 1,
            MissionOutcome::Abandoned => missions.abandoned += 1,
            MissionOutcome::Failed => missions.failed += 1,
        }
        push_bounded(&mut self.stats.recent_missions, record, self.history_limit);
    }
}

fn push_bounded<T>(list: &mut VecDeque<T>, item: T, limit: usize) {
    if limit == 0 {
        return;
    }
    while list.len() >= limit {
        list.pop_front();
    }
    list.push_back(item);
}
