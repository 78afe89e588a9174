//! Session statistics: the aggregate model and the aggregator that owns it.

mod aggregator;
mod model;

pub use aggregator::{StatsAggregator, DEFAULT_HISTORY_LIMIT};
pub use model::{
    ContainerInfo, MissionRecord, MissionTotals, SessionStats, TradeTotals, TransactionRecord,
};
