//! One-shot read of a complete log.

use std::path::Path;

use super::error::MonitorError;
use super::runner::MonitorOptions;
use crate::parser::LineParser;
use crate::stats::{SessionStats, StatsAggregator};
use crate::watcher::{LogTailer, StartPosition, TailOptions};

/// Parse every complete line currently in `path` and return the aggregate.
///
/// The `start` setting of `options.tail` is ignored; the file is always
/// read from its beginning.
///
/// # Errors
///
/// Returns `NotFound` or `PermissionDenied` if the log cannot be opened and
/// `Watcher` for read failures.
pub async fn read_log(path: &Path, options: &MonitorOptions) -> Result<SessionStats, MonitorError> {
    let tail = TailOptions {
        start: StartPosition::Beginning,
        ..options.tail.clone()
    };
    let mut tailer = LogTailer::open(path, tail).await?;
    let parser = LineParser::new(options.patterns.clone());
    let mut aggregator = StatsAggregator::with_history_limit(options.history_limit);

    let mut lines = 0usize;
    loop {
        let batch = tailer.poll().await?;
        lines += batch.lines.len();
        if batch.reset.is_some() {
            aggregator.note_file_reset();
        }
        for event in batch.lines.iter().filter_map(|line| parser.parse(line)) {
            aggregator.apply(&event);
        }
        if !batch.more_pending {
            break;
        }
    }

    tracing::debug!(path = %path.display(), lines, "Read complete log");
    Ok(aggregator.snapshot())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_read_log_in_small_chunks() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Game.log");
        let mut content = String::new();
        for _ in 0..20 {
            content.push_str("<2024-05-01T12:00:00.000Z> <CEntityComponentShoppingProvider::SendStandardItemBuyRequest> shopName[Shop] client_price[10] itemName[Thing] quantity[1]\n");
            content.push_str("<2024-05-01T12:00:01.000Z> [Notice] unrelated noise\n");
        }
        std::fs::write(&path, content).unwrap();

        let options = MonitorOptions {
            tail: TailOptions {
                max_read_bytes: 64,
                ..TailOptions::default()
            },
            ..MonitorOptions::default()
        };
        let stats = read_log(&path, &options).await.unwrap();
        assert_eq!(stats.items_moved_count, 20);
        assert_eq!(stats.inventory_capacity_used, 20);
    }

    #[tokio::test]
    async fn test_read_log_missing() {
        let dir = TempDir::new().unwrap();
        let err = read_log(&dir.path().join("Game.log"), &MonitorOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, MonitorError::NotFound(_)));
    }
}
