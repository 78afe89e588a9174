//! Tailer behavior across growth, rotation and truncation.

use std::io::Write;
use std::path::Path;

use gamelog_monitor::watcher::{LogTailer, ResetReason, TailOptions};
use tempfile::TempDir;

fn append(path: &Path, bytes: &[u8]) {
    let mut f = std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .unwrap();
    f.write_all(bytes).unwrap();
    f.flush().unwrap();
}

/// Deterministic chunk sizes for splitting writes.
struct XorShift(u64);

impl XorShift {
    fn next(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
}

#[tokio::test]
async fn test_every_line_delivered_exactly_once() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("Game.log");
    std::fs::write(&path, "").unwrap();

    let expected: Vec<String> = (0..500)
        .map(|i| format!("<entry {i}> payload {}", "x".repeat(i % 37)))
        .collect();
    let mut content = Vec::new();
    for line in &expected {
        content.extend_from_slice(line.as_bytes());
        content.push(b'\n');
    }

    let options = TailOptions {
        max_read_bytes: 512,
        ..TailOptions::default()
    };
    let mut tailer = LogTailer::open(&path, options).await.unwrap();
    let mut rng = XorShift(0x9E37_79B9_7F4A_7C15);
    let mut seen = Vec::new();
    let mut offsets = Vec::new();

    let mut written = 0;
    while written < content.len() {
        let step = usize::try_from(rng.next() % 300).unwrap() + 1;
        let end = (written + step).min(content.len());
        append(&path, &content[written..end]);
        written = end;

        loop {
            let batch = tailer.poll().await.unwrap();
            assert!(batch.reset.is_none());
            for line in batch.lines {
                offsets.push(line.source_offset);
                seen.push(line.text);
            }
            if !batch.more_pending {
                break;
            }
        }
    }

    assert_eq!(seen, expected);
    assert!(offsets.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(tailer.offset(), content.len() as u64);
    assert_eq!(tailer.pending_len(), 0);
}

#[tokio::test]
async fn test_repeated_polls_without_growth_are_empty() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("Game.log");
    std::fs::write(&path, "a\nb\n").unwrap();

    let mut tailer = LogTailer::open(&path, TailOptions::from_beginning())
        .await
        .unwrap();
    assert_eq!(tailer.poll().await.unwrap().lines.len(), 2);
    let offset = tailer.offset();

    for _ in 0..3 {
        let batch = tailer.poll().await.unwrap();
        assert!(batch.lines.is_empty());
        assert!(batch.reset.is_none());
        assert_eq!(tailer.offset(), offset);
    }
}

#[tokio::test]
async fn test_rotation_reads_only_new_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("Game.log");
    std::fs::write(&path, "old session line 1\nold session line 2\nold session line 3\n").unwrap();

    let mut tailer = LogTailer::open(&path, TailOptions::from_beginning())
        .await
        .unwrap();
    assert_eq!(tailer.poll().await.unwrap().lines.len(), 3);

    // The game moves the old log aside and starts a new one.
    std::fs::rename(&path, dir.path().join("Game-backup.log")).unwrap();
    std::fs::write(&path, "new session line 1\n").unwrap();

    let batch = tailer.poll().await.unwrap();
    assert_eq!(batch.reset, Some(ResetReason::Rotated));
    let texts: Vec<&str> = batch.lines.iter().map(|l| l.text.as_str()).collect();
    assert_eq!(texts, vec!["new session line 1"]);
    assert_eq!(batch.lines[0].source_offset, 0);
}

#[tokio::test]
async fn test_rotation_to_larger_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("Game.log");
    std::fs::write(&path, "short\n").unwrap();

    let mut tailer = LogTailer::open(&path, TailOptions::from_beginning())
        .await
        .unwrap();
    assert_eq!(tailer.poll().await.unwrap().lines.len(), 1);

    std::fs::remove_file(&path).unwrap();
    std::fs::write(&path, "first of many\nsecond of many\nthird of many\n").unwrap();

    let batch = tailer.poll().await.unwrap();
    assert!(matches!(
        batch.reset,
        Some(ResetReason::Rotated | ResetReason::Reappeared)
    ));
    assert_eq!(batch.lines.len(), 3);
    assert_eq!(batch.lines[0].text, "first of many");
}

#[tokio::test]
async fn test_truncate_in_place_then_regrow() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("Game.log");
    std::fs::write(&path, "aaaa\nbbbb\ncccc\n").unwrap();

    let mut tailer = LogTailer::open(&path, TailOptions::default()).await.unwrap();
    assert!(tailer.poll().await.unwrap().lines.is_empty());

    let file = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
    file.set_len(0).unwrap();
    drop(file);
    append(&path, b"zz\n");

    let batch = tailer.poll().await.unwrap();
    assert!(batch.reset.is_some());
    assert_eq!(batch.lines.len(), 1);
    assert_eq!(batch.lines[0].text, "zz");
}

#[tokio::test]
async fn test_split_write_yields_single_line() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("Game.log");
    std::fs::write(&path, "").unwrap();

    let mut tailer = LogTailer::open(&path, TailOptions::default()).await.unwrap();
    append(&path, b"Player: Al");
    assert!(tailer.poll().await.unwrap().lines.is_empty());
    append(&path, b"ice\n");

    let batch = tailer.poll().await.unwrap();
    assert_eq!(batch.lines.len(), 1);
    assert_eq!(batch.lines[0].text, "Player: Alice");
    assert_eq!(batch.lines[0].source_offset, 0);
}
