//! Monitor lifecycle, publication and fault handling.

use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use gamelog_monitor::monitor::{LogMonitor, MonitorError, MonitorOptions, MonitorState};
use gamelog_monitor::stats::SessionStats;
use gamelog_monitor::watcher::TailOptions;
use tempfile::TempDir;
use tokio::time::timeout;

const SESSION_A: &str = "<2024-05-01T12:00:00.000Z> [Notice] <Channel Created> map=\"megamap\" nickname=\"Alice\" playerGEID=42 sessionId=A\n";

fn purchase(item: &str, quantity: u32) -> String {
    format!(
        "<2024-05-01T12:05:00.000Z> [Notice] <CEntityComponentShopUIProvider::SendShopBuyRequest> shopName[Cubby Blast] client_price[100.0] itemName[{item}] quantity[{quantity}]\n"
    )
}

fn append(path: &Path, content: &str) {
    let mut f = std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .unwrap();
    f.write_all(content.as_bytes()).unwrap();
    f.flush().unwrap();
}

/// Options where only `refresh_now` and the first tick drive polls.
fn manual_options() -> MonitorOptions {
    MonitorOptions {
        poll_interval: Duration::from_secs(3600),
        use_notifications: false,
        ..MonitorOptions::default()
    }
}

fn log_file(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("Game.log");
    std::fs::write(&path, content).unwrap();
    path
}

#[tokio::test]
async fn test_lifecycle_transitions() {
    let dir = TempDir::new().unwrap();
    let path = log_file(&dir, "");
    let monitor = LogMonitor::new(manual_options());
    assert_eq!(monitor.status().state, MonitorState::Idle);

    monitor.start(&path).await.unwrap();
    assert_eq!(monitor.status().state, MonitorState::Monitoring);
    assert_eq!(monitor.status().path.as_deref(), Some(path.as_path()));

    assert!(matches!(
        monitor.start(&path).await,
        Err(MonitorError::AlreadyRunning)
    ));

    monitor.stop().await;
    assert_eq!(monitor.status().state, MonitorState::Stopped);
    assert!(matches!(
        monitor.refresh_now().await,
        Err(MonitorError::NotMonitoring)
    ));

    // Stopping twice is harmless.
    monitor.stop().await;
    assert_eq!(monitor.status().state, MonitorState::Stopped);

    monitor.start(&path).await.unwrap();
    assert_eq!(monitor.status().state, MonitorState::Monitoring);
    monitor.stop().await;
}

#[tokio::test]
async fn test_start_on_missing_file_reports_not_found() {
    let dir = TempDir::new().unwrap();
    let monitor = LogMonitor::new(manual_options());

    let err = monitor
        .start(dir.path().join("Game.log"))
        .await
        .unwrap_err();
    assert!(matches!(err, MonitorError::NotFound(_)));
    assert_eq!(monitor.status().state, MonitorState::Idle);
}

#[tokio::test]
async fn test_only_new_lines_are_counted() {
    let dir = TempDir::new().unwrap();
    let path = log_file(&dir, &format!("{SESSION_A}{}", purchase("Old", 9)));
    let monitor = LogMonitor::new(manual_options());
    monitor.start(&path).await.unwrap();

    append(&path, &purchase("Rifle", 5));
    append(&path, &purchase("Ammo", 2));
    let stats = monitor.refresh_now().await.unwrap();

    assert_eq!(stats.items_moved_count, 2);
    assert_eq!(stats.inventory_capacity_used, 7);
    assert_eq!(stats.containers["Cubby Blast"].transactions, 2);
    monitor.stop().await;
}

#[tokio::test]
async fn test_refresh_updates_watch_and_subscribers() {
    let dir = TempDir::new().unwrap();
    let path = log_file(&dir, "");
    let monitor = LogMonitor::new(manual_options());

    let received: Arc<Mutex<Vec<u64>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    let id = monitor.subscribe(move |stats: &SessionStats| {
        sink.lock().unwrap().push(stats.items_moved_count);
    });
    let mut rx = monitor.watch();

    monitor.start(&path).await.unwrap();
    append(&path, &format!("{SESSION_A}{}", purchase("Rifle", 1)));
    let stats = monitor.refresh_now().await.unwrap();
    assert_eq!(stats.items_moved_count, 1);

    assert_eq!(rx.borrow_and_update().items_moved_count, 1);
    assert_eq!(received.lock().unwrap().last(), Some(&1));

    assert!(monitor.unsubscribe(id));
    let before = received.lock().unwrap().len();
    append(&path, &purchase("Rifle", 1));
    monitor.refresh_now().await.unwrap();
    assert_eq!(received.lock().unwrap().len(), before);

    monitor.stop().await;
}

#[tokio::test]
async fn test_unrecognized_lines_do_not_publish() {
    let dir = TempDir::new().unwrap();
    let path = log_file(&dir, "");
    let monitor = LogMonitor::new(manual_options());
    let count = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&count);

    monitor.start(&path).await.unwrap();
    // Let the first tick pass before counting.
    monitor.refresh_now().await.unwrap();
    monitor.subscribe(move |_stats: &SessionStats| {
        seen.fetch_add(1, Ordering::SeqCst);
    });

    append(&path, "<2024-05-01T12:00:00.000Z> [Notice] <Frame> fps=60\nnoise\n");
    monitor.refresh_now().await.unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 0);
    assert_eq!(monitor.status().lines_read, 2);
    monitor.stop().await;
}

#[tokio::test]
async fn test_reset_stats_publishes_empty_snapshot() {
    let dir = TempDir::new().unwrap();
    let path = log_file(&dir, "");
    let monitor = LogMonitor::new(manual_options());
    monitor.start(&path).await.unwrap();

    append(&path, &purchase("Rifle", 3));
    assert_eq!(monitor.refresh_now().await.unwrap().items_moved_count, 1);

    monitor.reset_stats().await;
    assert!(monitor.snapshot().is_empty());

    // Counting resumes from zero.
    append(&path, &purchase("Rifle", 3));
    assert_eq!(monitor.refresh_now().await.unwrap().items_moved_count, 1);
    monitor.stop().await;
}

#[tokio::test]
async fn test_new_session_discards_previous_counters() {
    let dir = TempDir::new().unwrap();
    let path = log_file(&dir, "");
    let monitor = LogMonitor::new(manual_options());
    monitor.start(&path).await.unwrap();

    append(&path, SESSION_A);
    append(&path, &purchase("X", 1));
    append(&path, &purchase("Y", 1));
    assert_eq!(monitor.refresh_now().await.unwrap().items_moved_count, 2);

    append(&path, &SESSION_A.replace("sessionId=A", "sessionId=B"));
    let stats = monitor.refresh_now().await.unwrap();
    assert_eq!(stats.items_moved_count, 0);
    assert_eq!(stats.session_id.as_deref(), Some("B"));
    monitor.stop().await;
}

#[tokio::test]
async fn test_rotation_starts_fresh_session() {
    let dir = TempDir::new().unwrap();
    let path = log_file(&dir, "");
    let monitor = LogMonitor::new(manual_options());
    monitor.start(&path).await.unwrap();

    append(&path, SESSION_A);
    append(&path, &purchase("X", 4));
    assert_eq!(monitor.refresh_now().await.unwrap().items_moved_count, 1);

    // Relaunch: a new file reusing the same session id.
    std::fs::rename(&path, dir.path().join("Game-old.log")).unwrap();
    std::fs::write(&path, format!("{SESSION_A}{}", purchase("Z", 1))).unwrap();

    let stats = monitor.refresh_now().await.unwrap();
    assert_eq!(stats.items_moved_count, 1);
    assert_eq!(stats.inventory_capacity_used, 1);
    assert_eq!(stats.recent_transactions[0].item_id, "Z");
    monitor.stop().await;
}

#[tokio::test]
async fn test_faults_are_counted_and_recovered() {
    let dir = TempDir::new().unwrap();
    let path = log_file(&dir, "");
    let monitor = LogMonitor::new(manual_options());
    monitor.start(&path).await.unwrap();
    monitor.refresh_now().await.unwrap();

    // A directory where the log should be makes every read fail.
    std::fs::remove_file(&path).unwrap();
    std::fs::create_dir(&path).unwrap();
    monitor.refresh_now().await.unwrap();
    monitor.refresh_now().await.unwrap();

    let status = monitor.status();
    assert_eq!(status.state, MonitorState::Monitoring);
    assert_eq!(status.consecutive_faults, 2);
    assert_eq!(status.total_faults, 2);
    assert!(status.last_fault.is_some());

    std::fs::remove_dir(&path).unwrap();
    std::fs::write(&path, purchase("Back", 1)).unwrap();
    let stats = monitor.refresh_now().await.unwrap();
    assert_eq!(stats.items_moved_count, 1);

    let status = monitor.status();
    assert_eq!(status.consecutive_faults, 0);
    assert_eq!(status.total_faults, 2);
    monitor.stop().await;
}

#[tokio::test]
async fn test_missing_file_is_not_a_fault() {
    let dir = TempDir::new().unwrap();
    let path = log_file(&dir, "");
    let monitor = LogMonitor::new(manual_options());
    monitor.start(&path).await.unwrap();

    std::fs::remove_file(&path).unwrap();
    monitor.refresh_now().await.unwrap();
    assert_eq!(monitor.status().total_faults, 0);

    std::fs::write(&path, purchase("Back", 2)).unwrap();
    assert_eq!(monitor.refresh_now().await.unwrap().inventory_capacity_used, 2);
    monitor.stop().await;
}

#[tokio::test]
async fn test_background_loop_picks_up_appends() {
    let dir = TempDir::new().unwrap();
    let path = log_file(&dir, "");
    let monitor = LogMonitor::new(MonitorOptions {
        poll_interval: Duration::from_millis(20),
        use_notifications: false,
        ..MonitorOptions::default()
    });
    let mut rx = monitor.watch();
    monitor.start(&path).await.unwrap();
    rx.borrow_and_update();

    append(&path, &purchase("Rifle", 1));
    let stats = timeout(Duration::from_secs(5), async {
        loop {
            rx.changed().await.unwrap();
            let stats = Arc::clone(&rx.borrow_and_update());
            if stats.items_moved_count > 0 {
                return stats;
            }
        }
    })
    .await
    .expect("no snapshot published");
    assert_eq!(stats.items_moved_count, 1);
    monitor.stop().await;
}

#[tokio::test]
async fn test_notifications_with_replay() {
    let dir = TempDir::new().unwrap();
    let path = log_file(&dir, &purchase("Old", 1));
    let monitor = LogMonitor::new(MonitorOptions {
        poll_interval: Duration::from_millis(100),
        tail: TailOptions::from_beginning(),
        ..MonitorOptions::default()
    });
    let mut rx = monitor.watch();
    monitor.start(&path).await.unwrap();

    append(&path, &purchase("New", 1));
    let stats = timeout(Duration::from_secs(5), async {
        loop {
            let stats = Arc::clone(&rx.borrow_and_update());
            if stats.items_moved_count == 2 {
                return stats;
            }
            rx.changed().await.unwrap();
        }
    })
    .await
    .expect("replayed and appended lines not both applied");
    assert_eq!(stats.inventory_capacity_used, 2);
    monitor.stop().await;
}

#[tokio::test]
async fn test_stop_releases_the_file() {
    let dir = TempDir::new().unwrap();
    let path = log_file(&dir, "");
    let monitor = Arc::new(LogMonitor::new(MonitorOptions {
        poll_interval: Duration::from_millis(5),
        use_notifications: false,
        ..MonitorOptions::default()
    }));
    monitor.start(&path).await.unwrap();

    let writer = {
        let path = path.clone();
        tokio::spawn(async move {
            for i in 0..200 {
                append(&path, &purchase(&format!("item-{i}"), 1));
                tokio::task::yield_now().await;
            }
        })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    timeout(Duration::from_secs(5), monitor.stop())
        .await
        .expect("stop did not return");
    assert_eq!(monitor.status().state, MonitorState::Stopped);
    writer.await.unwrap();

    let moved = monitor.snapshot().items_moved_count;
    append(&path, &purchase("after-stop", 1));
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(monitor.snapshot().items_moved_count, moved);
}
