//! Monitor module tests.

mod monitor_test;

/// Verify all public monitor types are exported from the library.
#[test]
fn test_all_monitor_types_exported() {
    use gamelog_monitor::monitor::{
        read_log, LogMonitor, MonitorError, MonitorOptions, MonitorState, MonitorStatus,
        StatsCallback, SubscriptionId, DEFAULT_DEBOUNCE, DEFAULT_POLL_INTERVAL,
    };
    use gamelog_monitor::stats::SessionStats;

    let monitor = LogMonitor::new(MonitorOptions::default());
    assert_eq!(monitor.status(), MonitorStatus::default());
    assert_eq!(monitor.status().state, MonitorState::Idle);
    assert!(monitor.snapshot().is_empty());

    let callback: StatsCallback = std::sync::Arc::new(|_stats: &SessionStats| {});
    let id: SubscriptionId = monitor.subscribe(move |stats| callback(stats));
    assert!(monitor.unsubscribe(id));

    let _ = MonitorError::AlreadyRunning;
    let _ = read_log;
    assert!(DEFAULT_DEBOUNCE < DEFAULT_POLL_INTERVAL);
}
