//! Watcher module tests.

mod tailer_test;

/// Verify all public watcher types are exported from the library.
#[test]
fn test_all_watcher_types_exported() {
    use gamelog_monitor::watcher::{
        default_log_candidates, find_log_file, ChangeNotifier, ChangeSignal, FileIdentity,
        LogPosition, LogTailer, PollBatch, RawLine, ResetReason, StartPosition, TailOptions,
        WatcherError, DEFAULT_FINGERPRINT_BYTES, DEFAULT_MAX_READ_BYTES, LOG_FILE_NAME,
    };

    let _ = TailOptions::default();
    let _ = PollBatch::default();
    let _ = RawLine::new("text", 0);
    let _ = LogPosition::new(FileIdentity::from_prefix(b"x".to_vec()), 0);
    let _ = StartPosition::Beginning;
    let _ = ResetReason::Rotated;
    let _ = ChangeSignal::Changed;
    let _: Option<&ChangeNotifier> = None;
    let _: Option<&LogTailer> = None;
    let _: fn(std::path::PathBuf) -> WatcherError = WatcherError::NotFound;

    assert_eq!(DEFAULT_FINGERPRINT_BYTES, 256);
    assert!(DEFAULT_MAX_READ_BYTES > 0);
    assert!(default_log_candidates()[0].ends_with(LOG_FILE_NAME));
    assert!(find_log_file::<std::path::PathBuf>(&[]).is_none());
}
