//! The monitor loop.
//!
//! Drives the tailer on a timer and on filesystem notifications, feeds
//! each line through the parser into the aggregator and publishes
//! snapshots to subscribers.

use std::path::PathBuf;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::error::MonitorError;
use super::state::{MonitorState, MonitorStatus};
use super::subscribers::{StatsCallback, SubscriberRegistry, SubscriptionId};
use crate::parser::{LineParser, PatternTable};
use crate::stats::{SessionStats, StatsAggregator, DEFAULT_HISTORY_LIMIT};
use crate::watcher::{ChangeNotifier, ChangeSignal, LogTailer, TailOptions};

/// Default interval between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Default debounce window for filesystem notifications.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);

/// Monitor tuning.
#[derive(Debug, Clone)]
pub struct MonitorOptions {
    pub poll_interval: Duration,
    pub debounce: Duration,
    /// Wake on filesystem notifications in addition to the timer.
    pub use_notifications: bool,
    pub tail: TailOptions,
    pub history_limit: usize,
    pub patterns: PatternTable,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            debounce: DEFAULT_DEBOUNCE,
            use_notifications: true,
            tail: TailOptions::default(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            patterns: PatternTable::with_default_patterns(),
        }
    }
}

/// Outcome of one poll cycle.
#[derive(Debug, Default, Clone, Copy)]
struct Cycle {
    more_pending: bool,
}

/// State mutated by poll cycles. Guarded by a single async lock so cycles,
/// resets, start and stop never interleave.
#[derive(Debug)]
struct Core {
    tailer: Option<LogTailer>,
    aggregator: StatsAggregator,
}

#[derive(Debug)]
struct Shared {
    parser: LineParser,
    core: Mutex<Core>,
    status: StdMutex<MonitorStatus>,
    stats_tx: watch::Sender<Arc<SessionStats>>,
    /// Taken before the core lock is released and held while publishing,
    /// so snapshots go out in the order they were taken.
    publishing: StdMutex<()>,
    subscribers: SubscriberRegistry,
}

impl Shared {
    fn update_status<R>(&self, f: impl FnOnce(&mut MonitorStatus) -> R) -> R {
        let mut status = self.status.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut status)
    }

    fn begin_publish(&self) -> MutexGuard<'_, ()> {
        self.publishing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Hand a snapshot to the watch channel and every subscriber.
    fn publish(&self, _turn: &MutexGuard<'_, ()>, stats: &Arc<SessionStats>) {
        self.stats_tx.send_replace(Arc::clone(stats));
        self.subscribers.notify(stats);
    }

    /// Poll the tailer once and apply what it yields.
    ///
    /// `cancel` is checked between lines so `stop` never waits on a long
    /// batch.
    async fn cycle(&self, cancel: &CancellationToken) -> Cycle {
        let mut core = self.core.lock().await;
        let Core { tailer, aggregator } = &mut *core;
        let Some(tailer) = tailer.as_mut() else {
            return Cycle::default();
        };

        let batch = match tailer.poll().await {
            Ok(batch) => batch,
            Err(err) => {
                let first = self.update_status(|s| s.record_fault(err.to_string()));
                let path = tailer.path().display();
                if first {
                    tracing::warn!(path = %path, error = %err, "Log poll failed, will retry");
                } else {
                    tracing::debug!(path = %path, error = %err, "Log poll still failing");
                }
                return Cycle::default();
            }
        };

        if batch.reset.is_some() {
            aggregator.note_file_reset();
        }

        let mut applied = 0;
        for line in &batch.lines {
            if cancel.is_cancelled() {
                break;
            }
            if let Some(event) = self.parser.parse(line) {
                tracing::trace!(event = event.name(), offset = line.source_offset, "Applying event");
                aggregator.apply(&event);
                applied += 1;
            }
        }

        let recovered = self.update_status(|s| s.record_success(batch.lines.len(), applied));
        if recovered > 0 {
            tracing::info!(faults = recovered, "Log polling recovered");
        }

        if applied > 0 || batch.reset.is_some() {
            let stats = Arc::new(aggregator.snapshot());
            let turn = self.begin_publish();
            drop(core);
            self.publish(&turn, &stats);
        }

        Cycle {
            more_pending: batch.more_pending,
        }
    }
}

/// Handle to the spawned loop of the current run.
#[derive(Debug)]
struct RunHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Watches a game log and keeps a live [`SessionStats`] aggregate.
///
/// All methods take `&self`; share the monitor behind an `Arc` to drive it
/// from several tasks.
#[derive(Debug)]
pub struct LogMonitor {
    options: MonitorOptions,
    shared: Arc<Shared>,
    run: Mutex<Option<RunHandle>>,
}

impl Default for LogMonitor {
    fn default() -> Self {
        Self::new(MonitorOptions::default())
    }
}

impl LogMonitor {
    #[must_use]
    pub fn new(options: MonitorOptions) -> Self {
        let (stats_tx, _) = watch::channel(Arc::new(SessionStats::default()));
        let shared = Shared {
            parser: LineParser::new(options.patterns.clone()),
            core: Mutex::new(Core {
                tailer: None,
                aggregator: StatsAggregator::with_history_limit(options.history_limit),
            }),
            status: StdMutex::new(MonitorStatus::default()),
            stats_tx,
            publishing: StdMutex::new(()),
            subscribers: SubscriberRegistry::default(),
        };
        Self {
            options,
            shared: Arc::new(shared),
            run: Mutex::new(None),
        }
    }

    /// Start monitoring `path` with a fresh aggregate.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyRunning` while a run is active, and `NotFound`,
    /// `PermissionDenied` or `Watcher` if the log cannot be opened. The
    /// monitor state is unchanged on error.
    pub async fn start(&self, path: impl Into<PathBuf>) -> Result<(), MonitorError> {
        let path = path.into();
        let mut run = self.run.lock().await;
        if run.is_some() {
            return Err(MonitorError::AlreadyRunning);
        }

        let tailer = LogTailer::open(&path, self.options.tail.clone()).await?;

        {
            let mut core = self.shared.core.lock().await;
            core.tailer = Some(tailer);
            core.aggregator = StatsAggregator::with_history_limit(self.options.history_limit);
            self.shared.update_status(|s| {
                s.begin_run(path.clone());
                s.transition(MonitorState::Monitoring);
            });
            let turn = self.shared.begin_publish();
            drop(core);
            self.shared.publish(&turn, &Arc::new(SessionStats::default()));
        }

        let changes = if self.options.use_notifications {
            match ChangeNotifier::watch(&path, self.options.debounce) {
                Ok(pair) => Some(pair),
                Err(err) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %err,
                        "File notifications unavailable, falling back to polling"
                    );
                    None
                }
            }
        } else {
            None
        };

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_loop(
            Arc::clone(&self.shared),
            cancel.clone(),
            self.options.poll_interval,
            changes,
        ));
        *run = Some(RunHandle { cancel, task });

        tracing::info!(path = %path.display(), "Monitoring started");
        Ok(())
    }

    /// Stop the current run and release the log file.
    ///
    /// Safe to call in any state. Returns once the loop has exited.
    pub async fn stop(&self) {
        let mut run = self.run.lock().await;
        let Some(RunHandle { cancel, task }) = run.take() else {
            return;
        };
        cancel.cancel();
        if let Err(err) = task.await {
            tracing::warn!(error = %err, "Monitor loop ended abnormally");
        }

        self.shared.core.lock().await.tailer = None;
        self.shared.update_status(|s| s.transition(MonitorState::Stopped));
        tracing::info!("Monitoring stopped");
    }

    /// Poll immediately and return the resulting snapshot.
    ///
    /// # Errors
    ///
    /// Returns `NotMonitoring` unless a run is active.
    pub async fn refresh_now(&self) -> Result<Arc<SessionStats>, MonitorError> {
        let cancel = {
            let run = self.run.lock().await;
            let Some(handle) = run.as_ref() else {
                return Err(MonitorError::NotMonitoring);
            };
            handle.cancel.clone()
        };

        loop {
            if !self.shared.cycle(&cancel).await.more_pending || cancel.is_cancelled() {
                break;
            }
        }

        // Wait for any publication still in flight from the loop.
        let _turn = self.shared.begin_publish();
        Ok(self.snapshot())
    }

    /// Clear the aggregate and publish the empty snapshot.
    pub async fn reset_stats(&self) {
        let mut core = self.shared.core.lock().await;
        core.aggregator.reset();
        let stats = Arc::new(core.aggregator.snapshot());
        let turn = self.shared.begin_publish();
        drop(core);
        self.shared.publish(&turn, &stats);
    }

    /// Register a callback for every published snapshot.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&SessionStats) + Send + Sync + 'static,
    {
        let callback: StatsCallback = Arc::new(callback);
        self.shared.subscribers.subscribe(callback)
    }

    /// Remove a callback. Returns false if `id` was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.shared.subscribers.unsubscribe(id)
    }

    /// Receiver that always holds the latest snapshot.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<Arc<SessionStats>> {
        self.shared.stats_tx.subscribe()
    }

    /// Latest published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<SessionStats> {
        Arc::clone(&self.shared.stats_tx.borrow())
    }

    #[must_use]
    pub fn status(&self) -> MonitorStatus {
        self.shared.update_status(|s| s.clone())
    }
}

impl Drop for LogMonitor {
    fn drop(&mut self) {
        if let Some(handle) = self.run.get_mut().take() {
            handle.cancel.cancel();
        }
    }
}

/// Why the loop woke up.
enum Wake {
    Tick,
    Signal(Option<ChangeSignal>),
}

async fn run_loop(
    shared: Arc<Shared>,
    cancel: CancellationToken,
    poll_interval: Duration,
    changes: Option<(ChangeNotifier, mpsc::UnboundedReceiver<ChangeSignal>)>,
) {
    let (_notifier, mut signals) = match changes {
        Some((notifier, rx)) => (Some(notifier), Some(rx)),
        None => (None, None),
    };

    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let wake = tokio::select! {
            biased;

            () = cancel.cancelled() => break,
            _ = ticker.tick() => Wake::Tick,
            signal = next_signal(&mut signals) => Wake::Signal(signal),
        };

        match wake {
            Wake::Tick | Wake::Signal(Some(ChangeSignal::Changed)) => {}
            Wake::Signal(Some(ChangeSignal::Error(message))) => {
                tracing::debug!(error = %message, "File watcher reported an error");
            }
            Wake::Signal(None) => {
                tracing::warn!("File notifications closed, continuing with polling");
                signals = None;
                continue;
            }
        }

        loop {
            let cycle = shared.cycle(&cancel).await;
            if !cycle.more_pending || cancel.is_cancelled() {
                break;
            }
        }
    }

    tracing::debug!("Monitor loop exited");
}

async fn next_signal(
    signals: &mut Option<mpsc::UnboundedReceiver<ChangeSignal>>,
) -> Option<ChangeSignal> {
    match signals {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
