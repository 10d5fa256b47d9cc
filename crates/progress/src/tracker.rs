//! Progress tracking service.
//!
//! [`ProgressTracker`] follows one [`TrackedOperation`] at a time. Every
//! change goes through a trailing-edge [`Throttle`] and is tagged with the
//! tracker's generation; anything produced under an older generation is
//! discarded when it arrives.

use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use preloader_core::{
    normalize_progress, BoxError, OperationId, PreloadError, PreloaderConfig, ProgressDecay,
    ProgressState, StateUpdate, SyntheticClock,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::lock;
use crate::operation::{OperationFuture, ProgressSubscription, TrackedOperation};
use crate::throttle::Throttle;

/// Invoked with the new state on every applied change.
pub type RenderCallback = Arc<dyn Fn(&ProgressState) + Send + Sync>;

/// Invoked once per tracked operation: `Ok(())` when progress first
/// reaches 1, `Err` when the operation fails.
pub type DoneCallback = Arc<dyn Fn(Result<(), PreloadError>) + Send + Sync>;

/// What the tracker is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingMode {
    /// Nothing tracked
    Idle,
    /// Generating progress from the decay function
    Synthetic,
    /// Following progress reported by the operation
    Subscribed,
    /// Operation finished or absent; terminal state queued or applied
    Settled,
}

impl TrackingMode {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackingMode::Idle => "idle",
            TrackingMode::Synthetic => "synthetic",
            TrackingMode::Subscribed => "subscribed",
            TrackingMode::Settled => "settled",
        }
    }
}

/// Everything needed to build a [`ProgressTracker`].
pub struct TrackerOptions {
    /// Ceiling and emission interval
    pub config: PreloaderConfig,
    /// Synthetic progress function
    pub decay: Arc<dyn ProgressDecay>,
    /// Progress shown before the first emission
    pub initial_progress: f64,
    /// State change callback
    pub on_render: Option<RenderCallback>,
    /// Completion callback
    pub on_done: Option<DoneCallback>,
}

impl TrackerOptions {
    /// Options with the decay described by `config` and no callbacks.
    pub fn new(config: PreloaderConfig) -> Self {
        let decay = Arc::new(config.decay.build());
        Self {
            config,
            decay,
            initial_progress: 0.0,
            on_render: None,
            on_done: None,
        }
    }
}

/// Tracks a bootstrap operation and publishes throttled progress.
///
/// Must be used from within a Tokio runtime.
pub struct ProgressTracker {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<TrackerState>,
    throttle: Throttle<StateUpdate>,
    state_tx: watch::Sender<ProgressState>,
    on_render: Option<RenderCallback>,
    on_done: Option<DoneCallback>,
}

struct TrackerState {
    generation: u64,
    mode: TrackingMode,
    operation: Option<OperationId>,
    ceiling: f64,
    interval: Duration,
    decay: Arc<dyn ProgressDecay>,
    clock: SyntheticClock,
    ticker: Option<JoinHandle<()>>,
    listener: Option<JoinHandle<()>>,
    progress: ProgressState,
    // Completion already signalled for this generation.
    done: bool,
}

impl TrackerState {
    fn stop_tasks(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
        self.clock.reset();
    }
}

impl ProgressTracker {
    /// Create an idle tracker. Fails if the configuration is out of range.
    pub fn new(options: TrackerOptions) -> preloader_core::Result<Self> {
        options.config.validate()?;
        let TrackerOptions {
            config,
            decay,
            initial_progress,
            on_render,
            on_done,
        } = options;
        let initial = ProgressState::new(initial_progress);
        let (state_tx, _) = watch::channel(initial.clone());

        let inner = Arc::new_cyclic(|weak: &Weak<Inner>| {
            let weak = weak.clone();
            Inner {
                state: Mutex::new(TrackerState {
                    generation: 0,
                    mode: TrackingMode::Idle,
                    operation: None,
                    ceiling: config.ceiling,
                    interval: config.interval,
                    decay,
                    clock: SyntheticClock::new(),
                    ticker: None,
                    listener: None,
                    progress: initial,
                    done: false,
                }),
                throttle: Throttle::new(config.interval, move |update| {
                    if let Some(inner) = weak.upgrade() {
                        inner.apply(update);
                    }
                }),
                state_tx,
                on_render,
                on_done,
            }
        });

        Ok(Self { inner })
    }

    /// Start observing `operation`, replacing whatever was tracked before.
    ///
    /// Progress is reset to the ceiling. `None` completes immediately.
    pub fn track(&self, operation: Option<TrackedOperation>) {
        self.untrack();

        let inner = &self.inner;
        let mut state = lock(&inner.state);
        state.generation += 1;
        state.done = false;
        let generation = state.generation;
        let ceiling = state.ceiling;

        inner.throttle.call(StateUpdate::reset(generation, ceiling));

        let Some(operation) = operation else {
            state.mode = TrackingMode::Settled;
            debug!(generation, mode = state.mode.as_str(), "No operation to track, completing");
            inner.throttle.call(StateUpdate::progress(generation, 1.0));
            return;
        };

        let (id, future, subscription) = operation.into_parts();
        state.operation = Some(id);
        let weak = Arc::downgrade(inner);

        match subscription {
            None => {
                state.mode = TrackingMode::Synthetic;
                debug!(%id, generation, mode = state.mode.as_str(), "Tracking operation");
                state.ticker = Some(tokio::spawn(run_ticker(weak.clone(), generation)));
            }
            Some(subscription) => {
                state.mode = TrackingMode::Subscribed;
                debug!(%id, generation, mode = state.mode.as_str(), "Tracking operation");
                let current = normalize_progress(subscription.current(), ceiling);
                inner.throttle.call(StateUpdate::progress(generation, current));
                state.listener = Some(tokio::spawn(listen(weak.clone(), generation, subscription)));
            }
        }
        drop(state);

        // Detached: untracking stops observing the work, not the work itself.
        tokio::spawn(watch_outcome(weak, generation, id, future));
    }

    /// Stop tracking. Pending emissions are dropped and late callbacks of
    /// the current operation become no-ops. Idempotent.
    pub fn untrack(&self) {
        let mut state = lock(&self.inner.state);
        state.generation += 1;
        state.stop_tasks();
        let previous = std::mem::replace(&mut state.mode, TrackingMode::Idle);
        if let Some(id) = state.operation.take() {
            debug!(%id, mode = previous.as_str(), "Untracked operation");
        }
        self.inner.throttle.cancel();
    }

    /// Apply new settings. The interval governs the next throttle window and
    /// the next synthetic tick; ceiling and decay apply to the next
    /// emission.
    ///
    /// An out-of-range configuration is rejected and nothing changes.
    pub fn reconfigure(
        &self,
        config: &PreloaderConfig,
        decay: Option<Arc<dyn ProgressDecay>>,
    ) -> preloader_core::Result<()> {
        config.validate()?;
        let mut state = lock(&self.inner.state);
        state.ceiling = config.ceiling;
        state.interval = config.interval;
        if let Some(decay) = decay {
            state.decay = decay;
        }
        self.inner.throttle.set_interval(config.interval);
        debug!(
            ceiling = config.ceiling,
            interval_ms = config.interval.as_millis() as u64,
            "Reconfigured"
        );
        Ok(())
    }

    /// Current state.
    pub fn state(&self) -> ProgressState {
        lock(&self.inner.state).progress.clone()
    }

    /// Current mode.
    pub fn mode(&self) -> TrackingMode {
        lock(&self.inner.state).mode
    }

    /// Id of the operation being tracked, if any.
    pub fn operation(&self) -> Option<OperationId> {
        lock(&self.inner.state).operation
    }

    /// Receive every applied state.
    pub fn subscribe(&self) -> watch::Receiver<ProgressState> {
        self.inner.state_tx.subscribe()
    }

    /// Invoke the render callback with the current state.
    pub fn render(&self) {
        let snapshot = self.state();
        if let Some(render) = &self.inner.on_render {
            render(&snapshot);
        }
    }
}

impl Drop for ProgressTracker {
    fn drop(&mut self) {
        self.untrack();
    }
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = lock(&self.inner.state);
        f.debug_struct("ProgressTracker")
            .field("generation", &state.generation)
            .field("mode", &state.mode)
            .field("operation", &state.operation)
            .field("progress", &state.progress.progress)
            .finish_non_exhaustive()
    }
}

impl Inner {
    /// Queue raw progress reported by the current operation.
    fn report(&self, generation: u64, progress: f64) {
        let state = lock(&self.state);
        if state.generation != generation {
            return;
        }
        let normalized = normalize_progress(progress, state.ceiling);
        self.throttle.call(StateUpdate::progress(generation, normalized));
    }

    /// Advance the synthetic clock and queue the resulting progress.
    /// Returns the delay until the next tick, or `None` if superseded.
    fn tick(&self, generation: u64) -> Option<Duration> {
        let mut state = lock(&self.state);
        if state.generation != generation {
            return None;
        }
        let step = state.interval;
        let elapsed = state.clock.advance(step);
        let raw = state.decay.progress_at(elapsed);
        let normalized = normalize_progress(raw, state.ceiling);
        trace!(generation, elapsed_ms = elapsed.as_millis() as u64, normalized, "Synthetic tick");
        self.throttle.call(StateUpdate::progress(generation, normalized));
        Some(step)
    }

    /// Record the outcome of the operation tracked under `generation`.
    fn settle(&self, generation: u64, id: OperationId, outcome: Result<(), BoxError>) {
        let mut state = lock(&self.state);
        if state.generation != generation {
            trace!(%id, "Discarding outcome of superseded operation");
            return;
        }
        state.stop_tasks();
        state.mode = TrackingMode::Settled;
        let mode = state.mode.as_str();

        match outcome {
            Ok(()) => {
                info!(%id, mode, "Bootstrap operation completed");
                self.throttle.call(StateUpdate::progress(generation, 1.0));
            }
            Err(err) => {
                let err = PreloadError::operation_failed(err);
                warn!(%id, mode, error = %err, "Bootstrap operation failed");
                self.throttle.call(StateUpdate::failed(generation, err));
            }
        }
    }

    /// Throttle sink: apply a patch, then notify outside the lock.
    fn apply(&self, update: StateUpdate) {
        let (snapshot, changed, done) = {
            let mut state = lock(&self.state);
            if update.generation != state.generation {
                trace!(
                    update = update.generation,
                    current = state.generation,
                    "Dropping stale state update"
                );
                return;
            }

            let changed = state.progress.apply(&update);
            let done = if state.done {
                None
            } else if let Some(err) = &state.progress.error {
                Some(Err(err.clone()))
            } else if state.progress.progress >= 1.0 {
                Some(Ok(()))
            } else {
                None
            };
            if done.is_some() {
                state.done = true;
            }
            (state.progress.clone(), changed, done)
        };

        if changed {
            self.state_tx.send_replace(snapshot.clone());
            if let Some(render) = &self.on_render {
                render(&snapshot);
            }
        }
        if let Some(result) = done {
            if let Some(on_done) = &self.on_done {
                on_done(result);
            }
        }
    }
}

async fn run_ticker(inner: Weak<Inner>, generation: u64) {
    loop {
        let Some(delay) = inner.upgrade().and_then(|tracker| tracker.tick(generation)) else {
            return;
        };
        tokio::time::sleep(delay).await;
    }
}

async fn listen(inner: Weak<Inner>, generation: u64, mut subscription: ProgressSubscription) {
    while let Some(progress) = subscription.changed().await {
        let Some(tracker) = inner.upgrade() else {
            return;
        };
        tracker.report(generation, progress);
    }
}

async fn watch_outcome(inner: Weak<Inner>, generation: u64, id: OperationId, future: OperationFuture) {
    let outcome = future.await;
    match inner.upgrade() {
        Some(tracker) => tracker.settle(generation, id, outcome),
        None => trace!(%id, "Tracker dropped before operation finished"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::progress_channel;
    use tokio::sync::oneshot;

    const INTERVAL: Duration = Duration::from_millis(100);

    struct Recorder {
        renders: Arc<Mutex<Vec<ProgressState>>>,
        dones: Arc<Mutex<Vec<Result<(), PreloadError>>>>,
    }

    impl Recorder {
        fn progress(&self) -> Vec<f64> {
            self.renders.lock().unwrap().iter().map(|s| s.progress).collect()
        }

        fn done_count(&self) -> usize {
            self.dones.lock().unwrap().len()
        }
    }

    fn tracker_with(
        config: PreloaderConfig,
        decay: Option<Arc<dyn ProgressDecay>>,
    ) -> (ProgressTracker, Recorder) {
        let renders = Arc::new(Mutex::new(Vec::new()));
        let dones = Arc::new(Mutex::new(Vec::new()));
        let mut options = TrackerOptions::new(config);
        if let Some(decay) = decay {
            options.decay = decay;
        }
        let render_log = Arc::clone(&renders);
        options.on_render = Some(Arc::new(move |state: &ProgressState| {
            render_log.lock().unwrap().push(state.clone());
        }));
        let done_log = Arc::clone(&dones);
        options.on_done = Some(Arc::new(move |result: Result<(), PreloadError>| {
            done_log.lock().unwrap().push(result);
        }));
        (ProgressTracker::new(options).unwrap(), Recorder { renders, dones })
    }

    fn tracker() -> (ProgressTracker, Recorder) {
        tracker_with(PreloaderConfig::default(), None)
    }

    fn pending_operation() -> (TrackedOperation, oneshot::Sender<Result<(), BoxError>>) {
        let (tx, rx) = oneshot::channel::<Result<(), BoxError>>();
        let op = TrackedOperation::new(async move {
            rx.await.unwrap_or_else(|_| Err("sender dropped".into()))
        });
        (op, tx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_absent_operation_completes() {
        let (tracker, rec) = tracker();
        tracker.track(None);
        assert_eq!(tracker.mode(), TrackingMode::Settled);

        tokio::time::sleep(INTERVAL * 2).await;
        assert_eq!(rec.progress(), vec![1.0]);
        assert_eq!(rec.done_count(), 1);
        assert!(rec.dones.lock().unwrap()[0].is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_instant_operation_reaches_one() {
        let (tracker, rec) = tracker();
        tracker.track(Some(TrackedOperation::new(async { Ok::<_, BoxError>(()) })));

        tokio::time::sleep(INTERVAL * 3).await;
        assert_eq!(tracker.state().progress, 1.0);
        assert!(tracker.state().is_complete());
        assert_eq!(tracker.mode(), TrackingMode::Settled);
        assert_eq!(rec.done_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_emission_is_trailing() {
        let (tracker, rec) = tracker();
        let (op, _tx) = pending_operation();
        tracker.track(Some(op));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rec.progress().is_empty());
        assert_eq!(tracker.state().progress, 0.0);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(rec.progress().len(), 1);
        assert!(tracker.state().progress >= 0.4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_synthetic_progress_follows_decay() {
        let linear: Arc<dyn ProgressDecay> =
            Arc::new(|elapsed: Duration| elapsed.as_millis() as f64 / 1000.0);
        let config = PreloaderConfig::default().with_ceiling(0.0);
        let (tracker, rec) = tracker_with(config, Some(linear));
        let (op, tx) = pending_operation();
        tracker.track(Some(op));
        assert_eq!(tracker.mode(), TrackingMode::Synthetic);

        tokio::time::sleep(Duration::from_millis(450)).await;
        let progress = rec.progress();
        assert!(!progress.is_empty());
        assert!(progress.windows(2).all(|w| w[0] < w[1]));
        assert!(*progress.last().unwrap() < 1.0);

        tx.send(Ok(())).unwrap();
        tokio::time::sleep(INTERVAL * 2).await;
        assert_eq!(*rec.progress().last().unwrap(), 1.0);
        assert_eq!(rec.done_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reported_progress_is_normalized() {
        let (tracker, rec) = tracker();
        let (reporter, subscription) = progress_channel();
        reporter.report(0.5);
        let (tx, rx) = oneshot::channel::<()>();
        let op = TrackedOperation::with_progress(
            async move { rx.await.map_err(|_| "sender dropped") },
            subscription,
        );
        tracker.track(Some(op));
        assert_eq!(tracker.mode(), TrackingMode::Subscribed);

        tokio::time::sleep(INTERVAL + Duration::from_millis(10)).await;
        assert_eq!(tracker.state().progress, 0.7);

        reporter.report(2.0);
        tokio::time::sleep(INTERVAL + Duration::from_millis(10)).await;
        assert_eq!(tracker.state().progress, 1.0);
        // progress hitting 1 counts as success even before the outcome
        assert_eq!(rec.done_count(), 1);

        tx.send(()).unwrap();
        tokio::time::sleep(INTERVAL * 2).await;
        assert_eq!(rec.done_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_reports_coalesce_to_last() {
        let config = PreloaderConfig::default().with_ceiling(0.0);
        let (tracker, rec) = tracker_with(config, None);
        let (reporter, subscription) = progress_channel();
        let (_tx, rx) = oneshot::channel::<()>();
        let op = TrackedOperation::with_progress(
            async move { rx.await.map_err(|_| "sender dropped") },
            subscription,
        );
        tracker.track(Some(op));
        tokio::time::sleep(INTERVAL * 2).await;
        let before = rec.progress().len();

        for step in 1..=10 {
            reporter.report(step as f64 / 20.0);
            tokio::task::yield_now().await;
        }
        tokio::time::sleep(INTERVAL + Duration::from_millis(10)).await;

        let progress = rec.progress();
        assert_eq!(progress.len(), before + 1);
        assert_eq!(*progress.last().unwrap(), 0.5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_stores_error_once() {
        let (tracker, rec) = tracker();
        let (op, tx) = pending_operation();
        tracker.track(Some(op));
        tokio::time::sleep(INTERVAL * 2).await;

        tx.send(Err("config fetch failed".into())).unwrap();
        tokio::time::sleep(INTERVAL * 2).await;

        let state = tracker.state();
        let err = state.error.expect("error stored");
        assert_eq!(err.reason().to_string(), "config fetch failed");
        assert!(state.progress < 1.0);

        let dones = rec.dones.lock().unwrap();
        assert_eq!(dones.len(), 1);
        assert!(dones[0].is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_operation_is_ignored() {
        let (tracker, rec) = tracker();
        let (op_a, tx_a) = pending_operation();
        let (op_b, _tx_b) = pending_operation();

        tracker.track(Some(op_a));
        tracker.track(Some(op_b));
        tx_a.send(Ok(())).unwrap();

        tokio::time::sleep(INTERVAL * 5).await;
        let state = tracker.state();
        assert!(state.progress < 1.0);
        assert!(state.error.is_none());
        assert_eq!(rec.done_count(), 0);
        assert_eq!(tracker.mode(), TrackingMode::Synthetic);
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_failure_is_ignored() {
        let (tracker, rec) = tracker();
        let (op_a, tx_a) = pending_operation();
        tracker.track(Some(op_a));
        tracker.track(None);
        tx_a.send(Err("late failure".into())).unwrap();

        tokio::time::sleep(INTERVAL * 3).await;
        assert!(tracker.state().is_complete());
        let dones = rec.dones.lock().unwrap();
        assert_eq!(dones.len(), 1);
        assert!(dones[0].is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_untrack_stops_synthetic_emissions() {
        let (tracker, rec) = tracker();
        let (op, _tx) = pending_operation();
        tracker.track(Some(op));
        tokio::time::sleep(Duration::from_millis(350)).await;
        assert!(!rec.progress().is_empty());

        tracker.untrack();
        tracker.untrack();
        assert_eq!(tracker.mode(), TrackingMode::Idle);
        let count = rec.progress().len();

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(rec.progress().len(), count);
        assert_eq!(tracker.operation(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retrack_resets_to_ceiling_and_clears_error() {
        let (tracker, rec) = tracker();
        let (op, tx) = pending_operation();
        tracker.track(Some(op));
        tx.send(Err("first attempt".into())).unwrap();
        tokio::time::sleep(INTERVAL * 2).await;
        assert!(tracker.state().error.is_some());

        let (retry, _tx) = pending_operation();
        tracker.track(Some(retry));
        tokio::time::sleep(INTERVAL + Duration::from_millis(10)).await;

        let state = tracker.state();
        assert!(state.error.is_none());
        assert!(state.progress >= 0.4 && state.progress < 0.5);
        assert_eq!(rec.done_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_operation_signals_once() {
        let (tracker, rec) = tracker();
        tracker.track(None);
        tokio::time::sleep(INTERVAL * 2).await;
        tracker.track(None);
        tokio::time::sleep(INTERVAL * 2).await;
        assert_eq!(rec.done_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribe_sees_applied_state() {
        let (tracker, _rec) = tracker();
        let mut rx = tracker.subscribe();
        tracker.track(None);
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().progress, 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconfigure_changes_interval() {
        let (tracker, rec) = tracker();
        tracker.reconfigure(
            &PreloaderConfig::default().with_interval(Duration::from_millis(500)),
            None,
        )
        .unwrap();
        tracker.track(None);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(rec.progress().is_empty());
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(rec.progress(), vec![1.0]);
    }

    #[test]
    fn test_new_rejects_out_of_range_config() {
        for config in [
            PreloaderConfig::default().with_ceiling(1.5),
            PreloaderConfig::default().with_ceiling(-2.0),
            PreloaderConfig::default().with_interval(Duration::ZERO),
        ] {
            assert!(ProgressTracker::new(TrackerOptions::new(config)).is_err());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_reconfigure_leaves_state_untouched() {
        let (tracker, rec) = tracker();
        let (reporter, subscription) = progress_channel();
        let (_tx, rx) = oneshot::channel::<()>();
        tracker.track(Some(TrackedOperation::with_progress(
            async move { rx.await.map_err(|_| "sender dropped") },
            subscription,
        )));
        tokio::time::sleep(INTERVAL + Duration::from_millis(10)).await;
        assert_eq!(tracker.state().progress, 0.4);

        assert!(tracker
            .reconfigure(&PreloaderConfig::default().with_ceiling(1.5), None)
            .is_err());
        assert!(tracker
            .reconfigure(&PreloaderConfig::default().with_ceiling(-2.0), None)
            .is_err());
        assert!(tracker
            .reconfigure(&PreloaderConfig::default().with_interval(Duration::ZERO), None)
            .is_err());
        assert_eq!(tracker.state().progress, 0.4);

        reporter.report(0.5);
        tokio::time::sleep(INTERVAL + Duration::from_millis(10)).await;
        assert_eq!(tracker.state().progress, 0.7);
        assert!(rec.progress().iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_after_full_progress_keeps_single_completion() {
        let (tracker, rec) = tracker();
        let (reporter, subscription) = progress_channel();
        let (tx, rx) = oneshot::channel::<Result<(), BoxError>>();
        tracker.track(Some(TrackedOperation::with_progress(
            async move { rx.await.unwrap_or_else(|_| Err("sender dropped".into())) },
            subscription,
        )));
        tokio::time::sleep(INTERVAL + Duration::from_millis(10)).await;

        reporter.report(1.0);
        tokio::time::sleep(INTERVAL + Duration::from_millis(10)).await;
        assert_eq!(tracker.state().progress, 1.0);
        assert_eq!(rec.done_count(), 1);

        tx.send(Err("late rejection".into())).unwrap();
        tokio::time::sleep(INTERVAL * 2).await;

        let dones = rec.dones.lock().unwrap();
        assert_eq!(dones.len(), 1);
        assert!(dones[0].is_ok());

        let renders = rec.renders.lock().unwrap();
        let last = renders.last().unwrap();
        let err = last.error.as_ref().expect("error rendered");
        assert_eq!(err.reason().to_string(), "late rejection");
        assert!(tracker.state().error.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_releases_tasks() {
        let (tracker, rec) = tracker();
        let (op, tx) = pending_operation();
        tracker.track(Some(op));
        drop(tracker);

        let _ = tx.send(Ok(()));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(rec.progress().is_empty());
        assert_eq!(rec.done_count(), 0);
    }

    #[test]
    fn test_tracking_mode_as_str() {
        assert_eq!(TrackingMode::Idle.as_str(), "idle");
        assert_eq!(TrackingMode::Synthetic.as_str(), "synthetic");
        assert_eq!(TrackingMode::Subscribed.as_str(), "subscribed");
        assert_eq!(TrackingMode::Settled.as_str(), "settled");
    }
}
