//! Trailing-edge throttle.
//!
//! Values passed to [`Throttle::call`] are coalesced and delivered to the
//! sink once per window, at the end of the window. There is no leading
//! delivery: the first call of a burst arms the timer and waits.

use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use preloader_core::StateUpdate;
use tokio::task::JoinHandle;
use tracing::trace;

use crate::lock;

/// Values that can absorb a later value of the same kind.
pub trait Coalesce {
    /// Fold `newer` into `self`.
    fn coalesce(&mut self, newer: Self);
}

impl Coalesce for StateUpdate {
    fn coalesce(&mut self, newer: Self) {
        self.merge(newer);
    }
}

type Sink<T> = Box<dyn Fn(T) + Send + Sync>;

/// Trailing-edge throttle over coalescible values.
///
/// Must be used from within a Tokio runtime: arming the timer spawns a task.
pub struct Throttle<T> {
    shared: Arc<Shared<T>>,
}

struct Shared<T> {
    state: Mutex<State<T>>,
    sink: Sink<T>,
}

struct State<T> {
    interval: Duration,
    pending: Option<T>,
    timer: Option<JoinHandle<()>>,
    // Bumped by cancel so a timer that already woke up cannot flush.
    epoch: u64,
}

impl<T: Coalesce + Send + 'static> Throttle<T> {
    /// Create a throttle delivering to `sink` at most once per `interval`.
    pub fn new(interval: Duration, sink: impl Fn(T) + Send + Sync + 'static) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    interval,
                    pending: None,
                    timer: None,
                    epoch: 0,
                }),
                sink: Box::new(sink),
            }),
        }
    }

    /// Queue `value`, merging it into anything already pending.
    pub fn call(&self, value: T) {
        let mut state = lock(&self.shared.state);
        match state.pending.as_mut() {
            Some(pending) => pending.coalesce(value),
            None => state.pending = Some(value),
        }

        if state.timer.is_none() {
            let shared = Arc::downgrade(&self.shared);
            let interval = state.interval;
            let epoch = state.epoch;
            state.timer = Some(tokio::spawn(async move {
                tokio::time::sleep(interval).await;
                flush(shared, epoch);
            }));
        }
    }

    /// Drop the pending value and disarm the timer.
    pub fn cancel(&self) {
        let mut state = lock(&self.shared.state);
        state.epoch = state.epoch.wrapping_add(1);
        state.pending = None;
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
    }

    /// Change the window length. Takes effect from the next window.
    pub fn set_interval(&self, interval: Duration) {
        lock(&self.shared.state).interval = interval;
    }

    /// Current window length.
    pub fn interval(&self) -> Duration {
        lock(&self.shared.state).interval
    }

    /// Whether a value is waiting for the end of the window.
    pub fn is_pending(&self) -> bool {
        lock(&self.shared.state).pending.is_some()
    }
}

impl<T> Drop for Throttle<T> {
    fn drop(&mut self) {
        let mut state = lock(&self.shared.state);
        state.pending = None;
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
    }
}

impl<T> std::fmt::Debug for Throttle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = lock(&self.shared.state);
        f.debug_struct("Throttle")
            .field("interval", &state.interval)
            .field("pending", &state.pending.is_some())
            .finish()
    }
}

fn flush<T>(shared: Weak<Shared<T>>, epoch: u64) {
    let Some(shared) = shared.upgrade() else {
        return;
    };

    let value = {
        let mut state = lock(&shared.state);
        if state.epoch != epoch {
            trace!("throttle window cancelled before flush");
            return;
        }
        state.timer = None;
        state.pending.take()
    };

    // Sink runs unlocked so it may call back into the throttle.
    if let Some(value) = value {
        (shared.sink)(value);
    }
}
