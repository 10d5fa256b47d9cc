//! Pre-interactive phase and its handoff to the preloader.
//!
//! A [`Preboot`] runs before the component exists, filling the first
//! `ceiling` share of the bar on its own synthetic clock. The component
//! takes it over exactly once at startup and continues from the snapshot.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use preloader_core::{
    clamp_progress, round_progress, PreloaderConfig, ProgressDecay, Result, SyntheticClock, Time,
};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::lock;

/// Shows pre-interactive progress, e.g. by writing to a splash element.
pub type ApplyProgress = Arc<dyn Fn(f64) + Send + Sync>;

/// State handed from the pre-interactive phase to the component.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandoffSnapshot {
    /// Progress reached, within `[0, ceiling]`
    pub progress: f64,
    /// Synthetic time accumulated by the preboot clock
    pub elapsed: Duration,
    /// When the snapshot was taken
    pub taken_at: Time,
}

/// A running pre-interactive progress phase.
pub struct Preboot {
    shared: Arc<Mutex<PrebootState>>,
}

struct PrebootState {
    progress: f64,
    clock: SyntheticClock,
    ticker: Option<JoinHandle<()>>,
    taken: bool,
}

impl Preboot {
    /// Start ticking. Progress is `ceiling * decay(elapsed)`, passed to
    /// `apply` on every tick.
    ///
    /// Fails without starting if `config` is out of range.
    pub fn start(
        config: &PreloaderConfig,
        decay: Arc<dyn ProgressDecay>,
        apply: Option<ApplyProgress>,
    ) -> Result<Self> {
        config.validate()?;
        let shared = Arc::new(Mutex::new(PrebootState {
            progress: 0.0,
            clock: SyntheticClock::new(),
            ticker: None,
            taken: false,
        }));

        let weak = Arc::downgrade(&shared);
        let ceiling = config.ceiling;
        let interval = config.interval;
        let ticker = tokio::spawn(async move {
            loop {
                let progress = {
                    let Some(shared) = weak.upgrade() else {
                        return;
                    };
                    let mut state = lock(&shared);
                    if state.taken {
                        return;
                    }
                    let elapsed = state.clock.advance(interval);
                    let raw = clamp_progress(decay.progress_at(elapsed));
                    state.progress = round_progress(ceiling * raw);
                    state.progress
                };
                if let Some(apply) = &apply {
                    apply(progress);
                }
                tokio::time::sleep(interval).await;
            }
        });
        lock(&shared).ticker = Some(ticker);

        debug!(ceiling, interval_ms = interval.as_millis() as u64, "Preboot started");
        Ok(Self { shared })
    }

    /// Progress shown so far.
    pub fn progress(&self) -> f64 {
        lock(&self.shared).progress
    }

    /// Stop the preboot and return where it got to. Only the first call
    /// yields a snapshot.
    pub fn take(&self) -> Option<HandoffSnapshot> {
        let mut state = lock(&self.shared);
        if state.taken {
            return None;
        }
        state.taken = true;
        if let Some(ticker) = state.ticker.take() {
            ticker.abort();
        }

        let snapshot = HandoffSnapshot {
            progress: state.progress,
            elapsed: state.clock.elapsed(),
            taken_at: Utc::now(),
        };
        debug!(progress = snapshot.progress, "Preboot handed off");
        Some(snapshot)
    }
}

impl Drop for Preboot {
    fn drop(&mut self) {
        if let Some(ticker) = lock(&self.shared).ticker.take() {
            ticker.abort();
        }
    }
}

impl std::fmt::Debug for Preboot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = lock(&self.shared);
        f.debug_struct("Preboot")
            .field("progress", &state.progress)
            .field("taken", &state.taken)
            .finish()
    }
}
