//! Synthetic progress: decay functions and the clock that drives them.

use std::time::Duration;

/// Maps elapsed time to simulated progress in `[0, 1)`.
///
/// Implemented for any `Fn(Duration) -> f64`, so a closure can be passed
/// wherever a decay is expected.
pub trait ProgressDecay: Send + Sync {
    /// Simulated progress after `elapsed`.
    fn progress_at(&self, elapsed: Duration) -> f64;
}

impl<F> ProgressDecay for F
where
    F: Fn(Duration) -> f64 + Send + Sync,
{
    fn progress_at(&self, elapsed: Duration) -> f64 {
        self(elapsed)
    }
}

/// `min(1 - e^(-t / time_constant), cap)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialDecay {
    /// Time for progress to reach ~63%
    pub time_constant: Duration,
    /// Progress never reported above this
    pub cap: f64,
}

impl ExponentialDecay {
    /// Create a decay with the given time constant and cap.
    pub fn new(time_constant: Duration, cap: f64) -> Self {
        Self { time_constant, cap }
    }
}

impl Default for ExponentialDecay {
    fn default() -> Self {
        Self {
            time_constant: Duration::from_millis(4000),
            cap: 0.95,
        }
    }
}

impl ProgressDecay for ExponentialDecay {
    fn progress_at(&self, elapsed: Duration) -> f64 {
        let tau = self.time_constant.as_secs_f64();
        if tau <= 0.0 {
            return self.cap;
        }
        (1.0 - (-elapsed.as_secs_f64() / tau).exp()).min(self.cap)
    }
}

/// Elapsed-time accumulator for synthetic progress.
///
/// Advanced by a fixed step per tick, never read from the wall clock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyntheticClock {
    elapsed: Duration,
}

impl SyntheticClock {
    /// A clock at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance by `step` and return the new elapsed time.
    pub fn advance(&mut self, step: Duration) -> Duration {
        self.elapsed = self.elapsed.saturating_add(step);
        self.elapsed
    }

    /// Current elapsed time.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Back to zero.
    pub fn reset(&mut self) {
        self.elapsed = Duration::ZERO;
    }
}
