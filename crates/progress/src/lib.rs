//! Bootstrap progress tracking.
//!
//! Tracked operations, the trailing-edge throttle, synthetic progress, the
//! preboot handoff and the [`AppPreloader`] component built on top of them.

#![warn(missing_docs)]

pub mod operation;
pub mod throttle;
pub mod tracker;
pub mod handoff;
pub mod preloader;

pub use operation::{
    progress_channel, OperationFuture, ProgressReporter, ProgressSubscription, TrackedOperation,
};
pub use throttle::{Coalesce, Throttle};
pub use tracker::{DoneCallback, ProgressTracker, RenderCallback, TrackerOptions, TrackingMode};
pub use handoff::{ApplyProgress, HandoffSnapshot, Preboot};
pub use preloader::{AppPreloader, AppPreloaderBuilder};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a mutex, recovering the data if a callback panicked while holding it.
pub(crate) fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
