//! Progress state, state patches and normalization.

use chrono::{DateTime, Utc};

use crate::PreloadError;

/// Number of decimal places progress values are rounded to.
pub const PROGRESS_PRECISION: i32 = 6;

/// Map raw progress of the tracked operation into the share of the bar
/// left after the pre-interactive phase.
///
/// `progress` is clamped to `[0, 1]` (non-finite values count as 0), then
/// scaled into `[ceiling, 1]` and rounded to six decimal places so that
/// long float tails never reach the renderer.
pub fn normalize_progress(progress: f64, ceiling: f64) -> f64 {
    round_progress(ceiling + (1.0 - ceiling) * clamp_progress(progress))
}

/// Clamp to `[0, 1]`, treating NaN and infinities as 0.
pub fn clamp_progress(progress: f64) -> f64 {
    if progress.is_finite() {
        progress.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Round to [`PROGRESS_PRECISION`] decimal places.
pub fn round_progress(value: f64) -> f64 {
    let factor = 10f64.powi(PROGRESS_PRECISION);
    (value * factor).round() / factor
}

/// What the renderer sees.
#[derive(Debug, Clone)]
pub struct ProgressState {
    /// Overall progress in `[0, 1]`
    pub progress: f64,

    /// Failure of the current operation, if any
    pub error: Option<PreloadError>,

    /// When the state last changed
    pub updated_at: DateTime<Utc>,
}

impl ProgressState {
    /// Create a state starting at `progress` with no error.
    pub fn new(progress: f64) -> Self {
        Self {
            progress,
            error: None,
            updated_at: Utc::now(),
        }
    }

    /// Whether the bootstrap finished successfully.
    pub fn is_complete(&self) -> bool {
        self.error.is_none() && self.progress >= 1.0
    }

    /// Apply a patch. Returns `true` if anything changed.
    pub fn apply(&mut self, update: &StateUpdate) -> bool {
        let mut changed = false;

        if let Some(progress) = update.progress {
            if progress != self.progress {
                self.progress = progress;
                changed = true;
            }
        }

        match &update.error {
            ErrorPatch::Keep => {}
            ErrorPatch::Clear => {
                if self.error.take().is_some() {
                    changed = true;
                }
            }
            ErrorPatch::Set(err) => {
                self.error = Some(err.clone());
                changed = true;
            }
        }

        if changed {
            self.updated_at = Utc::now();
        }
        changed
    }
}

impl Default for ProgressState {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// How a patch touches the error field.
#[derive(Debug, Clone, Default)]
pub enum ErrorPatch {
    /// Leave as is
    #[default]
    Keep,
    /// Remove any stored error
    Clear,
    /// Store a failure
    Set(PreloadError),
}

/// Partial update of [`ProgressState`], tagged with the tracking generation
/// that produced it.
#[derive(Debug, Clone, Default)]
pub struct StateUpdate {
    /// Generation of the tracker when the patch was issued
    pub generation: u64,

    /// New progress, if changed
    pub progress: Option<f64>,

    /// Error change
    pub error: ErrorPatch,
}

impl StateUpdate {
    /// Patch that only sets progress.
    pub fn progress(generation: u64, progress: f64) -> Self {
        Self {
            generation,
            progress: Some(progress),
            error: ErrorPatch::Keep,
        }
    }

    /// Patch that resets state for a freshly tracked operation.
    pub fn reset(generation: u64, progress: f64) -> Self {
        Self {
            generation,
            progress: Some(progress),
            error: ErrorPatch::Clear,
        }
    }

    /// Patch that records a failure.
    pub fn failed(generation: u64, err: PreloadError) -> Self {
        Self {
            generation,
            progress: None,
            error: ErrorPatch::Set(err),
        }
    }

    /// Fold a later patch into this one, field by field, last writer wins.
    ///
    /// A patch from a newer generation replaces this one entirely.
    pub fn merge(&mut self, newer: StateUpdate) {
        if newer.generation != self.generation {
            *self = newer;
            return;
        }
        if newer.progress.is_some() {
            self.progress = newer.progress;
        }
        if !matches!(newer.error, ErrorPatch::Keep) {
            self.error = newer.error;
        }
    }
}
