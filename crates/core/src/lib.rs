//! Core data model of the application preloader.
//!
//! Progress state and patches, normalization, synthetic decay functions,
//! configuration and error types. Nothing in here needs an async runtime.

#![warn(missing_docs)]

mod id;
mod error;
mod progress;
mod decay;
mod config;

pub use id::OperationId;
pub use error::{BoxError, ConfigError, PreloadError, Result};
pub use progress::{
    clamp_progress, normalize_progress, round_progress, ErrorPatch, ProgressState, StateUpdate,
    PROGRESS_PRECISION,
};
pub use decay::{ExponentialDecay, ProgressDecay, SyntheticClock};
pub use config::{DecayConfig, PreloaderConfig, DEFAULT_CEILING, DEFAULT_INTERVAL_MS};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
