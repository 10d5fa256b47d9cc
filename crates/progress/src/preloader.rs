//! The preloader component.
//!
//! [`AppPreloader`] ties a [`ProgressTracker`] to the component lifecycle:
//! take over from the preboot phase, render, track the bootstrap operation,
//! and stop tracking when unmounted.

use std::sync::Arc;

use preloader_core::{ConfigError, PreloadError, PreloaderConfig, ProgressDecay, ProgressState};
use tokio::sync::watch;
use tracing::debug;

use crate::handoff::{HandoffSnapshot, Preboot};
use crate::operation::TrackedOperation;
use crate::tracker::{DoneCallback, ProgressTracker, RenderCallback, TrackerOptions, TrackingMode};

/// Builder for [`AppPreloader`].
pub struct AppPreloaderBuilder {
    config: PreloaderConfig,
    decay: Option<Arc<dyn ProgressDecay>>,
    on_render: Option<RenderCallback>,
    on_done: Option<DoneCallback>,
    preboot: Option<Preboot>,
}

impl AppPreloaderBuilder {
    /// Use a custom synthetic progress function instead of the configured
    /// exponential decay.
    pub fn decay(mut self, decay: impl ProgressDecay + 'static) -> Self {
        self.decay = Some(Arc::new(decay));
        self
    }

    /// Called with `{progress, error}` on every state change.
    pub fn on_render(mut self, render: impl Fn(&ProgressState) + Send + Sync + 'static) -> Self {
        self.on_render = Some(Arc::new(render));
        self
    }

    /// Called once per tracked operation.
    pub fn on_done(
        mut self,
        done: impl Fn(Result<(), PreloadError>) + Send + Sync + 'static,
    ) -> Self {
        self.on_done = Some(Arc::new(done));
        self
    }

    /// Take over from a running pre-interactive phase.
    pub fn preboot(mut self, preboot: Preboot) -> Self {
        self.preboot = Some(preboot);
        self
    }

    /// Build the component. A preboot, if any, is stopped here and its
    /// progress becomes the initial state.
    ///
    /// Fails if the configuration is out of range.
    pub fn build(self) -> Result<AppPreloader, ConfigError> {
        self.config.validate()?;
        let handoff = self.preboot.as_ref().and_then(Preboot::take);

        let mut options = TrackerOptions::new(self.config);
        if let Some(decay) = self.decay {
            options.decay = decay;
        }
        options.initial_progress = handoff.map_or(0.0, |snapshot| snapshot.progress);
        options.on_render = self.on_render;
        options.on_done = self.on_done;

        Ok(AppPreloader {
            tracker: ProgressTracker::new(options)?,
            handoff,
            mounted: false,
        })
    }
}

/// Shows bootstrap progress until the tracked operation completes.
#[derive(Debug)]
pub struct AppPreloader {
    tracker: ProgressTracker,
    handoff: Option<HandoffSnapshot>,
    mounted: bool,
}

impl AppPreloader {
    /// Start building a preloader.
    pub fn builder(config: PreloaderConfig) -> AppPreloaderBuilder {
        AppPreloaderBuilder {
            config,
            decay: None,
            on_render: None,
            on_done: None,
            preboot: None,
        }
    }

    /// Render the initial state and begin tracking `operation`.
    ///
    /// Mounting twice behaves like [`AppPreloader::set_operation`].
    pub fn mount(&mut self, operation: Option<TrackedOperation>) {
        if !self.mounted {
            self.mounted = true;
            debug!(handoff = self.handoff.is_some(), "Preloader mounted");
            self.tracker.render();
        }
        self.tracker.track(operation);
    }

    /// Replace the tracked operation.
    pub fn set_operation(&mut self, operation: Option<TrackedOperation>) {
        if !self.mounted {
            self.mount(operation);
            return;
        }
        self.tracker.track(operation);
    }

    /// Apply new settings. Out-of-range settings are rejected unapplied.
    pub fn reconfigure(&self, config: &PreloaderConfig) -> preloader_core::Result<()> {
        self.tracker.reconfigure(config, None)
    }

    /// Swap the synthetic progress function.
    pub fn set_decay(
        &self,
        config: &PreloaderConfig,
        decay: impl ProgressDecay + 'static,
    ) -> preloader_core::Result<()> {
        self.tracker.reconfigure(config, Some(Arc::new(decay)))
    }

    /// Stop tracking. The component can be mounted again.
    pub fn unmount(&mut self) {
        if self.mounted {
            self.mounted = false;
            self.tracker.untrack();
            debug!("Preloader unmounted");
        }
    }

    /// Current state.
    pub fn state(&self) -> ProgressState {
        self.tracker.state()
    }

    /// Receive every applied state.
    pub fn subscribe(&self) -> watch::Receiver<ProgressState> {
        self.tracker.subscribe()
    }

    /// What the tracker is doing.
    pub fn mode(&self) -> TrackingMode {
        self.tracker.mode()
    }

    /// Snapshot taken from the preboot phase, if there was one.
    pub fn handoff(&self) -> Option<&HandoffSnapshot> {
        self.handoff.as_ref()
    }

    /// Whether the component is mounted.
    pub fn is_mounted(&self) -> bool {
        self.mounted
    }
}

impl Drop for AppPreloader {
    fn drop(&mut self) {
        self.unmount();
    }
}
