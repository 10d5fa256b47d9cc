//! Tracked operations and their optional progress channel.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use preloader_core::{BoxError, OperationId};
use tokio::sync::watch;

/// The eventual outcome of a tracked operation.
pub type OperationFuture = Pin<Box<dyn Future<Output = Result<(), BoxError>> + Send + 'static>>;

/// An asynchronous bootstrap step whose completion gates the application.
///
/// Operations built with [`TrackedOperation::with_progress`] report real
/// progress; the others get synthetic progress while they run.
pub struct TrackedOperation {
    id: OperationId,
    future: OperationFuture,
    progress: Option<ProgressSubscription>,
}

impl TrackedOperation {
    /// Track a future that does not report progress.
    pub fn new<F, E>(future: F) -> Self
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<BoxError>,
    {
        Self {
            id: OperationId::new(),
            future: Box::pin(async move { future.await.map_err(Into::into) }),
            progress: None,
        }
    }

    /// Track a future that reports progress through `progress`.
    pub fn with_progress<F, E>(future: F, progress: ProgressSubscription) -> Self
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<BoxError>,
    {
        Self {
            progress: Some(progress),
            ..Self::new(future)
        }
    }

    /// Identifier used in logs.
    pub fn id(&self) -> OperationId {
        self.id
    }

    /// Whether the operation reports its own progress.
    pub fn reports_progress(&self) -> bool {
        self.progress.is_some()
    }

    /// Last progress reported, if the operation reports progress.
    pub fn current_progress(&self) -> Option<f64> {
        self.progress.as_ref().map(ProgressSubscription::current)
    }

    pub(crate) fn into_parts(self) -> (OperationId, OperationFuture, Option<ProgressSubscription>) {
        (self.id, self.future, self.progress)
    }
}

impl fmt::Debug for TrackedOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackedOperation")
            .field("id", &self.id)
            .field("progress", &self.current_progress())
            .finish_non_exhaustive()
    }
}

/// Create a linked reporter/subscription pair starting at zero progress.
pub fn progress_channel() -> (ProgressReporter, ProgressSubscription) {
    let (tx, rx) = watch::channel(0.0);
    (ProgressReporter { tx }, ProgressSubscription { rx })
}

/// Producer side: held by the work being tracked.
#[derive(Debug)]
pub struct ProgressReporter {
    tx: watch::Sender<f64>,
}

impl ProgressReporter {
    /// Publish raw progress, nominally in `[0, 1]`.
    ///
    /// Succeeds even when nobody is subscribed.
    pub fn report(&self, progress: f64) {
        self.tx.send_replace(progress);
    }
}

/// Consumer side: handed to [`TrackedOperation::with_progress`].
#[derive(Debug, Clone)]
pub struct ProgressSubscription {
    rx: watch::Receiver<f64>,
}

impl ProgressSubscription {
    /// Most recently reported progress.
    pub fn current(&self) -> f64 {
        *self.rx.borrow()
    }

    /// Wait for the next report. `None` once the reporter is gone.
    pub async fn changed(&mut self) -> Option<f64> {
        self.rx.changed().await.ok()?;
        Some(*self.rx.borrow_and_update())
    }
}
