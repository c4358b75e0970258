//! Deferred execution
//!
//! A scheduler runs a unit of work no sooner than a delay from now. Without
//! one, the runtime runs delayed actions immediately.

use std::fmt;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::trace;

/// A unit of deferred work
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs work after a delay
pub trait Scheduler: Send + Sync {
    fn run_later(&self, delay: Duration, task: Task);
}

/// Scheduler spawning onto a tokio runtime
#[derive(Clone)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Scheduler for the runtime the caller is running in, if any
    pub fn current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }
}

impl Scheduler for TokioScheduler {
    fn run_later(&self, delay: Duration, task: Task) {
        trace!(?delay, "Scheduling task");
        self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            task();
        });
    }
}

impl fmt::Debug for TokioScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokioScheduler").finish_non_exhaustive()
    }
}
