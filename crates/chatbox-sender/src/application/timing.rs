//! Time source and one-shot scheduling seams.

use std::time::{Duration, Instant};

/// A deferred unit of work handed to a [`Scheduler`].
pub type ScheduledTask = Box<dyn FnOnce() + Send + 'static>;

/// Source of the current instant.
pub trait Clock: Send + Sync {
    /// Returns the current monotonic instant.
    fn now(&self) -> Instant;
}

/// One-shot deferred execution.
///
/// Implementations must not run `task` on the calling thread before
/// `schedule` returns; callers may hold no locks when the task runs but do
/// rely on `schedule` itself being non-blocking.
pub trait Scheduler: Send + Sync {
    /// Runs `task` once, after `delay` has elapsed.
    fn schedule(&self, delay: Duration, task: ScheduledTask);
}
