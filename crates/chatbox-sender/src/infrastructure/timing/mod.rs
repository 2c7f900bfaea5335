//! Timing infrastructure: tokio-backed clock and scheduler.
//!
//! [`TokioClock`] reads `tokio::time::Instant`, and [`TokioScheduler`] spawns
//! a sleeping task per deferred action.  Both follow tokio's clock, so tests
//! running with a paused runtime (`start_paused = true`) see consistent time
//! across the two.
//!
//! The `mock` sub-module provides a manually driven pair for deterministic
//! unit and integration tests.

pub mod mock;

use std::time::{Duration, Instant};

use tokio::runtime::Handle;
use tracing::trace;

use crate::application::timing::{Clock, ScheduledTask, Scheduler};

/// Clock reading tokio's (possibly paused) time source.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }
}

/// Scheduler that runs each task on a tokio runtime after a sleep.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    /// Creates a scheduler spawning onto `handle`.
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Creates a scheduler for the runtime the caller is running on.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn current() -> Self {
        Self::new(Handle::current())
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: ScheduledTask) {
        trace!(delay_ms = delay.as_millis() as u64, "scheduling deferred task");
        self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            task();
        });
    }
}
