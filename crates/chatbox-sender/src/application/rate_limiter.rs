//! RateLimiter: sliding-window admission with a single deferred retry.
//!
//! [`RateLimiter::request`] asks for the registered callback to run "as soon
//! as legally possible".  If the window has room, the callback runs
//! immediately on the caller's thread.  Otherwise one retry is scheduled for
//! the moment the oldest admission leaves the window, plus a small buffer
//! delay that keeps the firing clear of the exact boundary.
//!
//! # Coalescing
//!
//! At most one retry is ever outstanding.  Requests arriving while it is
//! pending are absorbed: the single eventual callback services all of them.
//! Callers must therefore treat the callback as "do the latest thing", never
//! as "do one thing per request".
//!
//! # Locking
//!
//! The limiter state sits behind one mutex that is held only for the
//! admission check.  The callback always runs with the lock released.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chatbox_core::{Admission, RateWindow};
use tracing::debug;

use crate::application::timing::{Clock, Scheduler};

/// Callback invoked once per admission.
pub type AdmitCallback = Arc<dyn Fn() + Send + Sync>;

/// Rate limit parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    /// Maximum admissions per `window`.
    pub capacity: usize,
    /// Length of the sliding window.
    pub window: Duration,
    /// Extra delay added to every computed wait before retrying.
    pub buffer_delay: Duration,
}

impl Default for RateLimitPolicy {
    /// VRChat's chatbox limit: 3 messages per 5 seconds, retried 0.5 s late.
    fn default() -> Self {
        Self {
            capacity: 3,
            window: Duration::from_secs(5),
            buffer_delay: Duration::from_millis(500),
        }
    }
}

struct LimiterState {
    window: RateWindow,
    buffer_delay: Duration,
    retry_pending: bool,
    disposed: bool,
}

/// Sliding-window limiter that defers rather than drops.
pub struct RateLimiter {
    state: Mutex<LimiterState>,
    clock: Arc<dyn Clock>,
    scheduler: Arc<dyn Scheduler>,
    on_admit: AdmitCallback,
}

impl RateLimiter {
    /// Creates a limiter over `window` that calls `on_admit` for every
    /// admission.
    pub fn new(
        window: RateWindow,
        buffer_delay: Duration,
        clock: Arc<dyn Clock>,
        scheduler: Arc<dyn Scheduler>,
        on_admit: AdmitCallback,
    ) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(LimiterState {
                window,
                buffer_delay,
                retry_pending: false,
                disposed: false,
            }),
            clock,
            scheduler,
            on_admit,
        })
    }

    /// Attempts one admission at the current instant without invoking the
    /// callback or scheduling anything.
    pub fn try_admit_now(&self) -> Admission {
        let now = self.clock.now();
        self.lock_state().window.try_admit(now)
    }

    /// Requests that the callback run as soon as the window allows.
    ///
    /// Never blocks.  Coalesced into the pending retry if one exists.
    pub fn request(self: &Arc<Self>) {
        let deferred = {
            let mut state = self.lock_state();
            if state.disposed {
                debug!("request ignored: limiter disposed");
                return;
            }
            if state.retry_pending {
                debug!("request coalesced into pending retry");
                return;
            }
            match state.window.try_admit(self.clock.now()) {
                Admission::Granted => None,
                Admission::Deferred(wait) => {
                    state.retry_pending = true;
                    Some(wait + state.buffer_delay)
                }
            }
        };

        match deferred {
            None => (self.on_admit)(),
            Some(delay) => self.arm_retry(delay),
        }
    }

    /// Current buffer delay.
    pub fn buffer_delay(&self) -> Duration {
        self.lock_state().buffer_delay
    }

    /// Replaces the buffer delay used for retries armed from now on.
    pub fn set_buffer_delay(&self, buffer_delay: Duration) {
        self.lock_state().buffer_delay = buffer_delay;
    }

    /// Returns `true` while a deferred retry is scheduled.
    pub fn is_retry_pending(&self) -> bool {
        self.lock_state().retry_pending
    }

    /// Stops all future admissions.  A retry already scheduled fires as a
    /// no-op.
    pub fn dispose(&self) {
        self.lock_state().disposed = true;
    }

    /// Returns `true` once [`dispose`](Self::dispose) has been called.
    pub fn is_disposed(&self) -> bool {
        self.lock_state().disposed
    }

    fn arm_retry(self: &Arc<Self>, delay: Duration) {
        debug!(delay_ms = delay.as_millis() as u64, "admission deferred");
        let limiter = Arc::downgrade(self);
        self.scheduler.schedule(
            delay,
            Box::new(move || {
                if let Some(limiter) = limiter.upgrade() {
                    limiter.fire_retry();
                }
            }),
        );
    }

    fn fire_retry(self: &Arc<Self>) {
        let rearm = {
            let mut state = self.lock_state();
            if state.disposed {
                state.retry_pending = false;
                return;
            }
            // The retry is recorded like any other admission so that later
            // requests count it against the window.
            match state.window.try_admit(self.clock.now()) {
                Admission::Granted => {
                    state.retry_pending = false;
                    None
                }
                Admission::Deferred(wait) => Some(wait + state.buffer_delay),
            }
        };

        match rearm {
            None => (self.on_admit)(),
            Some(delay) => {
                debug!("retry fired before the window rolled; re-arming");
                self.arm_retry(delay);
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, LimiterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
