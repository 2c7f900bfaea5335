//! Exact sliding-window admission counter.
//!
//! # How the window works
//!
//! The window remembers the instants of the last `capacity` admissions in a
//! fixed-size ring buffer, oldest first starting at `head`.  When the buffer
//! is full, a new admission is only possible once the oldest entry is at
//! least one `window` old; the caller is told exactly how long to wait.
//!
//! ```text
//! capacity = 3, window = 5s
//!
//!   t=0 ✓   t=1 ✓   t=2 ✓   t=3 ✗ (wait 2s)   t=5 ✓ (t=0 rolled out)
//! ```
//!
//! Unlike a token bucket this never admits more than `capacity` events in
//! any trailing `window`, including windows that straddle a refill.  Memory
//! use is fixed at construction.

use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::trace;

/// Error type for [`RateWindow`] construction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RateWindowError {
    /// A window that admits nothing can never make progress.
    #[error("rate window capacity must be at least 1")]
    ZeroCapacity,
}

/// Result of an admission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The action may proceed now; its instant has been recorded.
    Granted,
    /// The window is full.  The oldest admission leaves the window after the
    /// contained duration.
    Deferred(Duration),
}

impl Admission {
    /// Returns `true` for [`Admission::Granted`].
    pub fn is_granted(self) -> bool {
        matches!(self, Admission::Granted)
    }
}

/// Fixed-capacity ring buffer of admission instants.
#[derive(Debug, Clone)]
pub struct RateWindow {
    slots: Box<[Option<Instant>]>,
    window: Duration,
    head: usize,
    tail: usize,
    full: bool,
}

impl RateWindow {
    /// Creates a window admitting at most `capacity` actions per `window`.
    ///
    /// # Errors
    ///
    /// Returns [`RateWindowError::ZeroCapacity`] if `capacity` is 0.
    pub fn new(capacity: usize, window: Duration) -> Result<Self, RateWindowError> {
        if capacity == 0 {
            return Err(RateWindowError::ZeroCapacity);
        }
        Ok(Self {
            slots: vec![None; capacity].into_boxed_slice(),
            window,
            head: 0,
            tail: 0,
            full: false,
        })
    }

    /// Maximum admissions per window.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Length of the sliding window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Number of admissions currently held in the buffer.
    ///
    /// Entries are only evicted lazily by [`try_admit`](Self::try_admit), so
    /// this may include admissions that have already aged out.
    pub fn len(&self) -> usize {
        if self.full {
            self.slots.len()
        } else {
            (self.tail + self.slots.len() - self.head) % self.slots.len()
        }
    }

    /// Returns `true` if no admission has been recorded yet.
    pub fn is_empty(&self) -> bool {
        !self.full && self.head == self.tail
    }

    /// Attempts to admit one action at `now`.
    ///
    /// On [`Admission::Granted`] the instant is recorded.  On
    /// [`Admission::Deferred`] nothing changes.
    pub fn try_admit(&mut self, now: Instant) -> Admission {
        if self.full {
            if let Some(oldest) = self.slots[self.head] {
                let elapsed = now.saturating_duration_since(oldest);
                if elapsed < self.window {
                    let wait = self.window - elapsed;
                    trace!(wait_ms = wait.as_millis() as u64, "rate window full");
                    return Admission::Deferred(wait);
                }
            }
            self.head = (self.head + 1) % self.slots.len();
            self.full = false;
        }

        self.slots[self.tail] = Some(now);
        self.tail = (self.tail + 1) % self.slots.len();
        self.full = self.tail == self.head;
        Admission::Granted
    }

    /// Iterates the recorded admission instants, oldest first.
    pub fn admissions(&self) -> impl Iterator<Item = Instant> + '_ {
        let cap = self.slots.len();
        (0..self.len()).filter_map(move |i| self.slots[(self.head + i) % cap])
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        assert_eq!(
            RateWindow::new(0, secs(1.0)).unwrap_err(),
            RateWindowError::ZeroCapacity
        );
    }

    #[test]
    fn test_admits_up_to_capacity_immediately() {
        // Arrange
        let t0 = Instant::now();
        let mut w = RateWindow::new(3, secs(5.0)).unwrap();

        // Act
        let results: Vec<Admission> = (0..3).map(|i| w.try_admit(t0 + secs(i as f64))).collect();

        // Assert
        assert!(results.iter().all(|a| a.is_granted()));
        assert_eq!(w.len(), 3);
    }

    #[test]
    fn test_defers_when_full_with_exact_wait() {
        // Arrange
        let t0 = Instant::now();
        let mut w = RateWindow::new(3, secs(5.0)).unwrap();
        for i in 0..3 {
            w.try_admit(t0 + secs(i as f64));
        }

        // Act
        let result = w.try_admit(t0 + secs(3.0));

        // Assert – the t=0 entry leaves the window at t=5
        assert_eq!(result, Admission::Deferred(secs(2.0)));
        assert_eq!(w.len(), 3, "a deferred attempt must not be recorded");
    }

    #[test]
    fn test_admits_once_oldest_ages_out() {
        let t0 = Instant::now();
        let mut w = RateWindow::new(3, secs(5.0)).unwrap();
        for i in 0..3 {
            w.try_admit(t0 + secs(i as f64));
        }

        assert_eq!(w.try_admit(t0 + secs(5.0)), Admission::Granted);
        // The next oldest is t=1, so t=5.5 must wait 0.5s.
        assert_eq!(w.try_admit(t0 + secs(5.5)), Admission::Deferred(secs(0.5)));
    }

    #[test]
    fn test_admissions_iterates_oldest_first_after_wraparound() {
        // Arrange
        let t0 = Instant::now();
        let mut w = RateWindow::new(2, secs(1.0)).unwrap();
        w.try_admit(t0);
        w.try_admit(t0 + secs(0.5));
        w.try_admit(t0 + secs(1.0)); // evicts t0

        // Act
        let recorded: Vec<Instant> = w.admissions().collect();

        // Assert
        assert_eq!(recorded, vec![t0 + secs(0.5), t0 + secs(1.0)]);
    }

    #[test]
    fn test_capacity_one_behaves_like_min_interval() {
        let t0 = Instant::now();
        let mut w = RateWindow::new(1, secs(1.0)).unwrap();

        assert!(w.try_admit(t0).is_granted());
        assert_eq!(w.try_admit(t0 + secs(0.2)), Admission::Deferred(secs(0.8)));
        assert!(w.try_admit(t0 + secs(1.0)).is_granted());
    }

    #[test]
    fn test_never_exceeds_capacity_in_any_trailing_window() {
        // Arrange – hammer the window every 100ms for 20s
        let t0 = Instant::now();
        let window = secs(5.0);
        let mut w = RateWindow::new(3, window).unwrap();
        let mut granted = Vec::new();

        // Act
        for step in 0..200 {
            let now = t0 + Duration::from_millis(step * 100);
            if w.try_admit(now).is_granted() {
                granted.push(now);
            }
        }

        // Assert
        for (i, start) in granted.iter().enumerate() {
            let in_window = granted[i..]
                .iter()
                .take_while(|t| t.duration_since(*start) < window)
                .count();
            assert!(in_window <= 3, "more than 3 admissions within 5s of {i}");
        }
        assert_eq!(granted.len(), 12, "3 admissions per 5s over 20s");
    }

    #[test]
    fn test_is_empty_and_accessors() {
        let w = RateWindow::new(4, secs(2.0)).unwrap();
        assert!(w.is_empty());
        assert_eq!(w.capacity(), 4);
        assert_eq!(w.window(), secs(2.0));
        assert_eq!(w.admissions().count(), 0);
    }
}
