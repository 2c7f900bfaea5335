//! SendCoordinator: decides when the chatbox text is actually transmitted.
//!
//! The coordinator sits above the [`RateLimiter`] and owns the debounce and
//! coalescing policy:
//!
//! - **Forced** sends (the user pressed *Send*) go straight to the limiter.
//! - **Soft** sends (fired on every edit while auto-send is on) are first
//!   debounced locally: the first soft request of a burst arms one timer,
//!   later ones merge into it, and the firing forwards whatever text is
//!   current by then.
//! - The typing indicator is pushed immediately on every text change; it is
//!   cheap and not rate-limited.
//!
//! # State machine
//!
//! ```text
//!            text changes                 send admitted
//!   Clean ─────────────────► Dirty ─────────────────────► Clean
//! ```
//!
//! `soft_pending` and `forced_pending` track in-flight requests and are
//! cleared by the transmission they lead to.  A transmission snapshots the
//! text and clears `dirty` in one critical section; any edit after that
//! snapshot re-dirties the state for the next cycle.
//!
//! Snapshot and send run under a second, send-only lock, so two admissions
//! racing on different threads reach the wire in snapshot order and the last
//! datagram always carries the newest snapshot.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};

use chatbox_core::{ProtocolError, RateWindow, RateWindowError};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::application::rate_limiter::{RateLimitPolicy, RateLimiter};
use crate::application::timing::{Clock, Scheduler};

/// Error type for chatbox transmissions.
#[derive(Debug, Error)]
pub enum TransmitError {
    /// No valid destination has been configured.
    #[error("no destination configured")]
    NoDestination,
    /// The message could not be encoded.
    #[error("encode failed: {0}")]
    Encode(#[from] ProtocolError),
    /// The datagram could not be sent.
    #[error("send failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Outbound side of the coordinator.
///
/// Fire-and-forget: errors are logged by the caller and never retried.
#[cfg_attr(test, mockall::automock)]
pub trait ChatboxTransmitter: Send + Sync {
    /// Sends the chatbox text.  `notify` marks a user-initiated send.
    fn send_input(&self, text: &str, notify: bool) -> Result<(), TransmitError>;

    /// Sends the typing indicator.
    fn send_typing(&self, typing: bool) -> Result<(), TransmitError>;
}

/// Kind of send being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendKind {
    /// Explicit user action.  Bypasses the debounce, still rate-limited.
    Forced,
    /// Background update.  Debounced and rate-limited.
    Soft,
}

/// Coordinator configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendPolicy {
    /// Hard protocol limit enforced by the [`RateLimiter`].
    pub rate_limit: RateLimitPolicy,
    /// Minimum spacing between soft-send admission attempts.
    pub soft_debounce: Duration,
    /// Whether typing notifications are emitted initially.
    pub typing_enabled: bool,
}

impl Default for SendPolicy {
    fn default() -> Self {
        Self {
            rate_limit: RateLimitPolicy::default(),
            soft_debounce: Duration::from_secs(1),
            typing_enabled: true,
        }
    }
}

#[derive(Debug, Default)]
struct SendState {
    text: String,
    dirty: bool,
    forced_pending: bool,
    soft_pending: bool,
    last_soft_request: Option<Instant>,
    typing_enabled: bool,
    disposed: bool,
}

impl SendState {
    fn typing_indicator(&self) -> bool {
        self.typing_enabled && self.dirty && !self.text.is_empty()
    }
}

struct CoordinatorInner {
    state: Mutex<SendState>,
    send_order: Mutex<()>,
    limiter: Arc<RateLimiter>,
    transmitter: Arc<dyn ChatboxTransmitter>,
    clock: Arc<dyn Clock>,
    scheduler: Arc<dyn Scheduler>,
    soft_debounce: Duration,
}

/// Debouncing, rate-limited chatbox sender.
///
/// Dropping the coordinator disposes it: pending timers fire as no-ops.
pub struct SendCoordinator {
    inner: Arc<CoordinatorInner>,
}

impl SendCoordinator {
    /// Creates a coordinator transmitting through `transmitter`.
    ///
    /// # Errors
    ///
    /// Returns [`RateWindowError::ZeroCapacity`] if the policy's capacity is 0.
    pub fn new(
        policy: SendPolicy,
        transmitter: Arc<dyn ChatboxTransmitter>,
        clock: Arc<dyn Clock>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Result<Self, RateWindowError> {
        let window = RateWindow::new(policy.rate_limit.capacity, policy.rate_limit.window)?;

        let inner = Arc::new_cyclic(|weak: &Weak<CoordinatorInner>| {
            let target = weak.clone();
            let limiter = RateLimiter::new(
                window,
                policy.rate_limit.buffer_delay,
                Arc::clone(&clock),
                Arc::clone(&scheduler),
                Arc::new(move || {
                    if let Some(inner) = target.upgrade() {
                        inner.transmit_now();
                    }
                }),
            );
            CoordinatorInner {
                state: Mutex::new(SendState {
                    typing_enabled: policy.typing_enabled,
                    ..SendState::default()
                }),
                send_order: Mutex::new(()),
                limiter,
                transmitter,
                clock,
                scheduler,
                soft_debounce: policy.soft_debounce,
            }
        });

        Ok(Self { inner })
    }

    /// Records a new text value.
    ///
    /// No-op if `new_text` equals the current text.  Otherwise marks the
    /// state dirty and, if typing notifications are on, pushes the typing
    /// indicator immediately.
    pub fn on_text_changed(&self, new_text: &str) {
        let typing = {
            let mut state = self.inner.lock_state();
            if state.disposed || state.text == new_text {
                return;
            }
            state.text.clear();
            state.text.push_str(new_text);
            state.dirty = true;
            state.typing_enabled.then(|| state.typing_indicator())
        };

        if let Some(typing) = typing {
            self.inner.emit_typing(typing);
        }
    }

    /// Requests a transmission of the current text.
    pub fn request_send(&self, kind: SendKind) {
        match kind {
            SendKind::Forced => self.inner.request_forced(),
            SendKind::Soft => self.inner.request_soft(),
        }
    }

    /// Turns typing notifications on or off and pushes the resulting
    /// indicator value (so disabling clears a visible indicator).
    pub fn set_typing_enabled(&self, enabled: bool) {
        let typing = {
            let mut state = self.inner.lock_state();
            if state.disposed {
                return;
            }
            state.typing_enabled = enabled;
            state.typing_indicator()
        };
        self.inner.emit_typing(typing);
    }

    /// Pushes the current typing indicator value.
    pub fn notify_typing(&self) {
        let typing = {
            let state = self.inner.lock_state();
            if state.disposed {
                return;
            }
            state.typing_indicator()
        };
        self.inner.emit_typing(typing);
    }

    /// The latest observed text.
    pub fn text(&self) -> String {
        self.inner.lock_state().text.clone()
    }

    /// Returns `true` if the text changed since the last transmission.
    pub fn is_dirty(&self) -> bool {
        self.inner.lock_state().dirty
    }

    /// Returns `true` while typing notifications are enabled.
    pub fn is_typing_enabled(&self) -> bool {
        self.inner.lock_state().typing_enabled
    }

    /// Returns `true` while a debounced soft send is waiting.
    pub fn is_soft_pending(&self) -> bool {
        self.inner.lock_state().soft_pending
    }

    /// Returns `true` while a forced send awaits admission.
    pub fn is_forced_pending(&self) -> bool {
        self.inner.lock_state().forced_pending
    }

    /// The underlying rate limiter, for tuning its buffer delay.
    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.inner.limiter
    }

    /// Stops all future transmissions.  Idempotent.
    pub fn dispose(&self) {
        {
            let mut state = self.inner.lock_state();
            if state.disposed {
                return;
            }
            state.disposed = true;
        }
        self.inner.limiter.dispose();
        info!("send coordinator disposed");
    }
}

impl Drop for SendCoordinator {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl CoordinatorInner {
    fn request_forced(&self) {
        {
            let mut state = self.lock_state();
            if state.disposed {
                return;
            }
            state.forced_pending = true;
        }
        self.limiter.request();
    }

    fn request_soft(self: &Arc<Self>) {
        {
            let mut state = self.lock_state();
            if state.disposed || !state.dirty {
                return;
            }
            if state.soft_pending {
                debug!("soft send coalesced into pending debounce");
                return;
            }
            state.soft_pending = true;
            state.last_soft_request = Some(self.clock.now());
        }

        debug!(
            debounce_ms = self.soft_debounce.as_millis() as u64,
            "soft send debounced"
        );
        let inner = Arc::downgrade(self);
        self.scheduler.schedule(
            self.soft_debounce,
            Box::new(move || {
                if let Some(inner) = inner.upgrade() {
                    inner.fire_soft();
                }
            }),
        );
    }

    fn fire_soft(&self) {
        let forward = {
            let mut state = self.lock_state();
            state.soft_pending = false;
            // A forced send may have transmitted the text in the meantime.
            if state.disposed || !state.dirty {
                false
            } else {
                if let Some(armed) = state.last_soft_request {
                    let waited = self.clock.now().saturating_duration_since(armed);
                    debug!(waited_ms = waited.as_millis() as u64, "soft send forwarded");
                }
                true
            }
        };
        if forward {
            self.limiter.request();
        }
    }

    fn transmit_now(&self) {
        // Held from snapshot to send so datagrams leave in snapshot order.
        let _order = self.send_order.lock().unwrap_or_else(PoisonError::into_inner);
        let (text, notify) = {
            let mut state = self.lock_state();
            if state.disposed {
                return;
            }
            let snapshot = (state.text.clone(), state.forced_pending);
            state.dirty = false;
            state.forced_pending = false;
            snapshot
        };

        match self.transmitter.send_input(&text, notify) {
            Ok(()) => debug!(chars = text.chars().count(), notify, "chatbox text sent"),
            Err(e) => log_transmit_failure("chatbox text", &e),
        }
    }

    fn emit_typing(&self, typing: bool) {
        if let Err(e) = self.transmitter.send_typing(typing) {
            log_transmit_failure("typing indicator", &e);
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, SendState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn log_transmit_failure(what: &str, err: &TransmitError) {
    match err {
        TransmitError::NoDestination => debug!("{what} not sent: {err}"),
        _ => warn!("{what} not sent: {err}"),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::timing::mock::{manual_timing, ManualClock, ManualScheduler};
    use mockall::predicate::eq;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn coordinator_with(
        mock: MockChatboxTransmitter,
    ) -> (SendCoordinator, Arc<ManualClock>, Arc<ManualScheduler>) {
        let (clock, scheduler) = manual_timing();
        let coordinator = SendCoordinator::new(
            SendPolicy::default(),
            Arc::new(mock),
            clock.clone(),
            scheduler.clone(),
        )
        .unwrap();
        (coordinator, clock, scheduler)
    }

    #[test]
    fn test_zero_capacity_policy_is_rejected() {
        let (clock, scheduler) = manual_timing();
        let mut policy = SendPolicy::default();
        policy.rate_limit.capacity = 0;

        let result = SendCoordinator::new(
            policy,
            Arc::new(MockChatboxTransmitter::new()),
            clock,
            scheduler,
        );

        assert!(matches!(result, Err(RateWindowError::ZeroCapacity)));
    }

    #[test]
    fn test_text_change_marks_dirty_and_pushes_typing_true() {
        // Arrange
        let mut mock = MockChatboxTransmitter::new();
        mock.expect_send_typing()
            .with(eq(true))
            .times(1)
            .returning(|_| Ok(()));
        let (c, _, _) = coordinator_with(mock);

        // Act
        c.on_text_changed("hello");

        // Assert
        assert!(c.is_dirty());
        assert_eq!(c.text(), "hello");
    }

    #[test]
    fn test_same_text_is_idempotent() {
        // Arrange – exactly one typing push for two identical updates
        let mut mock = MockChatboxTransmitter::new();
        mock.expect_send_typing().times(1).returning(|_| Ok(()));
        let (c, _, _) = coordinator_with(mock);
        c.on_text_changed("hello");

        // Act
        c.on_text_changed("hello");

        // Assert
        assert!(c.is_dirty());
    }

    #[test]
    fn test_clearing_text_pushes_typing_false() {
        let mut mock = MockChatboxTransmitter::new();
        let mut seq = mockall::Sequence::new();
        mock.expect_send_typing()
            .with(eq(true))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        mock.expect_send_typing()
            .with(eq(false))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        let (c, _, _) = coordinator_with(mock);

        c.on_text_changed("a");
        c.on_text_changed("");
    }

    #[test]
    fn test_no_typing_push_when_disabled() {
        // Arrange
        let mut mock = MockChatboxTransmitter::new();
        mock.expect_send_typing().times(0);
        let (clock, scheduler) = manual_timing();
        let policy = SendPolicy {
            typing_enabled: false,
            ..SendPolicy::default()
        };
        let c = SendCoordinator::new(policy, Arc::new(mock), clock, scheduler).unwrap();

        // Act
        c.on_text_changed("quiet");

        // Assert
        assert!(c.is_dirty());
        assert!(!c.is_typing_enabled());
    }

    #[test]
    fn test_disabling_typing_pushes_false() {
        let mut mock = MockChatboxTransmitter::new();
        mock.expect_send_typing().with(eq(true)).times(1).returning(|_| Ok(()));
        mock.expect_send_typing().with(eq(false)).times(1).returning(|_| Ok(()));
        let (c, _, _) = coordinator_with(mock);
        c.on_text_changed("draft");

        c.set_typing_enabled(false);

        assert!(!c.is_typing_enabled());
    }

    #[test]
    fn test_forced_send_transmits_with_notify() {
        // Arrange
        let mut mock = MockChatboxTransmitter::new();
        mock.expect_send_typing().returning(|_| Ok(()));
        mock.expect_send_input()
            .withf(|text, notify| text == "hi there" && *notify)
            .times(1)
            .returning(|_, _| Ok(()));
        let (c, _, _) = coordinator_with(mock);
        c.on_text_changed("hi there");

        // Act
        c.request_send(SendKind::Forced);

        // Assert
        assert!(!c.is_dirty());
        assert!(!c.is_forced_pending());
    }

    #[test]
    fn test_first_soft_send_waits_out_debounce_without_notify() {
        // Arrange
        let mut mock = MockChatboxTransmitter::new();
        mock.expect_send_typing().returning(|_| Ok(()));
        mock.expect_send_input()
            .withf(|text, notify| text == "a" && !*notify)
            .times(1)
            .returning(|_, _| Ok(()));
        let (c, _, scheduler) = coordinator_with(mock);
        c.on_text_changed("a");

        // Act
        c.request_send(SendKind::Soft);

        // Assert – armed, not sent
        assert_eq!(scheduler.pending_count(), 1);
        assert!(c.is_soft_pending());
        scheduler.advance(ms(999));
        assert!(c.is_dirty());
        scheduler.advance(ms(1));
        assert!(!c.is_dirty());
        assert!(!c.is_soft_pending());
    }

    #[test]
    fn test_soft_burst_arms_single_timer() {
        // Arrange
        let mut mock = MockChatboxTransmitter::new();
        mock.expect_send_typing().returning(|_| Ok(()));
        mock.expect_send_input()
            .withf(|text, notify| text == "abc" && !*notify)
            .times(1)
            .returning(|_, _| Ok(()));
        let (c, _, scheduler) = coordinator_with(mock);

        // Act
        for text in ["a", "ab", "abc"] {
            c.on_text_changed(text);
            c.request_send(SendKind::Soft);
            scheduler.advance(ms(100));
        }

        // Assert
        assert_eq!(scheduler.pending_count(), 1);
        scheduler.advance(ms(1000));
        assert!(!c.is_dirty());
    }

    #[test]
    fn test_soft_send_on_clean_state_does_nothing() {
        // Arrange – no text changes at all
        let mut mock = MockChatboxTransmitter::new();
        mock.expect_send_input().times(0);
        let (c, _, scheduler) = coordinator_with(mock);

        // Act
        c.request_send(SendKind::Soft);

        // Assert
        assert_eq!(scheduler.pending_count(), 0);
        assert!(!c.is_soft_pending());
    }

    #[test]
    fn test_transmit_failure_still_clears_dirty() {
        let mut mock = MockChatboxTransmitter::new();
        mock.expect_send_typing()
            .returning(|_| Err(TransmitError::NoDestination));
        mock.expect_send_input()
            .times(1)
            .returning(|_, _| Err(TransmitError::NoDestination));
        let (c, _, _) = coordinator_with(mock);
        c.on_text_changed("lost");

        c.request_send(SendKind::Forced);

        assert!(!c.is_dirty(), "failed sends are not retried");
    }

    #[test]
    fn test_disposed_coordinator_ignores_everything() {
        // Arrange
        let mut mock = MockChatboxTransmitter::new();
        mock.expect_send_typing().times(0);
        mock.expect_send_input().times(0);
        let (c, _, scheduler) = coordinator_with(mock);

        // Act
        c.dispose();
        c.on_text_changed("ignored");
        c.request_send(SendKind::Forced);
        c.request_send(SendKind::Soft);
        c.notify_typing();
        scheduler.advance(ms(10_000));

        // Assert
        assert!(c.limiter().is_disposed());
        assert_eq!(c.text(), "");
    }
}
