//! Recording transmitter for tests.
//!
//! Captures every [`ChatboxTransmitter`] call, together with the clock time at
//! which it happened, so tests can assert on what would have gone over the
//! wire and when.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::application::send_coordinator::{ChatboxTransmitter, TransmitError};
use crate::infrastructure::timing::mock::ManualClock;

/// A recorded `/chatbox/input` send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentInput {
    /// Clock offset at which the send happened.
    pub at: Duration,
    pub text: String,
    pub notify: bool,
}

/// A recorded `/chatbox/typing` send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentTyping {
    pub at: Duration,
    pub typing: bool,
}

/// A [`ChatboxTransmitter`] that records instead of sending.
pub struct RecordingTransmitter {
    clock: Arc<ManualClock>,
    inputs: Mutex<Vec<SentInput>>,
    typings: Mutex<Vec<SentTyping>>,
    fail_with_no_destination: Mutex<bool>,
}

impl RecordingTransmitter {
    /// Creates a recorder stamping calls with `clock`'s elapsed time.
    pub fn new(clock: Arc<ManualClock>) -> Self {
        Self {
            clock,
            inputs: Mutex::new(Vec::new()),
            typings: Mutex::new(Vec::new()),
            fail_with_no_destination: Mutex::new(false),
        }
    }

    /// Makes subsequent sends fail with [`TransmitError::NoDestination`].
    /// Failed sends are still recorded.
    pub fn set_failing(&self, failing: bool) {
        *self.fail_with_no_destination.lock().expect("lock poisoned") = failing;
    }

    /// All input sends so far.
    pub fn inputs(&self) -> Vec<SentInput> {
        self.inputs.lock().expect("lock poisoned").clone()
    }

    /// All typing sends so far.
    pub fn typings(&self) -> Vec<SentTyping> {
        self.typings.lock().expect("lock poisoned").clone()
    }

    /// Offsets at which input sends happened.
    pub fn input_times(&self) -> Vec<Duration> {
        self.inputs().into_iter().map(|s| s.at).collect()
    }

    /// The most recent typing value sent, if any.
    pub fn last_typing(&self) -> Option<bool> {
        self.typings().last().map(|t| t.typing)
    }

    fn outcome(&self) -> Result<(), TransmitError> {
        if *self.fail_with_no_destination.lock().expect("lock poisoned") {
            Err(TransmitError::NoDestination)
        } else {
            Ok(())
        }
    }
}

impl ChatboxTransmitter for RecordingTransmitter {
    fn send_input(&self, text: &str, notify: bool) -> Result<(), TransmitError> {
        self.inputs.lock().expect("lock poisoned").push(SentInput {
            at: self.clock.elapsed(),
            text: text.to_string(),
            notify,
        });
        self.outcome()
    }

    fn send_typing(&self, typing: bool) -> Result<(), TransmitError> {
        self.typings.lock().expect("lock poisoned").push(SentTyping {
            at: self.clock.elapsed(),
            typing,
        });
        self.outcome()
    }
}
