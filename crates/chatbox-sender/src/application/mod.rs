//! Application layer: the send-rate coordination core.
//!
//! Code in this layer orchestrates domain types from `chatbox_core` and
//! depends only on traits for time, scheduling, and transmission.  Concrete
//! implementations are injected at construction time, so every decision the
//! core makes can be replayed deterministically in tests.
//!
//! # Sub-modules
//!
//! - **`timing`** – The [`Clock`](timing::Clock) and
//!   [`Scheduler`](timing::Scheduler) seams.
//!
//! - **`rate_limiter`** – Wraps a sliding window with a single-slot deferred
//!   retry: a request is either admitted now or scheduled once for the moment
//!   the window rolls.  Overlapping requests collapse into that one retry.
//!
//! - **`send_coordinator`** – Tracks the latest text, debounces background
//!   ("soft") sends, prioritises user ("forced") sends, and emits the typing
//!   indicator.

pub mod rate_limiter;
pub mod send_coordinator;
pub mod timing;
