//! Domain entities for Chatbox Sender.
//!
//! This module contains pure business logic with no infrastructure
//! dependencies: no sockets, no timers, no clocks.  Operations that depend on
//! time take the current [`std::time::Instant`] as an argument, so they can be
//! unit-tested with fabricated instants.

/// Sliding-window admission counter.
///
/// See [`rate_window::RateWindow`] for the main type.
pub mod rate_window;

/// Destination address parsing.
pub mod destination;
