//! # chatbox-core
//!
//! Shared library for Chatbox Sender containing the OSC message codec, the
//! chatbox message constructors, and the pure rate-limiting and destination
//! parsing domain types.
//!
//! It has zero dependencies on OS APIs, UI frameworks, timers, or network
//! sockets.  Everything here is driven by values the caller passes in
//! (including the current time), which keeps it deterministic under test.
//!
//! # Architecture overview
//!
//! Chatbox Sender forwards live text to VRChat's chatbox over OSC (Open Sound
//! Control) datagrams.  VRChat enforces a strict message-rate limit, so every
//! send has to be admitted by a sliding-window limiter first.
//!
//! - **`protocol`** – How bytes travel over the network.  OSC messages are an
//!   address (`/chatbox/input`), a type-tag string (`,sTF`), and the argument
//!   values, each aligned to 4 bytes.
//!
//! - **`domain`** – Pure business logic.  The most important piece is the
//!   [`RateWindow`]: an exact sliding-window admission counter backed by a
//!   fixed-size ring buffer.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `chatbox_core::RateWindow` instead of `chatbox_core::domain::rate_window::RateWindow`.
pub use domain::destination::{parse_destination, DestinationError, DEFAULT_OSC_PORT};
pub use domain::rate_window::{Admission, RateWindow, RateWindowError};
pub use protocol::chatbox::{
    input_message, truncate_to_chatbox_limit, typing_message, INPUT_ADDRESS, MAX_CHATBOX_CHARS,
    TYPING_ADDRESS,
};
pub use protocol::osc::{decode_message, encode_message, encode_message_into, OscArg, OscMessage, ProtocolError};
