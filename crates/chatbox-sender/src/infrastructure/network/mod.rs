//! Network infrastructure.
//!
//! # Sub-modules
//!
//! - **`udp_transport`** – Encodes chatbox messages as OSC and sends them as
//!   single UDP datagrams to the configured destination.
//!
//! - **`mock`** – An in-memory [`ChatboxTransmitter`] that records every call,
//!   for tests.
//!
//! [`ChatboxTransmitter`]: crate::application::send_coordinator::ChatboxTransmitter

pub mod mock;
pub mod udp_transport;

pub use udp_transport::{TransportError, UdpTransmitter};
