//! Infrastructure layer for the chatbox sender.
//!
//! Contains OS-facing adapters: the UDP transport, configuration file
//! storage, console line parsing, and the tokio-backed clock and scheduler.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `chatbox_core`, but MUST NOT be imported by the `application` layer
//! outside of tests.

pub mod console;
pub mod network;
pub mod storage;
pub mod timing;
