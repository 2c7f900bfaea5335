//! Protocol module containing the OSC codec and the chatbox message set.

pub mod chatbox;
pub mod osc;

pub use chatbox::{input_message, typing_message, INPUT_ADDRESS, TYPING_ADDRESS};
pub use osc::{decode_message, encode_message, encode_message_into, OscArg, OscMessage, ProtocolError};
