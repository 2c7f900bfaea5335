//! Chatbox message set.
//!
//! VRChat listens for two chatbox addresses:
//!
//! | Address           | Arguments                                   |
//! |-------------------|---------------------------------------------|
//! | `/chatbox/input`  | `text: s`, `immediate: T/F`, `notify: T/F`  |
//! | `/chatbox/typing` | `typing: T/F`                               |
//!
//! `immediate` is always `true` here: the text is displayed directly instead
//! of opening the in-game keyboard.  `notify` plays the chatbox sound and is
//! reserved for sends the user explicitly asked for, so the forced-send flag
//! rides in the third slot and the second slot is fixed.

use crate::protocol::osc::{OscArg, OscMessage};

/// Address for chatbox text updates.
pub const INPUT_ADDRESS: &str = "/chatbox/input";

/// Address for the typing indicator.
pub const TYPING_ADDRESS: &str = "/chatbox/typing";

/// Maximum number of characters the chatbox displays.
pub const MAX_CHATBOX_CHARS: usize = 144;

/// Builds a `/chatbox/input` message.
///
/// `notify` carries the forced-send flag.
pub fn input_message(text: &str, notify: bool) -> OscMessage {
    OscMessage::new(
        INPUT_ADDRESS,
        vec![
            OscArg::Str(text.to_string()),
            OscArg::Bool(true),
            OscArg::Bool(notify),
        ],
    )
}

/// Builds a `/chatbox/typing` message.
pub fn typing_message(typing: bool) -> OscMessage {
    OscMessage::new(TYPING_ADDRESS, vec![OscArg::Bool(typing)])
}

/// Clips `text` to at most [`MAX_CHATBOX_CHARS`] characters.
///
/// Counts Unicode scalar values, not bytes, so multi-byte characters are
/// never split.
pub fn truncate_to_chatbox_limit(text: &str) -> &str {
    match text.char_indices().nth(MAX_CHATBOX_CHARS) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_message_argument_order() {
        // Arrange / Act
        let msg = input_message("hello", false);

        // Assert
        assert_eq!(msg.address, INPUT_ADDRESS);
        assert_eq!(
            msg.args,
            vec![
                OscArg::Str("hello".to_string()),
                OscArg::Bool(true),
                OscArg::Bool(false),
            ]
        );
        assert_eq!(msg.type_tags(), ",sTF");
    }

    #[test]
    fn test_input_message_notify_flag_follows_forced() {
        let msg = input_message("hello", true);
        assert_eq!(msg.args[2], OscArg::Bool(true));
        assert_eq!(msg.type_tags(), ",sTT");
    }

    #[test]
    fn test_typing_message_carries_single_bool() {
        assert_eq!(typing_message(true).args, vec![OscArg::Bool(true)]);
        assert_eq!(typing_message(false).type_tags(), ",F");
        assert_eq!(typing_message(false).address, TYPING_ADDRESS);
    }

    #[test]
    fn test_truncate_keeps_short_text_untouched() {
        assert_eq!(truncate_to_chatbox_limit("short"), "short");
        assert_eq!(truncate_to_chatbox_limit(""), "");
    }

    #[test]
    fn test_truncate_clips_at_char_limit() {
        // Arrange
        let long = "x".repeat(MAX_CHATBOX_CHARS + 10);

        // Act
        let clipped = truncate_to_chatbox_limit(&long);

        // Assert
        assert_eq!(clipped.chars().count(), MAX_CHATBOX_CHARS);
    }

    #[test]
    fn test_truncate_counts_chars_not_bytes() {
        // Each 'あ' is 3 bytes in UTF-8
        let exact = "あ".repeat(MAX_CHATBOX_CHARS);
        assert_eq!(truncate_to_chatbox_limit(&exact), exact);

        let over = "あ".repeat(MAX_CHATBOX_CHARS + 1);
        assert_eq!(truncate_to_chatbox_limit(&over).chars().count(), MAX_CHATBOX_CHARS);
    }
}
