//! Console front-end: turns stdin lines into sender commands.
//!
//! | Input              | Command                                   |
//! |--------------------|-------------------------------------------|
//! | `hello`            | [`ConsoleCommand::Submit`]                |
//! | `~hel` (auto-send) | [`ConsoleCommand::Draft`]                 |
//! | `//hi`             | [`ConsoleCommand::Submit`] of `/hi`       |
//! | `/dest <addr>`     | [`ConsoleCommand::SetDestination`]        |
//! | `/typing on\|off`  | [`ConsoleCommand::SetTyping`]             |
//! | `/clear`           | [`ConsoleCommand::Clear`]                 |
//! | `/quit`            | [`ConsoleCommand::Quit`]                  |
//!
//! Message text is clipped to the chatbox character limit.  Parsing is pure;
//! [`submit`] is the one helper that drives the coordinator.

use chatbox_core::truncate_to_chatbox_limit;
use tracing::debug;

use crate::application::send_coordinator::{SendCoordinator, SendKind};

/// A parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Send the text now (forced send).
    Submit(String),
    /// Update the text and soft-send it.
    Draft(String),
    /// Change the OSC destination.
    SetDestination(String),
    /// Turn typing notifications on or off.
    SetTyping(bool),
    /// Clear the chatbox.
    Clear,
    /// Exit the program.
    Quit,
    /// Blank line.
    Nothing,
    /// A malformed command, with a message for the user.
    Invalid(String),
}

/// Parses one input line.  `auto_send` enables `~` drafts.
pub fn parse_line(line: &str, auto_send: bool) -> ConsoleCommand {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return ConsoleCommand::Nothing;
    }

    if let Some(escaped) = line.strip_prefix("//") {
        return ConsoleCommand::Submit(clip(&format!("/{escaped}")));
    }
    if let Some(command) = line.strip_prefix('/') {
        return parse_command(command.trim());
    }
    if auto_send {
        if let Some(draft) = line.strip_prefix('~') {
            return ConsoleCommand::Draft(clip(draft));
        }
    }
    ConsoleCommand::Submit(clip(line))
}

/// What happened to a submitted line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Sent; the text was kept.
    Sent,
    /// Sent and the text cleared.
    SentAndCleared,
    /// Held back by the rate limit; the text stays until it goes out.
    Deferred,
}

/// Submits `text` as a forced send, clearing it afterwards when
/// `clear_on_send` is set.
///
/// A deferred send reads the text when it is finally admitted, so the clear
/// is skipped in that case.
pub fn submit(coordinator: &SendCoordinator, text: &str, clear_on_send: bool) -> SubmitOutcome {
    coordinator.on_text_changed(text);
    coordinator.request_send(SendKind::Forced);

    if coordinator.is_forced_pending() {
        if clear_on_send {
            debug!("send deferred by rate limit; keeping text until it goes out");
        }
        SubmitOutcome::Deferred
    } else if clear_on_send {
        coordinator.on_text_changed("");
        SubmitOutcome::SentAndCleared
    } else {
        SubmitOutcome::Sent
    }
}

fn parse_command(command: &str) -> ConsoleCommand {
    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };

    match (name, arg) {
        ("dest", "") => ConsoleCommand::Invalid("usage: /dest <ip:port>".to_string()),
        ("dest", addr) => ConsoleCommand::SetDestination(addr.to_string()),
        ("typing", "on") => ConsoleCommand::SetTyping(true),
        ("typing", "off") => ConsoleCommand::SetTyping(false),
        ("typing", _) => ConsoleCommand::Invalid("usage: /typing on|off".to_string()),
        ("clear", _) => ConsoleCommand::Clear,
        ("quit" | "exit", _) => ConsoleCommand::Quit,
        (other, _) => ConsoleCommand::Invalid(format!("unknown command /{other}")),
    }
}

fn clip(text: &str) -> String {
    truncate_to_chatbox_limit(text).to_string()
}
