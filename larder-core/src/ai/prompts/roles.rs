//! Splitting composed prompt text into role-tagged messages.

use std::sync::LazyLock;

use regex::Regex;

use crate::ai::types::{ChatMessage, Role};

/// A line opening a new turn: `[system] ...`, `[user] ...` or `[assistant] ...`.
static ROLE_TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[(system|user|assistant)\][ \t]*(.*)$").expect("Invalid role tag regex")
});

/// Parse prompt text into messages.
///
/// Grammar, one line at a time:
/// - a role tag line opens a new message whose content is the rest of the line;
/// - any other non-blank line is appended to the open message, joined by a space;
/// - blank lines and lines before the first tag are dropped.
///
/// Text with no role tags yields no messages.
pub fn parse_messages(text: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::new();
    let mut current: Option<ChatMessage> = None;

    for line in text.lines() {
        if let Some(caps) = ROLE_TAG_REGEX.captures(line) {
            let Some(role) = Role::from_tag(&caps[1]) else {
                continue;
            };
            messages.extend(current.take());
            current = Some(ChatMessage::new(role, caps[2].trim()));
            continue;
        }

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(message) = current.as_mut() {
            if !message.content.is_empty() {
                message.content.push(' ');
            }
            message.content.push_str(line);
        }
    }

    messages.extend(current);
    messages
}
