// SPDX-FileCopyrightText: 2026 Estuary Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Destination topic naming policy.

/// Topic names are truncated to this many characters, keeping the
/// left-most (label) portion.
pub const MAX_TOPIC_NAME_CHARS: usize = 120;

/// Names the destination topic for a source conversation.
///
/// `"{label} | {title}"` when the source thread's label is known,
/// `"Topic {id} | {title}"` when only the thread id is, and
/// `"💬 {title}"` for a plain chat timeline.
pub fn topic_name(chat_title: &str, thread_id: i64, thread_label: Option<&str>) -> String {
    let name = match thread_label.map(str::trim) {
        Some(label) if !label.is_empty() => format!("{label} | {chat_title}"),
        _ if thread_id != 0 => format!("Topic {thread_id} | {chat_title}"),
        _ => format!("💬 {chat_title}"),
    };
    truncate_chars(&name, MAX_TOPIC_NAME_CHARS)
}

/// Char-boundary-safe prefix truncation.
fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn labeled_thread_uses_label_pipe_title() {
        assert_eq!(
            topic_name("Ops", 9, Some("deploys")),
            "deploys | Ops"
        );
    }

    #[test]
    fn unlabeled_thread_falls_back_to_thread_id() {
        assert_eq!(topic_name("Ops", 9, None), "Topic 9 | Ops");
        assert_eq!(topic_name("Ops", 9, Some("   ")), "Topic 9 | Ops");
    }

    #[test]
    fn plain_chat_gets_speech_balloon_prefix() {
        assert_eq!(topic_name("Ops", 0, None), "💬 Ops");
    }

    #[test]
    fn truncation_keeps_the_label_portion() {
        let long_title = "x".repeat(300);
        let name = topic_name(&long_title, 0, Some("incident"));
        assert_eq!(name.chars().count(), MAX_TOPIC_NAME_CHARS);
        assert!(name.starts_with("incident | "));
    }

    proptest! {
        #[test]
        fn name_never_exceeds_limit(title in ".{0,200}", label in proptest::option::of(".{0,200}"), thread in 0i64..1000) {
            let name = topic_name(&title, thread, label.as_deref());
            prop_assert!(name.chars().count() <= MAX_TOPIC_NAME_CHARS);
        }
    }
}
