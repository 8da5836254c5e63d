// SPDX-FileCopyrightText: 2026 Estuary Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversion of Telegram updates into transport-agnostic inbound events.

use estuary_core::{ChatKind, InboundMessage};
use teloxide::types::{Chat, ChatKind as TgChatKind, Message, MessageKind, PublicChatKind};

use crate::media;

/// Longest label extracted from a reply snippet when the source thread's
/// real name is unavailable.
const SNIPPET_LABEL_CHARS: usize = 30;

/// Converts a Telegram message into an [`InboundMessage`].
pub fn to_inbound(msg: &Message, is_edit: bool) -> InboundMessage {
    let (thread_id, thread_label) = thread_info(msg);

    InboundMessage {
        id: i64::from(msg.id.0),
        chat_id: msg.chat.id.0,
        chat_title: chat_title(&msg.chat),
        chat_kind: classify_chat(&msg.chat),
        sender_id: sender_id(msg),
        thread_id,
        thread_label,
        text: msg
            .text()
            .or_else(|| msg.caption())
            .map(str::to_string),
        media: media::describe(msg),
        is_edit,
        is_service: !matches!(msg.kind, MessageKind::Common(_)),
    }
}

fn classify_chat(chat: &Chat) -> ChatKind {
    match &chat.kind {
        TgChatKind::Private(_) => ChatKind::Private,
        TgChatKind::Public(public) => match &public.kind {
            PublicChatKind::Channel(_) => ChatKind::Channel,
            PublicChatKind::Group | PublicChatKind::Supergroup(_) => ChatKind::Group,
        },
    }
}

fn chat_title(chat: &Chat) -> String {
    if let Some(title) = chat.title() {
        return title.to_string();
    }
    match (chat.first_name(), chat.last_name()) {
        (Some(first), Some(last)) => format!("{first} {last}"),
        (Some(first), None) => first.to_string(),
        _ => "Private chat".to_string(),
    }
}

/// The sender to judge admission against: the posting user, or for
/// anonymous channel/group posts the chat acting as sender.
fn sender_id(msg: &Message) -> Option<i64> {
    msg.from
        .as_ref()
        .map(|user| user.id.0 as i64)
        .or_else(|| msg.sender_chat.as_ref().map(|chat| chat.id.0))
}

/// Source thread id and a human-readable label for it.
///
/// Messages inside a forum topic reply (directly or transitively) to the
/// topic's creation service message, which carries the topic name. When
/// the reply target is an ordinary message instead, its leading text
/// stands in as the label.
fn thread_info(msg: &Message) -> (Option<i64>, Option<String>) {
    let Some(thread) = msg.thread_id else {
        return (None, None);
    };

    let label = msg.reply_to_message().and_then(|reply| match &reply.kind {
        MessageKind::ForumTopicCreated(created) => {
            Some(created.forum_topic_created.name.clone())
        }
        _ => reply
            .text()
            .or_else(|| reply.caption())
            .map(|text| text.chars().take(SNIPPET_LABEL_CHARS).collect()),
    });

    (Some(i64::from(thread.0.0)), label)
}
