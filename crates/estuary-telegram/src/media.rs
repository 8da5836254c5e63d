// SPDX-FileCopyrightText: 2026 Estuary Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Media classification for Telegram messages.
//!
//! Produces the tagged [`MediaDescriptor`] once at ingestion; nothing
//! downstream re-inspects Telegram types. Files travel by `file_id`, so
//! the relay never shuttles bytes, and sizes come straight from the
//! metadata Telegram attaches to each attachment.

use estuary_core::{MediaDescriptor, MediaKind};
use teloxide::types::Message;

/// Builds a media descriptor for the message's attachment, if any.
///
/// Photos use the largest available size variant (last in the array).
/// Voice notes classify as audio. Documents are classified by their MIME
/// type so a video or audio file sent "as file" still routes to the
/// matching primitive. Unsupported attachments (stickers, locations,
/// polls) yield `None`.
pub fn describe(msg: &Message) -> Option<MediaDescriptor> {
    if let Some(photos) = msg.photo() {
        let largest = photos.last()?;
        return Some(MediaDescriptor {
            kind: MediaKind::Photo,
            file_ref: largest.file.id.0.clone(),
            file_size: u64::from(largest.file.size),
            file_name: None,
            mime_type: Some("image/jpeg".to_string()),
        });
    }

    if let Some(video) = msg.video() {
        return Some(MediaDescriptor {
            kind: MediaKind::Video,
            file_ref: video.file.id.0.clone(),
            file_size: u64::from(video.file.size),
            file_name: video.file_name.clone(),
            mime_type: video.mime_type.as_ref().map(|m| m.to_string()),
        });
    }

    if let Some(audio) = msg.audio() {
        return Some(MediaDescriptor {
            kind: MediaKind::Audio,
            file_ref: audio.file.id.0.clone(),
            file_size: u64::from(audio.file.size),
            file_name: audio.file_name.clone(),
            mime_type: audio.mime_type.as_ref().map(|m| m.to_string()),
        });
    }

    if let Some(voice) = msg.voice() {
        return Some(MediaDescriptor {
            kind: MediaKind::Audio,
            file_ref: voice.file.id.0.clone(),
            file_size: u64::from(voice.file.size),
            file_name: None,
            mime_type: voice.mime_type.as_ref().map(|m| m.to_string()),
        });
    }

    if let Some(doc) = msg.document() {
        let mime_type = doc.mime_type.as_ref().map(|m| m.to_string());
        return Some(MediaDescriptor {
            kind: MediaKind::from_mime(mime_type.as_deref()),
            file_ref: doc.file.id.0.clone(),
            file_size: u64::from(doc.file.size),
            file_name: doc.file_name.clone(),
            mime_type,
        });
    }

    None
}
