// SPDX-FileCopyrightText: 2026 Estuary Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Estuary relay.
//!
//! Estuary mirrors messages from many Telegram source conversations into a
//! single destination forum, one topic per (source chat, source thread)
//! pair. This crate provides the shared types, the error model, and the
//! trait seams between the relay core and its transport/storage
//! collaborators.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{EstuaryError, TransportError, TransportErrorKind};
pub use traits::{CorrelationStore, ForumTransport, InboundSource, MappingStore};
pub use types::{
    ChatKind, ChatSummary, CorrelationRecord, InboundMessage, MediaDescriptor, MediaKind,
    SentMessage, SourceKey, TopicMapping, utc_timestamp,
};
