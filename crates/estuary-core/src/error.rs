// SPDX-FileCopyrightText: 2026 Estuary Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Estuary relay.

use strum::Display;
use thiserror::Error;

/// Classification of a destination-side transport failure.
///
/// The transport collaborator maps every raw API failure onto one of these
/// kinds; the relay core branches on the kind only and never inspects
/// error message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum TransportErrorKind {
    /// The destination rejected the topic id (deleted topic, invalid thread).
    /// Triggers mapping invalidation and a single resend attempt.
    TopicInvalid,
    /// An edit targeted content identical to what is already there.
    /// Benign, treated as success by callers.
    NotModified,
    /// Network, auth, or rate-limit failure. The operation is dropped;
    /// there is no retry loop beyond the single resolution retry.
    Unavailable,
    /// Any other destination-reported error. Terminal for the message.
    Rejected,
}

/// A structured failure reported by the transport collaborator.
#[derive(Debug, Error)]
#[error("transport error ({kind}): {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl TransportError {
    /// Creates a transport error without an underlying source.
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Creates a transport error wrapping the raw API error.
    pub fn with_source(
        kind: TransportErrorKind,
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn kind(&self) -> TransportErrorKind {
        self.kind
    }
}

/// The primary error type used across Estuary crates.
#[derive(Debug, Error)]
pub enum EstuaryError {
    /// Configuration errors (invalid TOML, missing required fields).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (mapping file I/O, SQLite failures).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A classified failure at the transport boundary.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl EstuaryError {
    /// Returns the transport error kind if this is a transport failure.
    pub fn transport_kind(&self) -> Option<TransportErrorKind> {
        match self {
            EstuaryError::Transport(e) => Some(e.kind),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_error_displays_kind_and_message() {
        let err = TransportError::new(TransportErrorKind::TopicInvalid, "thread not found");
        assert_eq!(
            err.to_string(),
            "transport error (TopicInvalid): thread not found"
        );
    }

    #[test]
    fn transport_kind_is_visible_through_estuary_error() {
        let err: EstuaryError =
            TransportError::new(TransportErrorKind::NotModified, "same content").into();
        assert_eq!(err.transport_kind(), Some(TransportErrorKind::NotModified));

        let err = EstuaryError::Config("bad".into());
        assert_eq!(err.transport_kind(), None);
    }

    #[test]
    fn with_source_preserves_the_cause() {
        let cause = std::io::Error::other("socket closed");
        let err = TransportError::with_source(
            TransportErrorKind::Unavailable,
            "send failed",
            Box::new(cause),
        );
        assert!(std::error::Error::source(&err).is_some());
    }
}
