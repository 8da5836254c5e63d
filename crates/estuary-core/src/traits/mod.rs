// SPDX-FileCopyrightText: 2026 Estuary Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams between the relay core and its collaborators.

pub mod store;
pub mod transport;

pub use store::{CorrelationStore, MappingStore};
pub use transport::{ForumTransport, InboundSource};
