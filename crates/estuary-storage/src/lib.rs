// SPDX-FileCopyrightText: 2026 Estuary Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence layer for the Estuary relay.
//!
//! Two stores, deliberately separate: the Mapping Store is a small,
//! human-inspectable JSON file (nested chat -> topics layout, schema
//! versioned), while the Correlation Store is WAL-mode SQLite with
//! embedded migrations and a single-writer concurrency model via
//! `tokio-rusqlite`. No operation ever spans both stores.

pub mod correlation;
pub mod database;
pub mod mapping;
pub mod migrations;
pub mod queries;

pub use correlation::SqliteCorrelationStore;
pub use database::Database;
pub use mapping::JsonMappingStore;
pub use queries::correlations::{RETENTION_HOURS, retention_cutoff};
