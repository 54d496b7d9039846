//! SQLite-backed stand-in for the browser Cache Storage API.
//!
//! This module provides named cache partitions holding `(request URL,
//! response)` pairs, stored with async access via tokio-rusqlite. It supports:
//!
//! - Per-key upserts (last write wins) and lookups
//! - All-or-nothing bulk population inside one transaction
//! - Atomic deletion of every partition outside a keep-list
//! - A persistent queue of contact forms awaiting background sync

pub mod connection;
pub mod forms;
pub mod hash;
pub mod migrations;
pub mod partition;

pub use crate::Error;

pub use connection::CacheDb;
pub use forms::PendingForm;
pub use partition::Cache;
