//! Offline worker for Data Science Explorer.
//!
//! A [`Worker`] intercepts same-origin GET requests and answers them with
//! one of three caching strategies, precaches the app shell on install,
//! drops older cache generations on activate, and handles background sync,
//! push, notification clicks and control messages. Platform effects go
//! through a [`WorkerHost`]; [`stdio`] drives a worker over JSON lines.

pub mod fallback;
pub mod handlers;
pub mod host;
pub mod stdio;
pub mod strategy;
pub mod worker;

#[cfg(test)]
mod testing;

pub use handlers::{ControlMessage, Intercepted, SyncReport};
pub use host::{HostCommand, Notification, WorkerHost};
pub use strategy::{Partitions, Strategy, StrategyTable};
pub use worker::{EventOutcome, Worker, WorkerEvent, WorkerState};
