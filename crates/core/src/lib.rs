//! Core types and shared functionality for the Data Science Explorer offline worker.
//!
//! This crate provides:
//! - Cache partitions backed by SQLite (a stand-in for the browser Cache Storage API)
//! - The request/response model shared with the network layer
//! - Unified error types
//! - Layered worker configuration

pub mod cache;
pub mod config;
pub mod error;
pub mod http;

pub use cache::{Cache, CacheDb, PendingForm};
pub use config::{ConfigError, WorkerConfig};
pub use error::Error;
pub use http::{Headers, Request, RequestMode, Response};
