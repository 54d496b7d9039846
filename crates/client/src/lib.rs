//! Client code for the offline worker.
//!
//! This crate provides the network abstraction the caching strategies fetch
//! through, its reqwest implementation, and URL classification helpers.

pub mod fetch;

pub use fetch::{FetchClient, FetchConfig, Network, is_same_origin, path_extension};
