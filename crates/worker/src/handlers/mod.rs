//! Event handlers, implemented as methods on [`crate::Worker`].

mod fetch;
mod lifecycle;
mod message;
mod push;
mod sync;

pub use fetch::Intercepted;
pub use message::ControlMessage;
pub use sync::SyncReport;
