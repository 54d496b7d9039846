//! The worker: shared state plus the event router.
//!
//! Handlers live in [`crate::handlers`] as methods on [`Worker`].
//! [`Worker::dispatch`] is the single entry point used by hosts.

use std::fmt;
use std::sync::Arc;

use dsx_client::Network;
use dsx_core::{CacheDb, Error, Request, Response, WorkerConfig};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{RwLock, oneshot};

use crate::handlers::SyncReport;
use crate::host::WorkerHost;
use crate::strategy::{Partitions, StrategyTable};

/// Lifecycle position of the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    #[default]
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    /// Install failed; this worker never controls clients.
    Redundant,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        };
        f.write_str(name)
    }
}

/// An event delivered to the worker by its host.
#[derive(Debug)]
pub enum WorkerEvent {
    Install,
    Activate,
    Fetch(Request),
    Sync { tag: String },
    Push { text: Option<String> },
    NotificationClick { action: Option<String> },
    /// A posted message; `reply` is the port answers go to, if any.
    Message { data: Value, reply: Option<oneshot::Sender<Value>> },
}

impl WorkerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            WorkerEvent::Install => "install",
            WorkerEvent::Activate => "activate",
            WorkerEvent::Fetch(_) => "fetch",
            WorkerEvent::Sync { .. } => "sync",
            WorkerEvent::Push { .. } => "push",
            WorkerEvent::NotificationClick { .. } => "notificationclick",
            WorkerEvent::Message { .. } => "message",
        }
    }
}

/// What handling an event produced.
#[derive(Debug)]
pub enum EventOutcome {
    Completed,
    /// A lifecycle or sync handler failed; the error has been logged.
    Failed(Error),
    /// The request was intercepted and answered.
    Response(Response),
    /// The request was left to the network untouched.
    Passthrough,
    Synced(SyncReport),
}

/// Offline worker for one origin.
pub struct Worker {
    pub(crate) config: Arc<WorkerConfig>,
    pub(crate) db: CacheDb,
    pub(crate) network: Arc<dyn Network>,
    pub(crate) host: Arc<dyn WorkerHost>,
    pub(crate) table: StrategyTable,
    pub(crate) partitions: Partitions,
    state: RwLock<WorkerState>,
}

impl Worker {
    pub fn new(config: Arc<WorkerConfig>, db: CacheDb, network: Arc<dyn Network>, host: Arc<dyn WorkerHost>) -> Self {
        let table = StrategyTable::from_config(&config);
        let partitions = Partitions::new(&db, &config);
        Self { config, db, network, host, table, partitions, state: RwLock::new(WorkerState::Parsed) }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// The static and dynamic partitions of the current generation.
    pub fn caches(&self) -> &Partitions {
        &self.partitions
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    pub(crate) async fn set_state(&self, next: WorkerState) {
        let mut state = self.state.write().await;
        tracing::info!(from = %*state, to = %next, "worker state");
        *state = next;
    }

    /// Route an event to its handler.
    ///
    /// Lifecycle and sync failures are logged here and reported as
    /// [`EventOutcome::Failed`]; nothing is escalated to the host.
    pub async fn dispatch(&self, event: WorkerEvent) -> EventOutcome {
        let name = event.name();
        tracing::debug!(event = name, "dispatch");

        let result = match event {
            WorkerEvent::Install => self.install().await.map(|_| EventOutcome::Completed),
            WorkerEvent::Activate => self.activate().await.map(|_| EventOutcome::Completed),
            WorkerEvent::Fetch(request) => {
                return match self.handle_fetch(&request).await {
                    Some(response) => EventOutcome::Response(response),
                    None => EventOutcome::Passthrough,
                };
            }
            WorkerEvent::Sync { tag } => self.handle_sync(&tag).await.map(EventOutcome::Synced),
            WorkerEvent::Push { text } => self.handle_push(text.as_deref()).await.map(|()| EventOutcome::Completed),
            WorkerEvent::NotificationClick { action } => self
                .handle_notification_click(action.as_deref())
                .await
                .map(|()| EventOutcome::Completed),
            WorkerEvent::Message { data, reply } => {
                self.handle_message(&data, reply).await;
                Ok(EventOutcome::Completed)
            }
        };

        result.unwrap_or_else(|e| {
            tracing::error!(event = name, code = e.code(), "handler failed: {e}");
            EventOutcome::Failed(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostCommand;
    use crate::testing::{harness, serve_app_shell, url};

    #[tokio::test]
    async fn test_new_worker_is_parsed() {
        let h = harness().await;
        assert_eq!(h.worker.state().await, WorkerState::Parsed);
        assert_eq!(h.worker.caches().static_cache.name(), "ds-explorer-static-v1");
        assert_eq!(h.worker.caches().dynamic_cache.name(), "ds-explorer-dynamic-v1");
    }

    #[tokio::test]
    async fn test_dispatch_install_then_activate() {
        let h = harness().await;
        serve_app_shell(&h.network, h.worker.config());

        assert!(matches!(h.worker.dispatch(WorkerEvent::Install).await, EventOutcome::Completed));
        assert_eq!(h.worker.state().await, WorkerState::Installed);
        assert!(matches!(h.worker.dispatch(WorkerEvent::Activate).await, EventOutcome::Completed));
        assert_eq!(h.worker.state().await, WorkerState::Activated);

        assert_eq!(h.host.commands(), vec![HostCommand::SkipWaiting, HostCommand::ClaimClients]);
    }

    #[tokio::test]
    async fn test_dispatch_swallows_install_failure() {
        let h = harness().await;
        h.network.go_offline();

        let outcome = h.worker.dispatch(WorkerEvent::Install).await;

        assert!(matches!(outcome, EventOutcome::Failed(Error::InstallFailed { .. })));
        assert_eq!(h.worker.state().await, WorkerState::Redundant);
    }

    #[tokio::test]
    async fn test_dispatch_fetch_outcomes() {
        let h = harness().await;
        h.network.respond_text(&url("/styles/app.css"), "body{}");

        let outcome = h.worker.dispatch(WorkerEvent::Fetch(Request::get(url("/styles/app.css")))).await;
        assert!(matches!(outcome, EventOutcome::Response(r) if r.text() == "body{}"));

        let post = Request::new("POST", url("/api/contact"));
        assert!(matches!(h.worker.dispatch(WorkerEvent::Fetch(post)).await, EventOutcome::Passthrough));
    }

    #[tokio::test]
    async fn test_dispatch_message_reply() {
        let h = harness().await;
        let (tx, rx) = oneshot::channel();

        let data = serde_json::json!({"type": "GET_VERSION"});
        h.worker.dispatch(WorkerEvent::Message { data, reply: Some(tx) }).await;

        assert_eq!(rx.await.unwrap(), serde_json::json!({"version": "ds-explorer-v1"}));
    }

    #[test]
    fn test_state_display() {
        assert_eq!(WorkerState::Redundant.to_string(), "redundant");
        assert_eq!(serde_json::to_value(WorkerState::Activated).unwrap(), serde_json::json!("activated"));
    }
}
