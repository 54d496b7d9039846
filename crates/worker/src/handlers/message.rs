//! Control messages posted by pages.

use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::oneshot;

use crate::worker::Worker;

/// Messages the worker understands, keyed by their `type` field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    SkipWaiting,
    GetVersion,
}

impl Worker {
    /// Handle a posted message. Unknown messages are ignored.
    ///
    /// `GET_VERSION` answers on `reply` with `{"version": <generation>}`.
    pub async fn handle_message(&self, data: &Value, reply: Option<oneshot::Sender<Value>>) {
        let Ok(message) = ControlMessage::deserialize(data) else {
            tracing::debug!(%data, "ignoring unknown message");
            return;
        };

        match message {
            ControlMessage::SkipWaiting => self.host.skip_waiting().await,
            ControlMessage::GetVersion => {
                let version = json!({ "version": self.config.version() });
                match reply {
                    Some(port) => {
                        if port.send(version).is_err() {
                            tracing::debug!("version reply port closed");
                        }
                    }
                    None => tracing::debug!("GET_VERSION without a reply port"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use dsx_core::WorkerConfig;

    use super::*;
    use crate::host::HostCommand;
    use crate::testing::{harness, harness_with};

    #[tokio::test]
    async fn test_get_version_replies_generation() {
        let h = harness().await;
        let (tx, rx) = oneshot::channel();

        h.worker.handle_message(&json!({"type": "GET_VERSION"}), Some(tx)).await;

        assert_eq!(rx.await.unwrap(), json!({"version": "ds-explorer-v1"}));
    }

    #[tokio::test]
    async fn test_get_version_follows_config() {
        let config = WorkerConfig { cache_version: "v7".into(), ..WorkerConfig::default() };
        let h = harness_with(config).await;
        let (tx, rx) = oneshot::channel();

        h.worker.handle_message(&json!({"type": "GET_VERSION"}), Some(tx)).await;

        assert_eq!(rx.await.unwrap(), json!({"version": "ds-explorer-v7"}));
    }

    #[tokio::test]
    async fn test_skip_waiting_message() {
        let h = harness().await;

        h.worker.handle_message(&json!({"type": "SKIP_WAITING"}), None).await;

        assert_eq!(h.host.commands(), vec![HostCommand::SkipWaiting]);
    }

    #[tokio::test]
    async fn test_unknown_messages_ignored() {
        let h = harness().await;
        let (tx, rx) = oneshot::channel();

        h.worker.handle_message(&json!({"type": "CLEAR_CACHE"}), Some(tx)).await;
        h.worker.handle_message(&json!("hello"), None).await;

        assert!(rx.await.is_err());
        assert!(h.host.commands().is_empty());
    }

    #[test]
    fn test_control_message_parse() {
        let msg: ControlMessage = serde_json::from_value(json!({"type": "SKIP_WAITING"})).unwrap();
        assert_eq!(msg, ControlMessage::SkipWaiting);
    }
}
