//! Platform side effects requested by the worker.
//!
//! Skipping the waiting phase, claiming clients, showing notifications and
//! opening windows belong to whatever hosts the worker. Handlers only
//! describe them through [`WorkerHost`].

use async_trait::async_trait;
use dsx_core::Error;
use dsx_core::config::NotificationSettings;
use serde::{Deserialize, Serialize};
use url::Url;

/// A notification action button.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
    pub icon: String,
}

/// Notification shown in response to a push message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    /// RFC 3339 arrival time of the push message.
    pub arrived_at: String,
    pub actions: Vec<NotificationAction>,
}

/// Action id that opens the site.
pub const EXPLORE_ACTION: &str = "explore";

/// Action id that only dismisses the notification.
pub const CLOSE_ACTION: &str = "close";

impl Notification {
    /// Build the push notification from configured copy.
    ///
    /// `text` replaces the default body when the push message carried one.
    pub fn from_settings(settings: &NotificationSettings, text: Option<&str>) -> Self {
        let body = match text.map(str::trim) {
            Some(text) if !text.is_empty() => text.to_string(),
            _ => settings.body.clone(),
        };

        Self {
            title: settings.title.clone(),
            body,
            icon: settings.icon.clone(),
            badge: settings.badge.clone(),
            vibrate: settings.vibrate.clone(),
            arrived_at: chrono::Utc::now().to_rfc3339(),
            actions: vec![
                NotificationAction {
                    action: EXPLORE_ACTION.into(),
                    title: "Explorer".into(),
                    icon: "/icons/checkmark.png".into(),
                },
                NotificationAction { action: CLOSE_ACTION.into(), title: "Fermer".into(), icon: "/icons/xmark.png".into() },
            ],
        }
    }
}

/// A side effect requested from the host, in serializable form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum HostCommand {
    SkipWaiting,
    ClaimClients,
    ShowNotification { notification: Notification },
    CloseNotification,
    OpenWindow { url: Url },
}

/// Host environment of the worker.
#[async_trait]
pub trait WorkerHost: Send + Sync {
    /// Activate this worker without waiting for existing clients to close.
    async fn skip_waiting(&self);

    /// Take control of already-open clients.
    async fn claim_clients(&self);

    async fn show_notification(&self, notification: &Notification) -> Result<(), Error>;

    async fn close_notification(&self);

    /// Focus a client showing `url`, or open a new window on it.
    async fn open_window(&self, url: &Url) -> Result<(), Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_default_body() {
        let settings = NotificationSettings::default();
        let notification = Notification::from_settings(&settings, None);
        assert_eq!(notification.title, "Data Science Explorer");
        assert_eq!(notification.body, settings.body);
        let actions: Vec<_> = notification.actions.iter().map(|a| a.action.as_str()).collect();
        assert_eq!(actions, vec![EXPLORE_ACTION, CLOSE_ACTION]);
    }

    #[test]
    fn test_notification_push_text() {
        let settings = NotificationSettings::default();
        let notification = Notification::from_settings(&settings, Some("Nouveau cours : clustering"));
        assert_eq!(notification.body, "Nouveau cours : clustering");

        let blank = Notification::from_settings(&settings, Some("   "));
        assert_eq!(blank.body, settings.body);
    }

    #[test]
    fn test_host_command_serde() {
        let json = serde_json::to_value(HostCommand::SkipWaiting).unwrap();
        assert_eq!(json, serde_json::json!({"name": "skip_waiting"}));

        let url = Url::parse("http://localhost:5173/").unwrap();
        let json = serde_json::to_value(HostCommand::OpenWindow { url }).unwrap();
        assert_eq!(json, serde_json::json!({"name": "open_window", "url": "http://localhost:5173/"}));
    }
}
