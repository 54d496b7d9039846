//! Push notifications and clicks on them.

use dsx_core::Error;

use crate::host::{EXPLORE_ACTION, Notification};
use crate::worker::Worker;

impl Worker {
    /// Show the new-content notification; `text` is the push payload, if any.
    pub async fn handle_push(&self, text: Option<&str>) -> Result<(), Error> {
        let notification = Notification::from_settings(&self.config.notification, text);
        tracing::info!(title = %notification.title, "showing push notification");
        self.host.show_notification(&notification).await
    }

    /// Close the notification and, for the explore action, open the site root.
    pub async fn handle_notification_click(&self, action: Option<&str>) -> Result<(), Error> {
        self.host.close_notification().await;

        if action == Some(EXPLORE_ACTION) {
            let root = self.config.resolve("/").map_err(|e| Error::InvalidUrl(e.to_string()))?;
            self.host.open_window(&root).await?;
        }
        Ok(())
    }
}
