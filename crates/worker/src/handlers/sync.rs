//! Background sync of queued contact forms.

use dsx_core::{Error, Request};
use serde::Serialize;
use serde_json::Value;

use crate::worker::Worker;

/// Outcome of one sync run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub delivered: usize,
    pub failed: usize,
}

impl Worker {
    /// Queue a contact form for the next background sync.
    pub async fn queue_contact_form(&self, payload: &Value) -> Result<i64, Error> {
        let id = self.db.queue_form(payload).await?;
        tracing::debug!(id, "contact form queued");
        Ok(id)
    }

    /// Deliver queued contact forms when `tag` is the contact sync tag.
    ///
    /// Each form is POSTed as JSON to the contact endpoint and removed from
    /// the queue only after an ok response. Failed forms stay queued for
    /// the next run; a form that was delivered but could not be removed
    /// counts as failed. Other tags are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is invalid or the queue cannot be read.
    pub async fn handle_sync(&self, tag: &str) -> Result<SyncReport, Error> {
        if tag != self.config.sync_tag {
            tracing::debug!(tag, "ignoring sync tag");
            return Ok(SyncReport::default());
        }

        let endpoint = self
            .config
            .resolve(&self.config.contact_endpoint)
            .map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let forms = self.db.pending_forms().await?;

        let mut report = SyncReport::default();
        for form in forms {
            let request = Request::post_json(endpoint.clone(), &form.payload);
            match self.network.fetch(&request).await {
                Ok(response) if response.ok() => match self.db.remove_form(form.id).await {
                    Ok(_) => report.delivered += 1,
                    Err(e) => {
                        tracing::warn!(id = form.id, code = e.code(), "delivered contact form could not be dequeued: {e}");
                        report.failed += 1;
                    }
                },
                Ok(response) => {
                    tracing::warn!(id = form.id, status = response.status, "contact form rejected");
                    report.failed += 1;
                }
                Err(e) => {
                    tracing::warn!(id = form.id, code = e.code(), "contact form delivery failed: {e}");
                    report.failed += 1;
                }
            }
        }

        tracing::info!(delivered = report.delivered, failed = report.failed, "contact sync finished");
        Ok(report)
    }
}
