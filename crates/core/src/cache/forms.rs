//! Pending contact form queue.
//!
//! Forms submitted while offline are queued here and replayed by the
//! background sync handler.

use super::connection::CacheDb;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;

/// A contact form waiting to be delivered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingForm {
    pub id: i64,
    pub payload: serde_json::Value,
    pub queued_at: String,
}

impl CacheDb {
    /// Queue a form payload for the next background sync.
    ///
    /// Returns the id of the queued form.
    pub async fn queue_form(&self, payload: &serde_json::Value) -> Result<i64, Error> {
        let payload_json = serde_json::to_string(payload)?;
        let queued_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<i64, Error> {
                conn.execute(
                    "INSERT INTO pending_forms (payload_json, queued_at) VALUES (?1, ?2)",
                    params![payload_json, queued_at],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await
            .map_err(Error::from)
    }

    /// All queued forms, oldest first.
    pub async fn pending_forms(&self) -> Result<Vec<PendingForm>, Error> {
        let rows = self
            .conn
            .call(|conn| -> Result<Vec<(i64, String, String)>, Error> {
                let mut stmt = conn.prepare("SELECT id, payload_json, queued_at FROM pending_forms ORDER BY id")?;
                let rows = stmt
                    .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)?;

        rows.into_iter()
            .map(|(id, payload_json, queued_at)| -> Result<PendingForm, Error> {
                Ok(PendingForm { id, payload: serde_json::from_str(&payload_json)?, queued_at })
            })
            .collect()
    }

    /// Remove a delivered form from the queue.
    ///
    /// Returns false if no form had that id.
    pub async fn remove_form(&self, id: i64) -> Result<bool, Error> {
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM pending_forms WHERE id = ?1", params![id])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }
}
