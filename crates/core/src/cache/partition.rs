//! Named cache partitions and their entries.
//!
//! Provides the Cache Storage operations the worker needs: open, match,
//! put, bulk put, delete, and enumeration of partitions.

use super::connection::CacheDb;
use super::hash::{compute_cache_key, entry_url};
use crate::Error;
use crate::http::{Headers, Response};
use tokio_rusqlite::{params, rusqlite};
use url::Url;

/// Handle to one named cache partition.
///
/// Cheap to clone; all clones share the same underlying connection.
#[derive(Clone, Debug)]
pub struct Cache {
    db: CacheDb,
    name: String,
}

/// A response flattened into its stored columns.
struct StoredEntry {
    key_hash: String,
    url: String,
    status: u16,
    headers_json: String,
    body: Vec<u8>,
}

impl StoredEntry {
    fn new(url: &Url, response: &Response) -> Result<Self, Error> {
        Ok(Self {
            key_hash: compute_cache_key(url),
            url: entry_url(url),
            status: response.status,
            headers_json: serde_json::to_string(&response.headers)?,
            body: response.body.to_vec(),
        })
    }
}

type StoredRow = (u16, String, Vec<u8>);

fn decode(row: StoredRow) -> Result<Response, Error> {
    let (status, headers_json, body) = row;
    let headers: Headers = serde_json::from_str(&headers_json)?;
    Ok(Response { status, headers, body: body.into() })
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn ensure_partition(conn: &rusqlite::Connection, name: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO caches (name, created_at) VALUES (?1, ?2) ON CONFLICT(name) DO NOTHING",
        params![name, now()],
    )?;
    Ok(())
}

fn upsert_entry(conn: &rusqlite::Connection, cache_name: &str, entry: &StoredEntry) -> rusqlite::Result<()> {
    ensure_partition(conn, cache_name)?;
    conn.execute(
        "INSERT INTO cache_entries (cache_name, key_hash, url, status, headers_json, body, stored_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT(cache_name, key_hash) DO UPDATE SET
            url = excluded.url,
            status = excluded.status,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at",
        params![cache_name, &entry.key_hash, &entry.url, entry.status, &entry.headers_json, &entry.body, now()],
    )?;
    Ok(())
}

fn drop_partition(conn: &rusqlite::Connection, name: &str) -> rusqlite::Result<bool> {
    conn.execute("DELETE FROM cache_entries WHERE cache_name = ?1", params![name])?;
    let removed = conn.execute("DELETE FROM caches WHERE name = ?1", params![name])?;
    Ok(removed > 0)
}

impl CacheDb {
    /// Handle to a partition without creating it.
    ///
    /// Lookups on a partition that doesn't exist yet miss; the first write creates it.
    pub fn cache(&self, name: &str) -> Cache {
        Cache { db: self.clone(), name: name.to_string() }
    }

    /// Open (creating if needed) the partition with the given name.
    pub async fn open_cache(&self, name: &str) -> Result<Cache, Error> {
        let owned = name.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                ensure_partition(conn, &owned)?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        Ok(Cache { db: self.clone(), name: name.to_string() })
    }

    /// Check whether a partition with the given name exists.
    pub async fn has_cache(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM caches WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// Names of all partitions, in creation order.
    pub async fn cache_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM caches ORDER BY rowid")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a partition and all its entries.
    ///
    /// Returns false if no partition had that name.
    pub async fn delete_cache(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let tx = conn.unchecked_transaction()?;
                let removed = drop_partition(&tx, &name)?;
                tx.commit()?;
                Ok(removed)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every partition whose name is not in `keep`.
    ///
    /// Runs in a single transaction: either every stale partition is gone
    /// afterwards or none is. Returns the deleted names.
    pub async fn retain_caches(&self, keep: &[String]) -> Result<Vec<String>, Error> {
        let keep = keep.to_vec();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let tx = conn.unchecked_transaction()?;
                let names = {
                    let mut stmt = tx.prepare("SELECT name FROM caches ORDER BY rowid")?;
                    stmt.query_map([], |row| row.get(0))?
                        .collect::<Result<Vec<String>, _>>()?
                };

                let mut deleted = Vec::new();
                for name in names.into_iter().filter(|n| !keep.contains(n)) {
                    drop_partition(&tx, &name)?;
                    deleted.push(name);
                }
                tx.commit()?;
                Ok(deleted)
            })
            .await
            .map_err(Error::from)
    }

    /// Look a URL up across every partition, oldest partition first.
    pub async fn match_any(&self, url: &Url) -> Result<Option<Response>, Error> {
        let key_hash = compute_cache_key(url);
        let row = self
            .conn
            .call(move |conn| -> Result<Option<StoredRow>, Error> {
                let result: rusqlite::Result<StoredRow> = conn.query_row(
                    "SELECT e.status, e.headers_json, e.body
                    FROM cache_entries e JOIN caches c ON c.name = e.cache_name
                    WHERE e.key_hash = ?1
                    ORDER BY c.rowid LIMIT 1",
                    params![key_hash],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                );

                match result {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        row.map(decode).transpose()
    }
}

impl Cache {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the stored response for a URL.
    ///
    /// Returns None if the partition holds no entry for it.
    pub async fn match_url(&self, url: &Url) -> Result<Option<Response>, Error> {
        let name = self.name.clone();
        let key_hash = compute_cache_key(url);
        let row = self
            .db
            .conn
            .call(move |conn| -> Result<Option<StoredRow>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT status, headers_json, body FROM cache_entries
                    WHERE cache_name = ?1 AND key_hash = ?2",
                )?;

                let result: rusqlite::Result<StoredRow> = stmt.query_row(params![name, key_hash], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)));

                match result {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        row.map(decode).transpose()
    }

    /// Store a response under a URL.
    ///
    /// Uses UPSERT semantics: a later put for the same URL replaces the
    /// earlier entry as a whole.
    pub async fn put(&self, url: &Url, response: &Response) -> Result<(), Error> {
        let name = self.name.clone();
        let entry = StoredEntry::new(url, response)?;
        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                upsert_entry(conn, &name, &entry)?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Store several responses in one transaction.
    ///
    /// Either every entry is written or, if any write fails, none is.
    pub async fn put_all(&self, entries: &[(Url, Response)]) -> Result<(), Error> {
        let name = self.name.clone();
        let entries = entries
            .iter()
            .map(|(url, response)| StoredEntry::new(url, response))
            .collect::<Result<Vec<_>, _>>()?;

        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.unchecked_transaction()?;
                for entry in &entries {
                    upsert_entry(&tx, &name, entry)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Remove the entry for a URL.
    ///
    /// Returns false if there was nothing to remove.
    pub async fn delete(&self, url: &Url) -> Result<bool, Error> {
        let name = self.name.clone();
        let key_hash = compute_cache_key(url);
        self.db
            .conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute(
                    "DELETE FROM cache_entries WHERE cache_name = ?1 AND key_hash = ?2",
                    params![name, key_hash],
                )?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// URLs stored in this partition, sorted.
    pub async fn keys(&self) -> Result<Vec<String>, Error> {
        let name = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT url FROM cache_entries WHERE cache_name = ?1 ORDER BY url")?;
                let urls = stmt
                    .query_map(params![name], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(urls)
            })
            .await
            .map_err(Error::from)
    }
}
