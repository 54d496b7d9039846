//! Caching strategies and the extension classifier that selects them.
//!
//! ### Classification
//! - Static assets (stylesheets, scripts, fonts, images) → cache-first.
//! - API payloads (`api`, `json`) → network-first.
//! - Everything else, notably route navigations → stale-while-revalidate.
//!
//! ### Writes
//! - Only responses with an ok status (200..=299) are stored.
//! - Cache-first writes the static partition; the other two write the dynamic one.
//! - A failed write is logged and never turns a good network response into an error.

mod cache_first;
mod network_first;
mod stale_while_revalidate;

pub use cache_first::cache_first;
pub use network_first::network_first;
pub use stale_while_revalidate::{Revalidation, SwrResponse, stale_while_revalidate};

use std::collections::HashSet;

use dsx_client::path_extension;
use dsx_core::{Cache, CacheDb, Error, Response, WorkerConfig};
use serde::Serialize;
use url::Url;

/// How a request is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    CacheFirst,
    NetworkFirst,
    StaleWhileRevalidate,
}

/// Extension → strategy mapping, built once from configuration.
#[derive(Debug, Clone)]
pub struct StrategyTable {
    cache_first: HashSet<String>,
    network_first: HashSet<String>,
}

impl StrategyTable {
    pub fn from_config(config: &WorkerConfig) -> Self {
        Self {
            cache_first: config.cache_first_extensions.iter().cloned().collect(),
            network_first: config.network_first_extensions.iter().cloned().collect(),
        }
    }

    /// Strategy for a lower-cased extension (empty when the path has none).
    pub fn classify_extension(&self, ext: &str) -> Strategy {
        if self.cache_first.contains(ext) {
            Strategy::CacheFirst
        } else if self.network_first.contains(ext) {
            Strategy::NetworkFirst
        } else {
            Strategy::StaleWhileRevalidate
        }
    }

    pub fn classify(&self, url: &Url) -> Strategy {
        self.classify_extension(&path_extension(url))
    }
}

/// The two live cache partitions of the current generation.
#[derive(Debug, Clone)]
pub struct Partitions {
    pub static_cache: Cache,
    pub dynamic_cache: Cache,
}

impl Partitions {
    pub fn new(db: &CacheDb, config: &WorkerConfig) -> Self {
        Self {
            static_cache: db.cache(&config.static_cache_name()),
            dynamic_cache: db.cache(&config.dynamic_cache_name()),
        }
    }
}

/// First hit for `url` across `caches`, in order.
pub(crate) async fn lookup(url: &Url, caches: [&Cache; 2]) -> Result<Option<Response>, Error> {
    for cache in caches {
        if let Some(response) = cache.match_url(url).await? {
            tracing::debug!(cache = cache.name(), %url, "cache hit");
            return Ok(Some(response));
        }
    }
    tracing::debug!(%url, "cache miss");
    Ok(None)
}

/// Store an ok response; failures are logged, not returned.
pub(crate) async fn store(cache: &Cache, url: &Url, response: &Response) {
    if !response.ok() {
        return;
    }
    if let Err(e) = cache.put(url, response).await {
        tracing::warn!(cache = cache.name(), %url, code = e.code(), "failed to store response: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> StrategyTable {
        StrategyTable::from_config(&WorkerConfig::default())
    }

    #[test]
    fn test_classify_static_assets() {
        let table = table();
        for ext in ["css", "js", "woff", "woff2", "ttf", "eot", "ico", "png", "jpg", "jpeg", "gif", "svg"] {
            assert_eq!(table.classify_extension(ext), Strategy::CacheFirst, "{ext}");
        }
    }

    #[test]
    fn test_classify_api() {
        let table = table();
        assert_eq!(table.classify_extension("json"), Strategy::NetworkFirst);
        assert_eq!(table.classify_extension("api"), Strategy::NetworkFirst);
    }

    #[test]
    fn test_classify_everything_else() {
        let table = table();
        for ext in ["html", "", "txt", "webmanifest", "CSS"] {
            assert_eq!(table.classify_extension(ext), Strategy::StaleWhileRevalidate, "{ext:?}");
        }
    }

    #[test]
    fn test_classify_url() {
        let table = table();
        let origin = Url::parse("http://localhost:5173").unwrap();
        assert_eq!(table.classify(&origin.join("/styles/app.CSS").unwrap()), Strategy::CacheFirst);
        assert_eq!(table.classify(&origin.join("/api/data.json").unwrap()), Strategy::NetworkFirst);
        assert_eq!(table.classify(&origin.join("/introduction").unwrap()), Strategy::StaleWhileRevalidate);
        assert_eq!(table.classify(&origin.join("/offline.html").unwrap()), Strategy::StaleWhileRevalidate);
    }

    #[test]
    fn test_default_sets_are_disjoint() {
        let table = table();
        assert!(table.cache_first.is_disjoint(&table.network_first));
    }

    #[test]
    fn test_classify_follows_config() {
        let mut config = WorkerConfig::default();
        config.cache_first_extensions.push("webp".into());
        config.network_first_extensions.push("csv".into());
        let table = StrategyTable::from_config(&config);
        assert_eq!(table.classify_extension("webp"), Strategy::CacheFirst);
        assert_eq!(table.classify_extension("csv"), Strategy::NetworkFirst);
    }
}
