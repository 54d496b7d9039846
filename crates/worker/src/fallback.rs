//! Last-resort answers when neither the network nor the strategy's cache could help.

use dsx_core::{Cache, CacheDb, Request, Response, WorkerConfig};
use serde_json::json;

/// Answer for a request whose strategy failed.
///
/// Navigations first get the cached offline page. After that, any request
/// gets whatever copy of its URL survives in any partition, and finally a
/// 503 JSON body. Cache errors here count as misses.
pub async fn offline_response(config: &WorkerConfig, db: &CacheDb, static_cache: &Cache, request: &Request) -> Response {
    if request.is_navigation()
        && let Some(page) = offline_page(config, static_cache).await
    {
        return page;
    }

    match db.match_any(&request.url).await {
        Ok(Some(response)) => return response,
        Ok(None) => {}
        Err(e) => tracing::warn!(url = %request.url, code = e.code(), "fallback lookup failed: {e}"),
    }

    tracing::info!(url = %request.url, "serving offline response");
    offline_json(config)
}

async fn offline_page(config: &WorkerConfig, static_cache: &Cache) -> Option<Response> {
    let url = match config.resolve(&config.offline_page) {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!("offline page: {e}");
            return None;
        }
    };
    match static_cache.match_url(&url).await {
        Ok(page) => page,
        Err(e) => {
            tracing::warn!(%url, code = e.code(), "offline page lookup failed: {e}");
            None
        }
    }
}

/// The fixed 503 body for resources that are unavailable offline.
pub fn offline_json(config: &WorkerConfig) -> Response {
    Response::json(503, &json!({ "error": "Offline", "message": config.offline_message }))
}
