//! Cache-first: serve from cache, touch the network only on a miss.

use dsx_client::Network;
use dsx_core::{Error, Request, Response};

use super::{Partitions, lookup, store};

/// Answer from cache when possible, otherwise fetch and keep an ok response
/// in the static partition.
///
/// # Errors
///
/// Propagates network errors on a miss; the caller owns the fallback.
pub async fn cache_first(network: &dyn Network, caches: &Partitions, request: &Request) -> Result<Response, Error> {
    if let Some(cached) = lookup(&request.url, [&caches.static_cache, &caches.dynamic_cache]).await? {
        return Ok(cached);
    }

    let response = network.fetch(request).await?;
    store(&caches.static_cache, &request.url, &response).await;
    Ok(response)
}
