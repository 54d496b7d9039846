//! Network-first: prefer fresh data, fall back to the last good copy.

use dsx_client::Network;
use dsx_core::{Error, Request, Response};

use super::{Partitions, lookup, store};

/// Fetch first and keep ok responses in the dynamic partition; when the
/// network fails, serve the cached copy instead.
///
/// Non-ok responses are returned as they are and never cached.
///
/// # Errors
///
/// Returns the network error when the network fails and nothing is cached.
pub async fn network_first(network: &dyn Network, caches: &Partitions, request: &Request) -> Result<Response, Error> {
    match network.fetch(request).await {
        Ok(response) => {
            store(&caches.dynamic_cache, &request.url, &response).await;
            Ok(response)
        }
        Err(err) => {
            tracing::debug!(url = %request.url, code = err.code(), "network failed, trying cache");
            match lookup(&request.url, [&caches.dynamic_cache, &caches.static_cache]).await? {
                Some(cached) => Ok(cached),
                None => Err(err),
            }
        }
    }
}
