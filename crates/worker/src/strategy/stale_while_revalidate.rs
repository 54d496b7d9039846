//! Stale-while-revalidate: answer from cache at once, refresh in the background.

use std::sync::Arc;

use dsx_client::Network;
use dsx_core::{Cache, Error, Request, Response};
use tokio::task::JoinHandle;

use super::{Partitions, lookup, store};

/// Background refresh of one cached entry.
///
/// The task keeps running when this handle is dropped.
#[derive(Debug)]
pub struct Revalidation {
    handle: JoinHandle<Result<Response, Error>>,
}

impl Revalidation {
    /// Fetch `request` and store an ok answer in `cache`, off the caller's path.
    pub fn spawn(network: Arc<dyn Network>, cache: Cache, request: Request) -> Self {
        let handle = tokio::spawn(async move {
            let response = network.fetch(&request).await.inspect_err(|e| {
                tracing::debug!(url = %request.url, code = e.code(), "revalidation failed: {e}");
            })?;
            store(&cache, &request.url, &response).await;
            Ok(response)
        });
        Self { handle }
    }

    /// Wait for the refresh and return what the network answered.
    ///
    /// # Errors
    ///
    /// Returns the network error, or `TaskFailed` if the task panicked.
    pub async fn wait(self) -> Result<Response, Error> {
        self.handle.await.map_err(|e| Error::TaskFailed(e.to_string()))?
    }

    /// Let the refresh finish on its own.
    pub fn detach(self) {
        drop(self.handle);
    }
}

/// Result of a stale-while-revalidate lookup.
#[derive(Debug)]
pub struct SwrResponse {
    pub response: Response,
    /// Present when the response came from cache and a refresh is in flight.
    pub revalidation: Option<Revalidation>,
}

/// Serve the cached copy if there is one and refresh it in the background;
/// otherwise wait for the network and cache its answer.
///
/// # Errors
///
/// Returns the network error when nothing is cached and the fetch fails.
pub async fn stale_while_revalidate(
    network: Arc<dyn Network>, caches: &Partitions, request: &Request,
) -> Result<SwrResponse, Error> {
    if let Some(cached) = lookup(&request.url, [&caches.dynamic_cache, &caches.static_cache]).await? {
        let revalidation = Revalidation::spawn(network, caches.dynamic_cache.clone(), request.clone());
        return Ok(SwrResponse { response: cached, revalidation: Some(revalidation) });
    }

    let response = network.fetch(request).await?;
    store(&caches.dynamic_cache, &request.url, &response).await;
    Ok(SwrResponse { response, revalidation: None })
}
