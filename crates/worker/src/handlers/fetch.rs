//! Fetch interception: pick a strategy, fall back when it fails.

use dsx_client::is_same_origin;
use dsx_core::{Request, Response};

use crate::fallback::offline_response;
use crate::strategy::{Revalidation, Strategy, cache_first, network_first, stale_while_revalidate};
use crate::worker::Worker;

/// An intercepted request and how it was answered.
#[derive(Debug)]
pub struct Intercepted {
    pub response: Response,
    pub strategy: Strategy,
    /// Background refresh started by stale-while-revalidate, if any.
    pub revalidation: Option<Revalidation>,
}

impl Worker {
    /// Whether a request is handled by the worker at all.
    ///
    /// Only same-origin GET requests are; everything else goes to the network untouched.
    pub fn intercepts(&self, request: &Request) -> bool {
        request.is_get() && is_same_origin(&request.url, &self.config.origin)
    }

    /// Answer an intercepted request, keeping the revalidation handle.
    pub async fn intercept(&self, request: &Request) -> Option<Intercepted> {
        if !self.intercepts(request) {
            tracing::debug!(method = %request.method, url = %request.url, "passthrough");
            return None;
        }

        let strategy = self.table.classify(&request.url);
        tracing::debug!(url = %request.url, ?strategy, "intercepted");

        let result = match strategy {
            Strategy::CacheFirst => cache_first(self.network.as_ref(), &self.partitions, request)
                .await
                .map(|r| (r, None)),
            Strategy::NetworkFirst => network_first(self.network.as_ref(), &self.partitions, request)
                .await
                .map(|r| (r, None)),
            Strategy::StaleWhileRevalidate => stale_while_revalidate(self.network.clone(), &self.partitions, request)
                .await
                .map(|swr| (swr.response, swr.revalidation)),
        };

        let (response, revalidation) = match result {
            Ok(answered) => answered,
            Err(e) => {
                tracing::debug!(url = %request.url, code = e.code(), "strategy failed, using fallback");
                let response = offline_response(&self.config, &self.db, &self.partitions.static_cache, request).await;
                (response, None)
            }
        };

        Some(Intercepted { response, strategy, revalidation })
    }

    /// Answer a request, or `None` to let it through to the network.
    ///
    /// Background refreshes keep running after this returns.
    pub async fn handle_fetch(&self, request: &Request) -> Option<Response> {
        let intercepted = self.intercept(request).await?;
        if let Some(revalidation) = intercepted.revalidation {
            revalidation.detach();
        }
        Some(intercepted.response)
    }
}
