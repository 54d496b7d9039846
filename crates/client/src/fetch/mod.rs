//! Network access for the worker.
//!
//! The worker never talks to reqwest directly: it goes through the
//! [`Network`] trait so strategies can be exercised against scripted
//! networks. [`FetchClient`] is the production implementation.
//!
//! ### Fetch semantics
//! - Any HTTP status is a successful fetch; only transport failures are errors.
//! - Redirects are followed (max 5); the final response is returned.
//! - No timeout unless one is configured.

pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Method};
use std::time::{Duration, Instant};

pub use self::url::{is_same_origin, path_extension};

use dsx_core::config::NetworkSettings;
use dsx_core::{Error, Headers, Request, Response};

/// Source of network responses.
#[async_trait]
pub trait Network: Send + Sync {
    /// Perform a request.
    ///
    /// Returns `Ok` for every response the server produced, whatever its
    /// status; `Err` only when no response could be obtained.
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "ds-explorer-worker/0.1")
    pub user_agent: String,

    /// Request timeout (default: none)
    pub timeout: Option<Duration>,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { user_agent: "ds-explorer-worker/0.1".to_string(), timeout: None, max_redirects: 5 }
    }
}

impl From<&NetworkSettings> for FetchConfig {
    fn from(settings: &NetworkSettings) -> Self {
        Self { user_agent: settings.user_agent.clone(), timeout: settings.timeout(), ..Default::default() }
    }
}

fn map_reqwest_error(err: reqwest::Error) -> Error {
    if err.is_timeout() { Error::Timeout(err.to_string()) } else { Error::Network(err.to_string()) }
}

/// reqwest-backed [`Network`].
#[derive(Debug, Clone)]
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let mut builder = Client::builder()
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true);

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        let http = builder
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

#[async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let start = Instant::now();
        let method = Method::from_bytes(request.method.to_ascii_uppercase().as_bytes())
            .map_err(|e| Error::InvalidInput(format!("invalid method {}: {}", request.method, e)))?;

        let mut builder = self.http.request(method, request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;

        let status = response.status().as_u16();
        let headers: Headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();

        let body: Bytes = response.bytes().await.map_err(map_reqwest_error)?;

        tracing::debug!(
            "fetched {} {} -> {} in {}ms ({} bytes)",
            request.method,
            request.url,
            status,
            start.elapsed().as_millis(),
            body.len()
        );

        Ok(Response { status, headers, body })
    }
}
