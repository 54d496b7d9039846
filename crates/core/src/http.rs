//! Request and response model shared by the cache store and the network layer.
//!
//! These mirror the subset of the Fetch API the worker relies on: a method,
//! a URL, a request mode (to tell navigations apart), headers, and a body.

use std::collections::BTreeMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use url::Url;

/// Header map with lower-cased names.
pub type Headers = BTreeMap<String, String>;

/// Request mode, as reported by the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    /// Top-level document load.
    Navigate,
    SameOrigin,
    #[default]
    NoCors,
    Cors,
}

/// An outgoing request intercepted by the worker.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: String,
    pub url: Url,
    pub mode: RequestMode,
    pub headers: Headers,
    pub body: Option<Bytes>,
}

impl Request {
    pub fn new(method: impl Into<String>, url: Url) -> Self {
        Self { method: method.into(), url, mode: RequestMode::default(), headers: Headers::new(), body: None }
    }

    /// A sub-resource GET request.
    pub fn get(url: Url) -> Self {
        Self::new("GET", url)
    }

    /// A navigation (top-level document) GET request.
    pub fn navigate(url: Url) -> Self {
        Self { mode: RequestMode::Navigate, ..Self::get(url) }
    }

    /// A POST carrying a JSON document.
    pub fn post_json(url: Url, payload: &serde_json::Value) -> Self {
        let mut request = Self::new("POST", url).with_header("Content-Type", "application/json");
        request.body = Some(Bytes::from(payload.to_string()));
        request
    }

    /// Set a header; names are stored lower-cased.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }
}

/// A response, either from the network or from a cache partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub headers: Headers,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self { status, headers: Headers::new(), body: body.into() }
    }

    /// Set a header; names are stored lower-cased.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// A JSON response with the matching content type.
    pub fn json(status: u16, value: &serde_json::Value) -> Self {
        Self::new(status, value.to_string()).with_header("Content-Type", "application/json")
    }

    /// Whether the status is in the 200..=299 range.
    pub fn ok(&self) -> bool {
        (200..=299).contains(&self.status)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type").map(String::as_str)
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
