//! Configuration validation rules.
//!
//! This module provides validation logic for `WorkerConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::WorkerConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl WorkerConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `origin` is not http(s) or carries a path
    /// - `cache_prefix` or `cache_version` is empty
    /// - an app-shell entry is not an absolute path
    /// - `offline_page` is not part of the app shell
    /// - the two extension sets overlap or contain upper-case entries
    /// - `network.user_agent` is empty
    /// - `network.timeout_ms` is set below 100ms or above 5 minutes
    ///
    /// Returns `ConfigError::Missing` if the app shell is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.origin.scheme() {
            "http" | "https" => {}
            scheme => return Err(invalid("origin", format!("unsupported scheme: {scheme}"))),
        }
        if self.origin.path() != "/" {
            return Err(invalid("origin", "must not carry a path"));
        }

        if self.cache_prefix.is_empty() {
            return Err(invalid("cache_prefix", "must not be empty"));
        }
        if self.cache_version.is_empty() {
            return Err(invalid("cache_version", "must not be empty"));
        }

        if self.app_shell.is_empty() {
            return Err(ConfigError::Missing {
                field: "app_shell".into(),
                hint: "list at least the site root and the offline page".into(),
            });
        }
        if let Some(entry) = self.app_shell.iter().find(|p| !p.starts_with('/') || p.contains('*')) {
            return Err(invalid("app_shell", format!("{entry} must be an absolute path without wildcards")));
        }
        if !self.app_shell.contains(&self.offline_page) {
            return Err(invalid("offline_page", format!("{} is not part of the app shell", self.offline_page)));
        }

        for (field, set) in
            [("cache_first_extensions", &self.cache_first_extensions), ("network_first_extensions", &self.network_first_extensions)]
        {
            if let Some(ext) = set.iter().find(|e| e.is_empty() || e.starts_with('.') || **e != e.to_lowercase()) {
                return Err(invalid(field, format!("{ext:?} must be a lower-case extension without a dot")));
            }
        }
        if let Some(ext) = self.cache_first_extensions.iter().find(|e| self.network_first_extensions.contains(e)) {
            return Err(invalid("network_first_extensions", format!("{ext} is also listed as cache-first")));
        }

        if !self.contact_endpoint.starts_with('/') {
            return Err(invalid("contact_endpoint", "must be an absolute path"));
        }

        if self.network.user_agent.is_empty() {
            return Err(invalid("network.user_agent", "must not be empty"));
        }
        if let Some(timeout_ms) = self.network.timeout_ms {
            if timeout_ms < 100 {
                return Err(invalid("network.timeout_ms", "must be at least 100ms"));
            }
            if timeout_ms > 300_000 {
                return Err(invalid("network.timeout_ms", "must not exceed 5 minutes (300000ms)"));
            }
        }

        if self.sync_tag.is_empty() {
            tracing::warn!("sync_tag is empty; background sync will never replay queued forms");
        }

        Ok(())
    }
}
