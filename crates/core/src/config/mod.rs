//! Worker configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (DSX_*)
//! 2. TOML config file (if DSX_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

mod validation;

pub use validation::ConfigError;

/// Immutable worker configuration.
///
/// Built once at startup and shared by every handler. Cache partition names
/// are derived from `cache_prefix` and `cache_version`, so bumping the
/// version makes the next activation drop the previous generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Origin the worker serves; requests to any other origin pass through.
    ///
    /// Set via DSX_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: Url,

    /// Prefix shared by all cache partition names.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Cache generation version (e.g. "v1").
    ///
    /// Set via DSX_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Absolute paths pre-cached at install.
    #[serde(default = "default_app_shell")]
    pub app_shell: Vec<String>,

    /// Page served to navigations when nothing else resolves. Must be part of the app shell.
    #[serde(default = "default_offline_page")]
    pub offline_page: String,

    /// Message carried by the synthesized 503 JSON body.
    #[serde(default = "default_offline_message")]
    pub offline_message: String,

    /// Extensions served cache-first.
    #[serde(default = "default_cache_first_extensions")]
    pub cache_first_extensions: Vec<String>,

    /// Extensions served network-first.
    #[serde(default = "default_network_first_extensions")]
    pub network_first_extensions: Vec<String>,

    /// Background sync tag that replays queued contact forms.
    #[serde(default = "default_sync_tag")]
    pub sync_tag: String,

    /// Path queued contact forms are posted to.
    #[serde(default = "default_contact_endpoint")]
    pub contact_endpoint: String,

    /// Path to the SQLite cache database.
    ///
    /// Set via DSX_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default)]
    pub network: NetworkSettings,

    #[serde(default)]
    pub notification: NotificationSettings,
}

/// Outbound HTTP settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSettings {
    /// User-Agent string for HTTP requests.
    ///
    /// Set via DSX_NETWORK__USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Optional request timeout in milliseconds. Unset means fetches may hang.
    ///
    /// Set via DSX_NETWORK__TIMEOUT_MS environment variable.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// Copy used for push notifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationSettings {
    #[serde(default = "default_notification_title")]
    pub title: String,
    /// Body used when the push message carries no text.
    #[serde(default = "default_notification_body")]
    pub body: String,
    #[serde(default = "default_notification_icon")]
    pub icon: String,
    #[serde(default = "default_notification_badge")]
    pub badge: String,
    #[serde(default = "default_vibrate")]
    pub vibrate: Vec<u32>,
}

fn default_origin() -> Url {
    Url::parse("http://localhost:5173").expect("static origin parses")
}

fn default_cache_prefix() -> String {
    "ds-explorer".into()
}

fn default_cache_version() -> String {
    "v1".into()
}

fn default_app_shell() -> Vec<String> {
    [
        "/",
        "/manifest.json",
        "/favicon.ico",
        "/introduction",
        "/courses",
        "/quiz",
        "/glossary",
        "/blog",
        "/community",
        "/offline.html",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_offline_page() -> String {
    "/offline.html".into()
}

fn default_offline_message() -> String {
    "Cette ressource n'est pas disponible hors ligne".into()
}

fn default_cache_first_extensions() -> Vec<String> {
    ["css", "js", "woff", "woff2", "ttf", "eot", "ico", "png", "jpg", "jpeg", "gif", "svg"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_network_first_extensions() -> Vec<String> {
    vec!["api".into(), "json".into()]
}

fn default_sync_tag() -> String {
    "contact-form".into()
}

fn default_contact_endpoint() -> String {
    "/api/contact".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./ds-explorer-cache.sqlite")
}

fn default_user_agent() -> String {
    "ds-explorer-worker/0.1".into()
}

fn default_notification_title() -> String {
    "Data Science Explorer".into()
}

fn default_notification_body() -> String {
    "Nouveau contenu disponible sur Data Science Explorer !".into()
}

fn default_notification_icon() -> String {
    "/icons/icon-192x192.png".into()
}

fn default_notification_badge() -> String {
    "/icons/icon-72x72.png".into()
}

fn default_vibrate() -> Vec<u32> {
    vec![100, 50, 100]
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self { user_agent: default_user_agent(), timeout_ms: None }
    }
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            title: default_notification_title(),
            body: default_notification_body(),
            icon: default_notification_icon(),
            badge: default_notification_badge(),
            vibrate: default_vibrate(),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            cache_prefix: default_cache_prefix(),
            cache_version: default_cache_version(),
            app_shell: default_app_shell(),
            offline_page: default_offline_page(),
            offline_message: default_offline_message(),
            cache_first_extensions: default_cache_first_extensions(),
            network_first_extensions: default_network_first_extensions(),
            sync_tag: default_sync_tag(),
            contact_endpoint: default_contact_endpoint(),
            db_path: default_db_path(),
            network: NetworkSettings::default(),
            notification: NotificationSettings::default(),
        }
    }
}

impl NetworkSettings {
    /// Timeout as Duration for use with reqwest, if one is configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

impl WorkerConfig {
    /// Identifier of the current cache generation, reported to pages.
    pub fn version(&self) -> String {
        format!("{}-{}", self.cache_prefix, self.cache_version)
    }

    /// Name of the partition holding the app shell and cache-first assets.
    pub fn static_cache_name(&self) -> String {
        format!("{}-static-{}", self.cache_prefix, self.cache_version)
    }

    /// Name of the partition written by network-first and stale-while-revalidate.
    pub fn dynamic_cache_name(&self) -> String {
        format!("{}-dynamic-{}", self.cache_prefix, self.cache_version)
    }

    /// Resolve a site-relative path against the worker origin.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the path cannot be joined to the origin.
    pub fn resolve(&self, path: &str) -> Result<Url, ConfigError> {
        self.origin
            .join(path)
            .map_err(|e| ConfigError::Invalid { field: "path".into(), reason: format!("{path}: {e}") })
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `DSX_`
    /// 2. TOML file from `DSX_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("DSX_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("DSX_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
