//! Unified error types for the offline worker.
//!
//! Every variant renders with a stable upper-case code prefix so log lines
//! and the stdio wire format can be matched on without parsing prose.

use tokio_rusqlite::rusqlite;

/// Unified error type for the worker crates.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input (e.g., malformed event or payload).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// The network could not produce a response at all.
    #[error("NETWORK_ERROR: {0}")]
    Network(String),

    /// Fetch timeout.
    #[error("FETCH_TIMEOUT: {0}")]
    Timeout(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// An app-shell asset could not be fetched during install.
    #[error("INSTALL_FAILED: {url}: {reason}")]
    InstallFailed { url: String, reason: String },

    /// A spawned worker task panicked or was cancelled.
    #[error("TASK_FAILED: {0}")]
    TaskFailed(String),

    /// Stored or received JSON could not be encoded or decoded.
    #[error("SERIALIZATION_ERROR: {0}")]
    Serialization(String),
}

impl Error {
    /// Stable code for this error, as used on the wire.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidInput(_) => "INVALID_INPUT",
            Error::InvalidUrl(_) => "INVALID_URL",
            Error::Network(_) => "NETWORK_ERROR",
            Error::Timeout(_) => "FETCH_TIMEOUT",
            Error::Database(_) | Error::MigrationFailed(_) => "CACHE_ERROR",
            Error::InstallFailed { .. } => "INSTALL_FAILED",
            Error::TaskFailed(_) => "TASK_FAILED",
            Error::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Whether the error means the network was unreachable (as opposed to a local failure).
    pub fn is_network(&self) -> bool {
        matches!(self, Error::Network(_) | Error::Timeout(_))
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InstallFailed { url: "/offline.html".to_string(), reason: "status 404".to_string() };
        assert!(err.to_string().starts_with("INSTALL_FAILED"));
        assert!(err.to_string().contains("/offline.html"));
    }

    #[test]
    fn test_error_code_matches_display_prefix() {
        let errors = [
            Error::InvalidInput("x".into()),
            Error::InvalidUrl("x".into()),
            Error::Network("x".into()),
            Error::Timeout("x".into()),
            Error::MigrationFailed("x".into()),
            Error::TaskFailed("x".into()),
            Error::Serialization("x".into()),
        ];
        for err in errors {
            assert!(err.to_string().starts_with(err.code()), "{err}");
        }
    }

    #[test]
    fn test_is_network() {
        assert!(Error::Network("connection refused".into()).is_network());
        assert!(Error::Timeout("20s".into()).is_network());
        assert!(!Error::InvalidInput("bad".into()).is_network());
    }

    #[test]
    fn test_from_serde_json() {
        let err: Error = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        assert_eq!(err.code(), "SERIALIZATION_ERROR");
    }
}
