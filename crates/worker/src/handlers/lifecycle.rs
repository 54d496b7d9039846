//! Install and activate.

use dsx_core::{Error, Request};
use tokio::task::JoinSet;

use crate::worker::{Worker, WorkerState};

impl Worker {
    /// Precache the app shell, then ask the host to skip waiting.
    ///
    /// Every shell URL is fetched before anything is written; one failure
    /// leaves the static partition untouched and marks the worker redundant.
    /// Returns the number of entries stored.
    ///
    /// # Errors
    ///
    /// Returns `InstallFailed` naming the first URL that failed, or a
    /// database error if the final write fails.
    pub async fn install(&self) -> Result<usize, Error> {
        self.set_state(WorkerState::Installing).await;

        match self.precache().await {
            Ok(stored) => {
                tracing::info!(cache = self.partitions.static_cache.name(), stored, "app shell cached");
                self.set_state(WorkerState::Installed).await;
                self.host.skip_waiting().await;
                Ok(stored)
            }
            Err(e) => {
                tracing::error!(code = e.code(), "install failed: {e}");
                self.set_state(WorkerState::Redundant).await;
                Err(e)
            }
        }
    }

    async fn precache(&self) -> Result<usize, Error> {
        let mut tasks = JoinSet::new();
        for path in &self.config.app_shell {
            let url = self.config.resolve(path).map_err(|e| Error::InvalidUrl(e.to_string()))?;
            let network = self.network.clone();
            tasks.spawn(async move {
                let result = network.fetch(&Request::get(url.clone())).await;
                (url, result)
            });
        }

        let mut entries = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            let (url, result) = joined.map_err(|e| Error::TaskFailed(e.to_string()))?;
            let response = result.map_err(|e| Error::InstallFailed { url: url.to_string(), reason: e.to_string() })?;
            if !response.ok() {
                return Err(Error::InstallFailed { url: url.to_string(), reason: format!("status {}", response.status) });
            }
            entries.push((url, response));
        }

        self.partitions.static_cache.put_all(&entries).await?;
        Ok(entries.len())
    }

    /// Delete every partition of older generations and claim open clients.
    ///
    /// Returns the names of the deleted partitions.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a redundant worker, which never cached the
    /// shell; nothing is deleted or claimed then. Returns a database error
    /// if the cleanup transaction fails; no partition is deleted in that case.
    pub async fn activate(&self) -> Result<Vec<String>, Error> {
        match self.state().await {
            WorkerState::Installed => {}
            WorkerState::Redundant => {
                return Err(Error::InvalidInput("cannot activate a redundant worker".into()));
            }
            state => tracing::warn!(%state, "activating a worker that is not installed"),
        }
        self.set_state(WorkerState::Activating).await;

        let keep = [
            self.partitions.static_cache.name().to_string(),
            self.partitions.dynamic_cache.name().to_string(),
        ];
        let deleted = match self.db.retain_caches(&keep).await {
            Ok(deleted) => deleted,
            Err(e) => {
                self.set_state(WorkerState::Installed).await;
                return Err(e);
            }
        };
        for name in &deleted {
            tracing::info!(cache = %name, "deleted stale cache");
        }

        self.host.claim_clients().await;
        self.set_state(WorkerState::Activated).await;
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use dsx_core::{Response, WorkerConfig};

    use super::*;
    use crate::host::HostCommand;
    use crate::testing::{harness, harness_with, serve_app_shell, url};

    #[tokio::test]
    async fn test_install_caches_every_shell_url() {
        let h = harness().await;
        serve_app_shell(&h.network, h.worker.config());

        let stored = h.worker.install().await.unwrap();

        assert_eq!(stored, 10);
        let keys = h.worker.caches().static_cache.keys().await.unwrap();
        assert_eq!(keys.len(), 10);
        assert!(keys.contains(&"http://localhost:5173/offline.html".to_string()));
        assert_eq!(h.worker.state().await, WorkerState::Installed);
        assert_eq!(h.host.commands(), vec![HostCommand::SkipWaiting]);
    }

    #[tokio::test]
    async fn test_install_is_all_or_nothing() {
        let h = harness().await;
        serve_app_shell(&h.network, h.worker.config());
        h.network.fail(&url("/glossary"));

        let err = h.worker.install().await.unwrap_err();

        assert!(matches!(err, Error::InstallFailed { url: ref failed, .. } if failed.ends_with("/glossary")));
        assert!(h.worker.caches().static_cache.keys().await.unwrap().is_empty());
        assert_eq!(h.worker.state().await, WorkerState::Redundant);
        assert!(h.host.commands().is_empty());
    }

    #[tokio::test]
    async fn test_install_rejects_error_status() {
        let h = harness().await;
        serve_app_shell(&h.network, h.worker.config());
        h.network.respond(&url("/favicon.ico"), Response::new(404, "missing"));

        let err = h.worker.install().await.unwrap_err();

        assert_eq!(err.code(), "INSTALL_FAILED");
        assert!(err.to_string().contains("status 404"));
        assert!(h.worker.caches().static_cache.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_install_uses_configured_shell() {
        let config = WorkerConfig {
            app_shell: vec!["/".into(), "/offline.html".into()],
            ..WorkerConfig::default()
        };
        let h = harness_with(config).await;
        serve_app_shell(&h.network, h.worker.config());

        assert_eq!(h.worker.install().await.unwrap(), 2);
        assert_eq!(h.network.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_activate_removes_other_generations() {
        let h = harness().await;
        h.db.cache("ds-explorer-static-v0").put(&url("/"), &Response::new(200, "old")).await.unwrap();
        h.db.cache("unrelated").put(&url("/x"), &Response::new(200, "x")).await.unwrap();
        h.worker.caches().static_cache.put(&url("/"), &Response::new(200, "new")).await.unwrap();

        let deleted = h.worker.activate().await.unwrap();

        assert_eq!(deleted, vec!["ds-explorer-static-v0".to_string(), "unrelated".to_string()]);
        assert_eq!(h.db.cache_names().await.unwrap(), vec!["ds-explorer-static-v1".to_string()]);
        assert_eq!(h.worker.state().await, WorkerState::Activated);
        assert_eq!(h.host.commands(), vec![HostCommand::ClaimClients]);
    }

    #[tokio::test]
    async fn test_activate_refused_after_failed_install() {
        let h = harness().await;
        h.db.cache("ds-explorer-static-v0").put(&url("/"), &Response::new(200, "old")).await.unwrap();
        h.network.go_offline();
        h.worker.install().await.unwrap_err();

        let err = h.worker.activate().await.unwrap_err();

        assert_eq!(err.code(), "INVALID_INPUT");
        assert_eq!(h.worker.state().await, WorkerState::Redundant);
        assert_eq!(h.db.cache_names().await.unwrap(), vec!["ds-explorer-static-v0".to_string()]);
        assert!(h.host.commands().is_empty());
    }

    #[tokio::test]
    async fn test_activate_with_nothing_stale() {
        let h = harness().await;
        assert!(h.worker.activate().await.unwrap().is_empty());
    }
}
