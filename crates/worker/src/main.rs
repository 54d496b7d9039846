//! ds-explorer-worker entry point.
//!
//! Runs the offline worker over a JSON-lines stdio transport.
//! Logging goes to stderr so stdout carries only protocol lines.

use std::sync::Arc;

use anyhow::{Context, Result};
use dsx_client::FetchClient;
use dsx_core::{CacheDb, WorkerConfig};
use dsx_worker::Worker;
use dsx_worker::stdio::{StdioHost, read_events, write_lines};
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = WorkerConfig::load().context("loading configuration")?;
    tracing::info!(origin = %config.origin, version = %config.version(), "starting ds-explorer worker on stdio");

    let db = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("opening cache database {}", config.db_path.display()))?;
    let network = FetchClient::new((&config.network).into())?;

    let (tx, rx) = mpsc::unbounded_channel();
    let host = StdioHost::new(tx.clone());
    let worker = Arc::new(Worker::new(Arc::new(config), db.clone(), Arc::new(network), Arc::new(host)));

    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        write_lines(rx, &mut stdout).await
    });

    let accepted = read_events(worker, BufReader::new(tokio::io::stdin()), tx).await?;
    let written = writer.await??;
    db.close().await.context("closing cache database")?;
    tracing::info!(accepted, written, "worker stopped");

    Ok(())
}
