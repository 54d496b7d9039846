//! Test doubles shared by the worker's unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dsx_client::Network;
use dsx_core::{CacheDb, Error, Request, Response, WorkerConfig};
use tokio::sync::Semaphore;
use url::Url;

use crate::host::{HostCommand, Notification, WorkerHost};
use crate::worker::Worker;

#[derive(Clone)]
enum Route {
    Respond(Response),
    Fail,
}

/// Scripted network. Unknown URLs answer 404; `go_offline` makes every fetch fail.
#[derive(Default)]
pub struct MockNetwork {
    routes: Mutex<HashMap<String, Route>>,
    offline: Mutex<bool>,
    calls: Mutex<Vec<String>>,
    requests: Mutex<Vec<Request>>,
    gate: Mutex<Option<Arc<Semaphore>>>,
}

impl MockNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, url: &Url, response: Response) {
        self.routes.lock().unwrap().insert(url.to_string(), Route::Respond(response));
    }

    pub fn respond_text(&self, url: &Url, body: &str) {
        self.respond(url, Response::new(200, body.to_string()));
    }

    pub fn fail(&self, url: &Url) {
        self.routes.lock().unwrap().insert(url.to_string(), Route::Fail);
    }

    pub fn go_offline(&self) {
        *self.offline.lock().unwrap() = true;
    }

    pub fn go_online(&self) {
        *self.offline.lock().unwrap() = false;
    }

    /// Hold every fetch until `resume` is called.
    pub fn pause(&self) {
        *self.gate.lock().unwrap() = Some(Arc::new(Semaphore::new(0)));
    }

    pub fn resume(&self) {
        if let Some(gate) = self.gate.lock().unwrap().take() {
            gate.add_permits(Semaphore::MAX_PERMITS / 2);
        }
    }

    /// Requests seen so far, as "METHOD url".
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Full requests seen so far, in order.
    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self, url: &Url) -> usize {
        let needle = format!("GET {url}");
        self.calls.lock().unwrap().iter().filter(|c| **c == needle).count()
    }
}

#[async_trait]
impl Network for MockNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{} {}", request.method, request.url));
        self.requests.lock().unwrap().push(request.clone());

        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            let _permit = gate.acquire().await.map_err(|e| Error::Network(e.to_string()))?;
        }

        if *self.offline.lock().unwrap() {
            return Err(Error::Network("offline".into()));
        }

        let route = self.routes.lock().unwrap().get(request.url.as_str()).cloned();
        match route {
            Some(Route::Respond(response)) => Ok(response),
            Some(Route::Fail) => Err(Error::Network(format!("connection reset: {}", request.url))),
            None => Ok(Response::new(404, "not found")),
        }
    }
}

/// Host that records every requested side effect.
#[derive(Default)]
pub struct RecordingHost {
    commands: Mutex<Vec<HostCommand>>,
}

impl RecordingHost {
    pub fn commands(&self) -> Vec<HostCommand> {
        self.commands.lock().unwrap().clone()
    }

    fn record(&self, command: HostCommand) {
        self.commands.lock().unwrap().push(command);
    }
}

#[async_trait]
impl WorkerHost for RecordingHost {
    async fn skip_waiting(&self) {
        self.record(HostCommand::SkipWaiting);
    }

    async fn claim_clients(&self) {
        self.record(HostCommand::ClaimClients);
    }

    async fn show_notification(&self, notification: &Notification) -> Result<(), Error> {
        self.record(HostCommand::ShowNotification { notification: notification.clone() });
        Ok(())
    }

    async fn close_notification(&self) {
        self.record(HostCommand::CloseNotification);
    }

    async fn open_window(&self, url: &Url) -> Result<(), Error> {
        self.record(HostCommand::OpenWindow { url: url.clone() });
        Ok(())
    }
}

/// Absolute URL on the default test origin.
pub fn url(path: &str) -> Url {
    WorkerConfig::default().resolve(path).unwrap()
}

pub struct Harness {
    pub worker: Arc<Worker>,
    pub network: Arc<MockNetwork>,
    pub host: Arc<RecordingHost>,
    pub db: CacheDb,
}

pub async fn harness_with(config: WorkerConfig) -> Harness {
    let db = CacheDb::open_in_memory().await.unwrap();
    let network = MockNetwork::new();
    let host = Arc::new(RecordingHost::default());
    let worker = Arc::new(Worker::new(Arc::new(config), db.clone(), network.clone(), host.clone()));
    Harness { worker, network, host, db }
}

pub async fn harness() -> Harness {
    harness_with(WorkerConfig::default()).await
}

/// Serve every app-shell path with a small HTML body named after it.
pub fn serve_app_shell(network: &MockNetwork, config: &WorkerConfig) {
    for path in &config.app_shell {
        network.respond(
            &config.resolve(path).unwrap(),
            Response::new(200, format!("<html>{path}</html>")).with_header("Content-Type", "text/html"),
        );
    }
}
