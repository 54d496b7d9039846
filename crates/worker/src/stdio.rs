//! JSON-lines transport between the worker and an embedding process.
//!
//! Each stdin line carries one event, `{"id": .., "event": "<name>", ..}`.
//! Events are handled concurrently. Every event yields exactly one
//! `outcome` (or `error`) line on stdout; `GET_VERSION` messages also yield
//! a `reply` line, and side effects are written as `command` lines.

use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use dsx_core::{Error, Headers, Request, RequestMode, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use url::Url;

use crate::host::{HostCommand, Notification, WorkerHost};
use crate::worker::{EventOutcome, Worker, WorkerEvent};

/// A request as it appears on the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct WireRequest {
    #[serde(default = "default_method")]
    pub method: String,
    pub url: Url,
    #[serde(default)]
    pub mode: RequestMode,
    #[serde(default)]
    pub headers: Headers,
    #[serde(default)]
    pub body: Option<String>,
}

fn default_method() -> String {
    "GET".to_string()
}

impl From<WireRequest> for Request {
    fn from(wire: WireRequest) -> Self {
        let mut request = Request::new(wire.method.to_ascii_uppercase(), wire.url);
        request.mode = wire.mode;
        for (name, value) in wire.headers {
            request = request.with_header(&name, value);
        }
        request.body = wire.body.map(Bytes::from);
        request
    }
}

/// Events accepted on stdin.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum InboundEvent {
    Install,
    Activate,
    Fetch {
        request: WireRequest,
    },
    Sync {
        tag: String,
    },
    Push {
        #[serde(default)]
        data: Option<String>,
    },
    NotificationClick {
        #[serde(default)]
        action: Option<String>,
    },
    Message {
        data: Value,
    },
    /// Store a contact form for the next `sync`.
    #[serde(rename = "queue_form")]
    QueueForm {
        payload: Value,
    },
}

/// A response as it appears on the wire; the body is decoded as UTF-8 text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: String,
}

impl From<Response> for WireResponse {
    fn from(response: Response) -> Self {
        let body = response.text();
        Self { status: response.status, headers: response.headers, body }
    }
}

/// Result of one event on the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WireOutcome {
    Completed,
    Failed { code: String, message: String },
    Response { response: WireResponse },
    Passthrough,
    Synced { delivered: usize, failed: usize },
    Queued { form_id: i64 },
}

impl WireOutcome {
    fn failed(err: &Error) -> Self {
        WireOutcome::Failed { code: err.code().to_string(), message: err.to_string() }
    }
}

impl From<EventOutcome> for WireOutcome {
    fn from(outcome: EventOutcome) -> Self {
        match outcome {
            EventOutcome::Completed => WireOutcome::Completed,
            EventOutcome::Failed(e) => WireOutcome::failed(&e),
            EventOutcome::Response(response) => WireOutcome::Response { response: response.into() },
            EventOutcome::Passthrough => WireOutcome::Passthrough,
            EventOutcome::Synced(report) => {
                WireOutcome::Synced { delivered: report.delivered, failed: report.failed }
            }
        }
    }
}

/// One line written to stdout.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutboundLine {
    Outcome {
        id: Value,
        #[serde(flatten)]
        outcome: WireOutcome,
    },
    Reply {
        id: Value,
        data: Value,
    },
    Command {
        #[serde(flatten)]
        command: HostCommand,
    },
    Error {
        id: Value,
        code: String,
        message: String,
    },
}

/// Host whose side effects become `command` lines.
pub struct StdioHost {
    out: mpsc::UnboundedSender<OutboundLine>,
}

impl StdioHost {
    pub fn new(out: mpsc::UnboundedSender<OutboundLine>) -> Self {
        Self { out }
    }

    fn send(&self, command: HostCommand) -> Result<(), Error> {
        self.out
            .send(OutboundLine::Command { command })
            .map_err(|_| Error::TaskFailed("output channel closed".into()))
    }

    fn send_logged(&self, command: HostCommand) {
        if let Err(e) = self.send(command) {
            tracing::debug!("dropping host command: {e}");
        }
    }
}

#[async_trait]
impl WorkerHost for StdioHost {
    async fn skip_waiting(&self) {
        self.send_logged(HostCommand::SkipWaiting);
    }

    async fn claim_clients(&self) {
        self.send_logged(HostCommand::ClaimClients);
    }

    async fn show_notification(&self, notification: &Notification) -> Result<(), Error> {
        self.send(HostCommand::ShowNotification { notification: notification.clone() })
    }

    async fn close_notification(&self) {
        self.send_logged(HostCommand::CloseNotification);
    }

    async fn open_window(&self, url: &Url) -> Result<(), Error> {
        self.send(HostCommand::OpenWindow { url: url.clone() })
    }
}

/// Parse one input line into its id and event.
///
/// The id is returned even when the event itself is malformed, so the
/// error line can be correlated.
pub fn parse_line(line: &str) -> Result<(Value, InboundEvent), (Value, Error)> {
    let value: Value = serde_json::from_str(line).map_err(|e| (Value::Null, Error::from(e)))?;
    let id = value.get("id").cloned().unwrap_or(Value::Null);
    match serde_json::from_value(value) {
        Ok(event) => Ok((id, event)),
        Err(e) => Err((id, Error::InvalidInput(e.to_string()))),
    }
}

async fn handle_event(worker: &Worker, id: Value, event: InboundEvent, out: &mpsc::UnboundedSender<OutboundLine>) {
    let outcome = match event {
        InboundEvent::Install => worker.dispatch(WorkerEvent::Install).await.into(),
        InboundEvent::Activate => worker.dispatch(WorkerEvent::Activate).await.into(),
        InboundEvent::Fetch { request } => worker.dispatch(WorkerEvent::Fetch(request.into())).await.into(),
        InboundEvent::Sync { tag } => worker.dispatch(WorkerEvent::Sync { tag }).await.into(),
        InboundEvent::Push { data } => worker.dispatch(WorkerEvent::Push { text: data }).await.into(),
        InboundEvent::NotificationClick { action } => {
            worker.dispatch(WorkerEvent::NotificationClick { action }).await.into()
        }
        InboundEvent::Message { data } => {
            let (tx, rx) = oneshot::channel();
            let outcome = worker.dispatch(WorkerEvent::Message { data, reply: Some(tx) }).await;
            if let Ok(data) = rx.await {
                if out.send(OutboundLine::Reply { id: id.clone(), data }).is_err() {
                    tracing::debug!("output closed before reply was written");
                }
            }
            outcome.into()
        }
        InboundEvent::QueueForm { payload } => match worker.queue_contact_form(&payload).await {
            Ok(form_id) => WireOutcome::Queued { form_id },
            Err(e) => {
                tracing::warn!(code = e.code(), "failed to queue contact form: {e}");
                WireOutcome::failed(&e)
            }
        },
    };

    if out.send(OutboundLine::Outcome { id, outcome }).is_err() {
        tracing::debug!("output closed before outcome was written");
    }
}

/// Read events until EOF, handling each on its own task.
///
/// Returns once every event has been answered. Malformed lines produce an
/// `error` line and do not stop the loop.
pub async fn read_events<R>(worker: Arc<Worker>, input: R, out: mpsc::UnboundedSender<OutboundLine>) -> io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    let mut tasks = JoinSet::new();
    let mut accepted = 0;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match parse_line(line) {
            Ok((id, event)) => {
                let worker = Arc::clone(&worker);
                let out = out.clone();
                tasks.spawn(async move { handle_event(&worker, id, event, &out).await });
                accepted += 1;
            }
            Err((id, e)) => {
                tracing::warn!(code = e.code(), "rejected input line: {e}");
                let line = OutboundLine::Error { id, code: e.code().to_string(), message: e.to_string() };
                if out.send(line).is_err() {
                    tracing::debug!("output closed before error was written");
                }
            }
        }

        while let Some(joined) = tasks.try_join_next() {
            if let Err(e) = joined {
                tracing::error!("event task failed: {e}");
            }
        }
    }

    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            tracing::error!("event task failed: {e}");
        }
    }

    tracing::info!(accepted, "input closed");
    Ok(accepted)
}

/// Write outbound lines until every sender is gone.
pub async fn write_lines<W>(mut lines: mpsc::UnboundedReceiver<OutboundLine>, output: &mut W) -> io::Result<usize>
where
    W: AsyncWrite + Unpin,
{
    let mut written = 0;
    while let Some(line) = lines.recv().await {
        let mut buf = serde_json::to_vec(&line).map_err(io::Error::other)?;
        buf.push(b'\n');
        output.write_all(&buf).await?;
        output.flush().await?;
        written += 1;
    }
    Ok(written)
}
