use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use citeview_core::contracts::ChatRequest;
use citeview_core::events::StreamEvent;
use eventsource_stream::Eventsource;
use futures::Stream;
use futures::StreamExt;
use reqwest::header::ACCEPT;
use snafu::ResultExt;
use tokio::sync::mpsc;
use tokio::sync::oneshot;
use url::Url;

use crate::error::HttpSnafu;
use crate::error::InvalidBaseUrlSnafu;
use crate::error::StreamError;
use crate::error::StreamResult;

pub const CHAT_STREAM_PATH: &str = "api/chat/stream";

pub type StreamWorker = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// What a running stream reports to its consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamSignal {
    Event(StreamEvent),
    /// The transport ended without a terminal event.
    Closed,
    Failed(String),
}

/// Receiving half of a stream. Dropping it cancels the worker.
pub struct EventStream {
    stream_id: u64,
    signals: mpsc::UnboundedReceiver<StreamSignal>,
    cancel_tx: Option<oneshot::Sender<()>>,
}

pub struct StreamHandle {
    pub stream: EventStream,
    /// Drives the transport; the caller decides where it runs.
    pub worker: StreamWorker,
}

impl EventStream {
    pub fn stream_id(&self) -> u64 {
        self.stream_id
    }

    pub async fn recv(&mut self) -> Option<StreamSignal> {
        self.signals.recv().await
    }

    pub fn try_recv(&mut self) -> Option<StreamSignal> {
        self.signals.try_recv().ok()
    }

    pub fn cancel(&mut self) -> bool {
        self.cancel_tx
            .take()
            .map(|tx| tx.send(()).is_ok())
            .unwrap_or(false)
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        if let Some(cancel_tx) = self.cancel_tx.take() {
            let _ = cancel_tx.send(());
        }
    }
}

pub trait EventSource: Send + Sync {
    fn name(&self) -> &str;
    fn open(&self, stream_id: u64, request: ChatRequest) -> StreamResult<StreamHandle>;
}

pub(crate) fn make_event_stream(
    stream_id: u64,
) -> (
    mpsc::UnboundedSender<StreamSignal>,
    EventStream,
    oneshot::Receiver<()>,
) {
    let (signal_tx, signal_rx) = mpsc::unbounded_channel();
    let (cancel_tx, cancel_rx) = oneshot::channel();
    (
        signal_tx,
        EventStream {
            stream_id,
            signals: signal_rx,
            cancel_tx: Some(cancel_tx),
        },
        cancel_rx,
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// Sends one decoded frame. Stops after a terminal event or once the
/// consumer has gone away.
fn forward(stream_id: u64, signal_tx: &mpsc::UnboundedSender<StreamSignal>, data: &str) -> Flow {
    let Some(event) = StreamEvent::decode(data) else {
        tracing::debug!(stream_id, data, "dropping undecodable stream frame");
        return Flow::Continue;
    };
    let terminal = event.is_terminal();
    if signal_tx.send(StreamSignal::Event(event)).is_err() || terminal {
        return Flow::Stop;
    }
    Flow::Continue
}

/// Forwards the `data` of every event in an SSE body until a terminal event,
/// the consumer going away, or the end of the body. Any of the three line
/// endings the format allows may separate fields.
pub(crate) async fn forward_sse<S, B, E>(
    stream_id: u64,
    body: S,
    signal_tx: &mpsc::UnboundedSender<StreamSignal>,
) where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    let mut frames = std::pin::pin!(body.eventsource());
    while let Some(frame) = frames.next().await {
        match frame {
            Ok(frame) => {
                if forward(stream_id, signal_tx, &frame.data) == Flow::Stop {
                    return;
                }
            }
            Err(err) => {
                let error = StreamError::EventStream {
                    stage: "read-event-stream",
                    message: err.to_string(),
                };
                tracing::warn!(stream_id, error = %error, "chat stream interrupted");
                let _ = signal_tx.send(StreamSignal::Failed(error.to_string()));
                return;
            }
        }
    }
    tracing::debug!(stream_id, "chat stream ended without terminal event");
    let _ = signal_tx.send(StreamSignal::Closed);
}

/// Streams chat answers from the backend's SSE endpoint.
#[derive(Debug, Clone)]
pub struct HttpEventSource {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpEventSource {
    pub fn new(base_url: &str) -> StreamResult<Self> {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> StreamResult<Self> {
        let endpoint = crate::documents::base_url(base_url)?
            .join(CHAT_STREAM_PATH)
            .context(InvalidBaseUrlSnafu {
                stage: "join-chat-endpoint",
                url: base_url.to_string(),
            })?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn run_worker(
        client: reqwest::Client,
        endpoint: Url,
        stream_id: u64,
        request: ChatRequest,
        signal_tx: mpsc::UnboundedSender<StreamSignal>,
        mut cancel_rx: oneshot::Receiver<()>,
    ) {
        let send = client
            .post(endpoint.clone())
            .header(ACCEPT, "text/event-stream")
            .json(&request)
            .send();
        let response = tokio::select! {
            _ = &mut cancel_rx => {
                tracing::debug!(stream_id, "chat stream cancelled before response");
                return;
            }
            response = send => response,
        };
        let response = match Self::check_response(response).await {
            Ok(response) => response,
            Err(error) => {
                tracing::warn!(stream_id, endpoint = %endpoint, error = %error, "failed to open chat stream");
                let _ = signal_tx.send(StreamSignal::Failed(error.to_string()));
                return;
            }
        };

        tokio::select! {
            _ = &mut cancel_rx => {
                tracing::debug!(stream_id, "chat stream cancelled");
            }
            _ = forward_sse(stream_id, response.bytes_stream(), &signal_tx) => {}
        }
    }

    async fn check_response(
        response: Result<reqwest::Response, reqwest::Error>,
    ) -> StreamResult<reqwest::Response> {
        let response = response.context(HttpSnafu {
            stage: "send-chat-request",
        })?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(StreamError::Status {
            stage: "chat-response-status",
            status: status.as_u16(),
            body,
        })
    }
}

impl EventSource for HttpEventSource {
    fn name(&self) -> &str {
        "http"
    }

    fn open(&self, stream_id: u64, request: ChatRequest) -> StreamResult<StreamHandle> {
        tracing::info!(stream_id, endpoint = %self.endpoint, "opening chat stream");
        let (signal_tx, stream, cancel_rx) = make_event_stream(stream_id);
        let worker: StreamWorker = Box::pin(Self::run_worker(
            self.client.clone(),
            self.endpoint.clone(),
            stream_id,
            request,
            signal_tx,
            cancel_rx,
        ));
        Ok(StreamHandle { stream, worker })
    }
}

/// One step of a pre-planned answer.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptedEvent {
    pub event: StreamEvent,
    pub delay_after: Duration,
}

impl ScriptedEvent {
    pub fn new(event: StreamEvent, delay_after: Duration) -> Self {
        Self { event, delay_after }
    }
}

pub type ScriptPlanner = Arc<dyn Fn(&ChatRequest) -> Vec<ScriptedEvent> + Send + Sync>;

/// Replays a planned event sequence with its pauses, in process.
#[derive(Clone)]
pub struct ScriptedEventSource {
    planner: ScriptPlanner,
}

impl ScriptedEventSource {
    pub fn new(planner: impl Fn(&ChatRequest) -> Vec<ScriptedEvent> + Send + Sync + 'static) -> Self {
        Self {
            planner: Arc::new(planner),
        }
    }

    async fn run_worker(
        stream_id: u64,
        script: Vec<ScriptedEvent>,
        signal_tx: mpsc::UnboundedSender<StreamSignal>,
        mut cancel_rx: oneshot::Receiver<()>,
    ) {
        for ScriptedEvent { event, delay_after } in script {
            if !matches!(cancel_rx.try_recv(), Err(oneshot::error::TryRecvError::Empty)) {
                tracing::debug!(stream_id, "scripted stream cancelled");
                return;
            }
            let terminal = event.is_terminal();
            if signal_tx.send(StreamSignal::Event(event)).is_err() || terminal {
                return;
            }
            if delay_after.is_zero() {
                continue;
            }
            tokio::select! {
                biased;
                _ = &mut cancel_rx => {
                    tracing::debug!(stream_id, "scripted stream cancelled");
                    return;
                }
                _ = tokio::time::sleep(delay_after) => {}
            }
        }
        let _ = signal_tx.send(StreamSignal::Closed);
    }
}

impl EventSource for ScriptedEventSource {
    fn name(&self) -> &str {
        "scripted"
    }

    fn open(&self, stream_id: u64, request: ChatRequest) -> StreamResult<StreamHandle> {
        let script = (self.planner)(&request);
        tracing::debug!(stream_id, steps = script.len(), "replaying scripted answer");
        let (signal_tx, stream, cancel_rx) = make_event_stream(stream_id);
        let worker: StreamWorker = Box::pin(Self::run_worker(stream_id, script, signal_tx, cancel_rx));
        Ok(StreamHandle { stream, worker })
    }
}
