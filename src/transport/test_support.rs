//! In-process fakes for link tests: a scripted wireless device and an HTTP
//! controller served by axum on a random local port.

// ============================================================================
// Imports
// ============================================================================

use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use futures_util::stream::{self, Stream, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::protocol::{ConnectionStatus, Message};

use super::callbacks::{LinkCallbacks, Subscription};
use super::wireless::{DisconnectHandler, NotificationStream, WirelessAdapter, WirelessDevice};

// ============================================================================
// Recorder
// ============================================================================

/// Captures everything a link emits.
pub(crate) struct Recorder {
    messages: Arc<Mutex<Vec<Message>>>,
    statuses: Arc<Mutex<Vec<ConnectionStatus>>>,
    _subscription: Subscription,
}

impl Recorder {
    pub(crate) fn attach(callbacks: &Arc<LinkCallbacks>) -> Self {
        let messages = Arc::new(Mutex::new(Vec::new()));
        let statuses = Arc::new(Mutex::new(Vec::new()));
        let m = Arc::clone(&messages);
        let s = Arc::clone(&statuses);

        let subscription = callbacks.attach(
            Arc::new(move |msg| m.lock().push(msg)),
            Arc::new(move |status| s.lock().push(status)),
        );

        Self {
            messages,
            statuses,
            _subscription: subscription,
        }
    }

    pub(crate) fn messages(&self) -> Vec<Message> {
        self.messages.lock().clone()
    }

    pub(crate) fn statuses(&self) -> Vec<ConnectionStatus> {
        self.statuses.lock().clone()
    }

    pub(crate) async fn wait_for_messages(&self, count: usize) -> Vec<Message> {
        wait_until(|| self.messages.lock().len() >= count).await;
        self.messages()
    }
}

/// Polls `condition` every 5ms for up to 3s.
pub(crate) async fn wait_until(condition: impl Fn() -> bool) {
    for _ in 0..600 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

// ============================================================================
// FakeAdapter / FakeDevice
// ============================================================================

pub(crate) struct FakeAdapter {
    device: Arc<FakeDevice>,
}

impl FakeAdapter {
    pub(crate) fn new(device: Arc<FakeDevice>) -> Self {
        Self { device }
    }
}

#[async_trait]
impl WirelessAdapter for FakeAdapter {
    async fn request_device(&self, service: Uuid) -> Result<Arc<dyn WirelessDevice>> {
        assert_eq!(service, super::wireless::SERVICE_UUID);
        Ok(Arc::clone(&self.device) as Arc<dyn WirelessDevice>)
    }
}

#[derive(Default)]
pub(crate) struct FakeDevice {
    name: Option<String>,
    connected: AtomicBool,
    fail_notifications: AtomicBool,
    write_delay: Mutex<Option<Duration>>,
    notify_delay: Mutex<Option<Duration>>,
    writes: Mutex<Vec<Vec<u8>>>,
    notify_tx: Mutex<Option<mpsc::UnboundedSender<Vec<u8>>>>,
    on_disconnect: Mutex<Option<DisconnectHandler>>,
}

impl FakeDevice {
    pub(crate) fn named(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: Some(name.to_string()),
            ..Self::default()
        })
    }

    pub(crate) fn unnamed() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn with_write_delay(self: Arc<Self>, delay: Duration) -> Arc<Self> {
        *self.write_delay.lock() = Some(delay);
        self
    }

    pub(crate) fn with_notify_delay(self: Arc<Self>, delay: Duration) -> Arc<Self> {
        *self.notify_delay.lock() = Some(delay);
        self
    }

    pub(crate) fn failing_notifications(self: Arc<Self>) -> Arc<Self> {
        self.fail_notifications.store(true, Ordering::SeqCst);
        self
    }

    pub(crate) fn writes(&self) -> Vec<Vec<u8>> {
        self.writes.lock().clone()
    }

    pub(crate) fn notify(&self, payload: &[u8]) {
        if let Some(tx) = self.notify_tx.lock().as_ref() {
            let _ = tx.send(payload.to_vec());
        }
    }

    /// Simulates the radio dropping the link.
    pub(crate) fn drop_link(&self) {
        self.connected.store(false, Ordering::SeqCst);
        let handler = self.on_disconnect.lock().take();
        if let Some(handler) = handler {
            handler();
        }
    }
}

#[async_trait]
impl WirelessDevice for FakeDevice {
    fn name(&self) -> Option<String> {
        self.name.clone()
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn on_disconnect(&self, handler: DisconnectHandler) {
        *self.on_disconnect.lock() = Some(handler);
    }

    async fn connect(&self) -> Result<()> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn start_notifications(
        &self,
        _service: Uuid,
        _characteristic: Uuid,
    ) -> Result<NotificationStream> {
        let delay = *self.notify_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_notifications.load(Ordering::SeqCst) {
            return Err(Error::wireless("notify characteristic missing"));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        *self.notify_tx.lock() = Some(tx);
        Ok(rx)
    }

    async fn write_without_response(
        &self,
        _service: Uuid,
        _characteristic: Uuid,
        chunk: &[u8],
    ) -> Result<()> {
        let delay = *self.write_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.writes.lock().push(chunk.to_vec());
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// MockController
// ============================================================================

/// Behaviour of the push endpoint.
#[derive(Debug, Clone)]
pub(crate) enum PushMode {
    /// Respond with 500.
    Fail,
    /// Send these event payloads, then close the stream.
    SendThenClose(Vec<String>),
    /// Send these event payloads, then keep the stream open.
    SendThenHold(Vec<String>),
}

pub(crate) struct ControllerState {
    pub(crate) ping_status: AtomicU16,
    pub(crate) command_status: AtomicU16,
    pub(crate) state_status: AtomicU16,
    pub(crate) push: Mutex<PushMode>,
    pub(crate) snapshot: Mutex<Value>,
    pub(crate) ping_hits: AtomicUsize,
    pub(crate) events_hits: AtomicUsize,
    pub(crate) state_hits: AtomicUsize,
    pub(crate) commands: Mutex<Vec<Value>>,
    pub(crate) no_cache_seen: AtomicBool,
}

/// HTTP controller serving the scoreboard API on `127.0.0.1:<random>`.
pub(crate) struct MockController {
    pub(crate) state: Arc<ControllerState>,
    pub(crate) base_url: String,
    pub(crate) authority: String,
}

impl MockController {
    pub(crate) async fn start(push: PushMode) -> Self {
        let state = Arc::new(ControllerState {
            ping_status: AtomicU16::new(200),
            command_status: AtomicU16::new(200),
            state_status: AtomicU16::new(200),
            push: Mutex::new(push),
            snapshot: Mutex::new(json!({ "type": "state", "data": { "a": 0, "b": 0 } })),
            ping_hits: AtomicUsize::new(0),
            events_hits: AtomicUsize::new(0),
            state_hits: AtomicUsize::new(0),
            commands: Mutex::new(Vec::new()),
            no_cache_seen: AtomicBool::new(false),
        });

        let app = Router::new()
            .route("/api/v1/ping", get(ping))
            .route("/api/v1/scoreboard", post(command))
            .route("/api/v1/events", get(events))
            .route("/api/v1/state", get(snapshot))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind should succeed");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            state,
            base_url: format!("http://{addr}"),
            authority: addr.to_string(),
        }
    }

    pub(crate) fn commands(&self) -> Vec<Value> {
        self.state.commands.lock().clone()
    }
}

fn status(code: &AtomicU16) -> StatusCode {
    StatusCode::from_u16(code.load(Ordering::SeqCst)).unwrap_or(StatusCode::OK)
}

async fn ping(State(state): State<Arc<ControllerState>>) -> Response {
    state.ping_hits.fetch_add(1, Ordering::SeqCst);
    (status(&state.ping_status), "pong").into_response()
}

async fn command(
    State(state): State<Arc<ControllerState>>,
    headers: axum::http::HeaderMap,
    axum::Json(body): axum::Json<Value>,
) -> Response {
    if headers
        .get("cache-control")
        .is_some_and(|v| v.as_bytes() == b"no-cache")
    {
        state.no_cache_seen.store(true, Ordering::SeqCst);
    }
    state.commands.lock().push(body);
    let code = status(&state.command_status);
    (code, axum::Json(json!({ "type": "ack", "data": { "ok": code.is_success() } })))
        .into_response()
}

async fn snapshot(State(state): State<Arc<ControllerState>>) -> Response {
    state.state_hits.fetch_add(1, Ordering::SeqCst);
    let code = status(&state.state_status);
    if !code.is_success() {
        return code.into_response();
    }
    axum::Json(state.snapshot.lock().clone()).into_response()
}

async fn events(State(state): State<Arc<ControllerState>>) -> Response {
    state.events_hits.fetch_add(1, Ordering::SeqCst);
    let mode = state.push.lock().clone();
    match mode {
        PushMode::Fail => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        PushMode::SendThenClose(payloads) => Sse::new(event_stream(payloads)).into_response(),
        PushMode::SendThenHold(payloads) => {
            Sse::new(event_stream(payloads).chain(stream::pending())).into_response()
        }
    }
}

fn event_stream(
    payloads: Vec<String>,
) -> impl Stream<Item = std::result::Result<Event, Infallible>> {
    stream::iter(
        payloads
            .into_iter()
            .map(|data| Ok(Event::default().event("state").data(data))),
    )
}
