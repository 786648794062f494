//! Networked link: JSON commands over HTTP plus a push-or-poll feed.
//!
//! # Endpoints
//!
//! | Path | Method | Purpose |
//! |------|--------|---------|
//! | [`PING_PATH`] | GET | Liveness probe on connect |
//! | [`COMMAND_PATH`] | POST | Send one message |
//! | [`EVENTS_PATH`] | GET (event stream) | Server-initiated messages |
//! | [`STATE_PATH`] | GET | Polled snapshot |
//!
//! # Subscription
//!
//! After a successful probe the link opens the push stream. When the stream
//! fails to open, errors, or ends, the link switches to polling the state
//! endpoint every [`TransportConfig::poll_interval`]. The switch is one-way
//! for the lifetime of the connection, and only one of the two runs at a
//! time. Poll failures are swallowed; the next tick retries.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use parking_lot::{Mutex, RwLock};
use regex::Regex;
use reqwest::header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE, PRAGMA};
use reqwest::{Client, RequestBuilder, Response};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::config::TransportConfig;
use crate::error::{Error, Result};
use crate::protocol::{ConnectionStatus, Message, StatusKind, TransportKind};

use super::callbacks::LinkCallbacks;
use super::link::Link;
use super::sse::SseParser;

// ============================================================================
// Constants
// ============================================================================

/// Liveness probe.
pub const PING_PATH: &str = "/api/v1/ping";

/// Command endpoint.
pub const COMMAND_PATH: &str = "/api/v1/scoreboard";

/// Push stream.
pub const EVENTS_PATH: &str = "/api/v1/events";

/// Polled snapshot.
pub const STATE_PATH: &str = "/api/v1/state";

static SCHEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^https?://").expect("scheme pattern is valid"));

// ============================================================================
// Address Normalization
// ============================================================================

/// Normalizes a caller-supplied base address.
///
/// Prefixes `default_scheme` when the address has no `http(s)://` scheme and
/// strips trailing slashes.
///
/// # Errors
///
/// Returns [`Error::InvalidAddress`] if the result is not a URL with a host.
pub fn normalize_base_url(address: &str, default_scheme: &str) -> Result<String> {
    let trimmed = address.trim();
    if trimmed.is_empty() {
        return Err(Error::invalid_address(address, "address is empty"));
    }

    let with_scheme = if SCHEME.is_match(trimmed) {
        trimmed.to_string()
    } else {
        format!("{default_scheme}://{trimmed}")
    };
    let normalized = with_scheme.trim_end_matches('/').to_string();

    let url =
        Url::parse(&normalized).map_err(|e| Error::invalid_address(address, e.to_string()))?;
    if url.host_str().is_none_or(str::is_empty) {
        return Err(Error::invalid_address(address, "address has no host"));
    }

    Ok(normalized)
}

/// Adds the headers that keep intermediaries from caching.
fn no_cache(request: RequestBuilder) -> RequestBuilder {
    request
        .header(CACHE_CONTROL, "no-cache")
        .header(PRAGMA, "no-cache")
}

// ============================================================================
// SubscriptionMode
// ============================================================================

/// Which feed currently delivers server-initiated messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionMode {
    /// Not connected.
    Inactive,
    /// Opening the push stream.
    Opening,
    /// Push stream open.
    Push,
    /// Polling the state endpoint.
    Polling,
}

// ============================================================================
// HttpLink
// ============================================================================

/// Networked link to the controller.
pub struct HttpLink {
    client: Client,
    config: Arc<TransportConfig>,
    /// Normalized base address; `Some` means connected.
    base_url: RwLock<Option<String>>,
    callbacks: Arc<LinkCallbacks>,
    /// Serializes sends.
    send_lock: tokio::sync::Mutex<()>,
    mode: Arc<RwLock<SubscriptionMode>>,
    subscription: Mutex<Option<JoinHandle<()>>>,
}

impl fmt::Debug for HttpLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpLink")
            .field("base_url", &*self.base_url.read())
            .field("mode", &*self.mode.read())
            .finish_non_exhaustive()
    }
}

impl HttpLink {
    /// Creates a disconnected link using `client` for every request.
    #[must_use]
    pub fn new(client: Client, config: Arc<TransportConfig>) -> Self {
        Self {
            client,
            config,
            base_url: RwLock::new(None),
            callbacks: LinkCallbacks::new(),
            send_lock: tokio::sync::Mutex::new(()),
            mode: Arc::new(RwLock::new(SubscriptionMode::Inactive)),
            subscription: Mutex::new(None),
        }
    }

    /// Returns the normalized base address, if connected.
    #[must_use]
    pub fn base_url(&self) -> Option<String> {
        self.base_url.read().clone()
    }

    /// Returns the current subscription mode.
    #[must_use]
    pub fn subscription_mode(&self) -> SubscriptionMode {
        *self.mode.read()
    }
}

// ============================================================================
// HttpLink - Connect
// ============================================================================

impl HttpLink {
    /// Connects to the controller at `address`.
    ///
    /// Emits `connecting`, probes [`PING_PATH`] once, then starts the
    /// subscription and emits `connected`. No retry.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidAddress`] if the address cannot be normalized
    /// - [`Error::ProbeFailed`] if the probe errors or returns non-2xx
    /// - [`Error::TimedOut`] if the probe exceeds the connect deadline
    pub async fn connect(&self, address: &str) -> Result<()> {
        let base = normalize_base_url(address, &self.config.default_scheme)?;

        self.stop_subscription();
        *self.base_url.write() = Some(base.clone());
        self.callbacks.emit_status(ConnectionStatus::networked(
            StatusKind::Connecting,
            Some(base.clone()),
        ));

        if let Err(e) = self.probe(&base).await {
            *self.base_url.write() = None;
            self.callbacks.emit_status(ConnectionStatus::networked(
                StatusKind::Disconnected,
                Some(base),
            ));
            return Err(e);
        }

        self.start_subscription(base.clone());
        info!(base_url = %base, "Networked link connected");

        self.callbacks.emit_status(ConnectionStatus::networked(
            StatusKind::Connected,
            Some(base),
        ));

        Ok(())
    }

    /// GETs the ping endpoint.
    async fn probe(&self, base: &str) -> Result<()> {
        let url = format!("{base}{PING_PATH}");
        debug!(url = %url, "Probing controller");

        let request = no_cache(self.client.get(&url)).send();
        let response = timeout(self.config.connect_timeout, request)
            .await
            .map_err(|_| Error::timed_out("probe", self.config.connect_timeout_ms()))?
            .map_err(|e| Error::probe_failed(&url, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::probe_failed(&url, format!("HTTP {}", status.as_u16())));
        }

        Ok(())
    }

    fn start_subscription(&self, base: String) {
        let subscriber = Subscriber {
            client: self.client.clone(),
            base,
            callbacks: Arc::clone(&self.callbacks),
            mode: Arc::clone(&self.mode),
            poll_interval: self.config.poll_interval,
            request_timeout: self.config.send_timeout,
        };

        *self.mode.write() = SubscriptionMode::Opening;
        let handle = tokio::spawn(subscriber.run());
        if let Some(previous) = self.subscription.lock().replace(handle) {
            previous.abort();
        }
    }

    fn stop_subscription(&self) {
        if let Some(handle) = self.subscription.lock().take() {
            handle.abort();
            debug!("Subscription stopped");
        }
        *self.mode.write() = SubscriptionMode::Inactive;
    }
}

// ============================================================================
// HttpLink - Link
// ============================================================================

#[async_trait]
impl Link for HttpLink {
    fn transport(&self) -> TransportKind {
        TransportKind::Networked
    }

    fn callbacks(&self) -> &Arc<LinkCallbacks> {
        &self.callbacks
    }

    async fn send(&self, message: &Message) -> Result<()> {
        let base = self
            .base_url
            .read()
            .clone()
            .ok_or(Error::not_connected(TransportKind::Networked))?;
        let body = message.encode()?;

        let _guard = self.send_lock.lock().await;
        let url = format!("{base}{COMMAND_PATH}");
        debug!(url = %url, bytes = body.len(), "Networked send");

        let request = no_cache(self.client.post(&url))
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send();
        let response = timeout(self.config.send_timeout, request)
            .await
            .map_err(|_| Error::timed_out("networked send", self.config.send_timeout_ms()))??;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::http(status.as_u16()));
        }

        Ok(())
    }

    fn status(&self) -> ConnectionStatus {
        match self.base_url.read().clone() {
            Some(base) => ConnectionStatus::networked(StatusKind::Connected, Some(base)),
            None => ConnectionStatus::networked(StatusKind::Disconnected, None),
        }
    }

    async fn close(&self) {
        self.stop_subscription();
        *self.base_url.write() = None;
    }
}

impl Drop for HttpLink {
    fn drop(&mut self) {
        if let Some(handle) = self.subscription.get_mut().take() {
            handle.abort();
        }
    }
}

// ============================================================================
// Subscriber
// ============================================================================

/// Background task feeding server-initiated messages to the callbacks.
struct Subscriber {
    client: Client,
    base: String,
    callbacks: Arc<LinkCallbacks>,
    mode: Arc<RwLock<SubscriptionMode>>,
    poll_interval: Duration,
    request_timeout: Duration,
}

impl Subscriber {
    /// Push first; once push is gone, poll until aborted.
    async fn run(self) {
        match self.open_push().await {
            Ok(response) => {
                self.set_mode(SubscriptionMode::Push);
                info!(base_url = %self.base, "Push stream open");
                self.pump_push(response).await;
            }
            Err(e) => debug!(error = %e, "Push stream unavailable"),
        }

        warn!(
            base_url = %self.base,
            interval_ms = ?self.poll_interval.as_millis(),
            "Falling back to polling"
        );
        self.set_mode(SubscriptionMode::Polling);
        self.poll_forever().await;
    }

    fn set_mode(&self, mode: SubscriptionMode) {
        *self.mode.write() = mode;
    }

    async fn open_push(&self) -> Result<Response> {
        let request = no_cache(self.client.get(format!("{}{EVENTS_PATH}", self.base)))
            .header(ACCEPT, "text/event-stream")
            .send();
        let response = timeout(self.request_timeout, request)
            .await
            .map_err(|_| Error::timed_out("open push stream", millis(self.request_timeout)))??;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::http(status.as_u16()));
        }

        Ok(response)
    }

    /// Delivers every event regardless of its `event:` name. Returns when
    /// the stream errors or ends.
    async fn pump_push(&self, response: Response) {
        let mut parser = SseParser::new();
        let mut body = response.bytes_stream();

        while let Some(chunk) = body.next().await {
            match chunk {
                Ok(bytes) => {
                    for event in parser.feed(&bytes) {
                        trace!(event = %event.event, len = event.data.len(), "Push event");
                        self.callbacks.emit_message(Message::from_text(&event.data));
                    }
                }
                Err(e) => {
                    debug!(error = %e, "Push stream error");
                    return;
                }
            }
        }

        debug!("Push stream ended");
    }

    async fn poll_forever(&self) {
        loop {
            if let Err(e) = self.poll_once().await {
                trace!(error = %e, "Poll failed");
            }
            sleep(self.poll_interval).await;
        }
    }

    async fn poll_once(&self) -> Result<()> {
        let request = no_cache(self.client.get(format!("{}{STATE_PATH}", self.base))).send();
        let response = timeout(self.request_timeout, request)
            .await
            .map_err(|_| Error::timed_out("poll", millis(self.request_timeout)))??;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::http(status.as_u16()));
        }

        let message: Message = response.json().await?;
        trace!(kind = ?message.type_name(), "Polled snapshot");
        self.callbacks.emit_message(message);
        Ok(())
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

// ============================================================================
// Tests
// ============================================================================
