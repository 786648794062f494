//! Single entry point hiding which link is active.
//!
//! The router owns at most one active link. Each connect call builds a fresh
//! link, releases the previous link's callback subscription, attaches to the
//! new one, and closes the superseded link. The application only sees one
//! message callback, one status callback and a status watch channel.
//!
//! # Example
//!
//! ```no_run
//! use scoreboard_link::{Message, TransportRouter};
//!
//! # async fn example() -> scoreboard_link::Result<()> {
//! let router = TransportRouter::builder().build()?;
//! router.on_message(|msg| println!("<= {:?}", msg.type_name()));
//! router.on_status(|status| println!("{}", status.label()));
//!
//! router.connect_networked("192.168.4.1").await?;
//! router.send(&Message::state(serde_json::json!({ "a": 1 }))).await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use reqwest::Client;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::config::TransportConfig;
use crate::error::{Error, Result};
use crate::protocol::{ConnectionStatus, Message, TransportKind};

use super::callbacks::{MessageHandler, StatusHandler, Subscription};
use super::http::HttpLink;
use super::link::Link;
use super::wireless::{FramedLink, WirelessAdapter};

// ============================================================================
// Types
// ============================================================================

/// The active link and the subscription relaying its callbacks.
struct ActiveLink {
    link: Arc<dyn Link>,
    subscription: Subscription,
}

/// Shared router state, referenced weakly by link callbacks.
struct RouterInner {
    config: Arc<TransportConfig>,
    wireless: Option<Arc<dyn WirelessAdapter>>,
    client: Client,
    active: Mutex<Option<ActiveLink>>,
    on_message: RwLock<Option<MessageHandler>>,
    on_status: RwLock<Option<StatusHandler>>,
    status_tx: watch::Sender<ConnectionStatus>,
}

impl RouterInner {
    fn relay_message(&self, message: Message) {
        let handler = self.on_message.read().clone();
        if let Some(handler) = handler {
            handler(message);
        }
    }

    fn relay_status(&self, status: ConnectionStatus) {
        self.status_tx.send_replace(status.clone());
        let handler = self.on_status.read().clone();
        if let Some(handler) = handler {
            handler(status);
        }
    }
}

// ============================================================================
// TransportRouter
// ============================================================================

/// Routes application traffic through exactly one active link.
///
/// Cheap to clone; clones share the same active link.
#[derive(Clone)]
pub struct TransportRouter {
    inner: Arc<RouterInner>,
}

impl fmt::Debug for TransportRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportRouter")
            .field("wireless_supported", &self.inner.wireless.is_some())
            .field("active", &self.active_transport())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// TransportRouter - Constructor
// ============================================================================

impl TransportRouter {
    /// Creates a builder.
    #[inline]
    #[must_use]
    pub fn builder() -> TransportRouterBuilder {
        TransportRouterBuilder::new()
    }
}

// ============================================================================
// TransportRouter - Callbacks
// ============================================================================

impl TransportRouter {
    /// Sets the message callback, replacing any earlier one.
    pub fn on_message(&self, handler: impl Fn(Message) + Send + Sync + 'static) {
        *self.inner.on_message.write() = Some(Arc::new(handler));
    }

    /// Sets the status callback, replacing any earlier one.
    pub fn on_status(&self, handler: impl Fn(ConnectionStatus) + Send + Sync + 'static) {
        *self.inner.on_status.write() = Some(Arc::new(handler));
    }

    /// Subscribes to status snapshots. The receiver starts at the latest one.
    #[must_use]
    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.inner.status_tx.subscribe()
    }
}

// ============================================================================
// TransportRouter - Connect
// ============================================================================

impl TransportRouter {
    /// Makes a new wireless link active, connects it and sends `hello`.
    ///
    /// # Errors
    ///
    /// - [`Error::Precondition`] if the host has no wireless support; the
    ///   current link stays active
    /// - any error of [`FramedLink::connect`] or of the handshake send
    pub async fn connect_wireless(&self) -> Result<()> {
        if self.inner.wireless.is_none() {
            return Err(Error::precondition(
                "wireless pairing is not supported on this platform",
            ));
        }

        let link = Arc::new(FramedLink::new(
            self.inner.wireless.clone(),
            Arc::clone(&self.inner.config),
        ));
        self.activate(Arc::clone(&link) as Arc<dyn Link>).await;

        link.connect().await?;
        self.handshake(link.as_ref()).await
    }

    /// Makes a new networked link active, connects it to `address` and
    /// sends `hello`.
    ///
    /// # Errors
    ///
    /// Any error of [`HttpLink::connect`] or of the handshake send.
    pub async fn connect_networked(&self, address: &str) -> Result<()> {
        let link = Arc::new(HttpLink::new(
            self.inner.client.clone(),
            Arc::clone(&self.inner.config),
        ));
        self.activate(Arc::clone(&link) as Arc<dyn Link>).await;

        link.connect(address).await?;
        self.handshake(link.as_ref()).await
    }

    /// Releases the old subscription and attaches to `link` under one lock,
    /// then closes the superseded link.
    async fn activate(&self, link: Arc<dyn Link>) {
        let transport = link.transport();

        let superseded = {
            let mut active = self.inner.active.lock();
            let previous = active.take().map(|ActiveLink { link, subscription }| {
                subscription.release();
                link
            });
            let subscription = Self::wire(&self.inner, &link);
            *active = Some(ActiveLink { link, subscription });
            previous
        };

        if let Some(previous) = superseded {
            debug!(from = %previous.transport(), to = %transport, "Active link superseded");
            previous.close().await;
        }
    }

    /// Attaches relaying handlers to `link`.
    fn wire(inner: &Arc<RouterInner>, link: &Arc<dyn Link>) -> Subscription {
        let for_messages: Weak<RouterInner> = Arc::downgrade(inner);
        let for_status = Weak::clone(&for_messages);

        link.callbacks().attach(
            Arc::new(move |message| {
                if let Some(inner) = for_messages.upgrade() {
                    inner.relay_message(message);
                }
            }),
            Arc::new(move |status| {
                if let Some(inner) = for_status.upgrade() {
                    inner.relay_status(status);
                }
            }),
        )
    }

    async fn handshake(&self, link: &dyn Link) -> Result<()> {
        link.send(&Message::hello(self.inner.config.originator.as_str()))
            .await?;
        info!(transport = %link.transport(), "Session established");
        Ok(())
    }
}

// ============================================================================
// TransportRouter - Traffic
// ============================================================================

impl TransportRouter {
    /// Sends through the active link.
    ///
    /// # Errors
    ///
    /// - [`Error::NoActiveTransport`] if nothing was connected yet
    /// - any error of the active link's send
    pub async fn send(&self, message: &Message) -> Result<()> {
        let link = self
            .inner
            .active
            .lock()
            .as_ref()
            .map(|active| Arc::clone(&active.link))
            .ok_or(Error::NoActiveTransport)?;

        link.send(message).await
    }

    /// Returns `idle` when no link is active, else the active link's status.
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        match self.inner.active.lock().as_ref() {
            Some(active) => active.link.status(),
            None => ConnectionStatus::idle(),
        }
    }

    /// Returns which link is active.
    #[must_use]
    pub fn active_transport(&self) -> Option<TransportKind> {
        self.inner
            .active
            .lock()
            .as_ref()
            .map(|active| active.link.transport())
    }

    /// Closes the active link and returns to `idle`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoActiveTransport`] if nothing is active.
    pub async fn disconnect(&self) -> Result<()> {
        let previous = self
            .inner
            .active
            .lock()
            .take()
            .ok_or(Error::NoActiveTransport)?;

        let ActiveLink { link, subscription } = previous;
        subscription.release();
        link.close().await;

        info!(transport = %link.transport(), "Session closed");
        self.inner.relay_status(ConnectionStatus::idle());
        Ok(())
    }
}

// ============================================================================
// TransportRouterBuilder
// ============================================================================

/// Builder for [`TransportRouter`].
#[derive(Default)]
pub struct TransportRouterBuilder {
    config: TransportConfig,
    wireless: Option<Arc<dyn WirelessAdapter>>,
    client: Option<Client>,
}

impl fmt::Debug for TransportRouterBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportRouterBuilder")
            .field("config", &self.config)
            .field("wireless", &self.wireless.is_some())
            .field("client", &self.client.is_some())
            .finish()
    }
}

impl TransportRouterBuilder {
    /// Creates a builder with default configuration and no wireless support.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the configuration.
    #[inline]
    #[must_use]
    pub fn config(mut self, config: TransportConfig) -> Self {
        self.config = config;
        self
    }

    /// Enables the wireless link through a platform adapter.
    #[inline]
    #[must_use]
    pub fn wireless(mut self, adapter: Arc<dyn WirelessAdapter>) -> Self {
        self.wireless = Some(adapter);
        self
    }

    /// Uses a pre-built HTTP client.
    #[inline]
    #[must_use]
    pub fn http_client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Builds the router.
    ///
    /// # Errors
    ///
    /// - [`Error::Precondition`] if the configuration is invalid
    /// - [`Error::Request`] if the default HTTP client cannot be built
    pub fn build(self) -> Result<TransportRouter> {
        self.config.validate()?;

        let client = match self.client {
            Some(client) => client,
            None => Client::builder().build()?,
        };

        let (status_tx, _) = watch::channel(ConnectionStatus::idle());

        Ok(TransportRouter {
            inner: Arc::new(RouterInner {
                config: Arc::new(self.config),
                wireless: self.wireless,
                client,
                active: Mutex::new(None),
                on_message: RwLock::new(None),
                on_status: RwLock::new(None),
                status_tx,
            }),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
