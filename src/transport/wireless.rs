//! Wireless link with MTU-bounded framed writes.
//!
//! The controller exposes one custom service with two characteristics:
//!
//! | Characteristic | Direction | Property |
//! |----------------|-----------|----------|
//! | [`TX_CHARACTERISTIC`] | Controller → Client | notify |
//! | [`RX_CHARACTERISTIC`] | Client → Controller | write without response |
//!
//! Outbound messages are UTF-8 JSON written in sequential chunks of at most
//! [`TransportConfig::chunk_size`] bytes, each awaited before the next.
//! Inbound messages arrive whole, one notification per message.
//!
//! The radio itself sits behind [`WirelessAdapter`] and [`WirelessDevice`],
//! implemented by the host platform.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::config::TransportConfig;
use crate::error::{Error, Result};
use crate::protocol::{ConnectionStatus, Message, StatusKind, TransportKind};

use super::callbacks::LinkCallbacks;
use super::framing::{chunk_count, chunks};
use super::link::Link;

// ============================================================================
// Constants
// ============================================================================

/// Scoreboard service advertised by the controller.
pub const SERVICE_UUID: Uuid = Uuid::from_u128(0x6e40_0001_b5a3_f393_e0a9_e50e_24dc_ca9e);

/// Notify characteristic (controller → client).
pub const TX_CHARACTERISTIC: Uuid = Uuid::from_u128(0x6e40_0003_b5a3_f393_e0a9_e50e_24dc_ca9e);

/// Write-without-response characteristic (client → controller).
pub const RX_CHARACTERISTIC: Uuid = Uuid::from_u128(0x6e40_0002_b5a3_f393_e0a9_e50e_24dc_ca9e);

/// Name reported for devices that advertise none.
pub const UNNAMED_DEVICE: &str = "BLE device";

// ============================================================================
// Platform Traits
// ============================================================================

/// Raw notification payloads in arrival order.
pub type NotificationStream = mpsc::UnboundedReceiver<Vec<u8>>;

/// Called once when the device drops asynchronously.
pub type DisconnectHandler = Box<dyn Fn() + Send + Sync>;

/// Host wireless capability: finds a device exposing a service.
#[async_trait]
pub trait WirelessAdapter: Send + Sync {
    /// Requests (or prompts the user for) a device advertising `service`.
    async fn request_device(&self, service: Uuid) -> Result<Arc<dyn WirelessDevice>>;
}

/// One remote wireless device.
#[async_trait]
pub trait WirelessDevice: Send + Sync {
    /// Advertised name.
    fn name(&self) -> Option<String>;

    /// Live connected flag.
    fn is_connected(&self) -> bool;

    /// Registers an observer for link-level disconnects.
    fn on_disconnect(&self, handler: DisconnectHandler);

    /// Opens the attribute-level connection.
    async fn connect(&self) -> Result<()>;

    /// Enables notifications on a characteristic.
    async fn start_notifications(
        &self,
        service: Uuid,
        characteristic: Uuid,
    ) -> Result<NotificationStream>;

    /// Writes one chunk without waiting for a response.
    async fn write_without_response(
        &self,
        service: Uuid,
        characteristic: Uuid,
        chunk: &[u8],
    ) -> Result<()>;

    /// Closes the connection.
    async fn disconnect(&self) -> Result<()>;
}

// ============================================================================
// FramedLink
// ============================================================================

/// Wireless link to the controller.
pub struct FramedLink {
    /// Platform capability, absent when the host has no radio support.
    adapter: Option<Arc<dyn WirelessAdapter>>,
    /// Shared settings.
    config: Arc<TransportConfig>,
    /// Device with an established write channel.
    device: RwLock<Option<Arc<dyn WirelessDevice>>>,
    /// Outward callbacks.
    callbacks: Arc<LinkCallbacks>,
    /// Serializes sends so chunk sequences never interleave.
    send_lock: tokio::sync::Mutex<()>,
    /// Notification pump.
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl fmt::Debug for FramedLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FramedLink")
            .field("supported", &self.adapter.is_some())
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// FramedLink - Constructor
// ============================================================================

impl FramedLink {
    /// Creates a link over `adapter`.
    ///
    /// `None` models a host without wireless support; connect then fails
    /// with [`Error::Precondition`].
    #[must_use]
    pub fn new(adapter: Option<Arc<dyn WirelessAdapter>>, config: Arc<TransportConfig>) -> Self {
        Self {
            adapter,
            config,
            device: RwLock::new(None),
            callbacks: LinkCallbacks::new(),
            send_lock: tokio::sync::Mutex::new(()),
            reader: Mutex::new(None),
        }
    }
}

// ============================================================================
// FramedLink - Connect
// ============================================================================

impl FramedLink {
    /// Opens a device exposing [`SERVICE_UUID`] and subscribes to its
    /// notify characteristic.
    ///
    /// Emits `connecting`, then `connected` with the device name. A later
    /// link drop emits `disconnected` through the status callback.
    ///
    /// # Errors
    ///
    /// - [`Error::Precondition`] if the host has no wireless support
    /// - [`Error::Wireless`] if the platform fails to open the device
    /// - [`Error::TimedOut`] if the connect deadline expires
    pub async fn connect(&self) -> Result<()> {
        let Some(adapter) = self.adapter.clone() else {
            return Err(Error::precondition(
                "wireless pairing is not supported on this platform",
            ));
        };

        self.callbacks
            .emit_status(ConnectionStatus::wireless(StatusKind::Connecting, None));

        let selected = Mutex::new(None);
        let opened = timeout(self.config.connect_timeout, self.open(adapter, &selected))
            .await
            .map_err(|_| Error::timed_out("wireless connect", self.config.connect_timeout_ms()))
            .and_then(|opened| opened);

        let device = match opened {
            Ok(device) => device,
            Err(e) => {
                warn!(error = %e, "Wireless connect failed");
                self.abandon(selected.into_inner()).await;
                return Err(e);
            }
        };

        let name = device.name().unwrap_or_else(|| UNNAMED_DEVICE.to_string());
        info!(device = %name, "Wireless link connected");

        self.callbacks.emit_status(ConnectionStatus::wireless(
            StatusKind::Connected,
            Some(name),
        ));

        Ok(())
    }

    /// Runs the open sequence; the write channel is installed only once
    /// every step succeeded. The chosen device is parked in `selected` so a
    /// failed or expired attempt can still be torn down.
    async fn open(
        &self,
        adapter: Arc<dyn WirelessAdapter>,
        selected: &Mutex<Option<Arc<dyn WirelessDevice>>>,
    ) -> Result<Arc<dyn WirelessDevice>> {
        let device = adapter.request_device(SERVICE_UUID).await?;
        debug!(name = ?device.name(), "Wireless device selected");
        *selected.lock() = Some(Arc::clone(&device));

        let callbacks = Arc::clone(&self.callbacks);
        let name = device.name();
        device.on_disconnect(Box::new(move || {
            warn!(device = ?name, "Wireless link dropped");
            callbacks.emit_status(ConnectionStatus::wireless(
                StatusKind::Disconnected,
                name.clone(),
            ));
        }));

        device.connect().await?;
        let notifications = device
            .start_notifications(SERVICE_UUID, TX_CHARACTERISTIC)
            .await?;

        let reader = tokio::spawn(Self::pump_notifications(
            notifications,
            Arc::clone(&self.callbacks),
        ));
        if let Some(previous) = self.reader.lock().replace(reader) {
            previous.abort();
        }

        *self.device.write() = Some(Arc::clone(&device));
        Ok(device)
    }

    /// Tears down a half-open attempt and reports `disconnected`.
    async fn abandon(&self, device: Option<Arc<dyn WirelessDevice>>) {
        if let Some(reader) = self.reader.lock().take() {
            reader.abort();
        }
        self.device.write().take();

        let name = device.as_ref().and_then(|device| device.name());
        if let Some(device) = device
            && let Err(e) = device.disconnect().await
        {
            debug!(error = %e, "Wireless disconnect failed");
        }

        self.callbacks
            .emit_status(ConnectionStatus::wireless(StatusKind::Disconnected, name));
    }

    /// Forwards each notification as one message.
    async fn pump_notifications(
        mut notifications: NotificationStream,
        callbacks: Arc<LinkCallbacks>,
    ) {
        while let Some(payload) = notifications.recv().await {
            trace!(len = payload.len(), "Wireless notification");
            callbacks.emit_message(Message::from_bytes(&payload));
        }
        debug!("Notification stream ended");
    }
}

// ============================================================================
// FramedLink - Link
// ============================================================================

#[async_trait]
impl Link for FramedLink {
    fn transport(&self) -> TransportKind {
        TransportKind::Wireless
    }

    fn callbacks(&self) -> &Arc<LinkCallbacks> {
        &self.callbacks
    }

    async fn send(&self, message: &Message) -> Result<()> {
        let device = self
            .device
            .read()
            .clone()
            .ok_or(Error::not_connected(TransportKind::Wireless))?;

        let payload = message.encode_bytes()?;
        let chunk_size = self.config.chunk_size;

        let _guard = self.send_lock.lock().await;
        debug!(
            bytes = payload.len(),
            chunks = chunk_count(payload.len(), chunk_size),
            "Wireless send"
        );

        let write_all = async {
            for (index, chunk) in chunks(&payload, chunk_size).enumerate() {
                device
                    .write_without_response(SERVICE_UUID, RX_CHARACTERISTIC, chunk)
                    .await?;
                trace!(index, len = chunk.len(), "Chunk written");
            }
            Ok::<(), Error>(())
        };

        timeout(self.config.send_timeout, write_all)
            .await
            .map_err(|_| Error::timed_out("wireless send", self.config.send_timeout_ms()))?
    }

    fn status(&self) -> ConnectionStatus {
        match self.device.read().as_ref() {
            Some(device) => {
                let kind = if device.is_connected() {
                    StatusKind::Connected
                } else {
                    StatusKind::Disconnected
                };
                ConnectionStatus::wireless(kind, device.name())
            }
            None => ConnectionStatus::wireless(StatusKind::Disconnected, None),
        }
    }

    async fn close(&self) {
        if let Some(reader) = self.reader.lock().take() {
            reader.abort();
        }

        let device = self.device.write().take();
        if let Some(device) = device
            && let Err(e) = device.disconnect().await
        {
            debug!(error = %e, "Wireless disconnect failed");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use serde_json::{Value, json};

    use crate::transport::test_support::{FakeAdapter, FakeDevice, Recorder};

    fn link_with(device: Arc<FakeDevice>) -> FramedLink {
        FramedLink::new(
            Some(Arc::new(FakeAdapter::new(device))),
            Arc::new(TransportConfig::new()),
        )
    }

    #[tokio::test]
    async fn test_connect_without_adapter_is_precondition() {
        let link = FramedLink::new(None, Arc::new(TransportConfig::new()));
        let err = link.connect().await.unwrap_err();
        assert!(matches!(err, Error::Precondition { .. }));
    }

    #[tokio::test]
    async fn test_connect_reports_device_name() {
        let device = FakeDevice::named("ESP32-Scoreboard");
        let link = link_with(Arc::clone(&device));
        let recorder = Recorder::attach(link.callbacks());

        link.connect().await.unwrap();

        let statuses = recorder.statuses();
        assert_eq!(statuses.first().unwrap().kind, StatusKind::Connecting);
        assert_eq!(
            statuses.last().unwrap(),
            &ConnectionStatus::wireless(StatusKind::Connected, Some("ESP32-Scoreboard".into()))
        );
        assert!(link.status().is_connected());
    }

    #[tokio::test]
    async fn test_unnamed_device_uses_fallback() {
        let link = link_with(FakeDevice::unnamed());
        let recorder = Recorder::attach(link.callbacks());

        link.connect().await.unwrap();

        assert_eq!(
            recorder.statuses().last().unwrap().name.as_deref(),
            Some(UNNAMED_DEVICE)
        );
    }

    #[tokio::test]
    async fn test_send_without_connect_writes_nothing() {
        let device = FakeDevice::named("dev");
        let link = link_with(Arc::clone(&device));

        let err = link.send(&Message::hello("pwa")).await.unwrap_err();

        assert!(matches!(
            err,
            Error::NotConnected {
                transport: TransportKind::Wireless
            }
        ));
        assert!(device.writes().is_empty());
    }

    #[tokio::test]
    async fn test_send_chunks_in_order() {
        let device = FakeDevice::named("dev");
        let link = link_with(Arc::clone(&device));
        link.connect().await.unwrap();

        let message = Message::state(json!({ "ta": "x".repeat(400) }));
        let encoded = message.encode_bytes().unwrap();
        link.send(&message).await.unwrap();

        let writes = device.writes();
        assert_eq!(writes.len(), encoded.len().div_ceil(180));
        assert!(writes.iter().all(|w| w.len() <= 180));
        assert_eq!(writes.concat(), encoded);
    }

    #[tokio::test]
    async fn test_concurrent_sends_do_not_interleave() {
        let device = FakeDevice::named("dev").with_write_delay(Duration::from_millis(2));
        let link = Arc::new(link_with(Arc::clone(&device)));
        link.connect().await.unwrap();

        let a = Message::state(json!({ "a": "a".repeat(500) }));
        let b = Message::state(json!({ "b": "b".repeat(500) }));
        let (ra, rb) = tokio::join!(link.send(&a), link.send(&b));
        ra.unwrap();
        rb.unwrap();

        let wire = device.writes().concat();
        let ea = a.encode_bytes().unwrap();
        let eb = b.encode_bytes().unwrap();
        let ab = [ea.clone(), eb.clone()].concat();
        let ba = [eb, ea].concat();
        assert!(wire == ab || wire == ba);
    }

    #[tokio::test]
    async fn test_send_timeout_halts_chunks() {
        let device = FakeDevice::named("dev").with_write_delay(Duration::from_millis(50));
        let config = TransportConfig::new().with_send_timeout(Duration::from_millis(75));
        let link = FramedLink::new(
            Some(Arc::new(FakeAdapter::new(Arc::clone(&device)))),
            Arc::new(config),
        );
        link.connect().await.unwrap();

        let message = Message::state(json!({ "pad": "p".repeat(1000) }));
        let err = link.send(&message).await.unwrap_err();
        assert!(err.is_timeout());

        let written = device.writes().len();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(device.writes().len(), written);
        assert!(written < message.encode_bytes().unwrap().len().div_ceil(180));
    }

    #[tokio::test]
    async fn test_inbound_notifications() {
        let device = FakeDevice::named("dev");
        let link = link_with(Arc::clone(&device));
        let recorder = Recorder::attach(link.callbacks());
        link.connect().await.unwrap();

        device.notify(br#"{"type":"ack","data":{"ok":true}}"#);
        device.notify(b"not json");

        let messages = recorder.wait_for_messages(2).await;
        assert_eq!(
            Value::from(messages[0].clone()),
            json!({ "type": "ack", "data": { "ok": true } })
        );
        assert_eq!(
            Value::from(messages[1].clone()),
            json!({ "type": "text", "data": "not json" })
        );
    }

    #[tokio::test]
    async fn test_async_drop_emits_disconnected() {
        let device = FakeDevice::named("dev");
        let link = link_with(Arc::clone(&device));
        let recorder = Recorder::attach(link.callbacks());
        link.connect().await.unwrap();

        device.drop_link();

        assert_eq!(
            recorder.statuses().last().unwrap().kind,
            StatusKind::Disconnected
        );
        assert_eq!(link.status().kind, StatusKind::Disconnected);
    }

    #[tokio::test]
    async fn test_connect_failure_leaves_no_write_channel() {
        let device = FakeDevice::named("dev").failing_notifications();
        let link = link_with(Arc::clone(&device));

        assert!(link.connect().await.is_err());
        assert!(link.send(&Message::hello("pwa")).await.unwrap_err().is_not_connected());
    }

    #[tokio::test]
    async fn test_connect_failure_reports_disconnected() {
        let device = FakeDevice::named("dev").failing_notifications();
        let link = link_with(Arc::clone(&device));
        let recorder = Recorder::attach(link.callbacks());

        let err = link.connect().await.unwrap_err();

        assert!(matches!(err, Error::Wireless { .. }));
        assert_eq!(
            recorder.statuses().last().unwrap(),
            &ConnectionStatus::wireless(StatusKind::Disconnected, Some("dev".into()))
        );
        assert_eq!(link.status().kind, StatusKind::Disconnected);
        assert!(!device.is_connected());
    }

    #[tokio::test]
    async fn test_connect_timeout_releases_device() {
        let device = FakeDevice::named("dev").with_notify_delay(Duration::from_millis(200));
        let config = TransportConfig::new().with_connect_timeout(Duration::from_millis(30));
        let link = FramedLink::new(
            Some(Arc::new(FakeAdapter::new(Arc::clone(&device)))),
            Arc::new(config),
        );
        let recorder = Recorder::attach(link.callbacks());

        let err = link.connect().await.unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(
            recorder.statuses().last().unwrap().kind,
            StatusKind::Disconnected
        );
        assert!(!device.is_connected());
        assert!(link.send(&Message::hello("pwa")).await.unwrap_err().is_not_connected());
    }

    #[tokio::test]
    async fn test_close_disconnects_device() {
        let device = FakeDevice::named("dev");
        let link = link_with(Arc::clone(&device));
        link.connect().await.unwrap();

        link.close().await;

        assert!(!device.is_connected());
        assert!(link.send(&Message::hello("pwa")).await.is_err());
    }
}
