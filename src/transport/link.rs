//! Common capability set of both links.

// ============================================================================
// Imports
// ============================================================================

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::protocol::{ConnectionStatus, Message, TransportKind};

use super::callbacks::LinkCallbacks;

// ============================================================================
// Link
// ============================================================================

/// A connected channel to the controller.
///
/// Connecting differs per link (the wireless link picks a device, the
/// networked link takes a base address) and lives on the concrete types.
/// Everything the router needs afterwards is here.
#[async_trait]
pub trait Link: Send + Sync + Debug {
    /// Which link this is.
    fn transport(&self) -> TransportKind;

    /// Callback slot that receives messages and status changes.
    fn callbacks(&self) -> &Arc<LinkCallbacks>;

    /// Sends one message. Concurrent calls are serialized per link.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::NotConnected`] if there is no live channel
    /// - [`crate::Error::TimedOut`] if the send deadline expires
    async fn send(&self, message: &Message) -> Result<()>;

    /// Current status, derived locally without any I/O.
    fn status(&self) -> ConnectionStatus;

    /// Stops background work and drops the channel.
    async fn close(&self);
}
