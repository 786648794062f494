//! Callback registration for links.
//!
//! Each link owns one [`LinkCallbacks`] slot. Attaching handlers returns a
//! [`Subscription`]; the link relays only to the handlers of the current
//! subscription, and releasing (or dropping) the subscription detaches them.
//!
//! Handlers are cloned out of the lock before they run, so a handler may
//! attach, release or emit again without deadlocking.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::identifiers::SubscriptionId;
use crate::protocol::{ConnectionStatus, Message};

// ============================================================================
// Types
// ============================================================================

/// Message callback.
pub type MessageHandler = Arc<dyn Fn(Message) + Send + Sync>;

/// Status callback.
pub type StatusHandler = Arc<dyn Fn(ConnectionStatus) + Send + Sync>;

/// Handlers attached under one subscription.
struct Registration {
    id: SubscriptionId,
    on_message: MessageHandler,
    on_status: StatusHandler,
}

// ============================================================================
// LinkCallbacks
// ============================================================================

/// Single callback slot owned by a link.
#[derive(Default)]
pub struct LinkCallbacks {
    slot: Mutex<Option<Registration>>,
}

impl fmt::Debug for LinkCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkCallbacks")
            .field("subscription", &self.current())
            .finish()
    }
}

impl LinkCallbacks {
    /// Creates an empty slot.
    #[inline]
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Attaches handlers, replacing any earlier registration.
    #[must_use = "dropping the subscription detaches the handlers"]
    pub fn attach(
        self: &Arc<Self>,
        on_message: MessageHandler,
        on_status: StatusHandler,
    ) -> Subscription {
        let id = SubscriptionId::generate();
        let previous = self.slot.lock().replace(Registration {
            id,
            on_message,
            on_status,
        });

        if let Some(previous) = previous {
            debug!(previous = %previous.id, current = %id, "Callbacks replaced");
        }

        Subscription {
            id,
            callbacks: Arc::downgrade(self),
        }
    }

    /// Returns the id of the live subscription.
    #[must_use]
    pub fn current(&self) -> Option<SubscriptionId> {
        self.slot.lock().as_ref().map(|r| r.id)
    }

    /// Delivers a message to the live subscription, if any.
    pub(crate) fn emit_message(&self, message: Message) {
        let handler = self.slot.lock().as_ref().map(|r| Arc::clone(&r.on_message));
        match handler {
            Some(handler) => handler(message),
            None => trace!("Message dropped, no subscription"),
        }
    }

    /// Delivers a status to the live subscription, if any.
    pub(crate) fn emit_status(&self, status: ConnectionStatus) {
        let handler = self.slot.lock().as_ref().map(|r| Arc::clone(&r.on_status));
        match handler {
            Some(handler) => handler(status),
            None => trace!(kind = %status.kind, "Status dropped, no subscription"),
        }
    }

    /// Removes the registration if it is still `id`.
    fn detach(&self, id: SubscriptionId) -> bool {
        let mut slot = self.slot.lock();
        if slot.as_ref().is_some_and(|r| r.id == id) {
            *slot = None;
            true
        } else {
            false
        }
    }
}

// ============================================================================
// Subscription
// ============================================================================

/// Handle to one callback registration.
///
/// Detaches on [`Subscription::release`] or drop. A handle whose
/// registration was already replaced detaches nothing.
pub struct Subscription {
    id: SubscriptionId,
    callbacks: Weak<LinkCallbacks>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("live", &self.is_live())
            .finish()
    }
}

impl Subscription {
    /// Returns the subscription id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Returns `true` while this handle's handlers are attached.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.callbacks
            .upgrade()
            .is_some_and(|callbacks| callbacks.current() == Some(self.id))
    }

    /// Detaches the handlers now.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(callbacks) = self.callbacks.upgrade()
            && callbacks.detach(self.id)
        {
            debug!(subscription = %self.id, "Callbacks released");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
