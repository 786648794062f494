//! Transport abstraction layer.
//!
//! Normalizes two structurally different channels behind one [`Link`]
//! capability set, and routes application traffic through whichever one is
//! active.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐     ┌─────────────────┐     ┌────────────────────────────┐
//! │ Application  │────►│ TransportRouter │────►│ FramedLink (wireless)      │
//! │              │     │  one active     │     │  180-byte chunked writes   │
//! │ on_message   │◄────│  Subscription   │◄────│  notify → Message          │
//! │ on_status    │     │  status watch   │     ├────────────────────────────┤
//! │              │     │                 │────►│ HttpLink (networked)       │
//! │              │     │                 │◄────│  POST + push-or-poll feed  │
//! └──────────────┘     └─────────────────┘     └────────────────────────────┘
//! ```
//!
//! # Session Lifecycle
//!
//! 1. `connect_wireless` / `connect_networked` builds a fresh link and makes it active
//! 2. The previous link's subscription is released and the link closed
//! 3. The link connects and emits `connecting` → `connected`
//! 4. The router sends a `hello` handshake
//! 5. Asynchronous drops surface only as `disconnected` status
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `callbacks` | Callback slot and subscription handles |
//! | `framing` | Outbound chunking |
//! | `http` | Networked link |
//! | `link` | Common link trait |
//! | `router` | Active link selection |
//! | `sse` | Event-stream parser |
//! | `wireless` | Wireless link and platform traits |

// ============================================================================
// Submodules
// ============================================================================

/// Callback slot and subscription handles.
pub mod callbacks;

/// Outbound chunking for the wireless link.
pub mod framing;

/// Networked link.
pub mod http;

/// Common link trait.
pub mod link;

/// Active link selection.
pub mod router;

/// Event-stream parser.
pub mod sse;

/// Wireless link and platform traits.
pub mod wireless;

#[cfg(test)]
pub(crate) mod test_support;

// ============================================================================
// Re-exports
// ============================================================================

pub use callbacks::{LinkCallbacks, MessageHandler, StatusHandler, Subscription};
pub use http::{HttpLink, SubscriptionMode, normalize_base_url};
pub use link::Link;
pub use router::{TransportRouter, TransportRouterBuilder};
pub use wireless::{
    DisconnectHandler, FramedLink, NotificationStream, WirelessAdapter, WirelessDevice,
};
