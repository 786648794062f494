//! Scoreboard Link - transport layer for remote scoreboard controllers.
//!
//! Mirrors and edits match state held by a physical scoreboard controller
//! over one of two interchangeable links: a short-range wireless link with
//! MTU-bounded writes and push notifications, or a local-network link with
//! request/response commands and a push-or-poll feed.
//!
//! # Architecture
//!
//! - **FramedLink**: wireless device, 180-byte chunked writes, one
//!   notification per inbound message
//! - **HttpLink**: JSON POST commands, server-sent events with a one-way
//!   fallback to 1 s polling
//! - **TransportRouter**: exactly one active link, one message callback, one
//!   status callback
//!
//! Payloads are opaque JSON objects; the crate never interprets scoreboard
//! fields beyond the [`merge_state`] reducer offered to the application.
//!
//! # Quick Start
//!
//! ```no_run
//! use scoreboard_link::{Message, Result, TransportRouter, merge_state};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let router = TransportRouter::builder().build()?;
//!
//!     router.on_message(|msg| {
//!         if let Some(snapshot) = msg.state_snapshot() {
//!             let merged = merge_state(&json!({ "a": 0, "b": 0 }), snapshot);
//!             println!("state: {merged}");
//!         }
//!     });
//!     router.on_status(|status| println!("{}", status.label()));
//!
//!     router.connect_networked("192.168.4.1").await?;
//!     router.send(&Message::state(json!({ "a": 1 }))).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | Chunk size, poll interval, deadlines |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Message envelope, status snapshots, reducer |
//! | [`transport`] | Links and router |

// ============================================================================
// Modules
// ============================================================================

/// Transport configuration.
pub mod config;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// Message envelope and connection status types.
pub mod protocol;

/// Wireless and networked links plus the router.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Configuration
pub use config::TransportConfig;

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::SubscriptionId;

// Protocol types
pub use protocol::{
    ConnectionStatus, Indicator, Message, MessageKind, StatusKind, TransportKind, merge_state,
};

// Transport types
pub use transport::{
    FramedLink, HttpLink, Link, Subscription, SubscriptionMode, TransportRouter,
    TransportRouterBuilder, WirelessAdapter, WirelessDevice,
};
