//! Message and status types shared by both links.
//!
//! # Protocol Overview
//!
//! | Type | Direction | Purpose |
//! |------|-----------|---------|
//! | `Message` | Both | Opaque JSON envelope with a `type` discriminant |
//! | `ConnectionStatus` | Link → App | Snapshot of link lifecycle |
//!
//! # Message Types
//!
//! Observed discriminants: `state`, `ack`, `hello`, `text`, `error`.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `message` | Message envelope and JSON encoding |
//! | `state` | Snapshot reducer |
//! | `status` | Connection status snapshots |

// ============================================================================
// Submodules
// ============================================================================

/// Message envelope.
pub mod message;

/// Snapshot reducer.
pub mod state;

/// Connection status snapshots.
pub mod status;

// ============================================================================
// Re-exports
// ============================================================================

pub use message::{Message, MessageKind};
pub use state::merge_state;
pub use status::{ConnectionStatus, Indicator, StatusKind, TransportKind};
