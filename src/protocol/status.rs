//! Connection status snapshots.
//!
//! A [`ConnectionStatus`] is created fresh on every transition and never
//! mutated afterwards, so listeners always see a consistent value.
//!
//! # Format
//!
//! ```json
//! { "kind": "connected", "transport": "wireless", "name": "ESP32-Scoreboard" }
//! { "kind": "connecting", "transport": "networked", "baseUrl": "http://192.168.4.1" }
//! { "kind": "idle" }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// StatusKind
// ============================================================================

/// Lifecycle state of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    /// No link has been chosen.
    Idle,
    /// Connect in progress.
    Connecting,
    /// Link is live.
    Connected,
    /// Link dropped or was never established.
    Disconnected,
}

impl StatusKind {
    /// Returns the wire name.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
        }
    }
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// TransportKind
// ============================================================================

/// Which link carries the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Short-range wireless link.
    Wireless,
    /// Local-network link.
    Networked,
}

impl TransportKind {
    /// Returns the wire name.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Wireless => "wireless",
            Self::Networked => "networked",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Indicator
// ============================================================================

/// Coarse badge state derived from a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Indicator {
    /// Connected.
    Ok,
    /// Connecting.
    Busy,
    /// Idle or disconnected.
    Bad,
}

// ============================================================================
// ConnectionStatus
// ============================================================================

/// Snapshot of a link's connection state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    /// Lifecycle state.
    pub kind: StatusKind,

    /// Link kind (absent when idle).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport: Option<TransportKind>,

    /// Advertised device name (wireless only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Normalized base address (networked only).
    #[serde(
        rename = "baseUrl",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub base_url: Option<String>,
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        Self::idle()
    }
}

impl ConnectionStatus {
    /// Status reported before any link is chosen.
    #[inline]
    #[must_use]
    pub const fn idle() -> Self {
        Self {
            kind: StatusKind::Idle,
            transport: None,
            name: None,
            base_url: None,
        }
    }

    /// Status of the wireless link.
    #[inline]
    #[must_use]
    pub fn wireless(kind: StatusKind, name: Option<String>) -> Self {
        Self {
            kind,
            transport: Some(TransportKind::Wireless),
            name,
            base_url: None,
        }
    }

    /// Status of the networked link.
    #[inline]
    #[must_use]
    pub fn networked(kind: StatusKind, base_url: Option<String>) -> Self {
        Self {
            kind,
            transport: Some(TransportKind::Networked),
            name: None,
            base_url,
        }
    }

    /// Returns `true` if the link is live.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.kind == StatusKind::Connected
    }

    /// Derives the badge indicator.
    #[must_use]
    pub fn indicator(&self) -> Indicator {
        match self.kind {
            StatusKind::Connected => Indicator::Ok,
            StatusKind::Connecting => Indicator::Busy,
            StatusKind::Idle | StatusKind::Disconnected => Indicator::Bad,
        }
    }

    /// Human-readable badge text, e.g. `connected via ESP32-Scoreboard`.
    #[must_use]
    pub fn label(&self) -> String {
        let via = match self.transport {
            Some(TransportKind::Wireless) => self.name.as_deref().unwrap_or("Bluetooth"),
            Some(TransportKind::Networked) => self.base_url.as_deref().unwrap_or("Wi-Fi"),
            None => return self.kind.to_string(),
        };
        format!("{} via {via}", self.kind)
    }
}

// ============================================================================
// Tests
// ============================================================================
