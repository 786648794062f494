//! Error types for the scoreboard transport layer.
//!
//! Every failure is scoped to the operation that produced it: connect
//! failures surface to the caller of connect, send failures to the caller of
//! send. Asynchronous link drops never raise; they are reported only through
//! the status callback.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use scoreboard_link::{Message, Result, TransportRouter};
//!
//! async fn example(router: &TransportRouter) -> Result<()> {
//!     router.connect_networked("192.168.4.1").await?;
//!     router.send(&Message::state(serde_json::json!({ "a": 1 }))).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Connection | [`Error::Precondition`], [`Error::ProbeFailed`], [`Error::InvalidAddress`], [`Error::Wireless`] |
//! | Send | [`Error::Http`], [`Error::NotConnected`], [`Error::NoActiveTransport`] |
//! | Deadline | [`Error::TimedOut`] |
//! | External | [`Error::Json`], [`Error::Request`] |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;

use crate::protocol::TransportKind;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// Host platform lacks a required capability.
    ///
    /// Returned immediately by connect, never retried.
    #[error("Precondition failed: {message}")]
    Precondition {
        /// Description of the missing capability.
        message: String,
    },

    /// Networked liveness probe failed.
    #[error("Probe failed for {url}: {reason}")]
    ProbeFailed {
        /// Probe URL.
        url: String,
        /// Why the probe failed.
        reason: String,
    },

    /// Base address could not be turned into a URL.
    #[error("Invalid address '{address}': {message}")]
    InvalidAddress {
        /// Address as supplied by the caller.
        address: String,
        /// Parser message.
        message: String,
    },

    /// Wireless platform reported a failure.
    #[error("Wireless error: {message}")]
    Wireless {
        /// Platform message.
        message: String,
    },

    // ========================================================================
    // Send Errors
    // ========================================================================
    /// Non-success HTTP status on a command send.
    #[error("HTTP {status}")]
    Http {
        /// Response status code.
        status: u16,
    },

    /// The link has no live channel.
    #[error("Not connected ({transport})")]
    NotConnected {
        /// Link that rejected the send.
        transport: TransportKind,
    },

    /// The router has no active link.
    #[error("No active transport")]
    NoActiveTransport,

    // ========================================================================
    // Deadline Errors
    // ========================================================================
    /// Operation exceeded its deadline.
    #[error("Timed out after {timeout_ms}ms: {operation}")]
    TimedOut {
        /// Operation that timed out.
        operation: String,
        /// Milliseconds waited.
        timeout_ms: u64,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client error.
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a precondition error.
    #[inline]
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition {
            message: message.into(),
        }
    }

    /// Creates a probe failed error.
    #[inline]
    pub fn probe_failed(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ProbeFailed {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid address error.
    #[inline]
    pub fn invalid_address(address: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidAddress {
            address: address.into(),
            message: message.into(),
        }
    }

    /// Creates a wireless error.
    #[inline]
    pub fn wireless(message: impl Into<String>) -> Self {
        Self::Wireless {
            message: message.into(),
        }
    }

    /// Creates an HTTP status error.
    #[inline]
    pub fn http(status: u16) -> Self {
        Self::Http { status }
    }

    /// Creates a not connected error.
    #[inline]
    pub fn not_connected(transport: TransportKind) -> Self {
        Self::NotConnected { transport }
    }

    /// Creates a timeout error.
    #[inline]
    pub fn timed_out(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::TimedOut {
            operation: operation.into(),
            timeout_ms,
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }

    /// Returns `true` if a send failed because nothing was connected.
    #[inline]
    #[must_use]
    pub fn is_not_connected(&self) -> bool {
        matches!(self, Self::NotConnected { .. } | Self::NoActiveTransport)
    }

    /// Returns `true` if this error happened while establishing a link.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Precondition { .. }
                | Self::ProbeFailed { .. }
                | Self::InvalidAddress { .. }
                | Self::Wireless { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
