//! Transport configuration.
//!
//! Holds the tunables shared by both links: wireless chunk size, poll
//! interval, per-operation deadlines and the handshake originator label.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use scoreboard_link::TransportConfig;
//!
//! let config = TransportConfig::new()
//!     .with_poll_interval(Duration::from_millis(500))
//!     .with_send_timeout(Duration::from_secs(5))
//!     .with_originator("kiosk");
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Safe per-write size for the wireless link.
pub const DEFAULT_CHUNK_SIZE: usize = 180;

/// Interval between state polls once the push stream is gone.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Deadline for connect and probe.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Deadline for one whole send.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Label carried in the `from` field of the hello handshake.
pub const DEFAULT_ORIGINATOR: &str = "pwa";

/// Scheme prefixed to base addresses that omit one.
pub const DEFAULT_SCHEME: &str = "http";

// ============================================================================
// TransportConfig
// ============================================================================

/// Configuration shared by the router and its links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Maximum bytes per wireless write.
    pub chunk_size: usize,

    /// Delay between polls of the state endpoint.
    pub poll_interval: Duration,

    /// Deadline for wireless connect and the networked probe.
    pub connect_timeout: Duration,

    /// Deadline for one send, covering every chunk.
    pub send_timeout: Duration,

    /// Originator label for the hello handshake.
    pub originator: String,

    /// Scheme used when the base address has none.
    pub default_scheme: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl TransportConfig {
    /// Creates a configuration with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            poll_interval: DEFAULT_POLL_INTERVAL,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            send_timeout: DEFAULT_SEND_TIMEOUT,
            originator: DEFAULT_ORIGINATOR.to_string(),
            default_scheme: DEFAULT_SCHEME.to_string(),
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl TransportConfig {
    /// Sets the wireless chunk size in bytes.
    #[inline]
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Sets the state poll interval.
    #[inline]
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the connect deadline.
    #[inline]
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the send deadline.
    #[inline]
    #[must_use]
    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// Sets the handshake originator label.
    #[inline]
    #[must_use]
    pub fn with_originator(mut self, originator: impl Into<String>) -> Self {
        self.originator = originator.into();
        self
    }

    /// Sets the scheme prefixed to bare addresses (`http` or `https`).
    #[inline]
    #[must_use]
    pub fn with_default_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.default_scheme = scheme.into();
        self
    }
}

// ============================================================================
// Validation
// ============================================================================

impl TransportConfig {
    /// Checks that every setting is usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Precondition`] for a zero chunk size, a zero poll
    /// interval or an unsupported default scheme.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::precondition("chunk size must be greater than zero"));
        }

        if self.poll_interval.is_zero() {
            return Err(Error::precondition(
                "poll interval must be greater than zero",
            ));
        }

        if !matches!(self.default_scheme.as_str(), "http" | "https") {
            return Err(Error::precondition(format!(
                "unsupported default scheme: {}",
                self.default_scheme
            )));
        }

        Ok(())
    }

    /// Returns the connect deadline in milliseconds, for error reporting.
    #[inline]
    #[must_use]
    pub(crate) fn connect_timeout_ms(&self) -> u64 {
        u64::try_from(self.connect_timeout.as_millis()).unwrap_or(u64::MAX)
    }

    /// Returns the send deadline in milliseconds, for error reporting.
    #[inline]
    #[must_use]
    pub(crate) fn send_timeout_ms(&self) -> u64 {
        u64::try_from(self.send_timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

// ============================================================================
// Tests
// ============================================================================
