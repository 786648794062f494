//! Outbound chunking for the wireless link.
//!
//! A serialized message is split into contiguous slices of at most
//! `chunk_size` bytes, written in order. No sequence numbers or boundary
//! markers are added: the remote treats each burst between notification
//! gaps as one message. Inbound notifications are never chunked.

// ============================================================================
// Imports
// ============================================================================

use std::slice::Chunks;

// ============================================================================
// Functions
// ============================================================================

/// Splits `payload` into ordered chunks of at most `chunk_size` bytes.
///
/// An empty payload yields no chunks.
///
/// # Panics
///
/// Panics if `chunk_size` is zero. [`crate::TransportConfig::validate`]
/// rejects that value before any link is built.
#[inline]
#[must_use]
pub fn chunks(payload: &[u8], chunk_size: usize) -> Chunks<'_, u8> {
    payload.chunks(chunk_size)
}

/// Number of writes needed for `len` bytes, i.e. `ceil(len / chunk_size)`.
#[inline]
#[must_use]
pub const fn chunk_count(len: usize, chunk_size: usize) -> usize {
    len.div_ceil(chunk_size)
}

// ============================================================================
// Tests
// ============================================================================
