//! Scoreboard state reducer.
//!
//! Inbound `state` messages are snapshots merged field by field into the
//! canonical record. Fields present in the snapshot win; fields it omits are
//! kept, so client-only fields survive a partial snapshot.

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;

// ============================================================================
// merge_state
// ============================================================================

/// Merges `incoming` over `current`, returning a new record.
///
/// Top-level fields are replaced wholesale (nested objects are not merged).
/// If either side is not a JSON object, `incoming` replaces `current` unless
/// it is `null`.
#[must_use]
pub fn merge_state(current: &Value, incoming: &Value) -> Value {
    match (current, incoming) {
        (Value::Object(base), Value::Object(update)) => {
            let mut merged = base.clone();
            for (key, value) in update {
                merged.insert(key.clone(), value.clone());
            }
            Value::Object(merged)
        }
        (_, Value::Null) => current.clone(),
        (_, other) => other.clone(),
    }
}

// ============================================================================
// Tests
// ============================================================================
